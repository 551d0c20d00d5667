mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use carecircle_core::channels::{Channel, ChannelSet};
use carecircle_core::error::CoreError;
use carecircle_core::notification::{NotificationContent, NotificationType};
use carecircle_core::preferences::PreferencesUpdate;
use carecircle_events::{
    ChannelOutcome, Clock, DeliveryChannelError, DeliveryContext, InMemoryNotificationStore,
    NotificationConfig, NotificationDispatcher, NotificationStore, NotifyError, SuppressReason,
};
use chrono::{TimeZone, Utc};
use common::{
    harness, harness_with, FakeForumDirectory, RecordingBroadcaster, RecordingEmailSender,
    StaticUserDirectory,
};

fn care_update() -> NotificationContent {
    NotificationContent::new(
        NotificationType::CareUpdate,
        "Appointment moved",
        "Mom's checkup is now Thursday.",
    )
}

#[tokio::test]
async fn delivers_on_both_channels_by_default() {
    let h = harness();
    let result = h
        .dispatcher
        .dispatch(2, &care_update(), &DeliveryContext::default().with_sender("Sam"))
        .await
        .unwrap();

    assert_eq!(result.user_id, 2);
    assert_eq!(result.in_app, ChannelOutcome::Delivered { message_id: None });
    assert_matches!(result.email, ChannelOutcome::Delivered { message_id: Some(_) });
    assert_eq!(h.broadcaster.pushes().await, vec![(2, 1)]);

    let sent = h.email.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "user2@example.com");
    assert_eq!(sent[0].subject, "[CareCircle] Appointment moved");
    assert!(sent[0].body.starts_with("Hi User 2,"));
    assert_eq!(
        sent[0].metadata.get("notification_id"),
        Some(&result.notification_id.to_string())
    );
}

#[tokio::test]
async fn persists_even_when_every_channel_is_suppressed() {
    let h = harness();
    h.store
        .upsert_preferences(
            3,
            &PreferencesUpdate {
                email_enabled: Some(false),
                in_app_enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = h
        .dispatcher
        .dispatch(3, &care_update(), &DeliveryContext::default())
        .await
        .unwrap();

    assert_eq!(
        result.in_app,
        ChannelOutcome::Suppressed(SuppressReason::ChannelDisabled)
    );
    assert_eq!(
        result.email,
        ChannelOutcome::Suppressed(SuppressReason::ChannelDisabled)
    );
    assert_eq!(h.store.all_for_user(3).await.len(), 1);
    assert!(h.broadcaster.pushes().await.is_empty());
    assert!(h.email.sent().await.is_empty());
}

#[tokio::test]
async fn exactly_one_row_per_dispatch() {
    let h = harness();
    for i in 0..5 {
        let content = if i % 2 == 0 {
            care_update()
        } else {
            care_update().with_channels(ChannelSet::in_app_only())
        };
        h.dispatcher
            .dispatch(4, &content, &DeliveryContext::default())
            .await
            .unwrap();
    }
    assert_eq!(h.store.all_for_user(4).await.len(), 5);
}

#[tokio::test]
async fn family_activity_email_is_off_by_default() {
    let h = harness();
    let content = NotificationContent::new(
        NotificationType::FamilyActivity,
        "New member",
        "Jo joined the family.",
    );
    let result = h
        .dispatcher
        .dispatch(5, &content, &DeliveryContext::default())
        .await
        .unwrap();

    assert!(result.in_app.is_delivered());
    assert_eq!(
        result.email,
        ChannelOutcome::Suppressed(SuppressReason::TypeDisabled)
    );
}

#[tokio::test]
async fn unrequested_channel_is_not_used() {
    let h = harness();
    let content = NotificationContent::new(
        NotificationType::Other("FORUM_DOWNVOTE".into()),
        "Your reply was downvoted",
        "",
    )
    .with_channels(ChannelSet::in_app_only());

    let result = h
        .dispatcher
        .dispatch(6, &content, &DeliveryContext::default())
        .await
        .unwrap();

    assert!(result.in_app.is_delivered());
    assert_eq!(
        result.outcome(Channel::Email),
        &ChannelOutcome::Suppressed(SuppressReason::NotRequested)
    );
    assert!(h.email.sent().await.is_empty());
}

#[tokio::test]
async fn unknown_user_is_rejected_before_persisting() {
    let h = harness();
    let err = h
        .dispatcher
        .dispatch(99_999, &care_update(), &DeliveryContext::default())
        .await
        .unwrap_err();

    assert_matches!(err, NotifyError::Core(CoreError::NotFound { id: 99_999, .. }));
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn store_failure_propagates() {
    let h = harness();
    h.store.fail_creates_for(7).await;
    let err = h
        .dispatcher
        .dispatch(7, &care_update(), &DeliveryContext::default())
        .await
        .unwrap_err();
    assert_matches!(err, NotifyError::Store(_));
    assert!(h.broadcaster.pushes().await.is_empty());
}

#[tokio::test]
async fn broadcast_failure_does_not_block_email() {
    let h = harness_with(
        RecordingBroadcaster::failing(),
        RecordingEmailSender::default(),
        FakeForumDirectory::default(),
        NotificationConfig::default(),
    );
    let result = h
        .dispatcher
        .dispatch(8, &care_update(), &DeliveryContext::default())
        .await
        .unwrap();

    assert_matches!(
        result.in_app,
        ChannelOutcome::Failed(DeliveryChannelError::Broadcast(_))
    );
    assert!(result.email.is_delivered());
    assert_eq!(h.store.all_for_user(8).await.len(), 1);
}

#[tokio::test]
async fn email_failure_is_recorded_not_raised() {
    let h = harness_with(
        RecordingBroadcaster::default(),
        RecordingEmailSender::failing(),
        FakeForumDirectory::default(),
        NotificationConfig::default(),
    );
    let result = h
        .dispatcher
        .dispatch(9, &care_update(), &DeliveryContext::default())
        .await
        .unwrap();

    assert!(result.in_app.is_delivered());
    assert_matches!(
        result.email,
        ChannelOutcome::Failed(DeliveryChannelError::Email(_))
    );
}

#[tokio::test(start_paused = true)]
async fn slow_email_times_out() {
    let config = NotificationConfig {
        channel_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let h = harness_with(
        RecordingBroadcaster::default(),
        RecordingEmailSender::slow(Duration::from_secs(30)),
        FakeForumDirectory::default(),
        config,
    );
    let result = h
        .dispatcher
        .dispatch(10, &care_update(), &DeliveryContext::default())
        .await
        .unwrap();

    assert!(result.in_app.is_delivered());
    assert_eq!(
        result.email,
        ChannelOutcome::Failed(DeliveryChannelError::Timeout {
            channel: Channel::Email,
            elapsed_ms: 2_000,
        })
    );
    assert_eq!(h.store.all_for_user(10).await.len(), 1);
}

#[tokio::test]
async fn missing_address_and_transport_are_suppressions() {
    let store = Arc::new(InMemoryNotificationStore::new());
    let mut users = StaticUserDirectory::up_to(20);
    users.no_email.insert(11);
    let broadcaster = Arc::new(RecordingBroadcaster::default());

    let without_transport = NotificationDispatcher::new(
        store.clone(),
        Arc::new(StaticUserDirectory::up_to(20)),
        Arc::new(FakeForumDirectory::default()),
        broadcaster.clone(),
        &NotificationConfig::default(),
    );
    let result = without_transport
        .dispatch(12, &care_update(), &DeliveryContext::default())
        .await
        .unwrap();
    assert_eq!(
        result.email,
        ChannelOutcome::Suppressed(SuppressReason::NoTransport)
    );

    let without_address = NotificationDispatcher::new(
        store.clone(),
        Arc::new(users),
        Arc::new(FakeForumDirectory::default()),
        broadcaster,
        &NotificationConfig::default(),
    )
    .with_email_sender(Arc::new(RecordingEmailSender::default()), "");
    let result = without_address
        .dispatch(11, &care_update(), &DeliveryContext::default())
        .await
        .unwrap();
    assert_eq!(
        result.email,
        ChannelOutcome::Suppressed(SuppressReason::NoAddress)
    );
}

fn clock_at(hour: u32, minute: u32) -> Clock {
    let instant = Utc
        .with_ymd_and_hms(2025, 3, 14, hour, minute, 0)
        .single()
        .unwrap();
    Arc::new(move || instant)
}

async fn quiet_overnight(store: &InMemoryNotificationStore, user_id: i64) {
    store
        .upsert_preferences(
            user_id,
            &PreferencesUpdate {
                quiet_hours_enabled: Some(true),
                quiet_hours_start: Some(Some("22:00".into())),
                quiet_hours_end: Some(Some("06:00".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn quiet_hours_hold_email_but_not_in_app() {
    let h = harness();
    quiet_overnight(&h.store, 14).await;
    let dispatcher = h.dispatcher.with_clock(clock_at(23, 30));

    let result = dispatcher
        .dispatch(14, &care_update(), &DeliveryContext::default())
        .await
        .unwrap();

    assert_eq!(
        result.email,
        ChannelOutcome::Suppressed(SuppressReason::QuietHours)
    );
    assert_eq!(result.in_app, ChannelOutcome::Delivered { message_id: None });
    assert!(h.email.sent().await.is_empty());
    assert_eq!(h.broadcaster.pushes().await, vec![(14, 1)]);
    assert_eq!(h.store.all_for_user(14).await.len(), 1);
}

#[tokio::test]
async fn email_resumes_outside_quiet_hours() {
    let h = harness();
    quiet_overnight(&h.store, 15).await;
    let dispatcher = h.dispatcher.with_clock(clock_at(12, 0));

    let result = dispatcher
        .dispatch(15, &care_update(), &DeliveryContext::default())
        .await
        .unwrap();

    assert_matches!(result.email, ChannelOutcome::Delivered { message_id: Some(_) });
    assert_eq!(h.email.sent().await.len(), 1);
}

#[tokio::test]
async fn in_app_push_carries_current_unread_total() {
    let h = harness();
    for _ in 0..3 {
        h.dispatcher
            .dispatch(13, &care_update(), &DeliveryContext::default())
            .await
            .unwrap();
    }
    assert_eq!(
        h.broadcaster.pushes().await,
        vec![(13, 1), (13, 2), (13, 3)]
    );
}

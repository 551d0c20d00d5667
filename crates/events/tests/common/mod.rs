#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carecircle_core::types::DbId;
use carecircle_events::{
    Broadcaster, DeliveryChannelError, EmailReceipt, EmailSender, ForumDirectory,
    InMemoryNotificationStore, LookupError, NotificationConfig, NotificationDispatcher,
    OutboundEmail, UserContact, UserDirectory,
};
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Broadcaster
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingBroadcaster {
    pub pushes: Mutex<Vec<(DbId, i64)>>,
    pub fail: bool,
}

impl RecordingBroadcaster {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub async fn pushes(&self) -> Vec<(DbId, i64)> {
        self.pushes.lock().await.clone()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn push_unread_count(&self, user_id: DbId, count: i64) -> Result<(), DeliveryChannelError> {
        if self.fail {
            return Err(DeliveryChannelError::Broadcast("socket closed".into()));
        }
        self.pushes.lock().await.push((user_id, count));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EmailSender
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingEmailSender {
    pub sent: Mutex<Vec<OutboundEmail>>,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub sequence: AtomicUsize,
}

impl RecordingEmailSender {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<EmailReceipt, DeliveryChannelError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DeliveryChannelError::Email("relay refused".into()));
        }
        self.sent.lock().await.push(email.clone());
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        Ok(EmailReceipt {
            message_id: Some(format!("msg-{n}")),
        })
    }
}

// ---------------------------------------------------------------------------
// Directories
// ---------------------------------------------------------------------------

/// Users `1..=max_id` exist, with `user{id}@example.com` addresses except
/// for ids in `no_email`.
pub struct StaticUserDirectory {
    pub max_id: DbId,
    pub no_email: HashSet<DbId>,
}

impl StaticUserDirectory {
    pub fn up_to(max_id: DbId) -> Self {
        Self {
            max_id,
            no_email: HashSet::new(),
        }
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn contact(&self, user_id: DbId) -> Result<Option<UserContact>, LookupError> {
        if user_id < 1 || user_id > self.max_id {
            return Ok(None);
        }
        Ok(Some(UserContact {
            user_id,
            email: (!self.no_email.contains(&user_id)).then(|| format!("user{user_id}@example.com")),
            display_name: format!("User {user_id}"),
        }))
    }
}

#[derive(Default)]
pub struct FakeForumDirectory {
    pub post_authors: HashMap<DbId, DbId>,
    pub reply_authors: HashMap<DbId, DbId>,
    pub participants: HashMap<DbId, Vec<DbId>>,
    pub moderators: HashMap<DbId, Vec<DbId>>,
    pub fail_moderators: bool,
}

#[async_trait]
impl ForumDirectory for FakeForumDirectory {
    async fn post_author(&self, post_id: DbId) -> Result<Option<DbId>, LookupError> {
        Ok(self.post_authors.get(&post_id).copied())
    }

    async fn reply_author(&self, reply_id: DbId) -> Result<Option<DbId>, LookupError> {
        Ok(self.reply_authors.get(&reply_id).copied())
    }

    async fn thread_participants(&self, post_id: DbId) -> Result<Vec<DbId>, LookupError> {
        Ok(self.participants.get(&post_id).cloned().unwrap_or_default())
    }

    async fn forum_moderators(&self, forum_id: DbId) -> Result<Vec<DbId>, LookupError> {
        if self.fail_moderators {
            return Err(LookupError("membership service unavailable".into()));
        }
        Ok(self.moderators.get(&forum_id).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<InMemoryNotificationStore>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub email: Arc<RecordingEmailSender>,
    pub dispatcher: NotificationDispatcher,
}

pub fn harness() -> Harness {
    harness_with(
        RecordingBroadcaster::default(),
        RecordingEmailSender::default(),
        FakeForumDirectory::default(),
        NotificationConfig::default(),
    )
}

pub fn harness_with(
    broadcaster: RecordingBroadcaster,
    email: RecordingEmailSender,
    forums: FakeForumDirectory,
    config: NotificationConfig,
) -> Harness {
    let store = Arc::new(InMemoryNotificationStore::new());
    let broadcaster = Arc::new(broadcaster);
    let email = Arc::new(email);
    let dispatcher = NotificationDispatcher::new(
        store.clone(),
        Arc::new(StaticUserDirectory::up_to(1_000)),
        Arc::new(forums),
        broadcaster.clone(),
        &config,
    )
    .with_email_sender(email.clone(), "[CareCircle]");

    Harness {
        store,
        broadcaster,
        email,
        dispatcher,
    }
}

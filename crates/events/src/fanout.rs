//! Expanding one forum event into per-recipient notifications.
//!
//! Candidates are gathered in a fixed stage order: post author, parent-reply
//! author, thread participants, forum moderators. A recipient is claimed by
//! the first stage that names them, so a post author who also moderates the
//! forum is notified once, as the post author. The actor never receives
//! their own event.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use carecircle_core::notification::NotificationContent;
use carecircle_core::source::{DATA_RECIPIENT_ROLE, DATA_REPLY_ID, SOURCE_FORUM_ID, SOURCE_POST_ID};
use carecircle_core::types::DbId;
use serde::Serialize;

use crate::delivery::SenderContext;
use crate::directory::ForumDirectory;
use crate::error::LookupError;

/// Why a recipient was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientRole {
    PostAuthor,
    ParentReplyAuthor,
    ThreadParticipant,
    ForumModerator,
}

impl RecipientRole {
    /// Stage order.
    pub const ALL: [RecipientRole; 4] = [
        RecipientRole::PostAuthor,
        RecipientRole::ParentReplyAuthor,
        RecipientRole::ThreadParticipant,
        RecipientRole::ForumModerator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecipientRole::PostAuthor => "post_author",
            RecipientRole::ParentReplyAuthor => "parent_reply_author",
            RecipientRole::ThreadParticipant => "thread_participant",
            RecipientRole::ForumModerator => "forum_moderator",
        }
    }
}

impl fmt::Display for RecipientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FanoutEvent
// ---------------------------------------------------------------------------

/// A domain occurrence to fan out. Never persisted.
///
/// Only roles with a template take part: an event that should not reach
/// moderators simply omits the moderator template.
#[derive(Debug, Clone)]
pub struct FanoutEvent {
    /// e.g. `"reply_created"`, `"reply_upvoted"`.
    pub event_type: String,
    pub actor_id: DbId,
    pub post_id: Option<DbId>,
    /// The reply this event is about (the new reply, the voted reply).
    pub reply_id: Option<DbId>,
    /// The reply being answered, for nested replies.
    pub parent_reply_id: Option<DbId>,
    pub forum_id: Option<DbId>,
    /// Sender and family names for rendering. Per-recipient fields are
    /// resolved for each recipient at dispatch time.
    pub sender: SenderContext,
    templates: HashMap<RecipientRole, NotificationContent>,
}

impl FanoutEvent {
    pub fn new(event_type: impl Into<String>, actor_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            actor_id,
            post_id: None,
            reply_id: None,
            parent_reply_id: None,
            forum_id: None,
            sender: SenderContext::default(),
            templates: HashMap::new(),
        }
    }

    pub fn with_post(mut self, post_id: DbId) -> Self {
        self.post_id = Some(post_id);
        self
    }

    pub fn with_reply(mut self, reply_id: DbId) -> Self {
        self.reply_id = Some(reply_id);
        self
    }

    pub fn with_parent_reply(mut self, parent_reply_id: DbId) -> Self {
        self.parent_reply_id = Some(parent_reply_id);
        self
    }

    pub fn with_forum(mut self, forum_id: DbId) -> Self {
        self.forum_id = Some(forum_id);
        self
    }

    pub fn with_sender(mut self, sender: SenderContext) -> Self {
        self.sender = sender;
        self
    }

    pub fn with_template(mut self, role: RecipientRole, content: NotificationContent) -> Self {
        self.templates.insert(role, content);
        self
    }

    pub fn template(&self, role: RecipientRole) -> Option<&NotificationContent> {
        self.templates.get(&role)
    }

    /// The payload for one recipient: the role's template with the event's
    /// source references filled in where the template left them unset.
    fn payload_for(&self, role: RecipientRole) -> Option<NotificationContent> {
        let mut content = self.template(role)?.clone();
        if let Some(id) = self.post_id {
            content.data.insert_if_absent(SOURCE_POST_ID, id);
        }
        if let Some(id) = self.forum_id {
            content.data.insert_if_absent(SOURCE_FORUM_ID, id);
        }
        if let Some(id) = self.reply_id {
            content.data.insert_if_absent(DATA_REPLY_ID, id);
        }
        content.data.insert_if_absent(DATA_RECIPIENT_ROLE, role.as_str());
        Some(content)
    }
}

/// One recipient of a fanout.
#[derive(Debug, Clone)]
pub struct PlannedNotification {
    pub recipient_id: DbId,
    pub role: RecipientRole,
    pub content: NotificationContent,
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Order-preserving de-duplication of staged candidates.
///
/// Returns `(recipient, role)` pairs with the actor removed and each
/// recipient attributed to the first stage that named them.
pub fn plan_recipients(
    actor_id: DbId,
    stages: &[(RecipientRole, Vec<DbId>)],
) -> Vec<(DbId, RecipientRole)> {
    let mut seen = HashSet::from([actor_id]);
    let mut planned = Vec::new();
    for (role, candidates) in stages {
        for &id in candidates {
            if seen.insert(id) {
                planned.push((id, *role));
            }
        }
    }
    planned
}

#[derive(Clone)]
pub struct EventFanoutPlanner {
    forums: Arc<dyn ForumDirectory>,
}

impl EventFanoutPlanner {
    pub fn new(forums: Arc<dyn ForumDirectory>) -> Self {
        Self { forums }
    }

    /// Compute the recipients and payloads for `event`.
    ///
    /// A stage whose lookup fails contributes nobody; the other stages are
    /// unaffected.
    pub async fn plan(&self, event: &FanoutEvent) -> Vec<PlannedNotification> {
        let mut stages = Vec::with_capacity(RecipientRole::ALL.len());
        for role in RecipientRole::ALL {
            if event.template(role).is_none() {
                continue;
            }
            let candidates = match self.collect_stage(event, role).await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(
                        event_type = %event.event_type,
                        role = %role,
                        error = %e,
                        "Fanout stage lookup failed, skipping stage"
                    );
                    Vec::new()
                }
            };
            stages.push((role, candidates));
        }

        plan_recipients(event.actor_id, &stages)
            .into_iter()
            .filter_map(|(recipient_id, role)| {
                event.payload_for(role).map(|content| PlannedNotification {
                    recipient_id,
                    role,
                    content,
                })
            })
            .collect()
    }

    async fn collect_stage(
        &self,
        event: &FanoutEvent,
        role: RecipientRole,
    ) -> Result<Vec<DbId>, LookupError> {
        match role {
            RecipientRole::PostAuthor => match event.post_id {
                Some(id) => Ok(self.forums.post_author(id).await?.into_iter().collect()),
                None => Ok(Vec::new()),
            },
            RecipientRole::ParentReplyAuthor => match event.parent_reply_id {
                Some(id) => Ok(self.forums.reply_author(id).await?.into_iter().collect()),
                None => Ok(Vec::new()),
            },
            RecipientRole::ThreadParticipant => match event.post_id {
                Some(id) => self.forums.thread_participants(id).await,
                None => Ok(Vec::new()),
            },
            RecipientRole::ForumModerator => match event.forum_id {
                Some(id) => self.forums.forum_moderators(id).await,
                None => Ok(Vec::new()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use carecircle_core::notification::{DataValue, NotificationType};

    use super::*;

    #[test]
    fn actor_is_never_planned() {
        let planned = plan_recipients(
            1,
            &[
                (RecipientRole::PostAuthor, vec![1]),
                (RecipientRole::ThreadParticipant, vec![1, 2]),
            ],
        );
        assert_eq!(planned, vec![(2, RecipientRole::ThreadParticipant)]);
    }

    #[test]
    fn first_stage_wins() {
        let planned = plan_recipients(
            9,
            &[
                (RecipientRole::PostAuthor, vec![3]),
                (RecipientRole::ParentReplyAuthor, vec![4]),
                (RecipientRole::ThreadParticipant, vec![4, 5, 5]),
                (RecipientRole::ForumModerator, vec![3, 6]),
            ],
        );
        assert_eq!(
            planned,
            vec![
                (3, RecipientRole::PostAuthor),
                (4, RecipientRole::ParentReplyAuthor),
                (5, RecipientRole::ThreadParticipant),
                (6, RecipientRole::ForumModerator),
            ]
        );
    }

    #[test]
    fn payload_fills_source_references_without_overwriting() {
        let template = NotificationContent::new(
            NotificationType::Other("FORUM_REPLY".into()),
            "New reply",
            "Someone replied",
        )
        .with_data(carecircle_core::notification::NotificationData::new().with("postId", "custom"));
        let event = FanoutEvent::new("reply_created", 1)
            .with_post(10)
            .with_forum(20)
            .with_reply(30)
            .with_template(RecipientRole::ForumModerator, template);

        let content = event.payload_for(RecipientRole::ForumModerator).unwrap();
        assert_eq!(content.data.get("postId"), Some(&DataValue::Text("custom".into())));
        assert_eq!(content.data.get("forumId"), Some(&DataValue::Int(20)));
        assert_eq!(content.data.get("replyId"), Some(&DataValue::Int(30)));
        assert_eq!(
            content.data.get("recipientRole"),
            Some(&DataValue::Text("forum_moderator".into()))
        );
        assert!(event.payload_for(RecipientRole::PostAuthor).is_none());
    }
}

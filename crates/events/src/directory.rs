//! Lookups the engine needs from the rest of the application.
//!
//! Users, posts, replies, and forum membership are owned elsewhere; the
//! engine only reads them through these traits.

use async_trait::async_trait;
use carecircle_core::types::DbId;

use crate::error::LookupError;

/// How to reach a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContact {
    pub user_id: DbId,
    /// `None` when the user has no deliverable address.
    pub email: Option<String>,
    pub display_name: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `Ok(None)` means the user does not exist.
    async fn contact(&self, user_id: DbId) -> Result<Option<UserContact>, LookupError>;
}

/// Forum structure consulted by the fanout planner.
#[async_trait]
pub trait ForumDirectory: Send + Sync {
    async fn post_author(&self, post_id: DbId) -> Result<Option<DbId>, LookupError>;

    async fn reply_author(&self, reply_id: DbId) -> Result<Option<DbId>, LookupError>;

    /// Distinct authors of replies under a post.
    async fn thread_participants(&self, post_id: DbId) -> Result<Vec<DbId>, LookupError>;

    /// Members of a forum holding the moderator role.
    async fn forum_moderators(&self, forum_id: DbId) -> Result<Vec<DbId>, LookupError>;
}

//! Source-entity references carried in notification data, and the
//! allow-list of fields a "mark read by source" request may filter on.
//!
//! The allow-list is a security boundary: only these keys may be used to
//! select notifications in bulk, never an arbitrary field from the request.

use std::fmt;

use crate::error::CoreError;

pub const SOURCE_CONVERSATION_ID: &str = "conversationId";
pub const SOURCE_POST_ID: &str = "postId";
pub const SOURCE_FORUM_ID: &str = "forumId";
pub const SOURCE_RESOURCE_ID: &str = "resourceId";
pub const SOURCE_ALERT_ID: &str = "alertId";
pub const SOURCE_ANNOUNCEMENT_ID: &str = "announcementId";

/// Data key for the reply a forum notification refers to. Informational
/// only; not accepted as a bulk read filter.
pub const DATA_REPLY_ID: &str = "replyId";

/// Data key recording why a fanout recipient was notified.
pub const DATA_RECIPIENT_ROLE: &str = "recipientRole";

/// A field that may be used to bulk-mark notifications read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceField {
    Conversation,
    Post,
    Forum,
    Resource,
    Alert,
    Announcement,
}

impl SourceField {
    pub const ALL: [SourceField; 6] = [
        SourceField::Conversation,
        SourceField::Post,
        SourceField::Forum,
        SourceField::Resource,
        SourceField::Alert,
        SourceField::Announcement,
    ];

    /// The notification data key this field reads.
    pub fn key(self) -> &'static str {
        match self {
            SourceField::Conversation => SOURCE_CONVERSATION_ID,
            SourceField::Post => SOURCE_POST_ID,
            SourceField::Forum => SOURCE_FORUM_ID,
            SourceField::Resource => SOURCE_RESOURCE_ID,
            SourceField::Alert => SOURCE_ALERT_ID,
            SourceField::Announcement => SOURCE_ANNOUNCEMENT_ID,
        }
    }

    /// Parse a request field name. Anything outside the allow-list is a
    /// validation error whose message enumerates the accepted names.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|f| f.key() == name)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid sourceField '{name}'. Must be one of: {}",
                    allowed_list()
                ))
            })
    }
}

impl fmt::Display for SourceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Comma-separated allow-list, for error messages.
pub fn allowed_list() -> String {
    SourceField::ALL
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Trim and require a non-empty source value.
pub fn normalize_source_value(value: &str) -> Result<&str, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "sourceValue must be a non-empty string".to_string(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_allowed_key_parses() {
        for f in SourceField::ALL {
            assert_eq!(SourceField::parse(f.key()).unwrap(), f);
        }
    }

    #[test]
    fn unknown_field_lists_allowed_values() {
        let err = SourceField::parse("password").unwrap_err().to_string();
        assert!(err.contains("password"));
        for key in [
            "conversationId",
            "postId",
            "forumId",
            "resourceId",
            "alertId",
            "announcementId",
        ] {
            assert!(err.contains(key), "message should list {key}");
        }
    }

    #[test]
    fn field_names_are_case_sensitive() {
        assert!(SourceField::parse("PostId").is_err());
        assert!(SourceField::parse("replyId").is_err());
    }

    #[test]
    fn source_value_is_trimmed() {
        assert_eq!(normalize_source_value("  R1 ").unwrap(), "R1");
        assert!(normalize_source_value("   ").is_err());
        assert!(normalize_source_value("").is_err());
    }
}

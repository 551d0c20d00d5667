//! Notification types, the opaque source-reference payload, and the content
//! a caller hands to the dispatcher.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channels::ChannelSet;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// NotificationType
// ---------------------------------------------------------------------------

/// Category of a notification.
///
/// The five named categories have per-channel preference switches. Anything
/// else is carried as [`NotificationType::Other`] and is delivered fail-open
/// (see `preferences::type_flag`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    Message,
    CareUpdate,
    SystemAnnouncement,
    FamilyActivity,
    EmergencyAlert,
    Other(String),
}

impl NotificationType {
    /// Wire name, as stored in `notifications.type`.
    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::Message => "MESSAGE",
            NotificationType::CareUpdate => "CARE_UPDATE",
            NotificationType::SystemAnnouncement => "SYSTEM_ANNOUNCEMENT",
            NotificationType::FamilyActivity => "FAMILY_ACTIVITY",
            NotificationType::EmergencyAlert => "EMERGENCY_ALERT",
            NotificationType::Other(name) => name,
        }
    }

    /// Parse a wire name. Unrecognized names are preserved, never rejected.
    pub fn parse(name: &str) -> Self {
        match name {
            "MESSAGE" => NotificationType::Message,
            "CARE_UPDATE" => NotificationType::CareUpdate,
            "SYSTEM_ANNOUNCEMENT" => NotificationType::SystemAnnouncement,
            "FAMILY_ACTIVITY" => NotificationType::FamilyActivity,
            "EMERGENCY_ALERT" => NotificationType::EmergencyAlert,
            other => NotificationType::Other(other.to_string()),
        }
    }
}

impl From<String> for NotificationType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<NotificationType> for String {
    fn from(value: NotificationType) -> Self {
        match value {
            NotificationType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// NotificationData
// ---------------------------------------------------------------------------

/// A single leaf value in [`NotificationData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl DataValue {
    /// Whether this value refers to the source id `expected`.
    ///
    /// Ids may be stored as numbers or strings depending on the producer, so
    /// integers compare by their decimal rendering. Booleans and floats never
    /// identify a source.
    pub fn matches_source(&self, expected: &str) -> bool {
        match self {
            DataValue::Text(s) => s == expected,
            DataValue::Int(i) => i.to_string() == expected,
            DataValue::Bool(_) | DataValue::Float(_) => false,
        }
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::Text(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::Text(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Int(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Bool(value)
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        DataValue::Float(value)
    }
}

/// String-keyed payload attached to a notification.
///
/// Different event kinds attach different source references. The
/// well-known keys are listed in [`crate::source`]; producers may add any
/// other keys (e.g. `replyId`, `voteType`) for client-side rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationData(BTreeMap<String, DataValue>);

impl NotificationData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DataValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert only if the key is not already present. Returns whether the
    /// value was written.
    pub fn insert_if_absent(&mut self, key: &str, value: impl Into<DataValue>) -> bool {
        if self.0.contains_key(key) {
            return false;
        }
        self.0.insert(key.to_string(), value.into());
        true
    }

    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.0.get(key)
    }

    /// Whether `data[key]` refers to the source id `expected`.
    pub fn matches_source(&self, key: &str, expected: &str) -> bool {
        self.get(key).is_some_and(|v| v.matches_source(expected))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// NotificationContent
// ---------------------------------------------------------------------------

/// Everything about a notification except its recipient and lifecycle
/// fields (id, read state, creation time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationContent {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub rich_message: Option<String>,
    #[serde(default)]
    pub data: NotificationData,
    #[serde(default)]
    pub is_actionable: bool,
    pub action_url: Option<String>,
    pub cta_label: Option<String>,
    pub secondary_action_url: Option<String>,
    pub secondary_cta_label: Option<String>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub expires_at: Option<Timestamp>,
    /// Channels the caller wants considered. Not persisted.
    #[serde(default)]
    pub channels: ChannelSet,
}

impl NotificationContent {
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notification_type,
            title: title.into(),
            message: message.into(),
            rich_message: None,
            data: NotificationData::new(),
            is_actionable: false,
            action_url: None,
            cta_label: None,
            secondary_action_url: None,
            secondary_cta_label: None,
            image_url: None,
            thumbnail_url: None,
            expires_at: None,
            channels: ChannelSet::all(),
        }
    }

    pub fn with_data(mut self, data: NotificationData) -> Self {
        self.data = data;
        self
    }

    pub fn with_rich_message(mut self, rich: impl Into<String>) -> Self {
        self.rich_message = Some(rich.into());
        self
    }

    /// Attach the primary call to action. Marks the notification actionable.
    pub fn with_action(mut self, url: impl Into<String>, label: impl Into<String>) -> Self {
        self.is_actionable = true;
        self.action_url = Some(url.into());
        self.cta_label = Some(label.into());
        self
    }

    pub fn with_secondary_action(
        mut self,
        url: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.secondary_action_url = Some(url.into());
        self.secondary_cta_label = Some(label.into());
        self
    }

    pub fn with_images(mut self, image_url: Option<String>, thumbnail_url: Option<String>) -> Self {
        self.image_url = image_url;
        self.thumbnail_url = thumbnail_url;
        self
    }

    pub fn expires_at(mut self, at: Timestamp) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn with_channels(mut self, channels: ChannelSet) -> Self {
        self.channels = channels;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_type_names_round_trip_through_parse() {
        for t in [
            NotificationType::Message,
            NotificationType::CareUpdate,
            NotificationType::SystemAnnouncement,
            NotificationType::FamilyActivity,
            NotificationType::EmergencyAlert,
        ] {
            assert_eq!(NotificationType::parse(t.as_str()), t);
        }
    }

    #[test]
    fn unknown_type_is_preserved() {
        let t = NotificationType::parse("FORUM_VOTE");
        assert_eq!(t, NotificationType::Other("FORUM_VOTE".into()));
        assert_eq!(String::from(t), "FORUM_VOTE");
    }

    #[test]
    fn type_serializes_as_wire_name() {
        let json = serde_json::to_value(NotificationType::CareUpdate).unwrap();
        assert_eq!(json, "CARE_UPDATE");
    }

    #[test]
    fn integer_ids_match_their_decimal_rendering() {
        let data = NotificationData::new()
            .with("postId", 42_i64)
            .with("conversationId", "c-9");
        assert!(data.matches_source("postId", "42"));
        assert!(data.matches_source("conversationId", "c-9"));
        assert!(!data.matches_source("postId", "4"));
        assert!(!data.matches_source("forumId", "42"));
    }

    #[test]
    fn booleans_never_match_a_source() {
        let data = NotificationData::new().with("resourceId", true);
        assert!(!data.matches_source("resourceId", "true"));
    }

    #[test]
    fn insert_if_absent_keeps_existing_value() {
        let mut data = NotificationData::new().with("postId", "p1");
        assert!(!data.insert_if_absent("postId", "p2"));
        assert!(data.insert_if_absent("forumId", "f1"));
        assert!(data.matches_source("postId", "p1"));
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn data_deserializes_mixed_leaves() {
        let data: NotificationData =
            serde_json::from_str(r#"{"postId": 7, "resourceId": "R1", "urgent": true}"#).unwrap();
        assert_eq!(data.get("postId"), Some(&DataValue::Int(7)));
        assert_eq!(data.get("resourceId"), Some(&DataValue::Text("R1".into())));
        assert_eq!(data.get("urgent"), Some(&DataValue::Bool(true)));
    }

    #[test]
    fn with_action_marks_actionable() {
        let content = NotificationContent::new(NotificationType::Message, "t", "m")
            .with_action("/messages/1", "Open");
        assert!(content.is_actionable);
        assert_eq!(content.cta_label.as_deref(), Some("Open"));
    }
}

//! Delivery channels.
//!
//! A notification is always persisted (that is the in-app inbox); the
//! channels below only describe the side effects that may follow.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Real-time push of the unread count plus the in-app inbox.
pub const CHANNEL_IN_APP: &str = "in_app";

/// Email delivered through the configured transport.
pub const CHANNEL_EMAIL: &str = "email";

/// A delivery mechanism for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Email,
}

impl Channel {
    /// Every channel, in the order the dispatcher evaluates them.
    pub const ALL: [Channel; 2] = [Channel::InApp, Channel::Email];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::InApp => CHANNEL_IN_APP,
            Channel::Email => CHANNEL_EMAIL,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The channels a caller asks the dispatcher to consider.
///
/// App-specific rules ("downvotes never email") are expressed here by the
/// caller rather than inside the engine. Preferences still apply on top: a
/// requested channel can be suppressed, an unrequested one is never used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSet {
    pub in_app: bool,
    pub email: bool,
}

impl ChannelSet {
    pub const fn all() -> Self {
        Self {
            in_app: true,
            email: true,
        }
    }

    pub const fn in_app_only() -> Self {
        Self {
            in_app: true,
            email: false,
        }
    }

    pub fn contains(&self, channel: Channel) -> bool {
        match channel {
            Channel::InApp => self.in_app,
            Channel::Email => self.email,
        }
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_match_constants() {
        assert_eq!(Channel::InApp.as_str(), CHANNEL_IN_APP);
        assert_eq!(Channel::Email.to_string(), CHANNEL_EMAIL);
    }

    #[test]
    fn in_app_only_excludes_email() {
        let set = ChannelSet::in_app_only();
        assert!(set.contains(Channel::InApp));
        assert!(!set.contains(Channel::Email));
    }

    #[test]
    fn default_set_requests_every_channel() {
        let set = ChannelSet::default();
        assert!(Channel::ALL.iter().all(|c| set.contains(*c)));
    }
}

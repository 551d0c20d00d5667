//! Engine error types.
//!
//! [`StoreError`] and [`NotifyError`] propagate to the caller.
//! [`DeliveryChannelError`] never does: the dispatcher records it in the
//! per-channel outcome and moves on.

use carecircle_core::channels::Channel;
use carecircle_core::error::CoreError;

/// Persistence failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Non-database backends (e.g. the in-memory store's failure knob).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a single delivery side effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryChannelError {
    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error("{channel} delivery timed out after {elapsed_ms}ms")]
    Timeout { channel: Channel, elapsed_ms: u64 },
}

/// Failure of an injected directory lookup (users, posts, forums).
#[derive(Debug, Clone, thiserror::Error)]
#[error("Lookup failed: {0}")]
pub struct LookupError(pub String);

/// Error returned by engine entry points.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_names_channel() {
        let err = DeliveryChannelError::Timeout {
            channel: Channel::Email,
            elapsed_ms: 10_000,
        };
        assert_eq!(err.to_string(), "email delivery timed out after 10000ms");
    }

    #[test]
    fn notify_error_is_transparent_over_core() {
        let err: NotifyError = CoreError::Validation("bad".into()).into();
        assert_eq!(err.to_string(), "Validation failed: bad");
    }
}

//! Domain error taxonomy shared by the notification engine and the HTTP layer.
//!
//! Only caller-facing failures live here. Persistence and delivery-channel
//! failures have their own types in `carecircle-events` because they are
//! handled differently (propagated vs. recovered locally).

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced entity (user, notification) does not exist or is not
    /// visible to the caller.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Caller input was rejected before any mutation happened.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_entity_and_id() {
        let err = CoreError::NotFound {
            entity: "User",
            id: 7,
        };
        assert_eq!(err.to_string(), "Entity not found: User with id 7");
    }

    #[test]
    fn validation_display_keeps_message() {
        let err = CoreError::Validation("sourceValue must not be empty".into());
        assert_eq!(
            err.to_string(),
            "Validation failed: sourceValue must not be empty"
        );
    }
}

//! Error types for the moderation pipeline.

use thiserror::Error;

use crate::moderation::Capability;

/// A failed call against the platform gateway
#[derive(Debug, Clone, Error)]
#[error("platform api error: {message}")]
pub struct GatewayError {
    pub message: String,
}

impl GatewayError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serenity::Error> for GatewayError {
    fn from(error: serenity::Error) -> Self {
        Self::new(error.to_string())
    }
}

/// Errors that terminate a pipeline run.
///
/// The `Display` strings double as the ephemeral reply shown to the
/// requester; nothing here is ever surfaced to the target or the audit log.
#[derive(Debug, Error)]
pub enum ModerationError {
    /// Requester lacks the capability the action requires
    #[error("No permission.")]
    AuthorizationDenied { required: Capability },

    /// Target could not be resolved to a current member
    #[error("User not found.")]
    TargetNotFound,

    /// The configured mute role does not exist on the guild
    #[error("Mute role does not exist.")]
    MuteRoleMissing,

    /// Role is not in the self-service list
    #[error("Invalid role.")]
    InvalidRole,

    /// A platform mutation or audit delivery failed
    #[error("Action failed: {0}")]
    Platform(#[from] GatewayError),
}

/// Result type for pipeline operations
pub type ModerationResult<T> = Result<T, ModerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_is_the_requester_reply() {
        let error = ModerationError::AuthorizationDenied {
            required: Capability::BanMembers,
        };
        assert_eq!(error.to_string(), "No permission.");

        assert_eq!(ModerationError::TargetNotFound.to_string(), "User not found.");
        assert_eq!(
            ModerationError::MuteRoleMissing.to_string(),
            "Mute role does not exist."
        );
        assert_eq!(ModerationError::InvalidRole.to_string(), "Invalid role.");

        let error = ModerationError::Platform(GatewayError::new("timed out"));
        assert_eq!(error.to_string(), "Action failed: platform api error: timed out");
    }
}

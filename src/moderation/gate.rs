//! Permission gate for moderation actions.

use crate::moderation::{ActionKind, ActionRequest, Capability, ModerationError};

/// The capability an action kind requires, if any.
///
/// Warn, Mute, TempMute and Unmute are deliberately ungated: any principal
/// who can invoke the command may execute them. See DESIGN.md before
/// tightening this table.
#[must_use]
pub fn required_capability(kind: ActionKind) -> Option<Capability> {
    match kind {
        ActionKind::Ban => Some(Capability::BanMembers),
        ActionKind::Kick => Some(Capability::KickMembers),
        ActionKind::BulkRoleGrant => Some(Capability::Administrator),
        ActionKind::Warn | ActionKind::Mute | ActionKind::TempMute | ActionKind::Unmute => None,
    }
}

/// Decide whether the requester may perform the action.
///
/// # Errors
/// Returns `AuthorizationDenied` naming the missing capability. The caller
/// surfaces it only to the requester, never to the target or the audit log.
pub fn authorize(request: &ActionRequest) -> Result<(), ModerationError> {
    if let Some(required) = required_capability(request.kind) {
        if !request.requester.holds(required) {
            return Err(ModerationError::AuthorizationDenied { required });
        }
    }
    Ok(())
}

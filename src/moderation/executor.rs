//! Platform-side mutations for validated action requests.

use std::sync::Arc;

use tracing::{info, warn};

use crate::COMMAND_TARGET;
use crate::config::BotConfig;
use crate::moderation::error::ModerationResult;
use crate::moderation::{ActionKind, ActionRequest, Gateway, MemberProfile, ModerationError};

/// Applies the state change an action request describes
pub struct ActionExecutor {
    gateway: Arc<dyn Gateway>,
    config: Arc<BotConfig>,
}

impl ActionExecutor {
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>, config: Arc<BotConfig>) -> Self {
        Self { gateway, config }
    }

    /// Preconditions that must hold before any notification is dispatched.
    /// Mute and TempMute require the configured mute role to exist on the
    /// guild; a missing role aborts the whole pipeline run.
    pub async fn preflight(&self, request: &ActionRequest) -> ModerationResult<()> {
        match request.kind {
            ActionKind::Mute | ActionKind::TempMute => {
                let exists = self
                    .gateway
                    .role_exists(request.guild_id, self.config.mute_role_id)
                    .await?;
                if !exists {
                    return Err(ModerationError::MuteRoleMissing);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Perform the mutation for a single-target action. `target` is the
    /// profile resolved by the pipeline; kinds that skip resolution pass
    /// `None`.
    pub async fn mutate(
        &self,
        request: &ActionRequest,
        target: Option<&MemberProfile>,
    ) -> ModerationResult<()> {
        let Some((user_id, _)) = request.target_member() else {
            return Ok(());
        };
        let reason = request.reason.as_deref().unwrap_or("No reason");

        match request.kind {
            ActionKind::Ban => {
                self.gateway.ban(request.guild_id, user_id, reason).await?;
            }
            ActionKind::Kick => {
                self.gateway.kick(request.guild_id, user_id, reason).await?;
            }
            // Warnings are notification-only
            ActionKind::Warn => {}
            ActionKind::Mute | ActionKind::TempMute => {
                self.gateway
                    .add_role(request.guild_id, user_id, self.config.mute_role_id)
                    .await?;
            }
            ActionKind::Unmute => {
                // Not holding the role is not an error; the action proceeds
                // to notify regardless.
                let holds_role = target.is_some_and(|t| t.holds_role(self.config.mute_role_id));
                if holds_role {
                    self.gateway
                        .remove_role(request.guild_id, user_id, self.config.mute_role_id)
                        .await?;
                }
            }
            ActionKind::BulkRoleGrant => {}
        }
        Ok(())
    }

    /// Grant a role to every current non-bot member lacking it. Individual
    /// failures are logged, skipped, and excluded from the returned count.
    pub async fn grant_role_to_all(&self, request: &ActionRequest) -> ModerationResult<usize> {
        let Some(role_id) = request.role_id else {
            return Err(ModerationError::InvalidRole);
        };
        if !self.config.self_assign_role_ids.contains(&role_id) {
            return Err(ModerationError::InvalidRole);
        }

        let members = self.gateway.list_members(request.guild_id).await?;
        let mut granted = 0usize;
        for member in &members {
            if member.is_bot || member.holds_role(role_id) {
                continue;
            }
            match self
                .gateway
                .add_role(request.guild_id, member.user_id, role_id)
                .await
            {
                Ok(()) => granted += 1,
                Err(e) => {
                    warn!(
                        target: COMMAND_TARGET,
                        user_id = %member.user_id,
                        role_id = %role_id,
                        "Skipping member in bulk role grant: {e}"
                    );
                }
            }
        }

        info!(
            target: COMMAND_TARGET,
            guild_id = %request.guild_id,
            role_id = %role_id,
            granted = granted,
            total_members = members.len(),
            "Bulk role grant completed"
        );
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::gateway::MockGateway;
    use crate::moderation::testing::test_config;
    use crate::moderation::{GatewayError, Requester};

    fn member(user_id: u64, is_bot: bool, role_ids: Vec<u64>) -> MemberProfile {
        MemberProfile {
            user_id,
            tag: format!("user#{user_id}"),
            is_bot,
            role_ids,
        }
    }

    #[tokio::test]
    async fn test_preflight_rejects_missing_mute_role() {
        let mut gateway = MockGateway::new();
        gateway.expect_role_exists().returning(|_, _| Ok(false));

        let executor = ActionExecutor::new(Arc::new(gateway), test_config());
        let request = ActionRequest::mute(10, Requester::new(1, "mod#1"), 2, "user#2", None);
        assert!(matches!(
            executor.preflight(&request).await,
            Err(ModerationError::MuteRoleMissing)
        ));
    }

    #[tokio::test]
    async fn test_preflight_only_checks_mute_kinds() {
        // No expectation on role_exists: a call would panic the mock
        let gateway = MockGateway::new();
        let executor = ActionExecutor::new(Arc::new(gateway), test_config());
        let request = ActionRequest::ban(10, Requester::new(1, "mod#1"), 2, "user#2", None);
        assert!(executor.preflight(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_unmute_skips_removal_when_role_not_held() {
        // No expectation on remove_role: a call would panic the mock
        let gateway = MockGateway::new();
        let executor = ActionExecutor::new(Arc::new(gateway), test_config());
        let request = ActionRequest::unmute(10, Requester::new(1, "mod#1"), 2, "user#2");
        let profile = member(2, false, vec![1, 2]);
        assert!(executor.mutate(&request, Some(&profile)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unmute_removes_held_role() {
        let config = test_config();
        let mute_role = config.mute_role_id;
        let mut gateway = MockGateway::new();
        gateway
            .expect_remove_role()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let executor = ActionExecutor::new(Arc::new(gateway), config);
        let request = ActionRequest::unmute(10, Requester::new(1, "mod#1"), 2, "user#2");
        let profile = member(2, false, vec![mute_role]);
        assert!(executor.mutate(&request, Some(&profile)).await.is_ok());
    }

    #[tokio::test]
    async fn test_bulk_grant_counts_only_successes() {
        let config = test_config();
        let role_id = config.self_assign_role_ids[0];
        let mut gateway = MockGateway::new();
        // Four members: a bot, one already holding the role, two eligible
        gateway.expect_list_members().returning(move |_| {
            Ok(vec![
                member(1, true, vec![]),
                member(2, false, vec![role_id]),
                member(3, false, vec![]),
                member(4, false, vec![]),
            ])
        });
        // Exactly the two eligible members are attempted; one attempt fails
        gateway
            .expect_add_role()
            .times(2)
            .returning(|_, user_id, _| {
                if user_id == 3 {
                    Err(GatewayError::new("missing permissions"))
                } else {
                    Ok(())
                }
            });

        let executor = ActionExecutor::new(Arc::new(gateway), config);
        let request =
            ActionRequest::bulk_role_grant(10, Requester::new(1, "admin#1"), role_id);
        let granted = executor.grant_role_to_all(&request).await.expect("bulk run");
        assert_eq!(granted, 1);
    }

    #[tokio::test]
    async fn test_bulk_grant_rejects_unlisted_role() {
        let gateway = MockGateway::new();
        let executor = ActionExecutor::new(Arc::new(gateway), test_config());
        let request = ActionRequest::bulk_role_grant(10, Requester::new(1, "admin#1"), 424_242);
        assert!(matches!(
            executor.grant_role_to_all(&request).await,
            Err(ModerationError::InvalidRole)
        ));
    }
}

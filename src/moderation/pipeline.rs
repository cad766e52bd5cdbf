//! Moderation pipeline orchestrator.
//!
//! One pipeline run handles exactly one action request:
//! Received → Authorized → TargetResolved → (Mutated) → Notified →
//! Acknowledged, terminating early with a single requester-facing error.
//! Within a run the side-effect order is fixed: audit log and direct
//! notification, then the mutation, then scheduling, then the ack.

use std::sync::Arc;

use tracing::{info, warn};

use crate::COMMAND_TARGET;
use crate::config::BotConfig;
use crate::duration::parse_duration_ms;
use crate::moderation::error::ModerationResult;
use crate::moderation::render::{self, Identity, NotificationSet};
use crate::moderation::{
    ActionExecutor, ActionKind, ActionRequest, Gateway, MemberProfile, ModerationError,
    SanctionScheduler, gate,
};

/// Result of a completed pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Single-target action completed; `ack` is the ephemeral reply
    Completed { ack: String },
    /// Bulk role grant completed with the number of successful grants
    BulkCompleted { role_id: u64, granted: usize },
}

/// Orchestrates one action request end to end
pub struct ModerationPipeline {
    gateway: Arc<dyn Gateway>,
    config: Arc<BotConfig>,
    scheduler: SanctionScheduler,
}

impl ModerationPipeline {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn Gateway>,
        config: Arc<BotConfig>,
        scheduler: SanctionScheduler,
    ) -> Self {
        Self {
            gateway,
            config,
            scheduler,
        }
    }

    /// Run the pipeline for one request.
    ///
    /// # Errors
    /// Any error is terminal for the run and maps to a single ephemeral
    /// reply; no further side effects happen after a failure.
    pub async fn run(
        &self,
        request: ActionRequest,
        identity: &Identity,
    ) -> ModerationResult<PipelineOutcome> {
        gate::authorize(&request)?;

        let executor = ActionExecutor::new(Arc::clone(&self.gateway), Arc::clone(&self.config));

        if request.kind == ActionKind::BulkRoleGrant {
            let Some(role_id) = request.role_id else {
                return Err(ModerationError::InvalidRole);
            };
            let granted = executor.grant_role_to_all(&request).await?;
            return Ok(PipelineOutcome::BulkCompleted { role_id, granted });
        }

        let profile = self.resolve_target(&request).await?;
        executor.preflight(&request).await?;

        let set = render::render_action(&self.config, identity, &request);

        if request.kind == ActionKind::Unmute {
            return self.finish_unmute(&request, &executor, profile.as_ref(), set).await;
        }

        // Audit entry and direct notification go out strictly before the
        // mutation, so a banned or kicked user still receives the notice.
        self.dispatch_audit(&request, &set).await?;
        self.dispatch_direct(&request, &set).await;

        executor.mutate(&request, profile.as_ref()).await?;

        if request.kind == ActionKind::TempMute {
            if let Some((user_id, tag)) = request.target_member() {
                let delay_ms = parse_duration_ms(request.duration.as_deref().unwrap_or(""));
                self.scheduler
                    .schedule(
                        user_id,
                        request.guild_id,
                        self.config.mute_role_id,
                        tag,
                        delay_ms,
                    )
                    .await;
            }
        }

        info!(
            target: COMMAND_TARGET,
            kind = %request.kind,
            guild_id = %request.guild_id,
            requester = %request.requester.tag,
            target = %request.target_tag(),
            "Moderation action completed"
        );
        Ok(PipelineOutcome::Completed { ack: set.ack })
    }

    /// Unmute is its own tail: the pending reversal is cancelled first so a
    /// stale timer cannot re-fire, the role comes off, and only the audit
    /// entry follows (no direct notification for unmute).
    async fn finish_unmute(
        &self,
        request: &ActionRequest,
        executor: &ActionExecutor,
        profile: Option<&MemberProfile>,
        set: NotificationSet,
    ) -> ModerationResult<PipelineOutcome> {
        if let Some((user_id, _)) = request.target_member() {
            let cancelled = self
                .scheduler
                .cancel_for_user(user_id, request.guild_id)
                .await;
            if !cancelled.is_empty() {
                info!(
                    target: COMMAND_TARGET,
                    user_id = %user_id,
                    cancelled = cancelled.len(),
                    "Cancelled pending sanction reversals on manual unmute"
                );
            }
        }

        executor.mutate(request, profile).await?;
        self.dispatch_audit(request, &set).await?;
        Ok(PipelineOutcome::Completed { ack: set.ack })
    }

    /// Resolve the target member when the kind requires membership.
    async fn resolve_target(
        &self,
        request: &ActionRequest,
    ) -> ModerationResult<Option<MemberProfile>> {
        if !request.kind.requires_member() {
            return Ok(None);
        }
        let Some((user_id, _)) = request.target_member() else {
            return Err(ModerationError::TargetNotFound);
        };
        match self.gateway.resolve_member(request.guild_id, user_id).await? {
            Some(profile) => Ok(Some(profile)),
            None => Err(ModerationError::TargetNotFound),
        }
    }

    /// Send the audit-log entry if the kind has a configured destination.
    /// A failed audit delivery aborts the run before the mutation.
    async fn dispatch_audit(
        &self,
        request: &ActionRequest,
        set: &NotificationSet,
    ) -> ModerationResult<()> {
        let Some(note) = &set.audit else {
            return Ok(());
        };
        let Some(channel_id) = self.config.log_channels.for_action(request.kind) else {
            return Ok(());
        };
        self.gateway.send_to_channel(channel_id, note).await?;
        Ok(())
    }

    /// Attempt the direct notification; delivery failure (closed DMs and the
    /// like) is swallowed and the pipeline continues.
    async fn dispatch_direct(&self, request: &ActionRequest, set: &NotificationSet) {
        let Some(note) = &set.direct else {
            return;
        };
        let Some((user_id, _)) = request.target_member() else {
            return;
        };
        if let Err(e) = self.gateway.send_direct(user_id, note).await {
            warn!(
                target: COMMAND_TARGET,
                user_id = %user_id,
                "Direct notification undeliverable: {e}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::store::SanctionState;
    use crate::moderation::testing::{
        Call, recording_gateway, test_config, test_identity, test_scheduler,
    };
    use crate::moderation::{Capability, MemberProfile, Requester};

    fn pipeline(
        gateway: Arc<crate::moderation::testing::RecordingGateway>,
        name: &str,
    ) -> (ModerationPipeline, SanctionScheduler) {
        let (scheduler, rx) = test_scheduler(name);
        // Keep the receiver alive for the duration of the test
        std::mem::forget(rx);
        let pipeline = ModerationPipeline::new(gateway, test_config(), scheduler.clone());
        (pipeline, scheduler)
    }

    fn moderator() -> Requester {
        Requester::with_capabilities(
            1,
            "mod#1",
            [Capability::BanMembers, Capability::KickMembers],
        )
    }

    fn seed_member(gateway: &crate::moderation::testing::RecordingGateway, user_id: u64) {
        gateway.members.lock().unwrap().insert(
            user_id,
            MemberProfile {
                user_id,
                tag: format!("user#{user_id}"),
                is_bot: false,
                role_ids: vec![],
            },
        );
    }

    #[tokio::test]
    async fn test_ban_orders_audit_and_dm_before_mutation() {
        let gateway = recording_gateway();
        seed_member(&gateway, 2);
        let (pipeline, _) = pipeline(Arc::clone(&gateway), "ban-order");

        let request = ActionRequest::ban(10, moderator(), 2, "user#2", Some("spam".to_string()));
        let outcome = pipeline.run(request, &test_identity()).await.expect("ban");

        let config = test_config();
        let calls = gateway.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                Call::ResolveMember(2),
                Call::Channel(config.log_channels.ban.unwrap()),
                Call::Direct(2),
                Call::Ban(2),
            ]
        );
        match outcome {
            PipelineOutcome::Completed { ack } => assert!(ack.contains("spam")),
            PipelineOutcome::BulkCompleted { .. } => panic!("expected single-target outcome"),
        }
    }

    #[tokio::test]
    async fn test_unresolvable_target_short_circuits() {
        let gateway = recording_gateway();
        let (pipeline, _) = pipeline(Arc::clone(&gateway), "ban-notfound");

        let request = ActionRequest::ban(10, moderator(), 2, "user#2", None);
        let result = pipeline.run(request, &test_identity()).await;
        assert!(matches!(result, Err(ModerationError::TargetNotFound)));

        // No log entry, no DM, no mutation: only the resolution attempt
        let calls = gateway.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![Call::ResolveMember(2)]);
    }

    #[tokio::test]
    async fn test_denied_requester_gets_single_reply_and_no_side_effects() {
        let gateway = recording_gateway();
        seed_member(&gateway, 2);
        let (pipeline, _) = pipeline(Arc::clone(&gateway), "ban-denied");

        let request = ActionRequest::ban(10, Requester::new(1, "mod#1"), 2, "user#2", None);
        let result = pipeline.run(request, &test_identity()).await;
        assert!(matches!(
            result,
            Err(ModerationError::AuthorizationDenied { .. })
        ));
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mute_with_missing_role_aborts_before_notifications() {
        let gateway = recording_gateway();
        seed_member(&gateway, 2);
        gateway.guild_roles.lock().unwrap().clear();
        let (pipeline, _) = pipeline(Arc::clone(&gateway), "mute-missing-role");

        let request = ActionRequest::mute(10, moderator(), 2, "user#2", None);
        let result = pipeline.run(request, &test_identity()).await;
        assert!(matches!(result, Err(ModerationError::MuteRoleMissing)));

        let calls = gateway.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![Call::ResolveMember(2), Call::RoleExists(500)]);
    }

    #[tokio::test]
    async fn test_warn_notifies_without_mutation_or_resolution() {
        let gateway = recording_gateway();
        let (pipeline, _) = pipeline(Arc::clone(&gateway), "warn");

        let request =
            ActionRequest::warn(10, Requester::new(1, "mod#1"), 2, "user#2", None);
        pipeline.run(request, &test_identity()).await.expect("warn");

        let config = test_config();
        let calls = gateway.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                Call::Channel(config.log_channels.warn.unwrap()),
                Call::Direct(2),
            ]
        );
    }

    #[tokio::test]
    async fn test_undeliverable_dm_is_swallowed() {
        let gateway = recording_gateway();
        seed_member(&gateway, 2);
        gateway
            .fail_direct
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let (pipeline, _) = pipeline(Arc::clone(&gateway), "dm-closed");

        let request = ActionRequest::kick(10, moderator(), 2, "user#2", None);
        let outcome = pipeline.run(request, &test_identity()).await.expect("kick");
        assert!(matches!(outcome, PipelineOutcome::Completed { .. }));

        // The kick still happened after the failed DM attempt
        let calls = gateway.calls.lock().unwrap().clone();
        assert!(calls.contains(&Call::Kick(2)));
    }

    #[tokio::test]
    async fn test_tempmute_schedules_reversal() {
        let gateway = recording_gateway();
        seed_member(&gateway, 2);
        let (pipeline, scheduler) = pipeline(Arc::clone(&gateway), "tempmute");

        let request = ActionRequest::tempmute(
            10,
            Requester::new(1, "mod#1"),
            2,
            "user#2",
            "10m",
            Some("flood".to_string()),
        );
        pipeline
            .run(request, &test_identity())
            .await
            .expect("tempmute");

        // The role went on and a reversal is pending 600000 ms out
        let calls = gateway.calls.lock().unwrap().clone();
        assert!(calls.contains(&Call::AddRole {
            user_id: 2,
            role_id: 500
        }));
        let pending = scheduler.store().active_for_user(2, 10);
        assert_eq!(pending.len(), 1);
        let window = pending[0].revert_at - pending[0].applied_at;
        assert_eq!(window.num_milliseconds(), 600_000);
    }

    #[tokio::test]
    async fn test_unmute_without_role_still_audits() {
        let gateway = recording_gateway();
        seed_member(&gateway, 2);
        let (pipeline, _) = pipeline(Arc::clone(&gateway), "unmute-no-role");

        let request = ActionRequest::unmute(10, Requester::new(1, "mod#1"), 2, "user#2");
        let outcome = pipeline
            .run(request, &test_identity())
            .await
            .expect("unmute");
        assert!(matches!(outcome, PipelineOutcome::Completed { .. }));

        let config = test_config();
        let calls = gateway.calls.lock().unwrap().clone();
        // No RemoveRole call (role not held), but the audit entry still lands
        assert_eq!(
            calls,
            vec![
                Call::ResolveMember(2),
                Call::Channel(config.log_channels.unmute.unwrap()),
            ]
        );
    }

    #[tokio::test]
    async fn test_manual_unmute_cancels_pending_reversal() {
        let gateway = recording_gateway();
        seed_member(&gateway, 2);
        let (pipeline, scheduler) = pipeline(Arc::clone(&gateway), "unmute-cancels");

        let record = scheduler.schedule(2, 10, 500, "user#2", 600_000).await;
        let request = ActionRequest::unmute(10, Requester::new(1, "mod#1"), 2, "user#2");
        pipeline
            .run(request, &test_identity())
            .await
            .expect("unmute");

        assert_eq!(
            scheduler.store().get(&record.id).unwrap().state,
            SanctionState::Cancelled
        );
        assert!(scheduler.store().active_for_user(2, 10).is_empty());
    }

    #[tokio::test]
    async fn test_bulk_grant_reports_successes() {
        let gateway = recording_gateway();
        {
            let mut members = gateway.members.lock().unwrap();
            members.insert(
                1,
                MemberProfile {
                    user_id: 1,
                    tag: "bot#1".to_string(),
                    is_bot: true,
                    role_ids: vec![],
                },
            );
            members.insert(
                2,
                MemberProfile {
                    user_id: 2,
                    tag: "user#2".to_string(),
                    is_bot: false,
                    role_ids: vec![700],
                },
            );
            members.insert(
                3,
                MemberProfile {
                    user_id: 3,
                    tag: "user#3".to_string(),
                    is_bot: false,
                    role_ids: vec![],
                },
            );
        }
        let (pipeline, _) = pipeline(Arc::clone(&gateway), "bulk");

        let requester = Requester::with_capabilities(1, "admin#1", [Capability::Administrator]);
        let request = ActionRequest::bulk_role_grant(10, requester, 700);
        let outcome = pipeline.run(request, &test_identity()).await.expect("bulk");
        assert_eq!(
            outcome,
            PipelineOutcome::BulkCompleted {
                role_id: 700,
                granted: 1
            }
        );

        // Only the one eligible member was attempted
        let calls = gateway.calls.lock().unwrap().clone();
        let attempts: Vec<_> = calls
            .iter()
            .filter(|call| matches!(call, Call::AddRole { .. }))
            .collect();
        assert_eq!(attempts.len(), 1);
    }
}

//! Sanction reversal scheduling.
//!
//! A single background task owns all pending reversals. It wakes on an mpsc
//! nudge (sent when a sanction is scheduled or a targeted check is wanted)
//! and on a periodic interval tick, and reverses every due record: remove
//! the role captured at scheduling time, emit an Unmute audit entry, persist
//! the transition. Reversal failures are logged and swallowed; the record
//! still transitions so a vanished member cannot wedge the queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::SANCTION_TARGET;
use crate::config::BotConfig;
use crate::moderation::render::{self, Identity};
use crate::moderation::{Gateway, SanctionRecord, SanctionStore};

/// Request type for the reversal task
#[derive(Debug, Clone)]
pub enum ReversalCheckRequest {
    /// Check every pending reversal regardless of timing
    CheckAll,
    /// Check a specific user's pending reversals
    CheckUser { user_id: u64, guild_id: u64 },
    /// Shut the reversal task down
    Shutdown,
}

/// Handle for scheduling and cancelling sanction reversals
#[derive(Clone)]
pub struct SanctionScheduler {
    store: SanctionStore,
    tx: Sender<ReversalCheckRequest>,
}

impl SanctionScheduler {
    #[must_use]
    pub fn new(store: SanctionStore, tx: Sender<ReversalCheckRequest>) -> Self {
        Self { store, tx }
    }

    #[must_use]
    pub fn store(&self) -> &SanctionStore {
        &self.store
    }

    /// Register a reversal due `delay_ms` from now. The record is persisted
    /// before the task is nudged, so a crash in between loses nothing.
    pub async fn schedule(
        &self,
        user_id: u64,
        guild_id: u64,
        role_id: u64,
        user_tag: &str,
        delay_ms: u64,
    ) -> SanctionRecord {
        let record = SanctionRecord::new(user_id, guild_id, role_id, user_tag, delay_ms);
        self.store.add(record.clone());
        if let Err(e) = self.store.save().await {
            error!(target: SANCTION_TARGET, "Failed to persist sanction store: {e}");
        }

        info!(
            target: SANCTION_TARGET,
            sanction_id = %record.id,
            user_id = %user_id,
            guild_id = %guild_id,
            delay_ms = delay_ms,
            "Sanction reversal scheduled"
        );

        // Nudge the task so a zero-delay sanction reverses promptly
        if let Err(e) = self
            .tx
            .send(ReversalCheckRequest::CheckUser { user_id, guild_id })
            .await
        {
            warn!(target: SANCTION_TARGET, "Reversal task unavailable: {e}");
        }
        record
    }

    /// Cancel every pending reversal for a target. Called by the manual
    /// unmute path so a later timer cannot re-fire against a user who was
    /// already unmuted.
    pub async fn cancel_for_user(&self, user_id: u64, guild_id: u64) -> Vec<SanctionRecord> {
        let cancelled = self.store.cancel_active_for_user(user_id, guild_id);
        if !cancelled.is_empty() {
            if let Err(e) = self.store.save().await {
                error!(target: SANCTION_TARGET, "Failed to persist sanction store: {e}");
            }
        }
        cancelled
    }

    /// Spawn the background reversal task
    pub fn spawn(
        self,
        gateway: Arc<dyn Gateway>,
        config: Arc<BotConfig>,
        identity: Identity,
        rx: Receiver<ReversalCheckRequest>,
        check_interval_seconds: u64,
    ) {
        tokio::spawn(async move {
            self.reversal_task(gateway, config, identity, rx, check_interval_seconds)
                .await;
        });
    }

    /// Reverse every record due at `now`. Exposed separately from the task
    /// loop so timing can be driven explicitly.
    pub async fn run_due_reversals(
        &self,
        gateway: &dyn Gateway,
        config: &BotConfig,
        identity: &Identity,
        now: DateTime<Utc>,
    ) {
        let due = self.store.due_for_reversal(now);
        for id in due {
            self.execute_reversal(gateway, config, identity, &id).await;
        }
    }

    async fn run_due_for_user(
        &self,
        gateway: &dyn Gateway,
        config: &BotConfig,
        identity: &Identity,
        user_id: u64,
        guild_id: u64,
        now: DateTime<Utc>,
    ) {
        let due = self.store.due_for_user(user_id, guild_id, now);
        for id in due {
            self.execute_reversal(gateway, config, identity, &id).await;
        }
    }

    async fn execute_reversal(
        &self,
        gateway: &dyn Gateway,
        config: &BotConfig,
        identity: &Identity,
        id: &str,
    ) {
        let record = match self.store.reverse(id) {
            Ok(record) => record,
            Err(e) => {
                error!(target: SANCTION_TARGET, "Failed to reverse sanction {id}: {e}");
                return;
            }
        };

        // The role and target were captured at scheduling time; current role
        // membership is not re-resolved.
        if let Err(e) = gateway
            .remove_role(record.guild_id, record.user_id, record.role_id)
            .await
        {
            error!(
                target: SANCTION_TARGET,
                sanction_id = %record.id,
                user_id = %record.user_id,
                "Failed to remove role during reversal: {e}"
            );
        }

        let note = render::render_reversal(config, identity, &record.user_tag);
        if let Some(channel_id) = config.log_channels.unmute {
            if let Err(e) = gateway.send_to_channel(channel_id, &note).await {
                error!(
                    target: SANCTION_TARGET,
                    sanction_id = %record.id,
                    "Failed to deliver reversal audit entry: {e}"
                );
            }
        }

        if let Err(e) = self.store.save().await {
            error!(target: SANCTION_TARGET, "Failed to persist sanction store: {e}");
        }
    }

    /// The task loop: periodic check plus on-demand nudges. The first tick
    /// fires immediately, so overdue records loaded from disk are reversed
    /// right after startup.
    async fn reversal_task(
        &self,
        gateway: Arc<dyn Gateway>,
        config: Arc<BotConfig>,
        identity: Identity,
        mut rx: Receiver<ReversalCheckRequest>,
        check_interval_seconds: u64,
    ) {
        info!(
            target: SANCTION_TARGET,
            "Starting sanction reversal task with {check_interval_seconds}s interval"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_seconds));

        loop {
            tokio::select! {
                Some(request) = rx.recv() => {
                    match request {
                        ReversalCheckRequest::CheckAll => {
                            self.run_due_reversals(gateway.as_ref(), &config, &identity, Utc::now()).await;
                        }
                        ReversalCheckRequest::CheckUser { user_id, guild_id } => {
                            self.run_due_for_user(gateway.as_ref(), &config, &identity, user_id, guild_id, Utc::now()).await;
                        }
                        ReversalCheckRequest::Shutdown => {
                            info!(target: SANCTION_TARGET, "Received shutdown request for reversal task");
                            break;
                        }
                    }
                }

                _ = interval.tick() => {
                    self.run_due_reversals(gateway.as_ref(), &config, &identity, Utc::now()).await;
                }
            }
        }

        info!(target: SANCTION_TARGET, "Sanction reversal task shut down");
    }
}

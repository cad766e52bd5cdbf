//! Sanction records and their durable store.
//!
//! Every temporary sanction is tracked as a [`SanctionRecord`] with a small
//! state machine (Active → Reversed | Cancelled). Records are persisted to a
//! YAML file on every transition so pending reversals survive a restart.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Default sanctions file location
pub const SANCTIONS_FILE: &str = "data/sanctions.yaml";

/// Lifecycle states of a temporary sanction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum SanctionState {
    /// Applied and waiting for the reversal time
    Active,
    /// Automatically reversed after the duration elapsed
    Reversed,
    /// Cancelled by a manual unmute before the reversal fired
    Cancelled,
}

/// Errors raised by sanction record operations
#[derive(Debug, Clone, Error)]
pub enum SanctionError {
    /// No record with the given ID
    #[error("sanction not found: {0}")]
    NotFound(String),

    /// Attempted transition out of a terminal state
    #[error("invalid sanction state transition from {0}")]
    InvalidTransition(SanctionState),
}

/// Record of one temporary sanction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanctionRecord {
    /// Unique ID of this sanction
    pub id: String,
    /// Sanctioned user
    pub user_id: u64,
    /// Guild the sanction applies in
    pub guild_id: u64,
    /// Role applied by the sanction, captured at scheduling time
    pub role_id: u64,
    /// Display tag of the user, for the reversal audit entry
    pub user_tag: String,
    /// When the sanction was applied
    pub applied_at: DateTime<Utc>,
    /// When the reversal is due
    pub revert_at: DateTime<Utc>,
    /// Current state
    pub state: SanctionState,
    /// When the reversal actually happened, if it has
    pub reversed_at: Option<DateTime<Utc>>,
}

impl SanctionRecord {
    /// Create a new active record due `delay_ms` from now
    #[must_use]
    pub fn new(
        user_id: u64,
        guild_id: u64,
        role_id: u64,
        user_tag: impl Into<String>,
        delay_ms: u64,
    ) -> Self {
        let now = Utc::now();
        let delay = Duration::milliseconds(i64::try_from(delay_ms).unwrap_or(i64::MAX));
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            guild_id,
            role_id,
            user_tag: user_tag.into(),
            applied_at: now,
            revert_at: now + delay,
            state: SanctionState::Active,
            reversed_at: None,
        }
    }

    /// Whether the reversal is due at `now`
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state == SanctionState::Active && self.revert_at <= now
    }

    /// Transition to Reversed
    ///
    /// # Errors
    /// Returns an error unless the record is Active.
    pub fn reverse(&mut self) -> Result<(), SanctionError> {
        if self.state != SanctionState::Active {
            return Err(SanctionError::InvalidTransition(self.state));
        }
        self.state = SanctionState::Reversed;
        self.reversed_at = Some(Utc::now());

        info!(
            sanction_id = %self.id,
            user_id = %self.user_id,
            guild_id = %self.guild_id,
            "Sanction reversed"
        );
        Ok(())
    }

    /// Transition to Cancelled
    ///
    /// # Errors
    /// Returns an error unless the record is Active.
    pub fn cancel(&mut self) -> Result<(), SanctionError> {
        if self.state != SanctionState::Active {
            return Err(SanctionError::InvalidTransition(self.state));
        }
        self.state = SanctionState::Cancelled;

        info!(
            sanction_id = %self.id,
            user_id = %self.user_id,
            guild_id = %self.guild_id,
            "Sanction cancelled"
        );
        Ok(())
    }
}

/// Durable store for sanction records
#[derive(Clone)]
pub struct SanctionStore {
    records: Arc<DashMap<String, SanctionRecord>>,
    path: Arc<PathBuf>,
}

impl SanctionStore {
    /// Create an empty store backed by the given file
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            path: Arc::new(path.into()),
        }
    }

    /// Load records from the backing file; a missing or unreadable file
    /// yields an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let store = Self::new(path);
        if let Ok(file_content) = tokio::fs::read_to_string(store.path.as_ref()).await {
            if let Ok(records) = serde_yaml::from_str::<Vec<SanctionRecord>>(&file_content) {
                for record in records {
                    store.records.insert(record.id.clone(), record);
                }
            }
        }
        store
    }

    /// Persist all records to the backing file
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created, the records
    /// cannot be serialized, or the file cannot be written.
    pub async fn save(&self) -> Result<(), crate::Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let records: Vec<SanctionRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let yaml = serde_yaml::to_string(&records)?;
        tokio::fs::write(self.path.as_ref(), yaml).await?;
        Ok(())
    }

    pub fn add(&self, record: SanctionRecord) {
        self.records.insert(record.id.clone(), record);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<SanctionRecord> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// IDs of active records whose reversal is due at `now`
    #[must_use]
    pub fn due_for_reversal(&self, now: DateTime<Utc>) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|entry| {
                let record = entry.value();
                record.is_due(now).then(|| record.id.clone())
            })
            .collect()
    }

    /// IDs of a user's active records whose reversal is due at `now`
    #[must_use]
    pub fn due_for_user(&self, user_id: u64, guild_id: u64, now: DateTime<Utc>) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|entry| {
                let record = entry.value();
                (record.user_id == user_id && record.guild_id == guild_id && record.is_due(now))
                    .then(|| record.id.clone())
            })
            .collect()
    }

    /// Active records for a user in a guild
    #[must_use]
    pub fn active_for_user(&self, user_id: u64, guild_id: u64) -> Vec<SanctionRecord> {
        self.records
            .iter()
            .filter_map(|entry| {
                let record = entry.value();
                (record.user_id == user_id
                    && record.guild_id == guild_id
                    && record.state == SanctionState::Active)
                    .then(|| record.clone())
            })
            .collect()
    }

    /// Reverse a record by ID, returning the updated record
    ///
    /// # Errors
    /// Returns an error if the record is missing or not Active.
    pub fn reverse(&self, id: &str) -> Result<SanctionRecord, SanctionError> {
        let mut record = self
            .records
            .get_mut(id)
            .ok_or_else(|| SanctionError::NotFound(id.to_string()))?;
        record.reverse()?;
        Ok(record.clone())
    }

    /// Cancel every active record for a user in a guild
    pub fn cancel_active_for_user(&self, user_id: u64, guild_id: u64) -> Vec<SanctionRecord> {
        let mut cancelled = Vec::new();
        for mut entry in self.records.iter_mut() {
            let record = entry.value_mut();
            if record.user_id == user_id
                && record.guild_id == guild_id
                && record.cancel().is_ok()
            {
                cancelled.push(record.clone());
            }
        }
        cancelled
    }
}

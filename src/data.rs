//! Centralized data structure for the bot.

use std::ops::Deref;
use std::sync::Arc;

use poise::serenity_prelude as serenity;
use serenity::prelude::TypeMapKey;

use crate::config::BotConfig;
use crate::moderation::SanctionScheduler;
use crate::verification::VerificationStore;

/// Centralized data handle shared with every command and handler
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

// Implement TypeMapKey for Data to allow storing it in Serenity's data map
impl TypeMapKey for Data {
    type Value = Data;
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("guild_id", &self.config.guild_id)
            .field("verification_enabled", &self.verification.is_enabled())
            .field("sanction_records", &self.sanctions.store().len())
            .finish()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    #[must_use]
    pub fn new(
        config: Arc<BotConfig>,
        verification: VerificationStore,
        sanctions: SanctionScheduler,
    ) -> Self {
        Self(Arc::new(DataInner {
            config,
            verification,
            sanctions,
        }))
    }
}

/// Inner state behind the shared handle
pub struct DataInner {
    /// Validated static configuration
    pub config: Arc<BotConfig>,
    /// Verification flag store
    pub verification: VerificationStore,
    /// Sanction reversal scheduler
    pub sanctions: SanctionScheduler,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::SanctionStore;

    #[tokio::test]
    async fn test_data_debug_impl() {
        let (tx, _rx) = tokio::sync::mpsc::channel(8);
        let store = SanctionStore::new(
            std::env::temp_dir().join(format!("warden-test-data-{}.yaml", uuid::Uuid::new_v4())),
        );
        let data = Data::new(
            Arc::new(BotConfig::default()),
            VerificationStore::load(
                std::env::temp_dir()
                    .join(format!("warden-test-data-v-{}.yaml", uuid::Uuid::new_v4())),
            )
            .await,
            SanctionScheduler::new(store, tx),
        );
        let debug_output = format!("{data:?}");
        assert!(debug_output.contains("Data"));
        assert!(debug_output.contains("verification_enabled"));
    }
}

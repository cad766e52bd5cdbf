//! File-backed verification toggle.
//!
//! One boolean, read once at startup and written through on every change.
//! Nothing outside this type touches the file.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Default verification flag file location
pub const VERIFICATION_FILE: &str = "data/verification.yaml";

#[derive(Debug, Serialize, Deserialize)]
struct VerificationPrefs {
    verify: bool,
}

impl Default for VerificationPrefs {
    fn default() -> Self {
        Self { verify: true }
    }
}

/// Store for the verification-enabled flag
#[derive(Debug)]
pub struct VerificationStore {
    path: PathBuf,
    enabled: AtomicBool,
}

impl VerificationStore {
    /// Load the flag from the backing file; a missing or unreadable file
    /// defaults to enabled.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let prefs = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_yaml::from_str::<VerificationPrefs>(&content).unwrap_or_default(),
            Err(_) => VerificationPrefs::default(),
        };
        Self {
            path,
            enabled: AtomicBool::new(prefs.verify),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Flip the flag and persist it before returning.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written; the in-memory flag is updated regardless.
    pub async fn set_enabled(&self, enabled: bool) -> Result<(), crate::Error> {
        self.enabled.store(enabled, Ordering::SeqCst);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let yaml = serde_yaml::to_string(&VerificationPrefs { verify: enabled })?;
        tokio::fs::write(&self.path, yaml).await?;

        info!(enabled = enabled, "Verification flag updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("warden-test-{name}-{}.yaml", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_file_defaults_to_enabled() {
        let store = VerificationStore::load(temp_path("verify-default")).await;
        assert!(store.is_enabled());
    }

    #[tokio::test]
    async fn test_toggle_survives_reload() {
        let path = temp_path("verify-toggle");

        let store = VerificationStore::load(&path).await;
        store.set_enabled(false).await.expect("persist");
        assert!(!store.is_enabled());

        // Simulated restart
        let reloaded = VerificationStore::load(&path).await;
        assert!(!reloaded.is_enabled());

        reloaded.set_enabled(true).await.expect("persist");
        let reloaded = VerificationStore::load(&path).await;
        assert!(reloaded.is_enabled());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_corrupt_file_defaults_to_enabled() {
        let path = temp_path("verify-corrupt");
        tokio::fs::write(&path, "not: [valid").await.expect("write");
        let store = VerificationStore::load(&path).await;
        assert!(store.is_enabled());
        let _ = std::fs::remove_file(&path);
    }
}

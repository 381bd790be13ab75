//! Engine configuration.
//!
//! Loaded from JSON; every field has a default so an empty object is a
//! valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::{VerificationError, Result};
use crate::ledger::Address;

/// Configuration for a [`crate::engine::VerificationsEngine`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Root label of description names (`<topic>.verifications.<root>`).
    #[serde(default = "default_description_root")]
    pub description_root: String,

    /// Maximum number of in-flight ledger reads during fan-out.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Accounts whose root-level verifications are trusted. Empty means
    /// root-level verifications are not restricted to particular issuers.
    #[serde(default)]
    pub trusted_roots: Vec<Address>,
}

fn default_description_root() -> String {
    "evan".to_string()
}

fn default_max_concurrency() -> usize {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            description_root: default_description_root(),
            max_concurrency: default_max_concurrency(),
            trusted_roots: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::Io` if the file cannot be read,
    /// `VerificationError::Config` if it is malformed or invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| VerificationError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(VerificationError::Config(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(VerificationError::Config(format!(
                "max_concurrency must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                self.max_concurrency
            )));
        }
        if self.description_root.is_empty()
            || self.description_root.contains('.')
            || self.description_root.contains('/')
        {
            return Err(VerificationError::Config(format!(
                "description_root must be a single label, got {:?}",
                self.description_root
            )));
        }
        Ok(())
    }

    pub fn with_trusted_root(mut self, root: Address) -> Self {
        self.trusted_roots.push(root);
        self
    }
}

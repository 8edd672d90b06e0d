use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Tunables for a [`LedgerStore`](crate::LedgerStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Snapshot frames kept for undo, counting the current state.
    /// The default of 11 keeps ten reachable prior states.
    pub history_capacity: usize,
    /// Seconds a login challenge stays valid after issue.
    pub challenge_ttl_secs: u64,
    /// Preamble of every challenge message.
    pub challenge_statement: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_capacity: 11,
            challenge_ttl_secs: 300,
            challenge_statement: "Sign this message to sign in to the Tally inventory console."
                .into(),
        }
    }
}

impl StoreConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.history_capacity < 1 {
            return Err(StoreError::Config(
                "history_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn challenge_ttl(&self) -> Duration {
        Duration::from_secs(self.challenge_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.history_capacity, 11);
        assert_eq!(c.challenge_ttl(), Duration::from_secs(300));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = StoreConfig::from_toml_str("history_capacity = 4").unwrap();
        assert_eq!(c.history_capacity, 4);
        assert_eq!(c.challenge_ttl_secs, 300);
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = StoreConfig::from_toml_str("history_capacity = 0").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = StoreConfig::from_toml_str("history_capacity = \"many\"").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "challenge_ttl_secs = 60").unwrap();
        writeln!(file, "challenge_statement = \"Prove it.\"").unwrap();

        let c = StoreConfig::load(file.path()).unwrap();
        assert_eq!(c.challenge_ttl_secs, 60);
        assert_eq!(c.challenge_statement, "Prove it.");
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StoreConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}

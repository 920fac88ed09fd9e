//! Activation settings, read from `~/.coresai/license.toml`.
//!
//! ```toml
//! database_path = "C:/ProgramData/CoresAI/private_license_keys.json"
//! probe_timeout_secs = 5
//! ```

use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Default database file name, relative to the working directory.
pub const DEFAULT_DATABASE_FILE: &str = "private_license_keys.json";

/// Settings for the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// Location of the license key database.
    pub database_path: PathBuf,
    /// Upper bound for each hardware probe, in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_FILE),
            probe_timeout_secs: 5,
        }
    }
}

impl LicenseConfig {
    /// `~/.coresai/license.toml`, if a home directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".coresai").join("license.toml"))
    }

    /// Loads from the default location, or defaults if there is none.
    ///
    /// # Errors
    ///
    /// See [`LicenseConfig::load_from`].
    pub fn load() -> LicenseResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads from an explicit path. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// An unreadable or unparsable file is an error; license settings are
    /// never silently replaced by defaults.
    pub fn load_from(path: &Path) -> LicenseResult<Self> {
        if !path.exists() {
            info!("No license config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LicenseError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| LicenseError::Config(format!("failed to parse {}: {e}", path.display())))?;
        if config.probe_timeout_secs == 0 {
            return Err(LicenseError::Config(
                "probe_timeout_secs must be at least 1".to_string(),
            ));
        }
        info!("Loaded license config from {:?}", path);
        Ok(config)
    }

    /// Per-probe timeout.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LicenseConfig::load_from(&dir.path().join("license.toml")).unwrap();
        assert_eq!(config, LicenseConfig::default());
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.toml");
        std::fs::write(&path, "probe_timeout_secs = 2\n").unwrap();
        let config = LicenseConfig::load_from(&path).unwrap();
        assert_eq!(config.probe_timeout_secs, 2);
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_FILE));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.toml");
        std::fs::write(&path, "probe_timeout_secs = \"soon\"\n").unwrap();
        let err = LicenseConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, LicenseError::Config(_)));
    }

    #[test]
    fn zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.toml");
        std::fs::write(&path, "probe_timeout_secs = 0\n").unwrap();
        assert!(LicenseConfig::load_from(&path).is_err());
    }
}

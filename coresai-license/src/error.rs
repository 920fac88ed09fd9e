//! Error types for the licensing module.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a license key is rejected by validation.
///
/// Each message is safe to show to the user as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Key is empty.
    #[error("Invalid key format")]
    InvalidFormat,

    /// Key does not start with the product prefix.
    #[error("Invalid key prefix")]
    InvalidPrefix,

    /// Key does not have six well-formed segments.
    #[error("Invalid key structure")]
    InvalidStructure,

    /// Duration code is not allowed or not known.
    #[error("Invalid duration code")]
    InvalidDuration,

    /// Key is well-formed but absent from the database.
    #[error("Key not found in database")]
    KeyNotFound,

    /// Key was already activated on this machine.
    #[error("Key has already been used")]
    AlreadyUsed,

    /// Key is locked to another machine.
    #[error("Key is locked to a different system")]
    HardwareMismatch,
}

impl ValidationError {
    /// Returns true when the rejection points at a key being reused on
    /// different hardware.
    #[must_use]
    pub fn is_security_relevant(&self) -> bool {
        matches!(self, Self::HardwareMismatch)
    }

    /// Returns true for rejections decided before any database lookup.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat
                | Self::InvalidPrefix
                | Self::InvalidStructure
                | Self::InvalidDuration
        )
    }
}

/// Reasons a hardware lock check fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LockError {
    /// Key is absent from the database.
    #[error("Key not found")]
    KeyNotFound,

    /// Key has no recorded fingerprint.
    #[error("Key not activated")]
    NotActivated,

    /// Current machine differs from the recorded one.
    #[error("Key is locked to a different system")]
    HardwareMismatch,
}

/// Failure of a single hardware probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe has no implementation for this platform.
    #[error("not supported on this platform")]
    Unsupported,

    /// Reading a system file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An introspection command failed or exited unsuccessfully.
    #[error("command `{command}` failed: {detail}")]
    Command { command: String, detail: String },

    /// Output could not be interpreted.
    #[error("unexpected output: {0}")]
    Parse(String),

    /// The device or value does not exist on this machine.
    #[error("{0} not present")]
    NotPresent(&'static str),
}

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The license database file does not exist.
    #[error("license database not found: {}", .0.display())]
    DatabaseNotFound(PathBuf),

    /// Storage I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The database content violates an invariant.
    #[error("license database integrity error: {0}")]
    Integrity(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

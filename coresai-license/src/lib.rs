//! License key validation and hardware locking for CoresAI.
//!
//! This module handles:
//! - Structured license key validation against a local key database
//! - One-time activation, persisted with a locked atomic rewrite
//! - Hardware fingerprinting for machine binding
//! - Hardware lock verification on later launches
//!
//! # Design Principles
//!
//! - **Offline**: no network calls; the key database is a local JSON file
//! - **Single use**: a key is activated once and never reset
//! - **Exact binding**: any hardware change breaks the lock
//! - **Degrade, don't abort**: a failing hardware probe weakens the
//!   fingerprint but never prevents one from being produced
//!
//! # License Key Format
//!
//! Keys are formatted as: `CoresAi-{1M|3M|6M|12M|LT}-XXXX-XXXX-XXXX-XXXX`

mod config;
mod device;
mod error;
mod key;
pub mod probe;
mod store;
mod validator;

pub use config::{LicenseConfig, DEFAULT_DATABASE_FILE};
pub use device::{
    hash_identifier, verify_match, FingerprintGenerator, HardwareIdentifiers, Probe,
    SystemFingerprint, DEFAULT_PROBE_TIMEOUT,
};
pub use error::{LicenseError, LicenseResult, LockError, ProbeError, ValidationError};
pub use key::{redact, DurationCode, ParsedKey, KEY_PREFIX, KEY_SEGMENTS, LIFETIME_DAYS};
pub use store::{
    ActivationAudit, KeyStatus, LicenseDatabase, LicenseRecord, LicenseStore, Partition,
    PartitionCounts, ValidationRules,
};
pub use validator::{ActivationSummary, LicenseValidator, ACTIVATION_FAILED};

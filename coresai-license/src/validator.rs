//! Key validation, one-time activation and hardware lock checks.
//!
//! A key moves from `unused` to `used` exactly once. Activation records the
//! activating machine's fingerprint; from then on the key only reports
//! `AlreadyUsed` on that machine and `HardwareMismatch` everywhere else.

use crate::config::LicenseConfig;
use crate::device::FingerprintGenerator;
use crate::error::{LicenseResult, LockError, ValidationError};
use crate::key::{redact, DurationCode, ParsedKey};
use crate::store::{KeyStatus, LicenseStore};
use chrono::Local;
use rust_decimal::Decimal;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Message returned when a validated key could not be committed.
pub const ACTIVATION_FAILED: &str = "Failed to activate key";

/// Outcome of a successful activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationSummary {
    pub duration: DurationCode,
    pub days: u32,
    pub price: Option<Decimal>,
}

impl fmt::Display for ActivationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "License key activated successfully! Duration: {} days, Price: ",
            self.days
        )?;
        match self.price {
            Some(price) => write!(f, "${price}"),
            None => f.write_str("not listed"),
        }
    }
}

/// Validates and activates license keys against a [`LicenseStore`].
#[derive(Debug)]
pub struct LicenseValidator {
    store: LicenseStore,
    generator: FingerprintGenerator,
}

impl LicenseValidator {
    /// Opens the database at `path` and fingerprints the host machine.
    ///
    /// # Errors
    ///
    /// Fails if the database cannot be loaded.
    pub fn open(path: impl Into<PathBuf>) -> LicenseResult<Self> {
        Ok(Self::new(LicenseStore::open(path)?, FingerprintGenerator::host()))
    }

    /// Opens the database named by `config`.
    ///
    /// # Errors
    ///
    /// Fails if the database cannot be loaded.
    pub fn from_config(config: &LicenseConfig) -> LicenseResult<Self> {
        let generator = FingerprintGenerator::host().with_timeout(config.probe_timeout());
        Ok(Self::new(LicenseStore::open(&config.database_path)?, generator))
    }

    /// Builds a validator from an open store and a generator.
    #[must_use]
    pub fn new(store: LicenseStore, generator: FingerprintGenerator) -> Self {
        Self { store, generator }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &LicenseStore {
        &self.store
    }

    /// Checks a key without changing anything.
    ///
    /// Format problems are reported before the database is consulted.
    ///
    /// # Errors
    ///
    /// The [`ValidationError`] describing why the key cannot be activated.
    pub fn validate_key(&self, key: &str) -> Result<DurationCode, ValidationError> {
        let db = self.store.database();
        let parsed = ParsedKey::parse(key, db.allowed_durations())?;
        let duration = parsed.duration();

        let record = db
            .find_in_partition(duration, parsed.raw())
            .ok_or(ValidationError::KeyNotFound)?;

        if record.status == KeyStatus::Unused {
            return Ok(duration);
        }

        match &record.hardware_fingerprint {
            Some(stored) => {
                if !self.generator.matches_current(stored) {
                    warn!(key = %redact(key), "License key presented on a different system");
                    return Err(ValidationError::HardwareMismatch);
                }
            }
            None => {
                // Activated before hardware locking existed; not bound to any machine.
                warn!(key = %redact(key), "Used license key has no hardware lock");
            }
        }
        Err(ValidationError::AlreadyUsed)
    }

    /// Marks an unused key as used and locks it to this machine.
    ///
    /// Callers are expected to run [`validate_key`](Self::validate_key)
    /// first; only existence and the unused state are rechecked here, against
    /// the file as it is on disk at commit time.
    ///
    /// Returns `Ok(false)` if the key is absent or no longer unused.
    ///
    /// # Errors
    ///
    /// Storage failures while committing.
    pub fn activate_key(&mut self, key: &str) -> LicenseResult<bool> {
        let fingerprint = self.generator.generate_fingerprint();
        let short = fingerprint.short().to_string();
        let now = Local::now().naive_local();

        let committed = self.store.update(move |db| {
            let record = db.find_mut(key)?;
            if record.status != KeyStatus::Unused {
                return None;
            }
            record.activate(fingerprint, now);
            Some(())
        })?;

        if committed.is_some() {
            info!(key = %redact(key), fingerprint = %short, "Activated license key");
            Ok(true)
        } else {
            warn!(key = %redact(key), "License key was not unused at activation time");
            Ok(false)
        }
    }

    /// Checks that the current machine is the one `key` is locked to.
    ///
    /// # Errors
    ///
    /// [`LockError::KeyNotFound`], [`LockError::NotActivated`] when no
    /// fingerprint is recorded, or [`LockError::HardwareMismatch`].
    pub fn verify_hardware_lock(&self, key: &str) -> Result<(), LockError> {
        let (_, record) = self
            .store
            .database()
            .find(key)
            .ok_or(LockError::KeyNotFound)?;
        let stored = record
            .hardware_fingerprint
            .as_ref()
            .ok_or(LockError::NotActivated)?;
        if self.generator.matches_current(stored) {
            Ok(())
        } else {
            warn!(key = %redact(key), "Hardware lock mismatch");
            Err(LockError::HardwareMismatch)
        }
    }

    /// Length of a license in days.
    #[must_use]
    pub fn duration_days(&self, duration: DurationCode) -> u32 {
        duration.days()
    }

    /// Listed price of a license.
    #[must_use]
    pub fn price(&self, duration: DurationCode) -> Option<Decimal> {
        self.store.database().price(duration)
    }

    /// Validates and then activates a key.
    ///
    /// This is the entry point for product code. Every outcome maps to one
    /// user-facing sentence: the summary's `Display` on success, the error
    /// string otherwise.
    ///
    /// # Errors
    ///
    /// `"Invalid license key: <reason>"` when validation fails, or
    /// [`ACTIVATION_FAILED`] when the key could not be committed.
    pub fn validate_and_activate(&mut self, key: &str) -> Result<ActivationSummary, String> {
        let duration = self
            .validate_key(key)
            .map_err(|e| format!("Invalid license key: {e}"))?;

        match self.activate_key(key) {
            Ok(true) => {}
            Ok(false) => return Err(ACTIVATION_FAILED.to_string()),
            Err(e) => {
                error!(key = %redact(key), error = %e, "Failed to persist activation");
                return Err(ACTIVATION_FAILED.to_string());
            }
        }

        Ok(ActivationSummary {
            duration,
            days: self.duration_days(duration),
            price: self.price(duration),
        })
    }
}

//! Persisted license key database.
//!
//! The database is a single JSON document:
//!
//! ```json
//! {
//!   "validation_rules": { "allowed_durations": ["1M", "3M", "6M", "12M", "LT"] },
//!   "license_keys": { "1_month": { "keys": [ { "key": "...", "status": "unused" } ] } },
//!   "pricing": { "1_month": 29.99 }
//! }
//! ```
//!
//! Writes go through [`LicenseStore::update`], which holds an exclusive lock
//! on a sidecar `<file>.lock`, re-reads the file, applies the change and
//! replaces the file atomically (temp file + rename). Concurrent activations
//! from several processes therefore serialize instead of overwriting each
//! other.

use crate::device::SystemFingerprint;
use crate::error::{LicenseError, LicenseResult};
use crate::key::DurationCode;
use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Activation state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Unused,
    Used,
}

/// One sellable license key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub key: String,
    pub status: KeyStatus,
    /// Local time of activation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_date: Option<NaiveDateTime>,
    /// Machine the key is locked to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_fingerprint: Option<SystemFingerprint>,
    /// Audit entry written alongside the lock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_hwids: Option<ActivationAudit>,
    /// Fields this crate does not interpret, kept on rewrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LicenseRecord {
    /// A fresh, unused key.
    #[must_use]
    pub fn unused(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: KeyStatus::Unused,
            activation_date: None,
            hardware_fingerprint: None,
            activation_hwids: None,
            extra: Map::new(),
        }
    }

    /// Returns true once the key has been activated.
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.status == KeyStatus::Used
    }

    /// A used key with no recorded fingerprint, from before hardware locking.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        self.is_used() && self.hardware_fingerprint.is_none()
    }

    /// Marks the key used and locks it to `fingerprint`.
    pub fn activate(&mut self, fingerprint: SystemFingerprint, at: NaiveDateTime) {
        self.status = KeyStatus::Used;
        self.activation_date = Some(at);
        self.activation_hwids = Some(ActivationAudit {
            timestamp: at,
            fingerprint: fingerprint.clone(),
            extra: Map::new(),
        });
        self.hardware_fingerprint = Some(fingerprint);
    }
}

/// When and on which machine a key was activated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationAudit {
    pub timestamp: NaiveDateTime,
    pub fingerprint: SystemFingerprint,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Rules applied before any key lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    pub allowed_durations: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keys of one duration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    #[serde(default)]
    pub keys: Vec<LicenseRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Key counts for one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionCounts {
    pub partition: String,
    pub unused: usize,
    pub used: usize,
    pub legacy: usize,
}

/// The whole license database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseDatabase {
    pub validation_rules: ValidationRules,
    pub license_keys: BTreeMap<String, Partition>,
    #[serde(default)]
    /// Prices as written in the file, so rewrites keep `499` and `29.99`
    /// in their original form.
    pub pricing: BTreeMap<String, Number>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for LicenseDatabase {
    /// Every duration allowed, one empty partition per duration, no prices.
    fn default() -> Self {
        Self {
            validation_rules: ValidationRules {
                allowed_durations: DurationCode::ALL
                    .iter()
                    .map(|d| d.code().to_string())
                    .collect(),
                extra: Map::new(),
            },
            license_keys: DurationCode::ALL
                .iter()
                .map(|d| (d.partition().to_string(), Partition::default()))
                .collect(),
            pricing: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

impl LicenseDatabase {
    /// Allowed duration codes, as written in the file.
    #[must_use]
    pub fn allowed_durations(&self) -> &[String] {
        &self.validation_rules.allowed_durations
    }

    /// Finds a key within the partition for `duration`.
    #[must_use]
    pub fn find_in_partition(&self, duration: DurationCode, key: &str) -> Option<&LicenseRecord> {
        self.license_keys
            .get(duration.partition())?
            .keys
            .iter()
            .find(|r| r.key == key)
    }

    /// Finds a key in any partition, returning the partition name with it.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<(&str, &LicenseRecord)> {
        self.license_keys.iter().find_map(|(name, partition)| {
            partition
                .keys
                .iter()
                .find(|r| r.key == key)
                .map(|r| (name.as_str(), r))
        })
    }

    /// Finds a key in any partition for modification.
    pub fn find_mut(&mut self, key: &str) -> Option<&mut LicenseRecord> {
        self.license_keys
            .values_mut()
            .flat_map(|p| p.keys.iter_mut())
            .find(|r| r.key == key)
    }

    /// Adds an unused key to the partition for `duration`.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Integrity`] if the key already exists anywhere.
    pub fn insert_unused(&mut self, duration: DurationCode, key: &str) -> LicenseResult<()> {
        if let Some((partition, _)) = self.find(key) {
            return Err(LicenseError::Integrity(format!(
                "key already present in partition {partition}"
            )));
        }
        self.license_keys
            .entry(duration.partition().to_string())
            .or_default()
            .keys
            .push(LicenseRecord::unused(key));
        Ok(())
    }

    /// Price listed for a duration.
    #[must_use]
    pub fn price(&self, duration: DurationCode) -> Option<Decimal> {
        self.pricing.get(duration.partition()).and_then(number_to_decimal)
    }

    /// Sets the price of a duration.
    ///
    /// Whole amounts are stored as JSON integers, others as floats.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Storage`] if the amount has no JSON number form.
    pub fn set_price(&mut self, duration: DurationCode, price: Decimal) -> LicenseResult<()> {
        let number = decimal_to_number(price)
            .ok_or_else(|| LicenseError::Storage(format!("price {price} is not representable")))?;
        self.pricing.insert(duration.partition().to_string(), number);
        Ok(())
    }

    /// Used keys without a hardware lock.
    pub fn legacy_records(&self) -> impl Iterator<Item = &LicenseRecord> {
        self.license_keys
            .values()
            .flat_map(|p| p.keys.iter())
            .filter(|r| r.is_legacy())
    }

    /// Per-partition key counts.
    #[must_use]
    pub fn partition_counts(&self) -> Vec<PartitionCounts> {
        self.license_keys
            .iter()
            .map(|(name, partition)| {
                let used = partition.keys.iter().filter(|r| r.is_used()).count();
                PartitionCounts {
                    partition: name.clone(),
                    unused: partition.keys.len() - used,
                    used,
                    legacy: partition.keys.iter().filter(|r| r.is_legacy()).count(),
                }
            })
            .collect()
    }

    /// Checks that every key string appears exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Integrity`] naming the partition of the
    /// duplicate.
    pub fn check_integrity(&self) -> LicenseResult<()> {
        let mut seen = HashSet::new();
        for (name, partition) in &self.license_keys {
            for record in &partition.keys {
                if !seen.insert(record.key.as_str()) {
                    return Err(LicenseError::Integrity(format!(
                        "duplicate key in partition {name}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Handle on the on-disk license database.
///
/// Holds the last committed state in memory. Reads are served from memory;
/// every write re-reads the file under the lock first.
#[derive(Debug)]
pub struct LicenseStore {
    path: PathBuf,
    db: LicenseDatabase,
}

impl LicenseStore {
    /// Opens an existing database.
    ///
    /// # Errors
    ///
    /// A missing, unreadable, malformed or inconsistent file is an error.
    /// There is no fallback to an empty database.
    pub fn open(path: impl Into<PathBuf>) -> LicenseResult<Self> {
        let path = path.into();
        let db = read_database(&path)?;
        info!(
            path = %path.display(),
            partitions = db.license_keys.len(),
            "Loaded license database"
        );
        Ok(Self { path, db })
    }

    /// Writes a new database file.
    ///
    /// # Errors
    ///
    /// Fails if the file already exists or `db` has duplicate keys.
    pub fn create(path: impl Into<PathBuf>, db: LicenseDatabase) -> LicenseResult<Self> {
        let path = path.into();
        db.check_integrity()?;
        let _lock = StoreLock::acquire(&path)?;
        if path.exists() {
            return Err(LicenseError::Storage(format!(
                "refusing to overwrite existing database {}",
                path.display()
            )));
        }
        write_database(&path, &db)?;
        info!(path = %path.display(), "Created license database");
        Ok(Self { path, db })
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The last committed database state.
    #[must_use]
    pub fn database(&self) -> &LicenseDatabase {
        &self.db
    }

    /// Re-reads the file.
    ///
    /// # Errors
    ///
    /// Same conditions as [`LicenseStore::open`].
    pub fn reload(&mut self) -> LicenseResult<()> {
        self.db = read_database(&self.path)?;
        Ok(())
    }

    /// Locked read-modify-write.
    ///
    /// `f` receives a copy of the database as currently on disk. Returning
    /// `Some` commits the modified copy; returning `None` discards it and
    /// leaves the file untouched. Either way the in-memory state afterwards
    /// is what the file holds.
    ///
    /// # Errors
    ///
    /// Lock, read, parse or write failures.
    pub fn update<T>(
        &mut self,
        f: impl FnOnce(&mut LicenseDatabase) -> Option<T>,
    ) -> LicenseResult<Option<T>> {
        let _lock = StoreLock::acquire(&self.path)?;
        let on_disk = read_database(&self.path)?;
        let mut staged = on_disk.clone();
        let outcome = f(&mut staged);
        if outcome.is_some() {
            write_database(&self.path, &staged)?;
            debug!(path = %self.path.display(), "Committed license database");
            self.db = staged;
        } else {
            self.db = on_disk;
        }
        Ok(outcome)
    }
}

fn number_to_decimal(number: &Number) -> Option<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn decimal_to_number(price: Decimal) -> Option<Number> {
    if price.fract().is_zero() {
        if let Some(whole) = price.to_i64() {
            return Some(Number::from(whole));
        }
    }
    price.to_f64().and_then(Number::from_f64)
}

fn read_database(path: &Path) -> LicenseResult<LicenseDatabase> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(LicenseError::DatabaseNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let db: LicenseDatabase = serde_json::from_str(&contents)?;
    db.check_integrity()?;
    Ok(db)
}

/// Writes next to the target and renames over it.
fn write_database(path: &Path, db: &LicenseDatabase) -> LicenseResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, db)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| LicenseError::Io(e.error))?;
    Ok(())
}

/// Exclusive advisory lock on `<database>.lock`, released on drop.
struct StoreLock {
    file: File,
}

impl StoreLock {
    fn acquire(db_path: &Path) -> LicenseResult<Self> {
        let mut lock_path = OsString::from(db_path.as_os_str());
        lock_path.push(".lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(PathBuf::from(lock_path))?;
        file.lock()?;
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

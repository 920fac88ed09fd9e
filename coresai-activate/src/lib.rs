//! Reports printed by the `coresai-activate` tool.
//!
//! Every report is serializable for `--json` output and has a plain text
//! rendering. Reports never carry raw hardware values or full license keys.

use coresai_license::probe::Component;
use coresai_license::{
    redact, ActivationSummary, DurationCode, FingerprintGenerator, HardwareIdentifiers,
    LicenseDatabase, Probe,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of one hardware probe.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProbeStatus {
    pub component: String,
    pub collected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// This machine's fingerprint and how it was obtained.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FingerprintReport {
    pub fingerprint: String,
    pub probes: Vec<ProbeStatus>,
}

impl FingerprintReport {
    /// Probes the machine behind `generator`.
    #[must_use]
    pub fn collect(generator: &FingerprintGenerator) -> Self {
        Self::from_identifiers(&generator.collect_identifiers())
    }

    /// Builds a report from already collected identifiers.
    #[must_use]
    pub fn from_identifiers(ids: &HardwareIdentifiers) -> Self {
        let reasons = [
            unavailable_reason(&ids.cpu_id),
            unavailable_reason(&ids.gpu_ids),
            unavailable_reason(&ids.disk_ids),
            unavailable_reason(&ids.motherboard_id),
            unavailable_reason(&ids.network_ids),
            unavailable_reason(&ids.machine_guid),
        ];
        let probes = Component::ALL
            .into_iter()
            .zip(reasons)
            .map(|(component, reason)| ProbeStatus {
                component: component.as_str().to_string(),
                collected: reason.is_none(),
                reason,
            })
            .collect();
        Self {
            fingerprint: ids.fingerprint().as_str().to_string(),
            probes,
        }
    }

    /// Returns true if any probe failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.probes.iter().any(|p| !p.collected)
    }
}

fn unavailable_reason<T>(probe: &Probe<T>) -> Option<String> {
    match probe {
        Probe::Collected(_) => None,
        Probe::Unavailable { reason } => Some(reason.clone()),
    }
}

impl fmt::Display for FingerprintReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fingerprint: {}", self.fingerprint)?;
        for probe in &self.probes {
            match &probe.reason {
                None => writeln!(f, "  {:<13} collected", probe.component)?,
                Some(reason) => writeln!(f, "  {:<13} unavailable ({reason})", probe.component)?,
            }
        }
        if self.is_degraded() {
            writeln!(f, "Warning: fingerprint is degraded; it may change when probes recover")?;
        }
        Ok(())
    }
}

/// Key counts and price for one partition.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PartitionStatus {
    pub partition: String,
    pub unused: usize,
    pub used: usize,
    pub legacy: usize,
    pub price: Option<String>,
}

/// Summary of a license database.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StatusReport {
    pub database: String,
    pub allowed_durations: Vec<String>,
    pub partitions: Vec<PartitionStatus>,
    /// Redacted keys that are used but not locked to any machine.
    pub legacy_keys: Vec<String>,
}

impl StatusReport {
    #[must_use]
    pub fn from_database(database: impl Into<String>, db: &LicenseDatabase) -> Self {
        let partitions = db
            .partition_counts()
            .into_iter()
            .map(|counts| PartitionStatus {
                price: DurationCode::from_partition(&counts.partition)
                    .and_then(|d| db.price(d))
                    .map(|p| p.to_string()),
                partition: counts.partition,
                unused: counts.unused,
                used: counts.used,
                legacy: counts.legacy,
            })
            .collect();
        Self {
            database: database.into(),
            allowed_durations: db.allowed_durations().to_vec(),
            partitions,
            legacy_keys: db.legacy_records().map(|r| redact(&r.key)).collect(),
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Database: {}", self.database)?;
        writeln!(f, "Allowed durations: {}", self.allowed_durations.join(", "))?;
        writeln!(
            f,
            "  {:<10} {:>7} {:>7} {:>7} {:>10}",
            "partition", "unused", "used", "legacy", "price"
        )?;
        for p in &self.partitions {
            let price = p.price.as_deref().map_or_else(|| "-".to_string(), |v| format!("${v}"));
            writeln!(
                f,
                "  {:<10} {:>7} {:>7} {:>7} {:>10}",
                p.partition, p.unused, p.used, p.legacy, price
            )?;
        }
        if !self.legacy_keys.is_empty() {
            writeln!(
                f,
                "{} used key(s) have no hardware lock: {}",
                self.legacy_keys.len(),
                self.legacy_keys.join(", ")
            )?;
        }
        Ok(())
    }
}

/// Outcome of a single-key command.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KeyOutcome {
    pub key: String,
    pub ok: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

impl KeyOutcome {
    /// A successful activation.
    #[must_use]
    pub fn activated(key: &str, summary: &ActivationSummary) -> Self {
        Self {
            key: redact(key),
            ok: true,
            message: summary.to_string(),
            duration: Some(summary.duration.code().to_string()),
            days: Some(summary.days),
        }
    }

    /// A key that passed validation and is ready to activate.
    #[must_use]
    pub fn valid(key: &str, duration: DurationCode) -> Self {
        Self {
            key: redact(key),
            ok: true,
            message: format!("Key is valid: {} ({} days)", duration, duration.days()),
            duration: Some(duration.code().to_string()),
            days: Some(duration.days()),
        }
    }

    /// A successful check with no duration attached.
    #[must_use]
    pub fn success(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: redact(key),
            ok: true,
            message: message.into(),
            duration: None,
            days: None,
        }
    }

    /// A rejection.
    #[must_use]
    pub fn failure(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: redact(key),
            ok: false,
            message: message.into(),
            duration: None,
            days: None,
        }
    }
}

impl fmt::Display for KeyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

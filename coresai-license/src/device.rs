//! Device fingerprinting for license binding.
//!
//! Generates a stable hardware fingerprint that identifies this machine.
//! Every raw identifier is hashed with SHA-256 on collection; the hashes are
//! then joined in a fixed order and hashed again with SHA-512:
//!
//! ```text
//! sha512( cpu - gpu.. - disk.. - motherboard - net.. - machine_guid )
//! ```
//!
//! Each component is a fixed-width hex token before it is joined, so the
//! `-` delimiter can never be confused with component content.
//!
//! A probe that fails or times out degrades the fingerprint instead of
//! aborting it: the component contributes an empty value and the failure is
//! logged. A machine on which every probe fails still yields a fingerprint
//! (the hash of all-empty fields), so two such machines would match each
//! other. That limitation is accepted; matching stays exact.

use crate::error::ProbeError;
use crate::probe::{Component, HardwareSource, HostHardware};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Default upper bound for a single hardware probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Separator between fingerprint components.
const FIELD_DELIMITER: &str = "-";

/// Hashes a single raw identifier (SHA-256, lowercase hex).
#[must_use]
pub fn hash_identifier(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Outcome of one hardware probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// The probe answered.
    Collected(T),
    /// The probe failed, panicked or timed out.
    Unavailable { reason: String },
}

impl<T> Probe<T> {
    /// Returns true if the probe answered.
    #[must_use]
    pub fn is_collected(&self) -> bool {
        matches!(self, Self::Collected(_))
    }

    /// Returns the collected value, if any.
    #[must_use]
    pub fn collected(&self) -> Option<&T> {
        match self {
            Self::Collected(value) => Some(value),
            Self::Unavailable { .. } => None,
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Probe<U> {
        match self {
            Self::Collected(value) => Probe::Collected(f(value)),
            Self::Unavailable { reason } => Probe::Unavailable { reason },
        }
    }
}

/// Hashed identifiers of the current machine.
///
/// Built fresh for every fingerprint request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareIdentifiers {
    pub cpu_id: Probe<String>,
    pub gpu_ids: Probe<Vec<String>>,
    pub disk_ids: Probe<Vec<String>>,
    pub motherboard_id: Probe<String>,
    pub network_ids: Probe<Vec<String>>,
    pub machine_guid: Probe<String>,
}

impl HardwareIdentifiers {
    /// Components whose probe did not answer.
    #[must_use]
    pub fn unavailable(&self) -> Vec<Component> {
        let collected = [
            self.cpu_id.is_collected(),
            self.gpu_ids.is_collected(),
            self.disk_ids.is_collected(),
            self.motherboard_id.is_collected(),
            self.network_ids.is_collected(),
            self.machine_guid.is_collected(),
        ];
        Component::ALL
            .into_iter()
            .zip(collected)
            .filter(|(_, ok)| !ok)
            .map(|(c, _)| c)
            .collect()
    }

    /// Combines the identifiers into a fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> SystemFingerprint {
        let single = |p: &Probe<String>| p.collected().cloned().unwrap_or_default();
        let list = |p: &Probe<Vec<String>>| {
            p.collected()
                .map(|ids| ids.join(FIELD_DELIMITER))
                .unwrap_or_default()
        };

        let combined = [
            single(&self.cpu_id),
            list(&self.gpu_ids),
            list(&self.disk_ids),
            single(&self.motherboard_id),
            list(&self.network_ids),
            single(&self.machine_guid),
        ]
        .join(FIELD_DELIMITER);

        SystemFingerprint(hex::encode(Sha512::digest(combined.as_bytes())))
    }
}

/// A stable fingerprint that identifies one machine.
///
/// The `Debug` output is shortened so fingerprints do not leak into logs
/// in full.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemFingerprint(String);

impl SystemFingerprint {
    /// Wraps a stored fingerprint string.
    #[must_use]
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the fingerprint as hex.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First twelve characters, for log correlation.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Debug for SystemFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SystemFingerprint({}…)", self.short())
    }
}

/// Compares two fingerprints. Any difference is a mismatch.
#[must_use]
pub fn verify_match(candidate: &SystemFingerprint, stored: &SystemFingerprint) -> bool {
    candidate == stored
}

/// Produces fingerprints from a hardware source.
#[derive(Clone)]
pub struct FingerprintGenerator {
    source: Arc<dyn HardwareSource>,
    timeout: Duration,
}

impl fmt::Debug for FingerprintGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FingerprintGenerator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for FingerprintGenerator {
    fn default() -> Self {
        Self::host()
    }
}

impl FingerprintGenerator {
    /// Generator for the machine this process runs on.
    #[must_use]
    pub fn host() -> Self {
        Self::new(HostHardware)
    }

    /// Generator over an arbitrary hardware source.
    #[must_use]
    pub fn new(source: impl HardwareSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Sets the per-probe timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the per-probe timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Queries every component and hashes what it finds.
    ///
    /// Never fails: a probe that errors, panics or exceeds the timeout is
    /// reported as [`Probe::Unavailable`].
    #[must_use]
    pub fn collect_identifiers(&self) -> HardwareIdentifiers {
        HardwareIdentifiers {
            cpu_id: self
                .run_probe(Component::Processor, |s| s.processor())
                .map(|cpu| hash_identifier(&cpu.identity())),
            gpu_ids: self
                .run_probe(Component::Graphics, |s| s.graphics_adapters())
                .map(|gpus| gpus.iter().map(|g| hash_identifier(&g.identity())).collect()),
            disk_ids: self
                .run_probe(Component::Storage, |s| s.storage_devices())
                .map(|disks| disks.iter().map(|d| hash_identifier(&d.identity())).collect()),
            motherboard_id: self
                .run_probe(Component::Motherboard, |s| s.motherboard())
                .map(|board| hash_identifier(&board.identity())),
            network_ids: self
                .run_probe(Component::Network, |s| s.network_adapters())
                .map(|adapters| {
                    adapters
                        .iter()
                        .filter_map(|a| a.mac.as_deref())
                        .map(hash_identifier)
                        .collect()
                }),
            machine_guid: self
                .run_probe(Component::MachineId, |s| s.machine_id())
                .map(|id| hash_identifier(id.trim())),
        }
    }

    /// Generates the fingerprint of the current machine.
    #[must_use]
    pub fn generate_fingerprint(&self) -> SystemFingerprint {
        let identifiers = self.collect_identifiers();
        let degraded = identifiers.unavailable();
        let fingerprint = identifiers.fingerprint();
        if degraded.is_empty() {
            debug!(fingerprint = fingerprint.short(), "Generated system fingerprint");
        } else {
            let fields: Vec<&str> = degraded.iter().map(Component::as_str).collect();
            warn!(
                fingerprint = fingerprint.short(),
                unavailable = ?fields,
                "Generated degraded system fingerprint"
            );
        }
        fingerprint
    }

    /// Returns true if the current machine produces `stored`.
    #[must_use]
    pub fn matches_current(&self, stored: &SystemFingerprint) -> bool {
        verify_match(&self.generate_fingerprint(), stored)
    }

    /// Runs one probe on a worker thread, bounded by the timeout.
    fn run_probe<T, F>(&self, component: Component, probe: F) -> Probe<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn HardwareSource) -> Result<T, ProbeError> + Send + 'static,
    {
        let source = Arc::clone(&self.source);
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name(format!("probe-{component}"))
            .spawn(move || {
                // The receiver is gone if we already timed out.
                let _ = tx.send(probe(source.as_ref()));
            });
        if let Err(e) = spawned {
            warn!(%component, error = %e, "Failed to start hardware probe");
            return Probe::Unavailable {
                reason: format!("could not start probe: {e}"),
            };
        }

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(value)) => {
                debug!(%component, "Hardware probe collected");
                Probe::Collected(value)
            }
            Ok(Err(e)) => {
                warn!(%component, error = %e, "Hardware probe failed");
                Probe::Unavailable {
                    reason: e.to_string(),
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(%component, timeout = ?self.timeout, "Hardware probe timed out");
                Probe::Unavailable {
                    reason: format!("timed out after {:?}", self.timeout),
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(%component, "Hardware probe panicked");
                Probe::Unavailable {
                    reason: "probe panicked".to_string(),
                }
            }
        }
    }
}

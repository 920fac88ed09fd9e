//! Shared test helpers for license tests.

#![allow(dead_code)]

use coresai_license::probe::{Component, StaticHardware};
use coresai_license::{FingerprintGenerator, LicenseStore, LicenseValidator};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MONTH_KEY: &str = "CoresAi-1M-X7K9-NQWP-VJHT-L4MD";
pub const SECOND_MONTH_KEY: &str = "CoresAi-1M-B8RT-ZK2M-QW4E-9PLX";
pub const LIFETIME_KEY: &str = "CoresAi-LT-A1B2-C3D4-E5F6-G7H8";
pub const LEGACY_KEY: &str = "CoresAi-12M-OLD1-OLD2-OLD3-OLD4";
pub const UNKNOWN_CODE_KEY: &str = "CoresAi-XX-AAAA-BBBB-CCCC-DDDD";
pub const ABSENT_KEY: &str = "CoresAi-3M-ZZZZ-YYYY-XXXX-WWWW";

/// A database in the on-disk format, with one legacy record.
pub const SAMPLE_DATABASE: &str = r#"{
  "validation_rules": { "allowed_durations": ["1M", "3M", "6M", "12M", "LT"] },
  "license_keys": {
    "1_month": {
      "keys": [
        { "key": "CoresAi-1M-X7K9-NQWP-VJHT-L4MD", "status": "unused" },
        { "key": "CoresAi-1M-B8RT-ZK2M-QW4E-9PLX", "status": "unused" }
      ]
    },
    "3_months": { "keys": [] },
    "6_months": { "keys": [] },
    "12_months": {
      "keys": [
        {
          "key": "CoresAi-12M-OLD1-OLD2-OLD3-OLD4",
          "status": "used",
          "activation_date": "2024-03-01T10:15:30.123456",
          "issued_to": "reseller-7"
        }
      ]
    },
    "lifetime": {
      "keys": [ { "key": "CoresAi-LT-A1B2-C3D4-E5F6-G7H8", "status": "unused" } ]
    }
  },
  "pricing": {
    "1_month": 29.99,
    "3_months": 79.99,
    "6_months": 149.99,
    "12_months": 249.99,
    "lifetime": 499
  }
}"#;

/// Writes [`SAMPLE_DATABASE`] into `dir` and returns its path.
pub fn write_sample(dir: &Path) -> PathBuf {
    let path = dir.join("private_license_keys.json");
    std::fs::write(&path, SAMPLE_DATABASE).unwrap();
    path
}

/// The machine most tests run on.
pub fn workstation() -> StaticHardware {
    StaticHardware::workstation()
}

/// The workstation with its second disk replaced.
pub fn upgraded_workstation() -> StaticHardware {
    let mut hw = StaticHardware::workstation();
    hw.storage[1].serial = "WD-WX99D80K9999".to_string();
    hw
}

/// A machine whose probes all fail.
pub fn blind_machine() -> StaticHardware {
    let mut hw = StaticHardware::default();
    for component in Component::ALL {
        hw = hw.with_failing(component);
    }
    hw
}

pub fn generator(hw: StaticHardware) -> FingerprintGenerator {
    FingerprintGenerator::new(hw).with_timeout(Duration::from_secs(2))
}

/// Opens a validator on `path` as seen from the machine `hw`.
pub fn validator_on(path: &Path, hw: StaticHardware) -> LicenseValidator {
    LicenseValidator::new(LicenseStore::open(path).unwrap(), generator(hw))
}

mod common;

use common::*;
use coresai_license::{
    DurationCode, KeyStatus, LicenseStore, LockError, ValidationError, ACTIVATION_FAILED,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

// ── validate_key ─────────────────────────────────────────────────

#[test]
fn unused_key_validates_with_its_duration() {
    let dir = tempfile::tempdir().unwrap();
    let v = validator_on(&write_sample(dir.path()), workstation());
    assert_eq!(v.validate_key(MONTH_KEY), Ok(DurationCode::OneMonth));
    assert_eq!(v.validate_key(LIFETIME_KEY), Ok(DurationCode::Lifetime));
}

#[test]
fn validation_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());
    let v = validator_on(&path, workstation());
    v.validate_key(MONTH_KEY).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE_DATABASE);
}

#[test]
fn unknown_duration_code_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let v = validator_on(&write_sample(dir.path()), workstation());
    assert_eq!(
        v.validate_key(UNKNOWN_CODE_KEY),
        Err(ValidationError::InvalidDuration)
    );
}

#[test]
fn absent_key_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let v = validator_on(&write_sample(dir.path()), workstation());
    assert_eq!(v.validate_key(ABSENT_KEY), Err(ValidationError::KeyNotFound));
}

#[test]
fn key_in_wrong_partition_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    // A 3M key filed under 1_month is not found through its own partition.
    let json = common::SAMPLE_DATABASE.replace(
        "CoresAi-1M-B8RT-ZK2M-QW4E-9PLX",
        "CoresAi-3M-B8RT-ZK2M-QW4E-9PLX",
    );
    std::fs::write(&path, json).unwrap();
    let v = validator_on(&path, workstation());
    assert_eq!(
        v.validate_key("CoresAi-3M-B8RT-ZK2M-QW4E-9PLX"),
        Err(ValidationError::KeyNotFound)
    );
}

#[test]
fn duration_must_be_allowed_by_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    let json = common::SAMPLE_DATABASE.replace(
        r#"["1M", "3M", "6M", "12M", "LT"]"#,
        r#"["3M", "6M", "12M", "LT"]"#,
    );
    std::fs::write(&path, json).unwrap();
    let v = validator_on(&path, workstation());
    assert_eq!(v.validate_key(MONTH_KEY), Err(ValidationError::InvalidDuration));
}

#[test]
fn legacy_used_key_reports_already_used_anywhere() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());
    for hw in [workstation(), upgraded_workstation()] {
        let v = validator_on(&path, hw);
        assert_eq!(v.validate_key(LEGACY_KEY), Err(ValidationError::AlreadyUsed));
    }
}

// ── activate_key ─────────────────────────────────────────────────

#[test]
fn activation_locks_key_to_machine() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());
    let mut v = validator_on(&path, workstation());

    assert!(v.activate_key(MONTH_KEY).unwrap());

    let expected = generator(workstation()).generate_fingerprint();
    let reopened = LicenseStore::open(&path).unwrap();
    let (partition, record) = reopened.database().find(MONTH_KEY).unwrap();
    assert_eq!(partition, "1_month");
    assert_eq!(record.status, KeyStatus::Used);
    assert!(record.activation_date.is_some());
    assert_eq!(record.hardware_fingerprint.as_ref(), Some(&expected));
    let audit = record.activation_hwids.as_ref().unwrap();
    assert_eq!(audit.fingerprint, expected);
    assert_eq!(Some(audit.timestamp), record.activation_date);

    // The in-memory view follows the commit.
    assert!(v.store().database().find(MONTH_KEY).unwrap().1.is_used());
}

#[test]
fn activation_leaves_other_keys_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());
    let mut v = validator_on(&path, workstation());
    v.activate_key(MONTH_KEY).unwrap();

    let store = LicenseStore::open(&path).unwrap();
    let db = store.database();
    assert!(!db.find(SECOND_MONTH_KEY).unwrap().1.is_used());
    let legacy = db.find(LEGACY_KEY).unwrap().1;
    assert!(legacy.is_legacy());
    assert_eq!(legacy.extra.get("issued_to").unwrap(), "reseller-7");
}

#[test]
fn activating_twice_fails_second_time() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = validator_on(&write_sample(dir.path()), workstation());
    assert!(v.activate_key(MONTH_KEY).unwrap());
    assert!(!v.activate_key(MONTH_KEY).unwrap());
}

#[test]
fn activating_unknown_key_returns_false() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());
    let mut v = validator_on(&path, workstation());
    assert!(!v.activate_key(ABSENT_KEY).unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE_DATABASE);
}

#[test]
fn activation_fails_when_database_vanishes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());
    let mut v = validator_on(&path, workstation());
    std::fs::remove_file(&path).unwrap();
    assert!(v.activate_key(MONTH_KEY).is_err());
}

// ── single use ───────────────────────────────────────────────────

#[test]
fn activated_key_never_validates_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());
    let mut v = validator_on(&path, workstation());
    v.activate_key(MONTH_KEY).unwrap();

    assert_eq!(v.validate_key(MONTH_KEY), Err(ValidationError::AlreadyUsed));

    let elsewhere = validator_on(&path, upgraded_workstation());
    assert_eq!(
        elsewhere.validate_key(MONTH_KEY),
        Err(ValidationError::HardwareMismatch)
    );
    assert!(
        elsewhere
            .validate_key(MONTH_KEY)
            .unwrap_err()
            .is_security_relevant()
    );
}

// ── verify_hardware_lock ─────────────────────────────────────────

#[test]
fn hardware_lock_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());
    let mut v = validator_on(&path, workstation());
    v.activate_key(LIFETIME_KEY).unwrap();

    assert_eq!(v.verify_hardware_lock(LIFETIME_KEY), Ok(()));

    let elsewhere = validator_on(&path, upgraded_workstation());
    assert_eq!(
        elsewhere.verify_hardware_lock(LIFETIME_KEY),
        Err(LockError::HardwareMismatch)
    );
}

#[test]
fn hardware_lock_requires_activation() {
    let dir = tempfile::tempdir().unwrap();
    let v = validator_on(&write_sample(dir.path()), workstation());
    assert_eq!(v.verify_hardware_lock(MONTH_KEY), Err(LockError::NotActivated));
    assert_eq!(v.verify_hardware_lock(LEGACY_KEY), Err(LockError::NotActivated));
    assert_eq!(v.verify_hardware_lock(ABSENT_KEY), Err(LockError::KeyNotFound));
}

// ── lookups ──────────────────────────────────────────────────────

#[test]
fn duration_and_price_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let v = validator_on(&write_sample(dir.path()), workstation());
    assert_eq!(v.duration_days(DurationCode::OneMonth), 30);
    assert_eq!(v.duration_days(DurationCode::Lifetime), 36_500);
    assert_eq!(v.price(DurationCode::OneMonth), Some(Decimal::new(2999, 2)));
    assert_eq!(v.price(DurationCode::Lifetime), Some(Decimal::from(499)));
}

// ── validate_and_activate ────────────────────────────────────────

#[test]
fn composite_success_message() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = validator_on(&write_sample(dir.path()), workstation());
    let summary = v.validate_and_activate(MONTH_KEY).unwrap();
    assert_eq!(summary.duration, DurationCode::OneMonth);
    assert_eq!(summary.days, 30);
    assert_eq!(
        summary.to_string(),
        "License key activated successfully! Duration: 30 days, Price: $29.99"
    );
}

#[test]
fn composite_reports_already_used_then_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());
    let mut v = validator_on(&path, workstation());
    v.validate_and_activate(MONTH_KEY).unwrap();

    assert_eq!(
        v.validate_and_activate(MONTH_KEY).unwrap_err(),
        "Invalid license key: Key has already been used"
    );

    let mut elsewhere = validator_on(&path, upgraded_workstation());
    assert_eq!(
        elsewhere.validate_and_activate(MONTH_KEY).unwrap_err(),
        "Invalid license key: Key is locked to a different system"
    );
}

#[test]
fn composite_reports_format_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = validator_on(&write_sample(dir.path()), workstation());
    assert_eq!(
        v.validate_and_activate("").unwrap_err(),
        "Invalid license key: Invalid key format"
    );
    assert_eq!(
        v.validate_and_activate(UNKNOWN_CODE_KEY).unwrap_err(),
        "Invalid license key: Invalid duration code"
    );
    assert_eq!(
        v.validate_and_activate(ABSENT_KEY).unwrap_err(),
        "Invalid license key: Key not found in database"
    );
}

#[test]
fn composite_messages_never_contain_fingerprints() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());
    let mut v = validator_on(&path, workstation());
    let fingerprint = generator(workstation()).generate_fingerprint();
    let ok = v.validate_and_activate(MONTH_KEY).unwrap().to_string();
    let mut elsewhere = validator_on(&path, upgraded_workstation());
    let err = elsewhere.validate_and_activate(MONTH_KEY).unwrap_err();
    for message in [ok, err] {
        assert!(!message.contains(fingerprint.short()));
    }
}

#[test]
fn lost_activation_race_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());
    let mut first = validator_on(&path, workstation());
    let mut second = validator_on(&path, workstation());

    first.validate_and_activate(MONTH_KEY).unwrap();
    // `second` still sees the key as unused in memory.
    assert_eq!(second.validate_key(MONTH_KEY), Ok(DurationCode::OneMonth));
    assert_eq!(
        second.validate_and_activate(MONTH_KEY).unwrap_err(),
        ACTIVATION_FAILED
    );
}

#[test]
fn stale_handles_do_not_drop_each_others_activations() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());
    let mut first = validator_on(&path, workstation());
    let mut second = validator_on(&path, upgraded_workstation());

    assert!(first.activate_key(MONTH_KEY).unwrap());
    assert!(second.activate_key(SECOND_MONTH_KEY).unwrap());

    let store = LicenseStore::open(&path).unwrap();
    let db = store.database();
    assert!(db.find(MONTH_KEY).unwrap().1.is_used());
    assert!(db.find(SECOND_MONTH_KEY).unwrap().1.is_used());
}

#[test]
fn concurrent_activations_of_distinct_keys_all_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());

    let handles: Vec<_> = [MONTH_KEY, SECOND_MONTH_KEY, LIFETIME_KEY]
        .into_iter()
        .map(|key| {
            let path = path.clone();
            std::thread::spawn(move || {
                let mut v = validator_on(&path, workstation());
                v.validate_and_activate(key).is_ok()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }

    let store = LicenseStore::open(&path).unwrap();
    let counts = store.database().partition_counts();
    let month = counts.iter().find(|c| c.partition == "1_month").unwrap();
    assert_eq!((month.used, month.unused), (2, 0));
    let lifetime = counts.iter().find(|c| c.partition == "lifetime").unwrap();
    assert_eq!(lifetime.used, 1);
}

#[test]
fn concurrent_activations_of_same_key_succeed_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            std::thread::spawn(move || {
                let mut v = validator_on(&path, workstation());
                v.activate_key(MONTH_KEY).unwrap()
            })
        })
        .collect();
    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(wins, 1);
}

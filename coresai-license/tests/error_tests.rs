use coresai_license::{LicenseError, LockError, ProbeError, ValidationError};
use std::path::PathBuf;

#[test]
fn validation_error_display() {
    let cases = [
        (ValidationError::InvalidFormat, "Invalid key format"),
        (ValidationError::InvalidPrefix, "Invalid key prefix"),
        (ValidationError::InvalidStructure, "Invalid key structure"),
        (ValidationError::InvalidDuration, "Invalid duration code"),
        (ValidationError::KeyNotFound, "Key not found in database"),
        (ValidationError::AlreadyUsed, "Key has already been used"),
        (ValidationError::HardwareMismatch, "Key is locked to a different system"),
    ];
    for (err, message) in cases {
        assert_eq!(err.to_string(), message);
    }
}

#[test]
fn validation_error_classification() {
    assert!(ValidationError::HardwareMismatch.is_security_relevant());
    assert!(!ValidationError::AlreadyUsed.is_security_relevant());

    assert!(ValidationError::InvalidFormat.is_format_error());
    assert!(ValidationError::InvalidDuration.is_format_error());
    assert!(!ValidationError::KeyNotFound.is_format_error());
    assert!(!ValidationError::HardwareMismatch.is_format_error());
}

#[test]
fn lock_error_display() {
    assert_eq!(LockError::KeyNotFound.to_string(), "Key not found");
    assert_eq!(LockError::NotActivated.to_string(), "Key not activated");
    assert_eq!(
        LockError::HardwareMismatch.to_string(),
        "Key is locked to a different system"
    );
}

#[test]
fn probe_error_display() {
    let err = ProbeError::Command {
        command: "powershell".to_string(),
        detail: "exit code: 1".to_string(),
    };
    assert_eq!(err.to_string(), "command `powershell` failed: exit code: 1");
    assert_eq!(ProbeError::NotPresent("motherboard").to_string(), "motherboard not present");
    assert_eq!(ProbeError::Unsupported.to_string(), "not supported on this platform");
}

#[test]
fn license_error_display() {
    let err = LicenseError::DatabaseNotFound(PathBuf::from("keys.json"));
    assert_eq!(err.to_string(), "license database not found: keys.json");

    let err = LicenseError::Integrity("duplicate key in partition 1_month".to_string());
    assert_eq!(
        err.to_string(),
        "license database integrity error: duplicate key in partition 1_month"
    );

    let err = LicenseError::Config("bad".to_string());
    assert_eq!(err.to_string(), "configuration error: bad");
}

#[test]
fn license_error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: LicenseError = io.into();
    assert!(matches!(err, LicenseError::Io(_)));
    assert!(err.to_string().contains("denied"));
}

#[test]
fn license_error_from_json() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: LicenseError = json_err.into();
    assert!(matches!(err, LicenseError::Serialization(_)));
}

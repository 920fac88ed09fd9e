//! License key format and the duration table.
//!
//! Keys use the format: `CoresAi-{CODE}-{SEG}-{SEG}-{SEG}-{SEG}`
//!
//! - `CODE` is a duration code (`1M`, `3M`, `6M`, `12M`, `LT`)
//! - each `SEG` is an opaque alphanumeric block
//!
//! No checksum is carried; a well-formed key still has to exist in the
//! license database.

use crate::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Product prefix every key starts with.
pub const KEY_PREFIX: &str = "CoresAi";

/// Number of dash-separated segments in a key.
pub const KEY_SEGMENTS: usize = 6;

/// Days granted by a lifetime key (100 years).
pub const LIFETIME_DAYS: u32 = 36_500;

/// A license duration tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DurationCode {
    OneMonth,
    ThreeMonths,
    SixMonths,
    TwelveMonths,
    Lifetime,
}

/// code, database partition, days
static DURATION_TABLE: [(DurationCode, &str, &str, u32); 5] = [
    (DurationCode::OneMonth, "1M", "1_month", 30),
    (DurationCode::ThreeMonths, "3M", "3_months", 90),
    (DurationCode::SixMonths, "6M", "6_months", 180),
    (DurationCode::TwelveMonths, "12M", "12_months", 365),
    (DurationCode::Lifetime, "LT", "lifetime", LIFETIME_DAYS),
];

impl DurationCode {
    /// All duration codes, shortest first.
    pub const ALL: [DurationCode; 5] = [
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::TwelveMonths,
        Self::Lifetime,
    ];

    fn row(&self) -> &'static (DurationCode, &'static str, &'static str, u32) {
        // The table lists every variant in declaration order.
        &DURATION_TABLE[*self as usize]
    }

    /// Looks up a code such as `"12M"`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        DURATION_TABLE
            .iter()
            .find(|(_, c, _, _)| *c == code)
            .map(|(d, _, _, _)| *d)
    }

    /// Looks up a database partition name such as `"12_months"`.
    #[must_use]
    pub fn from_partition(partition: &str) -> Option<Self> {
        DURATION_TABLE
            .iter()
            .find(|(_, _, p, _)| *p == partition)
            .map(|(d, _, _, _)| *d)
    }

    /// The short code embedded in keys.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.row().1
    }

    /// The database partition holding keys of this duration.
    #[must_use]
    pub fn partition(&self) -> &'static str {
        self.row().2
    }

    /// License length in days.
    #[must_use]
    pub fn days(&self) -> u32 {
        self.row().3
    }
}

impl fmt::Display for DurationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DurationCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or(ValidationError::InvalidDuration)
    }
}

impl Serialize for DurationCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for DurationCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Self::from_code(&code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown duration code: {code}")))
    }
}

/// A key that passed format checks. Says nothing about whether the key
/// exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedKey<'a> {
    raw: &'a str,
    duration: DurationCode,
}

impl<'a> ParsedKey<'a> {
    /// Checks a key string against the format rules.
    ///
    /// `allowed_durations` is the database's list of accepted codes; a code
    /// must be both allowed there and known to the duration table.
    ///
    /// # Errors
    ///
    /// Returns the first rule the key breaks, in this order: empty,
    /// prefix, segment structure, duration.
    pub fn parse<S: AsRef<str>>(
        key: &'a str,
        allowed_durations: &[S],
    ) -> Result<Self, ValidationError> {
        if key.is_empty() {
            return Err(ValidationError::InvalidFormat);
        }

        if !key
            .strip_prefix(KEY_PREFIX)
            .is_some_and(|rest| rest.starts_with('-'))
        {
            return Err(ValidationError::InvalidPrefix);
        }

        let segments: Vec<&str> = key.split('-').collect();
        if segments.len() != KEY_SEGMENTS {
            return Err(ValidationError::InvalidStructure);
        }
        if !segments[2..].iter().all(|s| is_block(s)) {
            return Err(ValidationError::InvalidStructure);
        }

        let code = segments[1];
        if !allowed_durations.iter().any(|a| a.as_ref() == code) {
            return Err(ValidationError::InvalidDuration);
        }
        let duration = DurationCode::from_code(code).ok_or(ValidationError::InvalidDuration)?;

        Ok(Self { raw: key, duration })
    }

    /// Returns the key string.
    #[must_use]
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Returns the duration encoded in the key.
    #[must_use]
    pub fn duration(&self) -> DurationCode {
        self.duration
    }
}

fn is_block(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Masks the random blocks of a key for logging: `CoresAi-1M-X7K9-****`.
#[must_use]
pub fn redact(key: &str) -> String {
    let mut parts = key.splitn(4, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(prefix), Some(code), Some(first)) if parts.next().is_some() => {
            format!("{prefix}-{code}-{first}-****")
        }
        _ => "****".to_string(),
    }
}

//! Naming convention: `<prefix><digits><unit>` where unit is `s`, `m` or `h`.
//!
//! Parsing is a grammar check, not substring arithmetic:
//! 1. exact, case-sensitive prefix match (no match = not a candidate)
//! 2. the final character must be a known unit
//! 3. everything between prefix and unit must be a non-empty run of ASCII digits
//! 4. `digits * unit` must fit in a `u64` of seconds

#![allow(missing_docs)]

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Unit suffix of a self-destruct duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    /// Map a unit token to a unit. Only lowercase `s`, `m`, `h` are accepted.
    pub const fn from_token(token: char) -> Option<Self> {
        match token {
            's' => Some(Self::Seconds),
            'm' => Some(Self::Minutes),
            'h' => Some(Self::Hours),
            _ => None,
        }
    }

    pub const fn token(self) -> char {
        match self {
            Self::Seconds => 's',
            Self::Minutes => 'm',
            Self::Hours => 'h',
        }
    }

    /// Seconds per unit.
    pub const fn multiplier(self) -> u64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3_600,
        }
    }
}

/// A name that passed the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParsedName {
    /// The digit run as written.
    pub amount: u64,
    pub unit: TimeUnit,
    /// `amount * unit.multiplier()`.
    pub duration_secs: u64,
}

impl ParsedName {
    pub const fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Why a prefixed name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NameRejection {
    /// Nothing after the prefix.
    MissingDuration,
    /// Final character is not one of `s`, `m`, `h`.
    UnknownUnit { found: char },
    /// No digits between prefix and unit.
    MissingDigits,
    /// Something other than ASCII digits between prefix and unit.
    NonDigit { found: char },
    /// The duration does not fit in seconds.
    Overflow,
    /// The on-disk name is not valid UTF-8.
    NotUtf8,
}

impl fmt::Display for NameRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDuration => f.write_str("no duration after prefix"),
            Self::UnknownUnit { found } => write!(f, "unknown unit {found:?} (expected s, m or h)"),
            Self::MissingDigits => f.write_str("no digits before unit"),
            Self::NonDigit { found } => write!(f, "unexpected character {found:?} in duration"),
            Self::Overflow => f.write_str("duration too large"),
            Self::NotUtf8 => f.write_str("name is not valid UTF-8"),
        }
    }
}

/// Result of matching one name against the convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// Name does not start with the prefix. Ignored silently.
    NotCandidate,
    Valid(ParsedName),
    Invalid(NameRejection),
}

/// The reserved prefix plus the duration grammar that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConvention {
    prefix: String,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self::new("temp")
    }
}

impl NamingConvention {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `name` starts with the prefix.
    pub fn is_candidate(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }

    /// Match a name against the convention.
    pub fn parse(&self, name: &str) -> NameMatch {
        let Some(rest) = name.strip_prefix(self.prefix.as_str()) else {
            return NameMatch::NotCandidate;
        };
        match parse_duration_token(rest) {
            Ok(parsed) => NameMatch::Valid(parsed),
            Err(rejection) => NameMatch::Invalid(rejection),
        }
    }

    /// Match a raw on-disk name. Non-UTF-8 names are candidates only if their
    /// lossy rendering carries the prefix, and are then always invalid.
    pub fn parse_os(&self, name: &std::ffi::OsStr) -> NameMatch {
        match name.to_str() {
            Some(utf8) => self.parse(utf8),
            None if self.is_candidate(&name.to_string_lossy()) => {
                NameMatch::Invalid(NameRejection::NotUtf8)
            }
            None => NameMatch::NotCandidate,
        }
    }
}

/// Parse the `<digits><unit>` token that follows the prefix.
pub fn parse_duration_token(token: &str) -> Result<ParsedName, NameRejection> {
    let mut chars = token.chars();
    let Some(unit_char) = chars.next_back() else {
        return Err(NameRejection::MissingDuration);
    };
    let unit = TimeUnit::from_token(unit_char)
        .ok_or(NameRejection::UnknownUnit { found: unit_char })?;

    let digits = chars.as_str();
    if digits.is_empty() {
        return Err(NameRejection::MissingDigits);
    }
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_digit()) {
        return Err(NameRejection::NonDigit { found: bad });
    }

    // All ASCII digits, so the only possible parse failure is overflow.
    let amount: u64 = digits.parse().map_err(|_| NameRejection::Overflow)?;
    let duration_secs = amount
        .checked_mul(unit.multiplier())
        .ok_or(NameRejection::Overflow)?;

    Ok(ParsedName {
        amount,
        unit,
        duration_secs,
    })
}

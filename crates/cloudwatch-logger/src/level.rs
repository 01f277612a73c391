// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Severity levels for shipped log records.
//!
//! Levels are ordered by their numeric value, and the numeric values are part
//! of the wire contract shared with other producers writing to the same log
//! groups:
//!
//! | Level     | Value |
//! |-----------|-------|
//! | DEBUG     | 100   |
//! | INFO      | 200   |
//! | NOTICE    | 250   |
//! | WARNING   | 300   |
//! | ERROR     | 400   |
//! | CRITICAL  | 500   |
//! | ALERT     | 550   |
//! | EMERGENCY | 600   |
//!
//! # Configuration
//!
//! The minimum level can be given by name (case-insensitive) or by numeric
//! value, e.g. `CWL_LOG_LEVEL=warning` or `CWL_LOG_LEVEL=300`.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Severity of a log record.
///
/// # Parsing
///
/// ```
/// use cloudwatch_logger::Level;
/// use std::str::FromStr;
///
/// assert_eq!(Level::from_str("warning").unwrap(), Level::Warning);
/// assert_eq!(Level::from_str("EMERGENCY").unwrap(), Level::Emergency);
/// assert_eq!(Level::from_str("250").unwrap(), Level::Notice);
/// assert!(Level::from_str("verbose").is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u16)]
pub enum Level {
    Debug = 100,
    #[default]
    Info = 200,
    Notice = 250,
    Warning = 300,
    Error = 400,
    Critical = 500,
    Alert = 550,
    Emergency = 600,
}

/// Every level in ascending order.
const LEVELS: [Level; 8] = [
    Level::Debug,
    Level::Info,
    Level::Notice,
    Level::Warning,
    Level::Error,
    Level::Critical,
    Level::Alert,
    Level::Emergency,
];

impl Level {
    /// Upper-case name written into the `log_level` context field and the
    /// message prefix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Alert => "ALERT",
            Level::Emergency => "EMERGENCY",
        }
    }

    /// Numeric wire value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self as u16
    }

    /// Looks a level up by its exact numeric value.
    #[must_use]
    pub fn from_value(value: u16) -> Option<Level> {
        LEVELS.into_iter().find(|level| level.value() == value)
    }

    /// All levels, lowest severity first.
    pub fn all() -> impl Iterator<Item = Level> {
        LEVELS.into_iter()
    }
}

impl AsRef<str> for Level {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(value) = trimmed.parse::<u16>() {
            return Level::from_value(value)
                .ok_or_else(|| format!("Invalid log level value: {value}"));
        }

        let upper = trimmed.to_uppercase();
        LEVELS
            .into_iter()
            .find(|level| level.name() == upper)
            .ok_or_else(|| {
                format!(
                    "Invalid log level: '{s}'. Valid levels are: debug, info, notice, warning, error, critical, alert, emergency",
                )
            })
    }
}

/// Accepts a name (case-insensitive) or a numeric value.
impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Level::from_str(&s).map_err(D::Error::custom),
            Value::Number(n) => n
                .as_u64()
                .and_then(|v| u16::try_from(v).ok())
                .and_then(Level::from_value)
                .ok_or_else(|| D::Error::custom(format!("Invalid log level value: {n}"))),
            other => Err(D::Error::custom(format!(
                "Expected a string or number for log level, got {other}"
            ))),
        }
    }
}

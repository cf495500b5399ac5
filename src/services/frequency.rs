// src/services/frequency.rs

//! Update frequency parsing.
//!
//! Frequencies are compact `<number><unit>` strings such as `12h`, `5m` or
//! `30s`. Only the first `(\d+)(\w+)` match is significant; text after it is
//! ignored, so `"12h every day"` reads as twelve hours.

use std::fmt;
use std::sync::LazyLock;

use chrono::TimeDelta;
use regex::Regex;
use serde::Serialize;

use crate::error::{AppError, Result};

static FREQUENCY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(\w+)").expect("frequency regex should compile"));

/// Unit of an update frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyUnit {
    Hours,
    Minutes,
    Seconds,
}

impl FrequencyUnit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "h" => Some(Self::Hours),
            "m" => Some(Self::Minutes),
            "s" => Some(Self::Seconds),
            _ => None,
        }
    }

    fn seconds(&self) -> i64 {
        match self {
            Self::Hours => 3600,
            Self::Minutes => 60,
            Self::Seconds => 1,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Self::Hours => "h",
            Self::Minutes => "m",
            Self::Seconds => "s",
        }
    }
}

/// A parsed update frequency.
///
/// The amount is always positive. Any `u32` count of hours, minutes or
/// seconds fits in a [`TimeDelta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParsedFrequency {
    amount: u32,
    unit: FrequencyUnit,
}

impl ParsedFrequency {
    /// Parse a frequency string.
    pub fn parse(value: &str) -> Result<Self> {
        let caps = FREQUENCY_PATTERN
            .captures(value)
            .ok_or_else(|| AppError::invalid_frequency(value))?;

        let amount: u32 = caps[1]
            .parse()
            .map_err(|_| AppError::invalid_frequency(value))?;
        let unit =
            FrequencyUnit::from_suffix(&caps[2]).ok_or_else(|| AppError::invalid_frequency(value))?;

        Self::new(amount, unit).ok_or_else(|| AppError::invalid_frequency(value))
    }

    /// Build a frequency, rejecting a zero amount.
    pub fn new(amount: u32, unit: FrequencyUnit) -> Option<Self> {
        (amount > 0).then_some(Self { amount, unit })
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    /// Parse an optional frequency; absence is a format error, never a default.
    pub fn parse_opt(value: Option<&str>) -> Result<Self> {
        match value {
            Some(v) => Self::parse(v),
            None => Err(AppError::invalid_frequency("")),
        }
    }

    /// The elapsed time this frequency represents.
    pub fn duration(&self) -> TimeDelta {
        let seconds = i64::from(self.amount) * self.unit.seconds();
        TimeDelta::seconds(seconds)
    }
}

impl fmt::Display for ParsedFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

/// Parse a frequency string.
pub fn parse(value: &str) -> Result<ParsedFrequency> {
    ParsedFrequency::parse(value)
}

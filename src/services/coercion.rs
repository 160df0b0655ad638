//! Conversions from raw report cells to typed values.
//!
//! Row-level malformed data never aborts an import: a cell that cannot be
//! converted is logged and treated as absent.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::ImportError;

const ISO_DATE: &str = "%Y-%m-%d";
const SCAN_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%.3f";
const SLASH_FOUR_DIGIT_YEAR: &str = "%m/%d/%Y";
const SLASH_TWO_DIGIT_YEAR: &str = "%m/%d/%y";

/// Date layout used by a report's date columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateConvention {
    /// `yyyy-MM-dd`.
    Iso,
    /// `yyyy-MM-dd HH:mm:ss.SSS`, optionally wrapped in double quotes.
    QuotedTimestamp,
    /// `M/d/yyyy` or `M/d/yy`, chosen by the digits after the last `/`.
    SlashInferred,
}

impl DateConvention {
    /// Parse an already-trimmed, non-empty value.
    fn parse(self, value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        match self {
            Self::Iso => NaiveDate::parse_from_str(value, ISO_DATE).map(midnight),
            Self::QuotedTimestamp => {
                NaiveDateTime::parse_from_str(strip_quotes(value), SCAN_TIMESTAMP)
            }
            Self::SlashInferred => {
                NaiveDate::parse_from_str(value, infer_slash_pattern(value)).map(midnight)
            }
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Iso => "iso",
            Self::QuotedTimestamp => "quoted_timestamp",
            Self::SlashInferred => "slash_inferred",
        }
    }

    fn expected_layout(self) -> &'static str {
        match self {
            Self::Iso => "yyyy-MM-dd",
            Self::QuotedTimestamp => "yyyy-MM-dd HH:mm:ss.SSS",
            Self::SlashInferred => "M/d/yy or M/d/yyyy",
        }
    }
}

impl std::fmt::Display for DateConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DateConvention {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "iso" => Ok(Self::Iso),
            "quoted_timestamp" => Ok(Self::QuotedTimestamp),
            "slash_inferred" => Ok(Self::SlashInferred),
            other => Err(ImportError::Config(format!(
                "unknown date convention '{other}' (expected iso, quoted_timestamp or slash_inferred)"
            ))),
        }
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Four-digit year when more than two characters follow the last `/`.
fn infer_slash_pattern(value: &str) -> &'static str {
    let tail = match value.rfind('/') {
        Some(pos) => &value[pos + 1..],
        None => value,
    };
    if tail.len() > 2 {
        SLASH_FOUR_DIGIT_YEAR
    } else {
        SLASH_TWO_DIGIT_YEAR
    }
}

/// Remove every space character. Identity normalization only.
pub fn clean_name(name: Option<&str>) -> Option<String> {
    name.map(|n| n.replace(' ', ""))
}

/// Convert a date cell. Empty input and unparseable input both yield `None`.
pub fn parse_date(raw: Option<&str>, convention: DateConvention) -> Option<NaiveDate> {
    parse_timestamp(raw, convention).map(|dt| dt.date())
}

/// Convert a date or timestamp cell, keeping the time of day.
pub fn parse_timestamp(raw: Option<&str>, convention: DateConvention) -> Option<NaiveDateTime> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    match convention.parse(trimmed) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                value = %trimmed,
                convention = %convention,
                error = %e,
                "Date value cannot be parsed and will be ignored; expected {}",
                convention.expected_layout()
            );
            None
        }
    }
}

/// Convert a decimal cell. Empty, `N/A` and non-numeric input yield `None`.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "N/A" {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        Ok(value) => {
            tracing::warn!(value = %trimmed, parsed = value, "Decimal value is not finite and will be ignored");
            None
        }
        Err(e) => {
            tracing::warn!(value = %trimmed, error = %e, "Decimal value cannot be parsed and will be ignored");
            None
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::payment::Item;

/// Date parsing error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("malformed date: {0:?}")]
    Malformed(String),

    #[error("invalid calendar date: {0:?}")]
    Invalid(String),

    #[error("unknown timezone: {0:?}")]
    UnknownTimezone(String),
}

/// How ambiguous `A/B/YYYY` dates are read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
pub enum DateLocale {
    /// Month first: `10/6/2025` is October 6
    #[default]
    Us,
    /// Day first: `6/10/2025` is October 6
    Eu,
}

impl fmt::Display for DateLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateLocale::Us => f.write_str("US"),
            DateLocale::Eu => f.write_str("EU"),
        }
    }
}

impl FromStr for DateLocale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(DateLocale::Us),
            "EU" => Ok(DateLocale::Eu),
            other => Err(format!("unknown date locale: {other}")),
        }
    }
}

/// A text block that did not yield an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Issue {
    pub id: String,
    /// First 100 characters of the block with PII redacted
    pub snippet: String,
    pub reason: String,
}

/// Output of one extraction batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ExtractionResult {
    pub items: Vec<Item>,
    pub issues: Vec<Issue>,
    pub duplicates_removed: u32,
    pub date_locale: DateLocale,
    /// Indices into `items` whose due date looks like a typo or fraud signal
    #[serde(default)]
    pub suspicious_items: Vec<usize>,
}

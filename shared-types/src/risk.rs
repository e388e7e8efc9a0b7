use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// Kinds of schedule risk the detector reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskType {
    Collision,
    CashCrunch,
    WeekendAutopay,
}

impl fmt::Display for RiskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskType::Collision => "COLLISION",
            RiskType::CashCrunch => "CASH_CRUNCH",
            RiskType::WeekendAutopay => "WEEKEND_AUTOPAY",
        };
        f.write_str(label)
    }
}

impl FromStr for RiskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "COLLISION" => Ok(RiskType::Collision),
            "CASH_CRUNCH" => Ok(RiskType::CashCrunch),
            "WEEKEND_AUTOPAY" => Ok(RiskType::WeekendAutopay),
            other => Err(format!("unknown risk type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => f.write_str("low"),
            Severity::Medium => f.write_str("medium"),
            Severity::High => f.write_str("high"),
        }
    }
}

/// A detected schedule risk
///
/// `affected_items` indexes into the item slice the detector was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Risk {
    #[serde(rename = "type")]
    pub risk_type: RiskType,
    pub severity: Severity,
    pub date: String,
    pub message: String,
    pub affected_items: Vec<usize>,
    /// Window total, only for CASH_CRUNCH
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub amount: Option<Decimal>,
}

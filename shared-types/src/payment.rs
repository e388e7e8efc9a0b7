use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

fn default_installment_no() -> u32 {
    1
}

/// One BNPL installment, normalized from a provider notification.
///
/// `due_date` is an ISO `YYYY-MM-DD` string. The shift fields are only set by
/// the business-day shifter; after shifting, `due_date` holds the shifted date
/// and `original_due_date` the provider's date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Item {
    pub provider: String,
    #[serde(default = "default_installment_no")]
    pub installment_no: u32,
    pub due_date: String,
    #[ts(type = "string")]
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub autopay: bool,
    #[serde(default)]
    #[ts(type = "string")]
    pub late_fee: Decimal,
    pub confidence: f64,

    // Set by the business-day shifter
    #[serde(default)]
    pub was_shifted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub original_due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub shifted_due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub shift_reason: Option<ShiftReason>,
}

impl Item {
    /// Build an item that did not come out of the extractor (imports, tests).
    /// Such items are treated as fully trusted.
    pub fn new(provider: impl Into<String>, due_date: impl Into<String>, amount: Decimal) -> Self {
        Self {
            provider: provider.into(),
            installment_no: 1,
            due_date: due_date.into(),
            amount,
            currency: "USD".to_string(),
            autopay: false,
            late_fee: Decimal::ZERO,
            confidence: 1.0,
            was_shifted: false,
            original_due_date: None,
            shifted_due_date: None,
            shift_reason: None,
        }
    }

    pub fn with_installment(mut self, installment_no: u32) -> Self {
        self.installment_no = installment_no;
        self
    }

    pub fn with_autopay(mut self, autopay: bool) -> Self {
        self.autopay = autopay;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_late_fee(mut self, late_fee: Decimal) -> Self {
        self.late_fee = late_fee;
        self
    }

    /// Date the provider originally scheduled, regardless of shifting
    pub fn provider_due_date(&self) -> &str {
        self.original_due_date.as_deref().unwrap_or(&self.due_date)
    }
}

/// Why a due date was moved off a non-business day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftReason {
    Weekend,
    Holiday,
    Custom,
}

impl fmt::Display for ShiftReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShiftReason::Weekend => "WEEKEND",
            ShiftReason::Holiday => "HOLIDAY",
            ShiftReason::Custom => "CUSTOM",
        };
        f.write_str(label)
    }
}

/// Audit record for an item whose due date was shifted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct MovedDate {
    pub provider: String,
    pub installment_no: u32,
    pub original_due_date: String,
    pub shifted_due_date: String,
    pub reason: ShiftReason,
}

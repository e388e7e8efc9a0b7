use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared_types::{DateError, DateLocale, Item};

use crate::date_parser::{date_candidate_re, DateParser};
use crate::providers::{extract_late_fee, preceding, PaymentProvider, ProviderRegistry};

/// Text blocks are cut to this many bytes before any pattern runs
pub const MAX_TEXT_BYTES: usize = 64 * 1024;

pub const PROVIDER_WEIGHT: f64 = 0.35;
pub const DATE_WEIGHT: f64 = 0.25;
pub const AMOUNT_WEIGHT: f64 = 0.20;
pub const INSTALLMENT_WEIGHT: f64 = 0.15;
pub const AUTOPAY_WEIGHT: f64 = 0.05;

/// Words that mark a date as the due date rather than an order or sent date
const DUE_CONTEXT: [&str; 7] = [
    "due",
    "scheduled",
    "charge",
    "collect",
    "deduct",
    "payment date",
    "will be paid",
];

/// Why a text block produced no item
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("provider not recognized")]
    ProviderNotRecognized,

    #[error("amount not found in {0} notification")]
    MissingAmount(&'static str),

    #[error("due date not found in {0} notification")]
    MissingDueDate(&'static str),

    #[error(transparent)]
    Date(#[from] DateError),
}

/// Which fields were matched in a notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldMatches {
    pub provider: bool,
    pub due_date: bool,
    pub amount: bool,
    pub installment: bool,
    pub autopay: bool,
}

impl FieldMatches {
    /// Weighted confidence; zero without a provider
    pub fn confidence(&self) -> f64 {
        if !self.provider {
            return 0.0;
        }

        let mut score = PROVIDER_WEIGHT;
        if self.due_date {
            score += DATE_WEIGHT;
        }
        if self.amount {
            score += AMOUNT_WEIGHT;
        }
        if self.installment {
            score += INSTALLMENT_WEIGHT;
        }
        if self.autopay {
            score += AUTOPAY_WEIGHT;
        }

        (score * 100.0).round() / 100.0
    }
}

/// Turns one notification into at most one `Item`
pub struct FieldExtractor {
    registry: ProviderRegistry,
    parser: DateParser,
}

impl FieldExtractor {
    pub fn new(tz: &str) -> Result<Self, DateError> {
        Ok(Self {
            registry: ProviderRegistry::default(),
            parser: DateParser::new(tz)?,
        })
    }

    pub fn with_locale(mut self, locale: DateLocale) -> Self {
        self.parser = self.parser.with_locale(locale);
        self
    }

    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn parser(&self) -> &DateParser {
        &self.parser
    }

    pub fn extract(&self, text: &str) -> Result<(Item, f64), FieldError> {
        let text = clamp_input(text);

        let provider = self
            .registry
            .identify(text)
            .ok_or(FieldError::ProviderNotRecognized)?;

        let due_date = self
            .find_due_date(text)
            .ok_or(FieldError::MissingDueDate(provider.name()))??;

        let money = provider
            .extract_amount(text)
            .ok_or(FieldError::MissingAmount(provider.name()))?;

        let installment = provider.match_installment(text);
        let autopay = provider.autopay_state(text);
        let late_fee = extract_late_fee(text)
            .map(|fee| fee.amount)
            .unwrap_or(Decimal::ZERO);

        let confidence = FieldMatches {
            provider: true,
            due_date: true,
            amount: true,
            installment: installment.is_some(),
            autopay: autopay.is_some(),
        }
        .confidence();

        let item = Item {
            provider: provider.name().to_string(),
            installment_no: installment.unwrap_or(1),
            due_date: due_date.format("%Y-%m-%d").to_string(),
            amount: money.amount,
            currency: money.currency.to_string(),
            autopay: autopay.unwrap_or(false),
            late_fee,
            confidence,
            was_shifted: false,
            original_due_date: None,
            shifted_due_date: None,
            shift_reason: None,
        };

        tracing::debug!(
            provider = %provider,
            installment_no = item.installment_no,
            due_date = %item.due_date,
            confidence,
            "extracted installment"
        );

        Ok((item, confidence))
    }

    /// Parse the date nearest a due-date phrase, or the first date in the text
    fn find_due_date(&self, text: &str) -> Option<Result<NaiveDate, DateError>> {
        let candidates: Vec<_> = date_candidate_re().find_iter(text).collect();

        let chosen = candidates
            .iter()
            .find(|m| {
                let before = preceding(text, m.start(), 40).to_lowercase();
                DUE_CONTEXT.iter().any(|word| before.contains(word))
            })
            .or_else(|| candidates.first())?;

        Some(self.parser.parse(chosen.as_str()))
    }
}

/// Cut `text` to `MAX_TEXT_BYTES` on a char boundary
pub fn clamp_input(text: &str) -> &str {
    if text.len() <= MAX_TEXT_BYTES {
        return text;
    }

    let mut end = MAX_TEXT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

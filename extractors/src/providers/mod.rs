//! BNPL provider registry.
//!
//! Each provider owns a pattern table (see `patterns`) and answers the same
//! four questions about a notification: is it mine, how much, which
//! installment, and is autopay on. Selection is an ordered first-match scan.

mod patterns;

use regex::Captures;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use patterns::{
    any_money_re, autopay_off_res, autopay_on_res, common_amount_res, installment_of_re,
    installment_slash_re, labelled_installment_re, late_fee_re, patterns_for,
};

/// Plans longer than this are treated as a misread
pub const MAX_INSTALLMENTS: u32 = 48;

/// Preceding words that mark an amount as something other than the installment
const NON_INSTALLMENT_CONTEXT: [&str; 4] = ["fee", "order", "purchase", "total of"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Klarna,
    Affirm,
    Afterpay,
    PayPal,
    Zip,
    Sezzle,
}

impl Provider {
    /// Detection order; the first provider that matches wins
    pub const ALL: [Provider; 6] = [
        Provider::Klarna,
        Provider::Affirm,
        Provider::Afterpay,
        Provider::PayPal,
        Provider::Zip,
        Provider::Sezzle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Klarna => "Klarna",
            Provider::Affirm => "Affirm",
            Provider::Afterpay => "Afterpay",
            Provider::PayPal => "PayPal",
            Provider::Zip => "Zip",
            Provider::Sezzle => "Sezzle",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An amount with the currency it was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Money {
    pub amount: Decimal,
    pub currency: &'static str,
}

/// The extraction capabilities every provider supplies
pub trait PaymentProvider {
    fn detect(&self, text: &str) -> bool;

    /// Installment amount, if one can be found
    fn extract_amount(&self, text: &str) -> Option<Money>;

    /// Installment number when an "X of Y" or "X/Y" marker is present and sane
    fn match_installment(&self, text: &str) -> Option<u32>;

    /// `Some(true)`/`Some(false)` only for an explicit autopay statement
    fn autopay_state(&self, text: &str) -> Option<bool>;

    /// Installment number, defaulting to 1
    fn extract_installment(&self, text: &str) -> u32 {
        self.match_installment(text).unwrap_or(1)
    }

    fn detect_autopay(&self, text: &str) -> bool {
        self.autopay_state(text).unwrap_or(false)
    }
}

impl PaymentProvider for Provider {
    fn detect(&self, text: &str) -> bool {
        patterns_for(*self).detect.is_match(text)
    }

    fn extract_amount(&self, text: &str) -> Option<Money> {
        let table = patterns_for(*self);

        for re in table.amount.iter().chain(common_amount_res()) {
            if let Some(money) = re.captures_iter(text).find_map(|caps| parse_money(&caps)) {
                return Some(money);
            }
        }

        // Fall back to the first explicitly marked amount that is not a fee or order total
        any_money_re()
            .captures_iter(text)
            .filter(|caps| caps.name("symbol").is_some() || caps.name("code").is_some())
            .filter(|caps| {
                let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
                let before = clause_before(text, start).to_lowercase();
                !NON_INSTALLMENT_CONTEXT.iter().any(|word| before.contains(word))
            })
            .find_map(|caps| parse_money(&caps))
    }

    fn match_installment(&self, text: &str) -> Option<u32> {
        [labelled_installment_re(), installment_of_re(), installment_slash_re()]
            .into_iter()
            .find_map(|re| {
                re.captures_iter(text).find_map(|caps| {
                    let no = caps.name("no")?.as_str().parse::<u32>().ok()?;
                    let total = caps.name("total")?.as_str().parse::<u32>().ok()?;
                    valid_installment(no, total).then_some(no)
                })
            })
    }

    fn autopay_state(&self, text: &str) -> Option<bool> {
        if autopay_off_res().iter().any(|re| re.is_match(text)) {
            return Some(false);
        }

        // A charge that is about a fee says nothing about autopay
        let table = patterns_for(*self);
        if autopay_on_res()
            .iter()
            .chain(&table.autopay_on)
            .flat_map(|re| re.find_iter(text))
            .any(|m| !clause_after(text, m.start()).to_lowercase().contains("fee"))
        {
            return Some(true);
        }

        None
    }
}

/// Late fee mentioned anywhere in the notification
pub fn extract_late_fee(text: &str) -> Option<Money> {
    late_fee_re()
        .captures_iter(text)
        .find_map(|caps| parse_money(&caps))
}

fn valid_installment(no: u32, total: u32) -> bool {
    no >= 1 && total >= 1 && no <= total && total <= MAX_INSTALLMENTS
}

fn parse_money(caps: &Captures) -> Option<Money> {
    let raw = caps
        .name("value")
        .or_else(|| caps.name("bare"))?
        .as_str()
        .replace(',', "");
    let amount = Decimal::from_str(&raw).ok()?;
    if amount < Decimal::new(1, 2) {
        return None;
    }

    let currency = caps
        .name("code")
        .map(|m| currency_from_code(m.as_str()))
        .or_else(|| caps.name("symbol").map(|m| currency_from_symbol(m.as_str())))
        .unwrap_or("USD");

    Some(Money { amount, currency })
}

fn currency_from_symbol(symbol: &str) -> &'static str {
    match symbol.to_ascii_uppercase().as_str() {
        "A$" | "AU$" => "AUD",
        "C$" | "CA$" => "CAD",
        "NZ$" => "NZD",
        "€" => "EUR",
        "£" => "GBP",
        _ => "USD",
    }
}

fn currency_from_code(code: &str) -> &'static str {
    match code.to_ascii_uppercase().as_str() {
        "EUR" => "EUR",
        "GBP" => "GBP",
        "AUD" => "AUD",
        "CAD" => "CAD",
        "NZD" => "NZD",
        _ => "USD",
    }
}

/// Up to `max_chars` characters ending at byte offset `end`
pub(crate) fn preceding(text: &str, end: usize, max_chars: usize) -> &str {
    let head = &text[..end];
    let start = head
        .char_indices()
        .rev()
        .nth(max_chars.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    &head[start..]
}

/// Up to 24 chars before `end`, cut back to the current clause
fn clause_before(text: &str, end: usize) -> &str {
    let before = preceding(text, end, 24);
    match before.rfind(|c: char| matches!(c, ',' | ';' | '.')) {
        Some(i) => &before[i + 1..],
        None => before,
    }
}

/// Text from `start` to the end of its sentence or clause
fn clause_after(text: &str, start: usize) -> &str {
    let rest = &text[start..];
    let end = rest
        .char_indices()
        .find(|&(i, c)| {
            matches!(c, ';' | '!' | '?')
                || (c == '.' && rest[i + 1..].starts_with(char::is_whitespace))
        })
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Ordered set of providers consulted during extraction
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Provider>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    /// First provider whose detector matches
    pub fn identify(&self, text: &str) -> Option<Provider> {
        self.providers.iter().copied().find(|p| p.detect(text))
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(Provider::ALL.to_vec())
    }
}

//! RFC 5545 calendar export.
//!
//! One all-day `VEVENT` per item. Text values are escaped per §3.3.11 and
//! content lines are folded at 75 octets per §3.1. No `VALARM` components
//! are emitted.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use shared_types::{Item, Risk};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{parse_date, resolve_timezone};

const PRODID: &str = "-//payplan//BNPL schedule//EN";
const DEFAULT_CALENDAR_NAME: &str = "BNPL payments";
const MAX_LINE_OCTETS: usize = 75;
const CRLF: &str = "\r\n";

pub struct IcsEncoder {
    tz: Tz,
    calendar_name: String,
    dtstamp: DateTime<Utc>,
}

impl IcsEncoder {
    /// Encoder stamped with the current UTC time. Unknown zones fall back to UTC.
    pub fn new(tz: &str) -> Self {
        Self {
            tz: resolve_timezone(tz),
            calendar_name: DEFAULT_CALENDAR_NAME.to_string(),
            dtstamp: Utc::now(),
        }
    }

    /// Fix `DTSTAMP`, making output byte-for-byte reproducible
    pub fn with_dtstamp(mut self, dtstamp: DateTime<Utc>) -> Self {
        self.dtstamp = dtstamp;
        self
    }

    pub fn with_calendar_name(mut self, name: impl Into<String>) -> Self {
        self.calendar_name = name.into();
        self
    }

    /// Encode items as a calendar. Each risk is annotated on the events
    /// listed in its `affected_items`.
    pub fn encode(&self, items: &[Item], risks: &[Risk]) -> Vec<u8> {
        let mut annotations: HashMap<usize, Vec<&Risk>> = HashMap::new();
        for risk in risks {
            for &idx in &risk.affected_items {
                annotations.entry(idx).or_default().push(risk);
            }
        }

        let mut out = String::new();
        push_line(&mut out, "BEGIN:VCALENDAR");
        push_line(&mut out, &format!("PRODID:{}", PRODID));
        push_line(&mut out, "VERSION:2.0");
        push_line(&mut out, "CALSCALE:GREGORIAN");
        push_line(&mut out, "METHOD:PUBLISH");
        push_line(&mut out, &format!("X-WR-CALNAME:{}", escape_text(&self.calendar_name)));
        push_line(&mut out, &format!("X-WR-TIMEZONE:{}", self.tz.name()));

        let mut written = 0;
        for (idx, item) in items.iter().enumerate() {
            let item_risks = annotations.get(&idx).map(Vec::as_slice).unwrap_or(&[]);
            if self.push_event(&mut out, item, item_risks) {
                written += 1;
            }
        }

        push_line(&mut out, "END:VCALENDAR");

        tracing::debug!(events = written, bytes = out.len(), "Encoded calendar");
        out.into_bytes()
    }

    /// Same calendar as [`IcsEncoder::encode`], base64 wrapped
    pub fn encode_base64(&self, items: &[Item], risks: &[Risk]) -> String {
        general_purpose::STANDARD.encode(self.encode(items, risks))
    }

    fn push_event(&self, out: &mut String, item: &Item, risks: &[&Risk]) -> bool {
        let Some(start) = parse_date(&item.due_date) else {
            tracing::warn!(
                provider = %item.provider,
                due_date = %item.due_date,
                "Skipping calendar event with invalid due date"
            );
            return false;
        };
        let end = start + Duration::days(1);

        push_line(out, "BEGIN:VEVENT");
        push_line(out, &format!("UID:{}", event_uid(item)));
        push_line(out, &format!("DTSTAMP:{}", self.dtstamp.format("%Y%m%dT%H%M%SZ")));
        push_line(out, &format!("DTSTART;VALUE=DATE:{}", start.format("%Y%m%d")));
        push_line(out, &format!("DTEND;VALUE=DATE:{}", end.format("%Y%m%d")));
        push_line(out, &format!("SUMMARY:{}", escape_text(&summary(item))));
        push_line(out, &format!("DESCRIPTION:{}", description(item, risks)));
        push_line(out, "CATEGORIES:BNPL");
        push_line(out, "TRANSP:TRANSPARENT");
        push_line(out, "END:VEVENT");
        true
    }
}

/// Encode items without risk annotations, stamped with the current time
pub fn generate_ics(items: &[Item], tz: &str) -> Vec<u8> {
    IcsEncoder::new(tz).encode(items, &[])
}

pub fn generate_ics_base64(items: &[Item], tz: &str) -> String {
    IcsEncoder::new(tz).encode_base64(items, &[])
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(&fold_line(line));
    out.push_str(CRLF);
}

fn summary(item: &Item) -> String {
    let mut summary = format!(
        "{} installment {}: {}",
        item.provider,
        item.installment_no,
        format_money(item.amount, &item.currency)
    );
    if item.was_shifted {
        summary.push_str(" (shifted)");
    }
    summary
}

/// Escaped description; each logical line is joined with a literal `\n`
fn description(item: &Item, risks: &[&Risk]) -> String {
    let mut lines = vec![format!("Due: {}", item.due_date)];
    if item.was_shifted {
        let reason = item
            .shift_reason
            .map(|r| format!(" ({})", r))
            .unwrap_or_default();
        lines.push(format!("Originally due: {}{}", item.provider_due_date(), reason));
    }
    lines.push(format!("Installment: {}", item.installment_no));
    lines.push(format!("Autopay: {}", if item.autopay { "ON" } else { "OFF" }));
    lines.push(format!("Late fee: {}", format_money(item.late_fee, &item.currency)));
    for risk in risks {
        lines.push(format!("Risk ({}) {}: {}", risk.severity, risk.risk_type, risk.message));
    }

    lines
        .iter()
        .map(|line| escape_text(line))
        .collect::<Vec<_>>()
        .join("\\n")
}

/// Stable across runs and across business-day shifts
fn event_uid(item: &Item) -> String {
    let key = format!(
        "{}|{}|{}|{}",
        item.provider,
        item.installment_no,
        item.provider_due_date(),
        item.amount.normalize()
    );
    format!("{}@payplan", Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
}

fn format_money(amount: Decimal, currency: &str) -> String {
    let mut value = amount.round_dp(2);
    value.rescale(2);
    match currency {
        "USD" => format!("${}", value),
        "EUR" => format!("€{}", value),
        "GBP" => format!("£{}", value),
        "AUD" => format!("A${}", value),
        "CAD" => format!("C${}", value),
        "NZD" => format!("NZ${}", value),
        other => format!("{} {}", value, other),
    }
}

/// Escape a TEXT value: backslash, semicolon, comma and newlines
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                escaped.push_str("\\n");
            }
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Inverse of [`escape_text`]; `\n` and `\N` both become a newline
pub fn unescape_text(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => unescaped.push('\n'),
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

/// Fold a content line into physical lines of at most 75 octets.
///
/// Continuations start with a single space, which counts toward the limit.
/// Splits never fall inside a multi-byte character. The result has no
/// trailing CRLF.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut folded = String::with_capacity(line.len() + line.len() / 64 * 3);
    let mut rest = line;
    let mut limit = MAX_LINE_OCTETS;

    while rest.len() > limit {
        let mut split = limit;
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        folded.push_str(&rest[..split]);
        folded.push_str(CRLF);
        folded.push(' ');
        rest = &rest[split..];
        limit = MAX_LINE_OCTETS - 1;
    }
    folded.push_str(rest);
    folded
}

/// Split calendar text into logical content lines, joining folded continuations
pub fn unfold_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for physical in text.split('\n') {
        let physical = physical.strip_suffix('\r').unwrap_or(physical);
        match physical.chars().next() {
            Some(' ') | Some('\t') if !lines.is_empty() => {
                if let Some(last) = lines.last_mut() {
                    last.push_str(&physical[1..]);
                }
            }
            _ if physical.is_empty() => {}
            _ => lines.push(physical.to_string()),
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared_types::{RiskType, Severity, ShiftReason};

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap()
    }

    fn encode(items: &[Item], risks: &[Risk]) -> String {
        let bytes = IcsEncoder::new("America/New_York")
            .with_dtstamp(stamp())
            .encode(items, risks);
        String::from_utf8(bytes).unwrap()
    }

    fn property<'a>(lines: &'a [String], name: &str) -> Vec<&'a str> {
        lines
            .iter()
            .filter_map(|l| l.strip_prefix(name))
            .collect()
    }

    #[test]
    fn test_escape_and_unescape() {
        let raw = "a,b;c\\d\ne";
        let escaped = escape_text(raw);
        assert_eq!(escaped, "a\\,b\\;c\\\\d\\ne");
        assert_eq!(unescape_text(&escaped), raw);
    }

    #[test]
    fn test_fold_line_limits_octets() {
        let line = format!("DESCRIPTION:{}", "x".repeat(200));
        let folded = fold_line(&line);
        for physical in folded.split("\r\n") {
            assert!(physical.len() <= 75);
        }
        assert_eq!(unfold_lines(&folded), vec![line]);
    }

    #[test]
    fn test_fold_line_respects_char_boundaries() {
        let line = format!("SUMMARY:{}", "€".repeat(60));
        let folded = fold_line(&line);
        for physical in folded.split("\r\n") {
            assert!(physical.len() <= 75);
        }
        assert_eq!(unfold_lines(&folded), vec![line]);
    }

    #[test]
    fn test_short_line_is_not_folded() {
        assert_eq!(fold_line("VERSION:2.0"), "VERSION:2.0");
    }

    #[test]
    fn test_calendar_structure() {
        let items = vec![Item::new("Klarna", "2025-10-06", Decimal::new(2500, 2))];
        let ics = encode(&items, &[]);

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert!(!ics.contains("VALARM"));

        let lines = unfold_lines(&ics);
        assert_eq!(property(&lines, "DTSTAMP:"), vec!["20251001T120000Z"]);
        assert_eq!(property(&lines, "DTSTART;VALUE=DATE:"), vec!["20251006"]);
        assert_eq!(property(&lines, "DTEND;VALUE=DATE:"), vec!["20251007"]);
        assert_eq!(
            property(&lines, "SUMMARY:"),
            vec!["Klarna installment 1: $25.00"]
        );
        assert_eq!(property(&lines, "X-WR-TIMEZONE:"), vec!["America/New_York"]);
    }

    #[test]
    fn test_timezone_cannot_inject_lines() {
        let items = vec![Item::new("Klarna", "2025-10-06", Decimal::new(2500, 2))];
        let bytes = IcsEncoder::new("UTC\r\nBEGIN:VALARM\r\nACTION:DISPLAY\r\nEND:VALARM")
            .with_dtstamp(stamp())
            .encode(&items, &[]);
        let ics = String::from_utf8(bytes).unwrap();

        assert!(!ics.contains("VALARM"));
        assert!(!ics.contains("ACTION:DISPLAY"));
        let lines = unfold_lines(&ics);
        assert_eq!(property(&lines, "X-WR-TIMEZONE:"), vec!["UTC"]);
    }

    #[test]
    fn test_shifted_item_summary_and_description() {
        let mut item = Item::new("Affirm", "2025-10-06", Decimal::new(5000, 2))
            .with_autopay(true)
            .with_late_fee(Decimal::new(7, 0))
            .with_installment(2);
        item.was_shifted = true;
        item.original_due_date = Some("2025-10-04".to_string());
        item.shifted_due_date = Some("2025-10-06".to_string());
        item.shift_reason = Some(ShiftReason::Weekend);

        let risk = Risk {
            risk_type: RiskType::Collision,
            severity: Severity::Medium,
            date: "2025-10-06".to_string(),
            message: "2 payments due on Monday, 2025-10-06".to_string(),
            affected_items: vec![0],
            amount: None,
        };

        let lines = unfold_lines(&encode(&[item], &[risk]));
        let summary = property(&lines, "SUMMARY:")[0];
        assert_eq!(summary, "Affirm installment 2: $50.00 (shifted)");

        let description = unescape_text(property(&lines, "DESCRIPTION:")[0]);
        let described: Vec<&str> = description.lines().collect();
        assert_eq!(
            described,
            vec![
                "Due: 2025-10-06",
                "Originally due: 2025-10-04 (WEEKEND)",
                "Installment: 2",
                "Autopay: ON",
                "Late fee: $7.00",
                "Risk (medium) COLLISION: 2 payments due on Monday, 2025-10-06",
            ]
        );
    }

    #[test]
    fn test_uid_is_stable_across_shifts() {
        let original = Item::new("Zip", "2025-10-04", Decimal::new(1000, 2));
        let mut shifted = original.clone();
        shifted.due_date = "2025-10-06".to_string();
        shifted.was_shifted = true;
        shifted.original_due_date = Some("2025-10-04".to_string());

        assert_eq!(event_uid(&original), event_uid(&shifted));
        assert_ne!(
            event_uid(&original),
            event_uid(&original.clone().with_installment(2))
        );
    }

    #[test]
    fn test_invalid_items_are_skipped() {
        let items = vec![
            Item::new("Zip", "2025-02-30", Decimal::new(1000, 2)),
            Item::new("Zip", "2025-03-02", Decimal::new(1000, 2)),
        ];
        let ics = encode(&items, &[]);
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
    }

    #[test]
    fn test_base64_matches_raw() {
        let items = vec![Item::new("Sezzle", "2025-10-06", Decimal::new(3333, 2))];
        let encoder = IcsEncoder::new("UTC").with_dtstamp(stamp());
        let raw = encoder.encode(&items, &[]);
        let wrapped = encoder.encode_base64(&items, &[]);
        assert_eq!(general_purpose::STANDARD.decode(wrapped).unwrap(), raw);
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(format_money(Decimal::new(125, 0), "GBP"), "£125.00");
        assert_eq!(format_money(Decimal::new(4999, 2), "EUR"), "€49.99");
        assert_eq!(format_money(Decimal::new(10, 0), "JPY"), "10.00 JPY");
    }
}

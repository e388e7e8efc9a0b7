use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared_types::{DateLocale, ExtractionResult, Issue, Item};
use std::collections::HashSet;

use crate::date_parser::{is_suspicious, slash_date_re};
use crate::extractor::{clamp_input, FieldExtractor};
use crate::redact::redact_snippet;

/// Caller-supplied knobs for one extraction batch
#[derive(Debug, Clone, Default)]
pub struct ExtractionOptions {
    /// Slash-date ordering; detected from the batch when unset
    pub date_locale: Option<DateLocale>,
    /// Reference time for suspicious-date flagging; skipped when unset
    pub now: Option<DateTime<Utc>>,
}

/// Run the field extractor over a batch of notifications.
///
/// One bad block never aborts the batch: it becomes an `Issue` and the rest
/// are still extracted. Identical items are collapsed, keeping first-seen order.
pub fn extract_items<S: AsRef<str>>(
    texts: &[S],
    tz: &str,
    opts: &ExtractionOptions,
) -> ExtractionResult {
    let date_locale = opts
        .date_locale
        .unwrap_or_else(|| detect_locale(texts.iter().map(|t| t.as_ref())));

    let extractor = match FieldExtractor::new(tz) {
        Ok(extractor) => extractor.with_locale(date_locale),
        Err(err) => {
            tracing::warn!(%err, "cannot extract batch");
            let issues = texts
                .iter()
                .enumerate()
                .map(|(index, text)| issue(index, text.as_ref(), err.to_string()))
                .collect();
            return ExtractionResult {
                items: Vec::new(),
                issues,
                duplicates_removed: 0,
                date_locale,
                suspicious_items: Vec::new(),
            };
        }
    };

    let mut items = Vec::new();
    let mut issues = Vec::new();

    for (index, text) in texts.iter().enumerate() {
        match extractor.extract(text.as_ref()) {
            Ok((item, _)) => items.push(item),
            Err(err) => {
                let issue = issue(index, text.as_ref(), err.to_string());
                tracing::warn!(id = %issue.id, reason = %issue.reason, snippet = %issue.snippet, "no item extracted");
                issues.push(issue);
            }
        }
    }

    let (items, duplicates_removed) = dedupe_items(items);

    let suspicious_items = match opts.now {
        Some(now) => {
            let tz = extractor.parser().timezone();
            items
                .iter()
                .enumerate()
                .filter(|(_, item)| {
                    NaiveDate::parse_from_str(&item.due_date, "%Y-%m-%d")
                        .map(|date| is_suspicious(date, tz, now))
                        .unwrap_or(false)
                })
                .map(|(index, item)| {
                    tracing::warn!(provider = %item.provider, due_date = %item.due_date, "suspicious due date");
                    index
                })
                .collect()
        }
        None => Vec::new(),
    };

    tracing::info!(
        items = items.len(),
        issues = issues.len(),
        duplicates_removed,
        date_locale = %date_locale,
        "extraction batch complete"
    );

    ExtractionResult {
        items,
        issues,
        duplicates_removed,
        date_locale,
        suspicious_items,
    }
}

/// Collapse items identical on provider, installment, due date and amount
pub fn dedupe_items(items: Vec<Item>) -> (Vec<Item>, u32) {
    let mut seen: HashSet<(String, u32, String, Decimal)> = HashSet::new();
    let mut kept = Vec::with_capacity(items.len());
    let mut removed = 0u32;

    for item in items {
        let key = (
            item.provider.clone(),
            item.installment_no,
            item.due_date.clone(),
            item.amount.normalize(),
        );
        if seen.insert(key) {
            kept.push(item);
        } else {
            removed += 1;
        }
    }

    (kept, removed)
}

/// `EU` when any slash date has a first component above 12, otherwise `US`
pub fn detect_locale<'a>(texts: impl IntoIterator<Item = &'a str>) -> DateLocale {
    for text in texts {
        for caps in slash_date_re().captures_iter(clamp_input(text)) {
            let first: u32 = caps[1].parse().unwrap_or(0);
            if first > 12 {
                return DateLocale::Eu;
            }
        }
    }
    DateLocale::Us
}

fn issue(index: usize, text: &str, reason: String) -> Issue {
    Issue {
        id: format!("issue-{}", index + 1),
        snippet: redact_snippet(clamp_input(text)),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const NY: &str = "America/New_York";

    fn email(provider: &str, amount: &str, due: &str, installment: u32) -> String {
        format!("{provider}: payment {installment} of 4. A payment of ${amount} is due {due}.")
    }

    #[test]
    fn test_same_email_twice_is_deduplicated() {
        let text = email("Klarna", "25.00", "10/6/2025", 1);
        let result = extract_items(&[text.clone(), text], NY, &ExtractionOptions::default());

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.duplicates_removed, 1);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_dedup_keeps_first_seen_order_and_distinct_items() {
        let texts = vec![
            email("Klarna", "25.00", "10/6/2025", 1),
            email("Affirm", "40.00", "10/2/2025", 1),
            email("Klarna", "25", "October 6, 2025", 1),
            email("Klarna", "25.00", "10/6/2025", 2),
        ];
        let result = extract_items(&texts, NY, &ExtractionOptions::default());

        let providers: Vec<_> = result.items.iter().map(|i| i.provider.as_str()).collect();
        assert_eq!(providers, vec!["Klarna", "Affirm", "Klarna"]);
        assert_eq!(result.items[2].installment_no, 2);
        assert_eq!(result.duplicates_removed, 1);
    }

    #[test]
    fn test_bad_block_does_not_abort_batch() {
        let texts = vec![
            "Your gym membership renews soon. Contact bob@example.com".to_string(),
            email("Sezzle", "12.50", "2025-11-01", 3),
            "Afterpay: payment of $10.00 is due 2/30/2025".to_string(),
        ];
        let result = extract_items(&texts, NY, &ExtractionOptions::default());

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].provider, "Sezzle");
        assert_eq!(result.issues.len(), 2);

        assert_eq!(result.issues[0].id, "issue-1");
        assert_eq!(result.issues[0].reason, "provider not recognized");
        assert!(result.issues[0].snippet.contains("[email]"));
        assert!(!result.issues[0].snippet.contains("bob@"));

        assert_eq!(result.issues[1].id, "issue-3");
        assert!(result.issues[1].reason.starts_with("invalid calendar date"));
    }

    #[test]
    fn test_unknown_timezone_turns_every_block_into_an_issue() {
        let texts = vec![email("Klarna", "25.00", "10/6/2025", 1)];
        let result = extract_items(&texts, "Nowhere/City", &ExtractionOptions::default());

        assert!(result.items.is_empty());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].reason, "unknown timezone: \"Nowhere/City\"");
    }

    #[test]
    fn test_locale_detection() {
        assert_eq!(detect_locale(["due 10/6/2025", "due 10/12/2025"]), DateLocale::Us);
        assert_eq!(detect_locale(["due 10/6/2025", "due 25/12/2025"]), DateLocale::Eu);

        let texts = vec![
            email("Klarna", "25.00", "25/10/2025", 1),
            email("Klarna", "25.00", "6/11/2025", 2),
        ];
        let result = extract_items(&texts, "Europe/Paris", &ExtractionOptions::default());
        assert_eq!(result.date_locale, DateLocale::Eu);
        assert_eq!(result.items[0].due_date, "2025-10-25");
        assert_eq!(result.items[1].due_date, "2025-11-06");
    }

    #[test]
    fn test_explicit_locale_overrides_detection() {
        let texts = vec![email("Klarna", "25.00", "6/11/2025", 1)];
        let opts = ExtractionOptions {
            date_locale: Some(DateLocale::Eu),
            now: None,
        };
        let result = extract_items(&texts, NY, &opts);
        assert_eq!(result.date_locale, DateLocale::Eu);
        assert_eq!(result.items[0].due_date, "2025-11-06");
    }

    #[test]
    fn test_suspicious_dates_are_flagged_not_dropped() {
        let texts = vec![
            email("Klarna", "25.00", "10/6/2025", 1),
            email("Affirm", "40.00", "10/6/2031", 1),
        ];
        let opts = ExtractionOptions {
            date_locale: None,
            now: Some(Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap()),
        };
        let result = extract_items(&texts, NY, &opts);

        assert_eq!(result.items.len(), 2);
        assert_eq!(result.suspicious_items, vec![1]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let texts = vec![
            email("Klarna", "25.00", "10/6/2025", 1),
            "nothing useful".to_string(),
        ];
        let first = extract_items(&texts, NY, &ExtractionOptions::default());
        let second = extract_items(&texts, NY, &ExtractionOptions::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_provider_name_as_header() {
        let texts = vec![email("Zip", "10.00", "10/6/2025", 1)];
        let result = extract_items(&texts, NY, &ExtractionOptions::default());
        assert!(result.issues.is_empty());
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].provider, "Zip");
        assert_eq!(result.items[0].amount, Decimal::new(1000, 2));
    }
}

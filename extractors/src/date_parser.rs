//! Strict date parsing anchored to an IANA timezone.
//!
//! Accepts ISO (`2025-10-06`), slash (`10/6/2025`, day-first under the EU
//! locale), long and short month names (`October 6, 2025`, `Oct 6th, 2025`),
//! day-first names (`6 October 2025`) and RFC 3339 timestamps. Every parse is
//! rebuilt from its components so impossible dates are rejected instead of
//! rolled into the next month.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use shared_types::{DateError, DateLocale};
use std::sync::OnceLock;

/// Further out than this is probably a typo
pub const SUSPICIOUS_FUTURE_DAYS: i64 = 730;
/// Older than this is probably stale or fraudulent
pub const SUSPICIOUS_PAST_DAYS: i64 = 30;

const MONTH_NAMES: &str = concat!(
    r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?",
    r"|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?",
);

fn ordinal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("invalid ordinal regex"))
}

fn weekday_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)^(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday",
            r"|mon|tues|tue|wed|thurs|thur|thu|fri|sat|sun)\.?,?\s+",
        ))
        .expect("invalid weekday regex")
    })
}

fn iso_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("invalid iso regex"))
}

fn timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(\d{4}-\d{2}-\d{2})[t ](\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?)(z|[+-]\d{2}:?\d{2})?$")
            .expect("invalid timestamp regex")
    })
}

fn slash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("invalid slash regex"))
}

fn month_first_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^([a-z]+)\.?\s+(\d{1,2}),?\s+(\d{4})$").expect("invalid month-first regex")
    })
}

fn day_first_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(\d{1,2})\s+([a-z]+)\.?,?\s+(\d{4})$").expect("invalid day-first regex")
    })
}

/// Dates embedded in free text, in any accepted form
pub fn date_candidate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let source = format!(
            concat!(
                r"(?i)\b(?:\d{{4}}-\d{{1,2}}-\d{{1,2}}(?:[t ]\d{{2}}:\d{{2}}(?::\d{{2}}(?:\.\d+)?)?(?:z|[+-]\d{{2}}:?\d{{2}})?)?",
                r"|\d{{1,2}}/\d{{1,2}}/\d{{4}}",
                r"|(?:{months})\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}",
                r"|\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{months})\.?,?\s+\d{{4}})\b",
            ),
            months = MONTH_NAMES
        );
        Regex::new(&source).expect("invalid date candidate regex")
    })
}

/// Slash dates in free text, used for locale detection
pub fn slash_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/\d{4}\b").expect("invalid slash date regex"))
}

pub fn parse_timezone(tz: &str) -> Result<Tz, DateError> {
    tz.trim()
        .parse::<Tz>()
        .map_err(|_| DateError::UnknownTimezone(tz.to_string()))
}

/// Parse `text` under `tz` with US slash ordering, returning `YYYY-MM-DD`
pub fn parse(text: &str, tz: &str) -> Result<String, DateError> {
    let parser = DateParser::new(tz)?;
    parser.parse_iso(text)
}

/// True when `date` is more than two years ahead of, or a month behind, `now`
/// as seen from `tz`
pub fn is_suspicious(date: NaiveDate, tz: Tz, now: DateTime<Utc>) -> bool {
    let today = now.with_timezone(&tz).date_naive();
    let delta = (date - today).num_days();
    delta > SUSPICIOUS_FUTURE_DAYS || delta < -SUSPICIOUS_PAST_DAYS
}

#[derive(Debug, Clone, Copy)]
pub struct DateParser {
    tz: Tz,
    locale: DateLocale,
}

impl DateParser {
    pub fn new(tz: &str) -> Result<Self, DateError> {
        Ok(Self {
            tz: parse_timezone(tz)?,
            locale: DateLocale::Us,
        })
    }

    pub fn with_locale(mut self, locale: DateLocale) -> Self {
        self.locale = locale;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn locale(&self) -> DateLocale {
        self.locale
    }

    pub fn parse_iso(&self, text: &str) -> Result<String, DateError> {
        self.parse(text).map(|d| d.format("%Y-%m-%d").to_string())
    }

    pub fn parse(&self, text: &str) -> Result<NaiveDate, DateError> {
        let cleaned = normalize(text);
        if cleaned.is_empty() {
            return Err(DateError::Malformed(text.to_string()));
        }

        if let Some(caps) = timestamp_re().captures(&cleaned) {
            return self.parse_timestamp(&caps[1], &caps[2], caps.get(3).map(|m| m.as_str()), text);
        }

        if let Some(caps) = iso_re().captures(&cleaned) {
            let (year, month, day) = (number(&caps[1], text)?, number(&caps[2], text)?, number(&caps[3], text)?);
            return reconstruct(year as i32, month, day, text);
        }

        if let Some(caps) = slash_re().captures(&cleaned) {
            let (first, second, year) = (number(&caps[1], text)?, number(&caps[2], text)?, number(&caps[3], text)?);
            let (month, day) = match self.locale {
                DateLocale::Us => (first, second),
                DateLocale::Eu => (second, first),
            };
            return reconstruct(year as i32, month, day, text);
        }

        if let Some(caps) = month_first_re().captures(&cleaned) {
            let month = month_number(&caps[1]).ok_or_else(|| DateError::Malformed(text.to_string()))?;
            let (day, year) = (number(&caps[2], text)?, number(&caps[3], text)?);
            return reconstruct(year as i32, month, day, text);
        }

        if let Some(caps) = day_first_re().captures(&cleaned) {
            let month = month_number(&caps[2]).ok_or_else(|| DateError::Malformed(text.to_string()))?;
            let (day, year) = (number(&caps[1], text)?, number(&caps[3], text)?);
            return reconstruct(year as i32, month, day, text);
        }

        Err(DateError::Malformed(text.to_string()))
    }

    fn parse_timestamp(
        &self,
        date: &str,
        time: &str,
        offset: Option<&str>,
        raw: &str,
    ) -> Result<NaiveDate, DateError> {
        match offset {
            Some(offset) => {
                let offset = if offset.eq_ignore_ascii_case("z") {
                    "+00:00".to_string()
                } else if offset.len() == 5 {
                    format!("{}:{}", &offset[..3], &offset[3..])
                } else {
                    offset.to_string()
                };
                let time = if time.len() == 5 { format!("{time}:00") } else { time.to_string() };
                let stamp = format!("{date}T{time}{offset}");
                let parsed = DateTime::parse_from_rfc3339(&stamp)
                    .map_err(|_| DateError::Invalid(raw.to_string()))?;
                Ok(parsed.with_timezone(&self.tz).date_naive())
            }
            None => {
                // Wall-clock time in the target zone; the calendar date is what it says,
                // even when the time falls in a DST gap
                let format = if time.len() == 5 { "%Y-%m-%d %H:%M" } else { "%Y-%m-%d %H:%M:%S%.f" };
                NaiveDateTime::parse_from_str(&format!("{date} {time}"), format)
                    .map(|dt| dt.date())
                    .map_err(|_| DateError::Invalid(raw.to_string()))
            }
        }
    }
}

/// Trim, collapse whitespace, drop trailing punctuation, ordinal suffixes and a
/// leading weekday name
fn normalize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_end_matches(['.', ',', ';', ':']);
    let without_weekday = weekday_prefix_re().replace(trimmed, "");
    ordinal_re().replace_all(&without_weekday, "$1").into_owned()
}

fn number(digits: &str, raw: &str) -> Result<u32, DateError> {
    digits
        .parse::<u32>()
        .map_err(|_| DateError::Malformed(raw.to_string()))
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_ascii_lowercase().as_str() {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// Build the date and confirm it still has the components it was built from
fn reconstruct(year: i32, month: u32, day: u32, raw: &str) -> Result<NaiveDate, DateError> {
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DateError::Invalid(raw.to_string()))?;

    if date.year() != year || date.month() != month || date.day() != day {
        return Err(DateError::Invalid(raw.to_string()));
    }

    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const NY: &str = "America/New_York";

    #[test]
    fn test_equivalent_forms() {
        let expected = "2025-10-06";
        assert_eq!(parse("2025-10-06", NY).unwrap(), expected);
        assert_eq!(parse("10/6/2025", NY).unwrap(), expected);
        assert_eq!(parse("October 6, 2025", NY).unwrap(), expected);
        assert_eq!(parse("Oct 6th, 2025", NY).unwrap(), expected);
        assert_eq!(parse("Oct. 6 2025", NY).unwrap(), expected);
        assert_eq!(parse("6 October 2025", NY).unwrap(), expected);
        assert_eq!(parse("Monday, October 6, 2025.", NY).unwrap(), expected);
    }

    #[test]
    fn test_ordinal_suffixes() {
        assert_eq!(parse("Nov 21st, 2025", NY).unwrap(), "2025-11-21");
        assert_eq!(parse("March 2nd, 2026", NY).unwrap(), "2026-03-02");
        assert_eq!(parse("Sept 3rd, 2025", NY).unwrap(), "2025-09-03");
    }

    #[test]
    fn test_reconstruction_rejects_impossible_dates() {
        assert!(matches!(parse("2025-02-30", NY), Err(DateError::Invalid(_))));
        assert!(matches!(parse("2/29/2025", NY), Err(DateError::Invalid(_))));
        assert!(matches!(parse("April 31, 2025", NY), Err(DateError::Invalid(_))));
        assert!(matches!(parse("2025-13-01", NY), Err(DateError::Invalid(_))));
        assert!(matches!(parse("2025-00-10", NY), Err(DateError::Invalid(_))));
        assert!(matches!(parse("1/32/2025", NY), Err(DateError::Invalid(_))));
    }

    #[test]
    fn test_leap_years() {
        assert_eq!(parse("2/29/2024", NY).unwrap(), "2024-02-29");
        assert_eq!(parse("2000-02-29", NY).unwrap(), "2000-02-29");
        assert!(matches!(parse("1900-02-29", NY), Err(DateError::Invalid(_))));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(parse("", NY), Err(DateError::Malformed(_))));
        assert!(matches!(parse("   ", NY), Err(DateError::Malformed(_))));
        assert!(matches!(parse("next Tuesday", NY), Err(DateError::Malformed(_))));
        assert!(matches!(parse("Smarch 3, 2025", NY), Err(DateError::Malformed(_))));
        assert!(matches!(parse("2025/10/06", NY), Err(DateError::Malformed(_))));
    }

    #[test]
    fn test_unknown_timezone() {
        assert!(matches!(
            parse("2025-10-06", "Mars/Olympus_Mons"),
            Err(DateError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn test_eu_locale_reads_day_first() {
        let parser = DateParser::new("Europe/Berlin").unwrap().with_locale(DateLocale::Eu);
        assert_eq!(parser.parse_iso("6/10/2025").unwrap(), "2025-10-06");
        assert!(matches!(parser.parse("10/13/2025"), Err(DateError::Invalid(_))));
    }

    #[test]
    fn test_timestamps_convert_into_timezone() {
        // 02:00 UTC is still the previous evening in New York
        assert_eq!(parse("2025-10-07T02:00:00Z", NY).unwrap(), "2025-10-06");
        assert_eq!(parse("2025-10-07T02:00:00Z", "UTC").unwrap(), "2025-10-07");
        assert_eq!(parse("2025-10-06T23:30:00+0000", "Asia/Tokyo").unwrap(), "2025-10-07");
    }

    #[test]
    fn test_dst_transition_days() {
        // Spring forward: 2025-03-09 02:00 local does not exist
        assert_eq!(parse("2025-03-09T07:30:00Z", NY).unwrap(), "2025-03-09");
        assert_eq!(parse("2025-03-09T02:30", NY).unwrap(), "2025-03-09");
        assert_eq!(parse("March 9, 2025", NY).unwrap(), "2025-03-09");
        // Fall back: 01:30 local happens twice
        assert_eq!(parse("2025-11-02T05:30:00Z", NY).unwrap(), "2025-11-02");
        assert_eq!(parse("2025-11-02T06:30:00Z", NY).unwrap(), "2025-11-02");
        assert_eq!(parse("11/2/2025", NY).unwrap(), "2025-11-02");
    }

    #[test]
    fn test_is_suspicious_window() {
        let tz: Tz = NY.parse().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 10, 1, 16, 0, 0).unwrap();
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();

        assert!(!is_suspicious(date("2025-10-15"), tz, now));
        assert!(!is_suspicious(date("2025-09-01"), tz, now));
        assert!(is_suspicious(date("2025-08-31"), tz, now));
        assert!(!is_suspicious(date("2027-10-01"), tz, now));
        assert!(is_suspicious(date("2027-10-02"), tz, now));
    }

    #[test]
    fn test_date_candidates_in_text() {
        let text = "Order 10/1/2025. Your payment is due Oct 6th, 2025 (ref 2025-10-06T12:00:00Z)";
        let found: Vec<&str> = date_candidate_re().find_iter(text).map(|m| m.as_str()).collect();
        assert_eq!(found, vec!["10/1/2025", "Oct 6th, 2025", "2025-10-06T12:00:00Z"]);
    }
}

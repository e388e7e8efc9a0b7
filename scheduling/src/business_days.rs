use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use shared_types::{Item, MovedDate, ShiftReason};
use std::collections::HashSet;

use crate::holidays::{is_weekend, Country, HolidayCalendar};
use crate::{parse_date, resolve_timezone};

/// Longest forward walk before an item is left where it is
pub const MAX_SHIFT_DAYS: i64 = 31;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDayConfig {
    pub country: Country,
    /// ISO dates treated as non-business days on top of holidays
    #[serde(default)]
    pub custom_skip_dates: Vec<String>,
    pub business_day_mode: bool,
}

impl Default for BusinessDayConfig {
    fn default() -> Self {
        Self {
            country: Country::Us,
            custom_skip_dates: Vec::new(),
            business_day_mode: true,
        }
    }
}

/// Moves due dates forward to the next business day
#[derive(Debug, Clone)]
pub struct BusinessDayShifter {
    enabled: bool,
    holidays: HolidayCalendar,
    skip_dates: HashSet<NaiveDate>,
}

impl BusinessDayShifter {
    pub fn new(config: &BusinessDayConfig) -> Self {
        let skip_dates = config
            .custom_skip_dates
            .iter()
            .filter_map(|raw| {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    tracing::warn!(date = %raw, "Ignoring invalid custom skip date");
                }
                parsed
            })
            .collect();

        Self {
            enabled: config.business_day_mode,
            holidays: HolidayCalendar::new(config.country),
            skip_dates,
        }
    }

    /// Why `date` is not a business day, checked weekend, holiday, custom
    pub fn blocking_reason(&mut self, date: NaiveDate) -> Option<ShiftReason> {
        if is_weekend(date) {
            Some(ShiftReason::Weekend)
        } else if self.holidays.is_holiday(date) {
            Some(ShiftReason::Holiday)
        } else if self.skip_dates.contains(&date) {
            Some(ShiftReason::Custom)
        } else {
            None
        }
    }

    pub fn is_business_day(&mut self, date: NaiveDate) -> bool {
        self.blocking_reason(date).is_none()
    }

    /// First business day on or after `date`, with the reason `date` was blocked.
    ///
    /// Returns `None` when `date` already is a business day or no business day
    /// exists within `MAX_SHIFT_DAYS`.
    pub fn next_business_day(&mut self, date: NaiveDate) -> Option<(NaiveDate, ShiftReason)> {
        let reason = self.blocking_reason(date)?;

        let mut candidate = date;
        for _ in 0..MAX_SHIFT_DAYS {
            candidate += Duration::days(1);
            if self.is_business_day(candidate) {
                return Some((candidate, reason));
            }
        }

        tracing::warn!(date = %date, "No business day within {} days", MAX_SHIFT_DAYS);
        None
    }

    /// Shift one item, returning the audit record when it moved
    pub fn shift_item(&mut self, item: &Item) -> (Item, Option<MovedDate>) {
        let mut shifted = item.clone();
        if !self.enabled {
            return (shifted, None);
        }

        let Some(due) = parse_date(&item.due_date) else {
            tracing::warn!(
                provider = %item.provider,
                due_date = %item.due_date,
                "Leaving item with invalid due date unshifted"
            );
            shifted.was_shifted = false;
            return (shifted, None);
        };

        let Some((target, reason)) = self.next_business_day(due) else {
            return (shifted, None);
        };

        let original = item.provider_due_date().to_string();
        let target = target.format("%Y-%m-%d").to_string();

        tracing::debug!(
            provider = %item.provider,
            installment = item.installment_no,
            from = %item.due_date,
            to = %target,
            reason = %reason,
            "Shifted due date"
        );

        shifted.due_date = target.clone();
        shifted.was_shifted = true;
        shifted.original_due_date = Some(original.clone());
        shifted.shifted_due_date = Some(target.clone());
        shifted.shift_reason = Some(reason);

        let moved = MovedDate {
            provider: item.provider.clone(),
            installment_no: item.installment_no,
            original_due_date: original,
            shifted_due_date: target,
            reason,
        };

        (shifted, Some(moved))
    }
}

/// Shift every item off weekends, holidays and custom skip dates.
///
/// Items keep their input order so risk indices line up; the moved-date audit
/// trail is sorted by shifted date.
pub fn shift_to_business_days(
    items: &[Item],
    tz: &str,
    config: &BusinessDayConfig,
) -> (Vec<Item>, Vec<MovedDate>) {
    // Dates are calendar dates; the zone is only validated
    resolve_timezone(tz);

    let mut shifter = BusinessDayShifter::new(config);
    let mut shifted = Vec::with_capacity(items.len());
    let mut moved = Vec::new();

    for item in items {
        let (item, record) = shifter.shift_item(item);
        shifted.push(item);
        moved.extend(record);
    }

    moved.sort_by(|a, b| a.shifted_due_date.cmp(&b.shifted_due_date));

    tracing::info!(
        items = shifted.len(),
        moved = moved.len(),
        country = %config.country,
        "Business-day shift complete"
    );

    (shifted, moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const TZ: &str = "America/New_York";

    fn item(due: &str) -> Item {
        Item::new("Klarna", due, Decimal::new(2500, 2))
    }

    fn shift_one(due: &str, config: &BusinessDayConfig) -> (Item, Vec<MovedDate>) {
        let (items, moved) = shift_to_business_days(&[item(due)], TZ, config);
        (items.into_iter().next().unwrap(), moved)
    }

    #[test]
    fn test_business_day_is_untouched() {
        let (shifted, moved) = shift_one("2025-10-02", &BusinessDayConfig::default());
        assert!(!shifted.was_shifted);
        assert_eq!(shifted.due_date, "2025-10-02");
        assert!(shifted.original_due_date.is_none());
        assert!(moved.is_empty());
    }

    #[test]
    fn test_saturday_moves_to_monday() {
        let (shifted, moved) = shift_one("2025-10-04", &BusinessDayConfig::default());
        assert!(shifted.was_shifted);
        assert_eq!(shifted.due_date, "2025-10-06");
        assert_eq!(shifted.original_due_date.as_deref(), Some("2025-10-04"));
        assert_eq!(shifted.shifted_due_date.as_deref(), Some("2025-10-06"));
        assert_eq!(shifted.shift_reason, Some(ShiftReason::Weekend));
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].reason, ShiftReason::Weekend);
    }

    #[test]
    fn test_thanksgiving_moves_to_friday() {
        for (holiday, next) in [
            ("2025-11-27", "2025-11-28"),
            ("2031-11-27", "2031-11-28"),
            ("2040-11-22", "2040-11-23"),
        ] {
            let (shifted, _) = shift_one(holiday, &BusinessDayConfig::default());
            assert_eq!(shifted.due_date, next);
            assert_eq!(shifted.shift_reason, Some(ShiftReason::Holiday));
        }
    }

    #[test]
    fn test_walks_through_weekend_then_holiday() {
        // Saturday before Labor Day 2025
        let (shifted, _) = shift_one("2025-08-30", &BusinessDayConfig::default());
        assert_eq!(shifted.due_date, "2025-09-02");
        assert_eq!(shifted.shift_reason, Some(ShiftReason::Weekend));
    }

    #[test]
    fn test_observed_holiday_in_previous_year() {
        // New Year's Day 2022 is observed Friday 2021-12-31
        let (shifted, _) = shift_one("2021-12-31", &BusinessDayConfig::default());
        assert_eq!(shifted.due_date, "2022-01-03");
        assert_eq!(shifted.shift_reason, Some(ShiftReason::Holiday));
    }

    #[test]
    fn test_country_none_still_skips_weekends() {
        let config = BusinessDayConfig {
            country: Country::None,
            ..BusinessDayConfig::default()
        };
        let (shifted, _) = shift_one("2025-11-27", &config);
        assert!(!shifted.was_shifted);

        let (shifted, _) = shift_one("2025-10-04", &config);
        assert_eq!(shifted.due_date, "2025-10-06");
    }

    #[test]
    fn test_custom_skip_dates() {
        let config = BusinessDayConfig {
            custom_skip_dates: vec!["2025-10-06".to_string(), "not-a-date".to_string()],
            ..BusinessDayConfig::default()
        };
        let (shifted, _) = shift_one("2025-10-06", &config);
        assert_eq!(shifted.due_date, "2025-10-07");
        assert_eq!(shifted.shift_reason, Some(ShiftReason::Custom));

        // Saturday, Sunday and the custom Monday are all walked through
        let (shifted, _) = shift_one("2025-10-04", &config);
        assert_eq!(shifted.due_date, "2025-10-07");
        assert_eq!(shifted.shift_reason, Some(ShiftReason::Weekend));
    }

    #[test]
    fn test_disabled_mode_passes_through() {
        let config = BusinessDayConfig {
            business_day_mode: false,
            ..BusinessDayConfig::default()
        };
        let (shifted, moved) = shift_one("2025-10-04", &config);
        assert!(!shifted.was_shifted);
        assert_eq!(shifted.due_date, "2025-10-04");
        assert!(moved.is_empty());
    }

    #[test]
    fn test_invalid_date_is_left_alone() {
        let (shifted, moved) = shift_one("2025-02-30", &BusinessDayConfig::default());
        assert!(!shifted.was_shifted);
        assert_eq!(shifted.due_date, "2025-02-30");
        assert!(moved.is_empty());
    }

    #[test]
    fn test_moved_dates_sorted_and_items_keep_order() {
        let items = vec![item("2025-11-27"), item("2025-10-02"), item("2025-10-04")];
        let (shifted, moved) = shift_to_business_days(&items, TZ, &BusinessDayConfig::default());

        let dates: Vec<&str> = shifted.iter().map(|i| i.due_date.as_str()).collect();
        assert_eq!(dates, vec!["2025-11-28", "2025-10-02", "2025-10-06"]);

        let moved_to: Vec<&str> = moved.iter().map(|m| m.shifted_due_date.as_str()).collect();
        assert_eq!(moved_to, vec!["2025-10-06", "2025-11-28"]);
    }

    #[test]
    fn test_shifting_twice_keeps_provider_date() {
        let (first, _) = shift_to_business_days(&[item("2025-10-04")], TZ, &BusinessDayConfig::default());
        let (second, moved) = shift_to_business_days(&first, TZ, &BusinessDayConfig::default());
        assert_eq!(second, first);
        assert!(moved.is_empty());
    }

    #[test]
    fn test_gb_christmas_substitution() {
        let config = BusinessDayConfig {
            country: Country::Gb,
            ..BusinessDayConfig::default()
        };
        // Christmas 2027 is a Saturday; Mon 27th and Tue 28th are substitutes
        let (shifted, _) = shift_one("2027-12-25", &config);
        assert_eq!(shifted.due_date, "2027-12-29");
        assert_eq!(shifted.shift_reason, Some(ShiftReason::Weekend));
    }
}

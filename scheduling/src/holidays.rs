//! Rule-based public holiday calendars.
//!
//! Holidays are computed from their defining rule ("4th Thursday of
//! November", "Monday before May 25", Easter offsets) so any year resolves
//! without a maintained table.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::ScheduleError;

/// Jurisdiction whose holidays block due dates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    #[default]
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "GB", alias = "UK")]
    Gb,
    #[serde(rename = "CA")]
    Ca,
    /// Weekends only
    #[serde(rename = "None")]
    None,
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Country::Us => "US",
            Country::Gb => "GB",
            Country::Ca => "CA",
            Country::None => "None",
        };
        f.write_str(code)
    }
}

impl FromStr for Country {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" | "USA" => Ok(Country::Us),
            "GB" | "UK" => Ok(Country::Gb),
            "CA" => Ok(Country::Ca),
            "NONE" | "" => Ok(Country::None),
            _ => Err(ScheduleError::UnknownCountry(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holiday {
    /// Observed date (after weekend substitution)
    pub date: NaiveDate,
    pub name: &'static str,
}

/// All observed holidays of `country` that fall on dates computed for `year`.
///
/// An observed date can land in the previous year (US New Year's Day on a
/// Saturday is observed December 31).
pub fn holidays_for_year(country: Country, year: i32) -> Vec<Holiday> {
    let mut holidays = match country {
        Country::Us => us_holidays(year),
        Country::Gb => gb_holidays(year),
        Country::Ca => ca_holidays(year),
        Country::None => Vec::new(),
    };
    holidays.sort_by_key(|h| h.date);
    holidays
}

/// Holiday lookups with a per-year cache
#[derive(Debug, Clone)]
pub struct HolidayCalendar {
    country: Country,
    years: HashMap<i32, Vec<Holiday>>,
}

impl HolidayCalendar {
    pub fn new(country: Country) -> Self {
        Self {
            country,
            years: HashMap::new(),
        }
    }

    pub fn country(&self) -> Country {
        self.country
    }

    /// Name of the holiday observed on `date`, if any
    pub fn holiday_on(&mut self, date: NaiveDate) -> Option<&'static str> {
        if self.country == Country::None {
            return None;
        }

        // Next year's rules can observe a holiday on December 31
        let years = if date.month() == 12 {
            vec![date.year(), date.year() + 1]
        } else {
            vec![date.year()]
        };

        for year in years {
            let country = self.country;
            let holidays = self
                .years
                .entry(year)
                .or_insert_with(|| holidays_for_year(country, year));
            if let Some(holiday) = holidays.iter().find(|h| h.date == date) {
                return Some(holiday.name);
            }
        }

        None
    }

    pub fn is_holiday(&mut self, date: NaiveDate) -> bool {
        self.holiday_on(date).is_some()
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        ymd(year + 1, 1, 1)?
    } else {
        ymd(year, month + 1, 1)?
    };
    let mut date = first_of_next.pred_opt()?;
    while date.weekday() != weekday {
        date = date.pred_opt()?;
    }
    Some(date)
}

/// Last `weekday` strictly before `date`
fn weekday_before(date: NaiveDate, weekday: Weekday) -> Option<NaiveDate> {
    let mut current = date.pred_opt()?;
    while current.weekday() != weekday {
        current = current.pred_opt()?;
    }
    Some(current)
}

/// Saturday holidays are observed Friday, Sunday holidays Monday
fn observed_nearest(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

/// Western Easter Sunday (anonymous Gregorian computus)
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    ymd(year, month as u32, day as u32)
}

/// Weekend holidays move to the next weekday not already a holiday
fn substitute_forward(holidays: Vec<(Option<NaiveDate>, &'static str)>) -> Vec<Holiday> {
    let mut dated: Vec<Holiday> = holidays
        .into_iter()
        .filter_map(|(date, name)| date.map(|date| Holiday { date, name }))
        .collect();
    dated.sort_by_key(|h| h.date);

    let mut taken: HashSet<NaiveDate> = dated
        .iter()
        .filter(|h| !is_weekend(h.date))
        .map(|h| h.date)
        .collect();

    for holiday in dated.iter_mut().filter(|h| is_weekend(h.date)) {
        let mut date = holiday.date;
        while is_weekend(date) || taken.contains(&date) {
            date += Duration::days(1);
        }
        taken.insert(date);
        holiday.date = date;
    }

    dated
}

fn us_holidays(year: i32) -> Vec<Holiday> {
    let mut rules = vec![
        (ymd(year, 1, 1).map(observed_nearest), "New Year's Day"),
        (nth_weekday(year, 1, Weekday::Mon, 3), "Martin Luther King Jr. Day"),
        (nth_weekday(year, 2, Weekday::Mon, 3), "Washington's Birthday"),
        (last_weekday(year, 5, Weekday::Mon), "Memorial Day"),
        (ymd(year, 7, 4).map(observed_nearest), "Independence Day"),
        (nth_weekday(year, 9, Weekday::Mon, 1), "Labor Day"),
        (nth_weekday(year, 10, Weekday::Mon, 2), "Columbus Day"),
        (ymd(year, 11, 11).map(observed_nearest), "Veterans Day"),
        (nth_weekday(year, 11, Weekday::Thu, 4), "Thanksgiving Day"),
        (ymd(year, 12, 25).map(observed_nearest), "Christmas Day"),
    ];
    if year >= 2021 {
        rules.push((ymd(year, 6, 19).map(observed_nearest), "Juneteenth"));
    }

    rules
        .into_iter()
        .filter_map(|(date, name)| date.map(|date| Holiday { date, name }))
        .collect()
}

fn gb_holidays(year: i32) -> Vec<Holiday> {
    let easter = easter_sunday(year);
    substitute_forward(vec![
        (ymd(year, 1, 1), "New Year's Day"),
        (easter.map(|d| d - Duration::days(2)), "Good Friday"),
        (easter.map(|d| d + Duration::days(1)), "Easter Monday"),
        (nth_weekday(year, 5, Weekday::Mon, 1), "Early May Bank Holiday"),
        (last_weekday(year, 5, Weekday::Mon), "Spring Bank Holiday"),
        (last_weekday(year, 8, Weekday::Mon), "Summer Bank Holiday"),
        (ymd(year, 12, 25), "Christmas Day"),
        (ymd(year, 12, 26), "Boxing Day"),
    ])
}

fn ca_holidays(year: i32) -> Vec<Holiday> {
    let easter = easter_sunday(year);
    substitute_forward(vec![
        (ymd(year, 1, 1), "New Year's Day"),
        (easter.map(|d| d - Duration::days(2)), "Good Friday"),
        (
            ymd(year, 5, 25).and_then(|d| weekday_before(d, Weekday::Mon)),
            "Victoria Day",
        ),
        (ymd(year, 7, 1), "Canada Day"),
        (nth_weekday(year, 9, Weekday::Mon, 1), "Labour Day"),
        (nth_weekday(year, 10, Weekday::Mon, 2), "Thanksgiving"),
        (ymd(year, 11, 11), "Remembrance Day"),
        (ymd(year, 12, 25), "Christmas Day"),
        (ymd(year, 12, 26), "Boxing Day"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn names_on(country: Country, s: &str) -> Option<&'static str> {
        HolidayCalendar::new(country).holiday_on(date(s))
    }

    #[test]
    fn test_easter() {
        assert_eq!(easter_sunday(2024), Some(date("2024-03-31")));
        assert_eq!(easter_sunday(2025), Some(date("2025-04-20")));
        assert_eq!(easter_sunday(2026), Some(date("2026-04-05")));
        assert_eq!(easter_sunday(2038), Some(date("2038-04-25")));
    }

    #[test]
    fn test_us_rule_based_holidays() {
        assert_eq!(names_on(Country::Us, "2025-11-27"), Some("Thanksgiving Day"));
        assert_eq!(names_on(Country::Us, "2040-11-22"), Some("Thanksgiving Day"));
        assert_eq!(names_on(Country::Us, "2099-11-26"), Some("Thanksgiving Day"));
        assert_eq!(names_on(Country::Us, "2025-01-20"), Some("Martin Luther King Jr. Day"));
        assert_eq!(names_on(Country::Us, "2025-05-26"), Some("Memorial Day"));
        assert_eq!(names_on(Country::Us, "2025-09-01"), Some("Labor Day"));
        assert_eq!(names_on(Country::Us, "2025-10-13"), Some("Columbus Day"));
        assert_eq!(names_on(Country::Us, "2025-06-19"), Some("Juneteenth"));
        assert_eq!(names_on(Country::Us, "2020-06-19"), None);
        assert_eq!(names_on(Country::Us, "2025-10-02"), None);
    }

    #[test]
    fn test_us_weekend_observance() {
        // July 4, 2026 is a Saturday
        assert_eq!(names_on(Country::Us, "2026-07-03"), Some("Independence Day"));
        assert_eq!(names_on(Country::Us, "2026-07-04"), None);
        // January 1, 2022 is a Saturday, observed in the previous year
        assert_eq!(names_on(Country::Us, "2021-12-31"), Some("New Year's Day"));
    }

    #[test]
    fn test_gb_substitute_days() {
        assert_eq!(names_on(Country::Gb, "2025-04-18"), Some("Good Friday"));
        assert_eq!(names_on(Country::Gb, "2025-04-21"), Some("Easter Monday"));
        assert_eq!(names_on(Country::Gb, "2025-08-25"), Some("Summer Bank Holiday"));
        // Christmas 2027 is a Saturday and Boxing Day a Sunday
        assert_eq!(names_on(Country::Gb, "2027-12-27"), Some("Christmas Day"));
        assert_eq!(names_on(Country::Gb, "2027-12-28"), Some("Boxing Day"));
        assert_eq!(names_on(Country::Gb, "2025-11-27"), None);
    }

    #[test]
    fn test_ca_holidays() {
        assert_eq!(names_on(Country::Ca, "2025-05-19"), Some("Victoria Day"));
        assert_eq!(names_on(Country::Ca, "2025-10-13"), Some("Thanksgiving"));
        assert_eq!(names_on(Country::Ca, "2025-11-11"), Some("Remembrance Day"));
    }

    #[test]
    fn test_none_has_no_holidays() {
        assert!(holidays_for_year(Country::None, 2025).is_empty());
        assert_eq!(names_on(Country::None, "2025-12-25"), None);
    }

    #[test]
    fn test_country_parsing() {
        assert_eq!("us".parse::<Country>().unwrap(), Country::Us);
        assert_eq!("UK".parse::<Country>().unwrap(), Country::Gb);
        assert_eq!("None".parse::<Country>().unwrap(), Country::None);
        assert!("Atlantis".parse::<Country>().is_err());
        assert_eq!(serde_json::to_string(&Country::None).unwrap(), "\"None\"");
    }
}

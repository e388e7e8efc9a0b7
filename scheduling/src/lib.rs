//! Scheduling Crate
//!
//! Downstream stages of the BNPL pipeline. Takes normalized items from the
//! `extractors` crate, moves due dates off non-business days, flags schedule
//! risks and encodes the result as an iCalendar feed.
//!
//! # Architecture
//!
//! - **Holidays**: rule-based calendars for US, GB and CA
//! - **Business days**: forward walk to the next business day with an audit trail
//! - **Risks**: collisions, cash crunches around paydays, weekend autopay
//! - **ICS**: RFC 5545 encoder with escaping and line folding
//!
//! Every stage is a pure function of its inputs. The shifter and detector
//! pass invalid records through instead of failing.
//!
//! # Example
//!
//! ```rust,ignore
//! use scheduling::{detect_risks, generate_ics, shift_to_business_days, BusinessDayConfig};
//!
//! let (items, moved) = shift_to_business_days(&items, "America/New_York", &BusinessDayConfig::default());
//! let risks = detect_risks(&items, &["2025-10-03"], Decimal::ZERO, "America/New_York");
//! let ics = generate_ics(&items, "America/New_York");
//! ```

pub mod business_days;
pub mod holidays;
pub mod ics;
pub mod risk;

use chrono::{Datelike, NaiveDate, TimeZone, Weekday};
use chrono_tz::Tz;
use thiserror::Error;

pub use business_days::{shift_to_business_days, BusinessDayConfig, BusinessDayShifter, MAX_SHIFT_DAYS};
pub use holidays::{holidays_for_year, Country, Holiday, HolidayCalendar};
pub use ics::{
    escape_text, fold_line, generate_ics, generate_ics_base64, unescape_text, unfold_lines,
    IcsEncoder,
};
pub use risk::{detect_risks, filter_risks, RiskDetector, RiskOptions};

// Re-export the pipeline types from shared-types for convenience
pub use shared_types::{Item, MovedDate, Risk, RiskType, Severity, ShiftReason};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("unknown country: {0:?}")]
    UnknownCountry(String),

    #[error("unknown timezone: {0:?}")]
    UnknownTimezone(String),
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Resolve an IANA name, falling back to UTC with a warning.
///
/// Calendar dates do not move with the zone, so a bad name only affects
/// weekday labels at the edges of the day.
pub(crate) fn resolve_timezone(tz: &str) -> Tz {
    match tz.parse::<Tz>() {
        Ok(zone) => zone,
        Err(_) => {
            tracing::warn!(timezone = %tz, "{}, using UTC", ScheduleError::UnknownTimezone(tz.to_string()));
            Tz::UTC
        }
    }
}

/// Weekday of `date` as observed at local noon in `tz`
pub(crate) fn local_weekday(date: NaiveDate, tz: Tz) -> Weekday {
    date.and_hms_opt(12, 0, 0)
        .and_then(|noon| tz.from_local_datetime(&noon).earliest())
        .map(|local| local.weekday())
        .unwrap_or_else(|| date.weekday())
}

pub(crate) fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

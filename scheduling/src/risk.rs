use chrono::{Duration, NaiveDate, Weekday};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared_types::{Item, Risk, RiskType, Severity};
use std::collections::BTreeMap;

use crate::{local_weekday, parse_date, resolve_timezone, weekday_name};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskOptions {
    /// Days either side of a payday that count toward its window
    pub window_days: i64,
    /// Overage above the buffer at which a cash crunch becomes high severity
    pub high_overage: Decimal,
}

impl Default for RiskOptions {
    fn default() -> Self {
        Self {
            window_days: 3,
            high_overage: Decimal::new(250, 0),
        }
    }
}

/// Scans a normalized schedule for collisions, cash crunches and weekend autopay.
///
/// Items with unparseable due dates are ignored. `affected_items` are indices
/// into the slice passed to [`RiskDetector::detect`].
#[derive(Debug, Clone)]
pub struct RiskDetector {
    options: RiskOptions,
    tz: Tz,
}

impl RiskDetector {
    pub fn new(tz: &str) -> Self {
        Self::with_options(tz, RiskOptions::default())
    }

    pub fn with_options(tz: &str, options: RiskOptions) -> Self {
        Self {
            options,
            tz: resolve_timezone(tz),
        }
    }

    pub fn detect<S: AsRef<str>>(&self, items: &[Item], paydays: &[S], min_buffer: Decimal) -> Vec<Risk> {
        let dated: Vec<(usize, NaiveDate)> = items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| parse_date(&item.due_date).map(|date| (idx, date)))
            .collect();

        let mut risks = self.collisions(&dated);
        risks.extend(self.cash_crunches(items, &dated, paydays, min_buffer));
        risks.extend(self.weekend_autopay(items, &dated));

        tracing::debug!(items = items.len(), risks = risks.len(), "Risk detection complete");
        risks
    }

    fn collisions(&self, dated: &[(usize, NaiveDate)]) -> Vec<Risk> {
        let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
        for &(idx, date) in dated {
            by_date.entry(date).or_default().push(idx);
        }

        by_date
            .into_iter()
            .filter(|(_, indices)| indices.len() >= 2)
            .map(|(date, indices)| {
                let severity = if indices.len() >= 3 {
                    Severity::High
                } else {
                    Severity::Medium
                };
                Risk {
                    risk_type: RiskType::Collision,
                    severity,
                    date: date.format("%Y-%m-%d").to_string(),
                    message: format!(
                        "{} payments due on {}, {}",
                        indices.len(),
                        weekday_name(local_weekday(date, self.tz)),
                        date.format("%Y-%m-%d")
                    ),
                    affected_items: indices,
                    amount: None,
                }
            })
            .collect()
    }

    fn cash_crunches<S: AsRef<str>>(
        &self,
        items: &[Item],
        dated: &[(usize, NaiveDate)],
        paydays: &[S],
        min_buffer: Decimal,
    ) -> Vec<Risk> {
        let window = Duration::days(self.options.window_days);
        let mut risks = Vec::new();

        for raw in paydays {
            let raw = raw.as_ref();
            let Some(payday) = parse_date(raw) else {
                tracing::warn!(payday = %raw, "Ignoring invalid payday");
                continue;
            };

            let (start, end) = (payday - window, payday + window);
            let affected: Vec<usize> = dated
                .iter()
                .filter(|(_, date)| *date >= start && *date <= end)
                .map(|&(idx, _)| idx)
                .collect();

            let total: Decimal = affected.iter().map(|&idx| items[idx].amount).sum();
            if total <= min_buffer {
                continue;
            }

            let severity = if total - min_buffer >= self.options.high_overage {
                Severity::High
            } else {
                Severity::Medium
            };

            risks.push(Risk {
                risk_type: RiskType::CashCrunch,
                severity,
                date: payday.format("%Y-%m-%d").to_string(),
                message: format!(
                    "{} due within {} days of payday {} exceeds buffer of {}",
                    two_places(total),
                    self.options.window_days,
                    payday.format("%Y-%m-%d"),
                    two_places(min_buffer)
                ),
                affected_items: affected,
                amount: Some(total),
            });
        }

        risks
    }

    fn weekend_autopay(&self, items: &[Item], dated: &[(usize, NaiveDate)]) -> Vec<Risk> {
        dated
            .iter()
            .filter(|&&(idx, date)| items[idx].autopay && is_weekend_in(date, self.tz))
            .map(|&(idx, date)| {
                let item = &items[idx];
                Risk {
                    risk_type: RiskType::WeekendAutopay,
                    severity: Severity::Low,
                    date: date.format("%Y-%m-%d").to_string(),
                    message: format!(
                        "{} installment {} autopays on a {}",
                        item.provider,
                        item.installment_no,
                        weekday_name(local_weekday(date, self.tz))
                    ),
                    affected_items: vec![idx],
                    amount: None,
                }
            })
            .collect()
    }
}

fn is_weekend_in(date: NaiveDate, tz: Tz) -> bool {
    matches!(local_weekday(date, tz), Weekday::Sat | Weekday::Sun)
}

fn two_places(value: Decimal) -> String {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

/// Run all detectors with default options and concatenate their findings
/// (collisions, then cash crunches, then weekend autopay).
pub fn detect_risks<S: AsRef<str>>(items: &[Item], paydays: &[S], min_buffer: Decimal, tz: &str) -> Vec<Risk> {
    RiskDetector::new(tz).detect(items, paydays, min_buffer)
}

/// Keep only risks of the allowed types, for API surfaces that expose a subset
pub fn filter_risks(risks: Vec<Risk>, allowed: &[RiskType]) -> Vec<Risk> {
    risks
        .into_iter()
        .filter(|risk| allowed.contains(&risk.risk_type))
        .collect()
}

use std::collections::BTreeSet;

use chrono::{DateTime, Days, Months, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::dto::LedgerEntry;
use crate::clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    /// Unknown or missing periods mean `daily`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("weekly") => Period::Weekly,
            Some("monthly") => Period::Monthly,
            _ => Period::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryWindow {
    pub period: Period,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SummaryWindow {
    /// `[local midnight of the period start, now]` in `tz`.
    pub fn compute(period: Period, now: DateTime<Utc>, tz: Tz) -> Self {
        let today = clock::local_date(now, tz);
        let start_date = match period {
            Period::Daily => Some(today),
            Period::Weekly => today.checked_sub_days(Days::new(7)),
            Period::Monthly => today.checked_sub_months(Months::new(1)),
        }
        .unwrap_or(today);
        Self {
            period,
            start: clock::local_midnight(tz, start_date).with_timezone(&Utc),
            end: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Totals {
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub period: Period,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub entry_count: usize,
    pub days_count: usize,
    pub avg_calories: i64,
    pub avg_protein: i64,
    pub avg_carbs: i64,
    pub avg_fat: i64,
}

/// Sums entries whose date falls inside the window. Rows with unparsable
/// dates are skipped. Averages divide by distinct date strings, at least one.
pub fn summarize(entries: &[LedgerEntry], period: Period, now: DateTime<Utc>, tz: Tz) -> Summary {
    let window = SummaryWindow::compute(period, now, tz);
    let mut totals = Totals::default();
    let mut days: BTreeSet<&str> = BTreeSet::new();
    let mut entry_count = 0;

    for e in entries {
        let Some(date) = clock::parse_row_date(&e.date) else {
            continue;
        };
        let at = clock::local_midnight(tz, date).with_timezone(&Utc);
        if at < window.start || at > window.end {
            continue;
        }
        entry_count += 1;
        days.insert(e.date.as_str());
        totals.calories += e.macros.calories;
        totals.protein += e.macros.protein;
        totals.carbs += e.macros.carbs;
        totals.fat += e.macros.fat;
    }

    let days_count = days.len().max(1);
    let avg = |total: f64| (total / days_count as f64).round() as i64;
    Summary {
        period: window.period,
        total_calories: totals.calories,
        total_protein: totals.protein,
        total_carbs: totals.carbs,
        total_fat: totals.fat,
        entry_count,
        days_count,
        avg_calories: avg(totals.calories),
        avg_protein: avg(totals.protein),
        avg_carbs: avg(totals.carbs),
        avg_fat: avg(totals.fat),
    }
}

//! Local calendar helpers. Ledger rows carry user-facing `M/D/YYYY` dates and
//! `h:mm AM` times, so every conversion goes through the caller's timezone.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Resolves an IANA zone name, falling back to UTC.
pub fn resolve_timezone(name: Option<&str>) -> Tz {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        None => Tz::UTC,
        Some(n) => n.parse::<Tz>().unwrap_or_else(|_| {
            warn!(timezone = %n, "unknown timezone, using UTC");
            Tz::UTC
        }),
    }
}

pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

pub fn local_date_string(now: DateTime<Utc>, tz: Tz) -> String {
    format_date(local_date(now, tz))
}

pub fn local_time_string(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%-I:%M %p").to_string()
}

/// First instant of `date` in `tz`. Zones that skip midnight on a DST switch
/// resolve to the UTC reading of the same wall clock.
pub fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

const ROW_DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y"];

/// Parses a stored row date. Returns `None` for anything unrecognized.
pub fn parse_row_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    ROW_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

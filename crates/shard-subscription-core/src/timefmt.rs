//! Subscription timestamp parsing and date arithmetic
//!
//! Stored timestamps appear in three formats accumulated over the life of
//! the database. Parsing tries them in a fixed order and takes the first
//! success; changing the order would silently change which ambiguous strings
//! parse, so it is part of the contract.

use chrono::{Months, NaiveDate, NaiveDateTime};

/// Canonical write format
pub const STAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

const DATETIME_FORMATS: [&str; 2] = ["%d.%m.%Y %H:%M", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a stored timestamp, trying the accepted formats in order.
///
/// Date-only values parse to midnight.
pub fn parse_stamp(text: &str) -> Option<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Render a timestamp in the canonical storage format
pub fn format_stamp(dt: NaiveDateTime) -> String {
    dt.format(STAMP_FORMAT).to_string()
}

/// Whether an expiry text denotes a still-running subscription.
///
/// Absent or unparseable expiry counts as inactive.
pub fn is_active(expiry: Option<&str>, now: NaiveDateTime) -> bool {
    match expiry.and_then(parse_stamp) {
        Some(exp) => now < exp,
        None => false,
    }
}

/// Calendar-day difference between an expiry text and `now`, date parts only.
///
/// A subscription expiring at 00:05 today and one expiring at 23:55 today
/// both have 0 days left; hours never distinguish thresholds.
pub fn days_until(expiry: &str, now: NaiveDateTime) -> Option<i64> {
    let exp = parse_stamp(expiry)?;
    Some((exp.date() - now.date()).num_days())
}

/// Add calendar months with end-of-month clamping (Jan 31 + 1 month lands on
/// the last day of February)
pub fn add_months(dt: NaiveDateTime, months: u32) -> NaiveDateTime {
    // Only fails at the edge of representable time.
    dt.checked_add_months(Months::new(months)).unwrap_or(dt)
}

/// Exact day count covered by `n` calendar months starting at `now`; used
/// when the provisioning server needs a duration in days
pub fn months_as_days(now: NaiveDateTime, months: u32) -> i64 {
    (add_months(now, months) - now).num_days()
}

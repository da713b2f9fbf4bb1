use crate::error::SyncError;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Parses a purchase cadence such as `12h`, `7d` or `3w`.
pub fn parse_cadence(value: &str) -> Result<Duration, SyncError> {
    let misformatted = || SyncError::Configuration("--every misformatted".to_string());

    let value = value.trim();
    let unit = value.chars().last().ok_or_else(misformatted)?;
    let digits = &value[..value.len() - unit.len_utf8()];

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(misformatted());
    }

    let count: i64 = digits.parse().map_err(|_| misformatted())?;
    let hours = match unit {
        'h' => Some(count),
        'd' => count.checked_mul(24),
        'w' => count.checked_mul(24 * 7),
        _ => None,
    }
    .ok_or_else(misformatted)?;

    Duration::try_hours(hours).ok_or_else(misformatted)
}

/// Parses a `YYYY-MM-DD` date as midnight UTC.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>, SyncError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            SyncError::Configuration(format!("invalid date '{}', expected YYYY-MM-DD", value))
        })
}

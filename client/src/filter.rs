//! Date-range computation and filtering over analysis results.
//!
//! Bounds are epoch milliseconds, the unit `createdDate` comes in.  A bare
//! `YYYY-MM-DD` bound is taken as midnight UTC of that day.
//!

use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::AnalysisResult;

/// One full day, the inclusivity adjustment for an explicit end date.
pub const ONE_DAY_MS: i64 = 86_400_000;

/// User input errors on the date window.
///
#[derive(Debug, Error)]
pub enum DateRangeError {
    #[error("invalid date {0}, expected YYYY-MM-DD")]
    Invalid(String),
    #[error("from/to dates can not be in the future")]
    Future,
    #[error("from date must be earlier than to date")]
    Inverted,
}

/// Turn optional `YYYY-MM-DD` bounds into an inclusive epoch-ms window.
///
/// No `from` means epoch 0; no `to` means now, with no further adjustment.
/// An explicit `to` is pushed forward by one day so its whole calendar day
/// is included.
///
pub fn compute_bounds(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(i64, i64), DateRangeError> {
    let now = Utc::now().timestamp_millis();

    let from_ms = match from {
        Some(day) => day_start_ms(day)?,
        None => 0,
    };
    let to_ms = match to {
        Some(day) => day_start_ms(day)?,
        None => now,
    };

    if from_ms > now || to_ms > now {
        return Err(DateRangeError::Future);
    }

    // Include the whole `to` day when it was given explicitly.
    //
    let to_ms = if to.is_some() { to_ms + ONE_DAY_MS } else { to_ms };

    if from_ms > to_ms {
        return Err(DateRangeError::Inverted);
    }
    Ok((from_ms, to_ms))
}

/// Midnight of the given calendar day as epoch milliseconds.
///
fn day_start_ms(day: &str) -> Result<i64, DateRangeError> {
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| DateRangeError::Invalid(day.to_string()))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
}

/// Render an epoch-ms bound back as its calendar day, in local time for
/// display.
///
pub fn day_of(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Keep the results created inside the window, inclusive on both ends.
/// Order is preserved, nothing is deduplicated.
///
pub fn filter_by_range(
    results: Vec<AnalysisResult>,
    from_ms: i64,
    to_ms: i64,
) -> Vec<AnalysisResult> {
    results
        .into_iter()
        .filter(|r| from_ms <= r.created_date && r.created_date <= to_ms)
        .collect()
}

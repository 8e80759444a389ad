//! Human-readable message dates.
//!
//! Messages carry the block height they were posted at. Heights are turned
//! into an approximate age using the average Stacks block time.

use chrono::{DateTime, TimeDelta, Utc};

/// Average Stacks block time in minutes.
pub const BLOCK_TIME_MINUTES: i64 = 10;

/// Format `timestamp` relative to `now`.
///
/// With `is_block_height` the value is a block count, otherwise milliseconds
/// since the Unix epoch. Recent dates read as "just now" or "N units ago";
/// anything a week or older gets an absolute date.
pub fn format_date(timestamp: u64, is_block_height: bool, now: DateTime<Utc>) -> String {
    let date = if is_block_height {
        block_height_to_date(timestamp, now)
    } else {
        i64::try_from(timestamp)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    };

    let Some(date) = date else {
        return "Invalid date".to_string();
    };

    let diff_sec = (now - date).num_seconds();
    let diff_min = diff_sec.div_euclid(60);
    let diff_hour = diff_min.div_euclid(60);
    let diff_day = diff_hour.div_euclid(24);

    if diff_sec < 60 {
        "just now".to_string()
    } else if diff_min < 60 {
        ago(diff_min, "minute")
    } else if diff_hour < 24 {
        ago(diff_hour, "hour")
    } else if diff_day < 7 {
        ago(diff_day, "day")
    } else {
        date.format("%b %-d, %Y, %I:%M %p").to_string()
    }
}

/// [`format_date`] against the current time.
pub fn format_date_now(timestamp: u64, is_block_height: bool) -> String {
    format_date(timestamp, is_block_height, Utc::now())
}

fn block_height_to_date(height: u64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let minutes = i64::try_from(height).ok()?.checked_mul(BLOCK_TIME_MINUTES)?;
    now.checked_sub_signed(TimeDelta::try_minutes(minutes)?)
}

fn ago(n: i64, unit: &str) -> String {
    format!("{} {}{} ago", n, unit, if n > 1 { "s" } else { "" })
}

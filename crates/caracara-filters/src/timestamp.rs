//! Timestamp helpers for date-based filters
//!
//! Date filters accept either a fixed ISO 8601 UTC timestamp such as
//! `2020-01-01T01:00:00Z`, or a relative offset from now such as `-30m`,
//! `+1h` or `-7d`.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};

/// Format used by Falcon for timestamps in FQL
pub const FQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

static RELATIVE_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^([-+])(\d+)(s|m|h|d)$").expect("Invalid regex pattern")
});

static ISO_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z").expect("Invalid regex pattern")
});

/// Check a relative timestamp string such as `-7d`
pub fn is_relative_timestamp(value: &str) -> bool {
    RELATIVE_PATTERN.is_match(value)
}

/// Check that a string starts with an ISO 8601 UTC timestamp
pub fn is_iso_timestamp(value: &str) -> bool {
    ISO_PATTERN.is_match(value)
}

/// Resolve a relative timestamp against `now`.
///
/// Returns `None` when the string is not a relative timestamp or the offset
/// overflows the representable range.
pub fn relative_timestamp(value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = RELATIVE_PATTERN.captures(value)?;
    let amount: i64 = caps[2].parse().ok()?;
    let delta = match &caps[3] {
        "s" => Duration::try_seconds(amount)?,
        "m" => Duration::try_minutes(amount)?,
        "h" => Duration::try_hours(amount)?,
        "d" => Duration::try_days(amount)?,
        _ => return None,
    };

    if &caps[1] == "-" {
        now.checked_sub_signed(delta)
    } else {
        now.checked_add_signed(delta)
    }
}

/// Render a timestamp in FQL format
pub fn format_fql_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(FQL_TIMESTAMP_FORMAT).to_string()
}

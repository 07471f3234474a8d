//! Wall-clock helpers for punchd
//!
//! All attendance timestamps are timezone-aware `DateTime<Local>` values.
//! They are persisted as RFC 3339 strings and rendered for the attendance
//! log in a configurable display offset.
//!
//! # Mock Time for Development
//!
//! In debug builds, `PUNCH_MOCK_TIME` (format `YYYY-MM-DD HH:MM:SS`) shifts
//! the clock returned by [`now`]. The mocked clock keeps advancing at the
//! real rate, which makes it possible to walk a shift up to its expiry.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "PUNCH_MOCK_TIME";

/// Format used for attendance log rows
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)]
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            let raw = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
            let parsed = NaiveDateTime::parse_from_str(&raw, LOG_TIMESTAMP_FORMAT)
                .ok()
                .and_then(|naive| Local.from_local_datetime(&naive).single());

            match parsed {
                Some(mock_dt) => {
                    let offset = mock_dt.signed_duration_since(chrono::Local::now());
                    tracing::info!(
                        mock_time = %raw,
                        offset_secs = offset.num_seconds(),
                        "Mock time enabled"
                    );
                    Some(offset)
                }
                None => {
                    tracing::warn!(
                        mock_time = %raw,
                        expected_format = LOG_TIMESTAMP_FORMAT,
                        "Invalid mock time, using system clock"
                    );
                    None
                }
            }
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Current local time, honouring `PUNCH_MOCK_TIME` in debug builds.
#[allow(clippy::disallowed_methods)]
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();
    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Serialize a timestamp for storage.
pub fn to_storage_string(dt: &DateTime<Local>) -> String {
    dt.to_rfc3339()
}

/// Parse a stored RFC 3339 timestamp back into local time.
pub fn parse_storage_string(s: &str) -> Result<DateTime<Local>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Local))
}

/// Render a timestamp for the attendance log.
///
/// With `offset` set, the time is shown in that fixed offset (a business
/// timezone); otherwise in the host's local zone.
pub fn format_log_timestamp(dt: &DateTime<Local>, offset: Option<FixedOffset>) -> String {
    match offset {
        Some(offset) => dt.with_timezone(&offset).format(LOG_TIMESTAMP_FORMAT).to_string(),
        None => dt.format(LOG_TIMESTAMP_FORMAT).to_string(),
    }
}

/// Parse a `+HH:MM` / `-HH:MM` UTC offset.
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };

    let (hours, minutes) = rest.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes >= 60 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Elapsed time between two wall-clock instants, zero if `later` precedes `earlier`.
pub fn elapsed_between(earlier: &DateTime<Local>, later: &DateTime<Local>) -> Duration {
    later
        .signed_duration_since(*earlier)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Short human form such as `8h 05m`, used in log lines and CLI output.
pub fn format_duration_hm(duration: Duration) -> String {
    let total_minutes = duration.as_secs() / 60;
    format!("{}h {:02}m", total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_round_trip_preserves_instant() {
        let dt = Local.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        let parsed = parse_storage_string(&to_storage_string(&dt)).unwrap();
        assert_eq!(parsed, dt);
    }

    #[test]
    fn corrupt_storage_string_is_an_error() {
        assert!(parse_storage_string("yesterday-ish").is_err());
        assert!(parse_storage_string("2025-03-14 09:00:00").is_err());
    }

    #[test]
    fn parse_offsets() {
        assert_eq!(parse_utc_offset("+08:00"), FixedOffset::east_opt(8 * 3600));
        assert_eq!(parse_utc_offset("-05:30"), FixedOffset::east_opt(-(5 * 3600 + 30 * 60)));
        assert_eq!(parse_utc_offset("08:00"), None);
        assert_eq!(parse_utc_offset("+8:00"), None);
        assert_eq!(parse_utc_offset("+15:00"), None);
        assert_eq!(parse_utc_offset("+08:60"), None);
    }

    #[test]
    fn log_timestamp_in_business_offset() {
        let utc = DateTime::parse_from_rfc3339("2025-03-14T01:00:00Z")
            .unwrap()
            .with_timezone(&Local);
        let manila = parse_utc_offset("+08:00");
        assert_eq!(format_log_timestamp(&utc, manila), "2025-03-14 09:00:00");
    }

    #[test]
    fn elapsed_never_negative() {
        let a = Local.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        let b = a + chrono::Duration::minutes(90);

        assert_eq!(elapsed_between(&a, &b), Duration::from_secs(5400));
        assert_eq!(elapsed_between(&b, &a), Duration::ZERO);
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration_hm(Duration::from_secs(8 * 3600 + 5 * 60 + 59)), "8h 05m");
        assert_eq!(format_duration_hm(Duration::ZERO), "0h 00m");
    }
}

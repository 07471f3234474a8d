//! Validated policy structures

use crate::schema::{RawAttendanceConfig, RawConfig, RawServiceConfig, RawSinkConfig};
use chrono::FixedOffset;
use std::path::PathBuf;
use std::time::Duration;

/// Default cooldown between a clock-out and the next clock-in
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Default maximum shift length before the sweeper closes it
pub const DEFAULT_MAX_SHIFT: Duration = Duration::from_secs(14 * 3600);

/// Default sweeper interval
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Default webhook request timeout
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Validated policy ready for use by the service
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub service: ServiceConfig,
    pub attendance: AttendancePolicy,
    pub sink: SinkConfig,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            attendance: AttendancePolicy::from_raw(raw.attendance),
            sink: raw.sink.map(SinkConfig::from_raw).unwrap_or_default(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw
                .socket_path
                .unwrap_or_else(punch_util::default_socket_path),
            data_dir: raw.data_dir.unwrap_or_else(punch_util::default_data_dir),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: punch_util::default_socket_path(),
            data_dir: punch_util::default_data_dir(),
        }
    }
}

/// Attendance timing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendancePolicy {
    /// A clock-in is refused while less than this has passed since the last clock-out
    pub cooldown: Duration,
    /// Shifts open at least this long are force-closed
    pub max_shift: Duration,
    pub sweep_interval: Duration,
    /// Offset for attendance log timestamps; host local time when `None`
    pub display_offset: Option<FixedOffset>,
}

impl AttendancePolicy {
    fn from_raw(raw: RawAttendanceConfig) -> Self {
        Self {
            cooldown: raw
                .cooldown_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_COOLDOWN),
            max_shift: raw
                .max_shift_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_MAX_SHIFT),
            sweep_interval: raw
                .sweep_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SWEEP_INTERVAL),
            display_offset: raw
                .display_offset
                .as_deref()
                .and_then(punch_util::parse_utc_offset),
        }
    }
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            max_shift: DEFAULT_MAX_SHIFT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            display_offset: None,
        }
    }
}

/// Attendance log sink selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SinkConfig {
    #[default]
    None,
    Jsonl {
        path: PathBuf,
    },
    Webhook {
        url: String,
        timeout: Duration,
    },
}

impl SinkConfig {
    fn from_raw(raw: RawSinkConfig) -> Self {
        match raw {
            RawSinkConfig::None => SinkConfig::None,
            RawSinkConfig::Jsonl { path } => SinkConfig::Jsonl { path },
            RawSinkConfig::Webhook {
                url,
                timeout_seconds,
            } => SinkConfig::Webhook {
                url,
                timeout: timeout_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_WEBHOOK_TIMEOUT),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_constants() {
        let policy = AttendancePolicy::default();
        assert_eq!(policy.cooldown, Duration::from_secs(300));
        assert_eq!(policy.max_shift, Duration::from_secs(50_400));
        assert_eq!(policy.sweep_interval, Duration::from_secs(900));
        assert!(policy.display_offset.is_none());
    }

    #[test]
    fn raw_attendance_overrides_defaults() {
        let policy = AttendancePolicy::from_raw(RawAttendanceConfig {
            cooldown_seconds: Some(60),
            max_shift_seconds: None,
            sweep_interval_seconds: Some(300),
            display_offset: Some("+08:00".into()),
        });

        assert_eq!(policy.cooldown, Duration::from_secs(60));
        assert_eq!(policy.max_shift, DEFAULT_MAX_SHIFT);
        assert_eq!(policy.sweep_interval, Duration::from_secs(300));
        assert_eq!(policy.display_offset, FixedOffset::east_opt(8 * 3600));
    }

    #[test]
    fn webhook_timeout_defaults() {
        let sink = SinkConfig::from_raw(RawSinkConfig::Webhook {
            url: "https://example.com/hook".into(),
            timeout_seconds: None,
        });
        assert_eq!(
            sink,
            SinkConfig::Webhook {
                url: "https://example.com/hook".into(),
                timeout: DEFAULT_WEBHOOK_TIMEOUT,
            }
        );
    }
}

//! Configuration validation

use crate::schema::{RawAttendanceConfig, RawConfig, RawSinkConfig};
use thiserror::Error;

/// Longest accepted cooldown (one day)
pub const MAX_COOLDOWN_SECONDS: u64 = 86_400;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("attendance.{field}: {message}")]
    AttendanceError { field: &'static str, message: String },

    #[error("Invalid UTC offset '{0}': expected +HH:MM or -HH:MM")]
    InvalidOffset(String),

    #[error("sink: {0}")]
    SinkError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = validate_attendance(&config.attendance);

    if let Some(sink) = &config.sink {
        errors.extend(validate_sink(sink));
    }

    errors
}

fn validate_attendance(raw: &RawAttendanceConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(cooldown) = raw.cooldown_seconds
        && cooldown > MAX_COOLDOWN_SECONDS
    {
        errors.push(ValidationError::AttendanceError {
            field: "cooldown_seconds",
            message: format!("{}s exceeds the maximum of {}s", cooldown, MAX_COOLDOWN_SECONDS),
        });
    }

    if raw.max_shift_seconds == Some(0) {
        errors.push(ValidationError::AttendanceError {
            field: "max_shift_seconds",
            message: "must be greater than zero".into(),
        });
    }

    match raw.sweep_interval_seconds {
        Some(0) => errors.push(ValidationError::AttendanceError {
            field: "sweep_interval_seconds",
            message: "must be greater than zero".into(),
        }),
        Some(interval) => {
            let max_shift = raw
                .max_shift_seconds
                .unwrap_or(crate::DEFAULT_MAX_SHIFT.as_secs());
            if max_shift > 0 && interval > max_shift {
                errors.push(ValidationError::AttendanceError {
                    field: "sweep_interval_seconds",
                    message: format!(
                        "{}s is longer than max_shift_seconds ({}s)",
                        interval, max_shift
                    ),
                });
            }
        }
        None => {}
    }

    if let Some(offset) = &raw.display_offset
        && punch_util::parse_utc_offset(offset).is_none()
    {
        errors.push(ValidationError::InvalidOffset(offset.clone()));
    }

    errors
}

fn validate_sink(sink: &RawSinkConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    match sink {
        RawSinkConfig::None => {}
        RawSinkConfig::Jsonl { path } => {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::SinkError("jsonl path cannot be empty".into()));
            }
        }
        RawSinkConfig::Webhook {
            url,
            timeout_seconds,
        } => {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(ValidationError::SinkError(format!(
                    "webhook url '{}' must start with http:// or https://",
                    url
                )));
            }
            if *timeout_seconds == Some(0) {
                errors.push(ValidationError::SinkError(
                    "webhook timeout_seconds must be greater than zero".into(),
                ));
            }
        }
    }

    errors
}

//! Attendance log rows

use chrono::{DateTime, FixedOffset, Local};
use punch_api::ClockAction;
use serde::{Deserialize, Serialize};

/// One attendance log row: who, what, when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkRow {
    pub name: String,
    pub action: ClockAction,
    /// `YYYY-MM-DD HH:MM:SS` in the configured display offset
    pub timestamp: String,
}

impl SinkRow {
    pub fn new(
        name: impl Into<String>,
        action: ClockAction,
        at: &DateTime<Local>,
        display_offset: Option<FixedOffset>,
    ) -> Self {
        Self {
            name: name.into(),
            action,
            timestamp: punch_util::format_log_timestamp(at, display_offset),
        }
    }
}

//! Open shift records

use chrono::{DateTime, Local};
use punch_api::ShiftView;
use punch_util::{OriginContext, UserId};
use std::time::Duration;

/// One open attendance period
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftRecord {
    pub user_id: UserId,
    pub clock_in_at: DateTime<Local>,
    /// Scope the shift was opened in, for routing notices
    pub origin_context: Option<OriginContext>,
    /// Last display name seen for the user
    pub display_name: Option<String>,
}

impl ShiftRecord {
    /// Time on duty as of `now`
    pub fn elapsed(&self, now: &DateTime<Local>) -> Duration {
        punch_util::elapsed_between(&self.clock_in_at, now)
    }

    /// Whether the shift has been open for at least `max_shift`
    pub fn is_expired(&self, now: &DateTime<Local>, max_shift: Duration) -> bool {
        self.elapsed(now) >= max_shift
    }

    /// Name for log rows: display name when known, otherwise the raw id
    pub fn log_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.user_id.to_string())
    }

    pub fn to_view(&self, now: &DateTime<Local>) -> ShiftView {
        ShiftView {
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            clock_in_at: self.clock_in_at,
            origin_context: self.origin_context.clone(),
            elapsed: self.elapsed(now),
        }
    }
}

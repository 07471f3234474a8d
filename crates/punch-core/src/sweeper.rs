//! Force-closes shifts that have run too long

use chrono::{DateTime, Local};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::{ClockStore, CoreError, ShiftRecord};

/// Closes every open shift whose elapsed time has reached `max_shift`
#[derive(Debug, Clone, Copy)]
pub struct ExpirySweeper {
    max_shift: Duration,
}

impl ExpirySweeper {
    pub fn new(max_shift: Duration) -> Self {
        Self { max_shift }
    }

    pub fn max_shift(&self) -> Duration {
        self.max_shift
    }

    /// Run one pass over a snapshot of the open shifts.
    ///
    /// Each expired shift is closed at `now`. Unreadable records and failed
    /// writes are logged and skipped; the rest of the pass continues and the
    /// skipped users are retried on the next pass. Returns the closed shifts
    /// in insertion order.
    pub fn sweep(&self, store: &mut ClockStore, now: DateTime<Local>) -> Vec<ShiftRecord> {
        let mut expired = Vec::new();

        for user_id in store.open_users() {
            let shift = match store.shift_for(&user_id) {
                Ok(Some(shift)) => shift.clone(),
                // Closed since the snapshot
                Ok(None) => continue,
                Err(CoreError::CorruptRecord { field, value, .. }) => {
                    warn!(user_id = %user_id, field, value = %value, "Skipping unreadable shift");
                    continue;
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Skipping shift");
                    continue;
                }
            };

            if !shift.is_expired(&now, self.max_shift) {
                continue;
            }

            match store.close_shift(&user_id, now) {
                Ok(_) => {
                    info!(
                        user_id = %user_id,
                        elapsed = %punch_util::format_duration_hm(shift.elapsed(&now)),
                        "Shift expired, clocked out"
                    );
                    expired.push(shift);
                }
                Err(e) => {
                    error!(user_id = %user_id, error = %e, "Failed to close expired shift");
                }
            }
        }

        expired
    }
}

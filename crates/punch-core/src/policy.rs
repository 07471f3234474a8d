//! Eligibility rules for clocking in and out

use chrono::{DateTime, Local};
use punch_api::DenyReason;
use punch_util::UserId;
use std::time::Duration;

use crate::{ClockStore, CoreResult};

/// Decision on a clock-in attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ClockInDecision {
    Allowed,
    Denied(DenyReason),
}

/// Decision on a clock-out attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ClockOutDecision {
    /// A shift is open and will be closed
    Allowed,
    /// Nothing is open; the clock-out is still recorded
    AllowedNotActive,
    Denied(DenyReason),
}

/// Pure decision logic over a [`ClockStore`] snapshot
#[derive(Debug, Clone, Copy)]
pub struct EligibilityPolicy {
    cooldown: Duration,
}

impl EligibilityPolicy {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Checked in order: exclusion, open shift, cooldown.
    ///
    /// Clocking in exactly `cooldown` after the last clock-out is allowed.
    /// Errors only when this user's persisted state cannot be read.
    pub fn can_clock_in(
        &self,
        store: &ClockStore,
        user_id: &UserId,
        now: DateTime<Local>,
    ) -> CoreResult<ClockInDecision> {
        if store.is_excluded(user_id) {
            return Ok(ClockInDecision::Denied(DenyReason::Excluded));
        }

        if let Some(shift) = store.shift_for(user_id)? {
            return Ok(ClockInDecision::Denied(DenyReason::AlreadyClockedIn {
                since: shift.clock_in_at,
            }));
        }

        if let Some(last_out) = store.last_clock_out(user_id)? {
            let available_at = last_out + self.cooldown;
            if now < available_at {
                return Ok(ClockInDecision::Denied(DenyReason::CooldownActive {
                    available_at,
                }));
            }
        }

        Ok(ClockInDecision::Allowed)
    }

    /// Clock-out is permissive: only excluded users are refused.
    pub fn can_clock_out(&self, store: &ClockStore, user_id: &UserId) -> ClockOutDecision {
        if store.is_excluded(user_id) {
            ClockOutDecision::Denied(DenyReason::Excluded)
        } else if store.has_open_shift(user_id) {
            ClockOutDecision::Allowed
        } else {
            ClockOutDecision::AllowedNotActive
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use punch_store::SqliteStore;
    use std::sync::Arc;

    fn at(hour: u32, min: u32, sec: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 14, hour, min, sec).unwrap()
    }

    fn setup() -> (EligibilityPolicy, ClockStore) {
        let backend = Arc::new(SqliteStore::in_memory().unwrap());
        (
            EligibilityPolicy::new(Duration::from_secs(300)),
            ClockStore::load(backend).unwrap(),
        )
    }

    #[test]
    fn fresh_user_may_clock_in() {
        let (policy, store) = setup();
        let decision = policy.can_clock_in(&store, &UserId::new("u1"), at(9, 0, 0)).unwrap();
        assert_eq!(decision, ClockInDecision::Allowed);
    }

    #[test]
    fn cooldown_boundary() {
        let (policy, mut store) = setup();
        let u = UserId::new("u1");
        store.close_shift(&u, at(17, 0, 0)).unwrap();

        let before = policy.can_clock_in(&store, &u, at(17, 4, 59)).unwrap();
        assert_eq!(
            before,
            ClockInDecision::Denied(DenyReason::CooldownActive {
                available_at: at(17, 5, 0)
            })
        );

        let exact = policy.can_clock_in(&store, &u, at(17, 5, 0)).unwrap();
        assert_eq!(exact, ClockInDecision::Allowed);

        let after = policy.can_clock_in(&store, &u, at(17, 5, 1)).unwrap();
        assert_eq!(after, ClockInDecision::Allowed);
    }

    #[test]
    fn open_shift_blocks_clock_in() {
        let (policy, mut store) = setup();
        let u = UserId::new("u1");
        store.open_shift(&u, at(9, 0, 0), None, None).unwrap();

        let decision = policy.can_clock_in(&store, &u, at(9, 30, 0)).unwrap();
        assert_eq!(
            decision,
            ClockInDecision::Denied(DenyReason::AlreadyClockedIn { since: at(9, 0, 0) })
        );
        assert_eq!(policy.can_clock_out(&store, &u), ClockOutDecision::Allowed);
    }

    #[test]
    fn exclusion_wins_over_everything() {
        let (policy, mut store) = setup();
        let u = UserId::new("u1");
        store.close_shift(&u, at(8, 0, 0)).unwrap();
        store.exclude(&u).unwrap();

        let decision = policy.can_clock_in(&store, &u, at(8, 1, 0)).unwrap();
        assert_eq!(decision, ClockInDecision::Denied(DenyReason::Excluded));
        assert_eq!(
            policy.can_clock_out(&store, &u),
            ClockOutDecision::Denied(DenyReason::Excluded)
        );
    }

    #[test]
    fn clock_out_without_shift_is_allowed() {
        let (policy, store) = setup();
        assert_eq!(
            policy.can_clock_out(&store, &UserId::new("u1")),
            ClockOutDecision::AllowedNotActive
        );
    }
}

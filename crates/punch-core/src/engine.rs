//! Attendance engine

use chrono::{DateTime, Local};
use punch_api::{
    AttendanceEvent, AttendanceEventKind, AttendanceOutcome, ClockOutKind, DenyReason,
    ShiftView, UserStatus,
};
use punch_config::AttendancePolicy;
use punch_store::{AuditEvent, AuditEventType, Store};
use punch_util::{OriginContext, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    ClockInDecision, ClockOutDecision, ClockStore, CoreError, CoreEvent, CoreResult, EligibilityPolicy,
    ExpirySweeper, ShiftRecord,
};

/// Result of one attendance action: the answer for the caller plus the
/// committed transition, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub outcome: AttendanceOutcome,
    pub event: Option<CoreEvent>,
}

impl Transition {
    fn denied(reason: DenyReason) -> Self {
        Self {
            outcome: AttendanceOutcome::Denied { reason },
            event: None,
        }
    }

    fn ignored() -> Self {
        Self {
            outcome: AttendanceOutcome::Ignored,
            event: None,
        }
    }
}

/// Result of excluding a user
#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub user_id: UserId,
    pub discarded_shift: Option<ShiftRecord>,
}

/// The attendance state machine.
///
/// Owns the clock records and is driven from a single task; every
/// operation takes `&mut self`, so two transitions for the same user can
/// never interleave.
pub struct AttendanceEngine {
    policy: AttendancePolicy,
    eligibility: EligibilityPolicy,
    sweeper: ExpirySweeper,
    records: ClockStore,
    store: Arc<dyn Store>,
}

impl AttendanceEngine {
    /// Load persisted state and set up the rules from `policy`
    pub fn new(policy: AttendancePolicy, store: Arc<dyn Store>) -> CoreResult<Self> {
        let records = ClockStore::load(store.clone())?;

        info!(
            cooldown_secs = policy.cooldown.as_secs(),
            max_shift_secs = policy.max_shift.as_secs(),
            open_shifts = records.open_count(),
            "Attendance engine initialized"
        );

        let _ = store.append_audit(AuditEvent::new(AuditEventType::PolicyLoaded {
            cooldown_secs: policy.cooldown.as_secs(),
            max_shift_secs: policy.max_shift.as_secs(),
        }));

        Ok(Self {
            eligibility: EligibilityPolicy::new(policy.cooldown),
            sweeper: ExpirySweeper::new(policy.max_shift),
            policy,
            records,
            store,
        })
    }

    pub fn policy(&self) -> &AttendancePolicy {
        &self.policy
    }

    pub fn records(&self) -> &ClockStore {
        &self.records
    }

    /// Re-read all state from storage
    pub fn reload(&mut self) -> CoreResult<()> {
        self.records.reload()
    }

    /// Feed one platform event through the state machine.
    ///
    /// `now` is used when the event carries no timestamp of its own.
    pub fn handle_event(
        &mut self,
        event: AttendanceEvent,
        now: DateTime<Local>,
    ) -> CoreResult<Transition> {
        let at = event.at.unwrap_or(now);

        debug!(
            user_id = %event.user_id,
            kind = ?event.kind,
            "Attendance event"
        );

        match event.kind {
            AttendanceEventKind::JoinedChannel | AttendanceEventKind::ClockInCommand => self
                .clock_in(
                    &event.user_id,
                    event.display_name,
                    event.origin_context,
                    at,
                ),
            AttendanceEventKind::ClockOutCommand => {
                self.clock_out(&event.user_id, event.display_name, at)
            }
            AttendanceEventKind::LeftChannel => {
                // Leaving voice while off duty means nothing
                if !self.records.has_open_shift(&event.user_id) {
                    return Ok(Transition::ignored());
                }
                self.clock_out(&event.user_id, event.display_name, at)
            }
        }
    }

    /// Open a shift if the user is eligible
    pub fn clock_in(
        &mut self,
        user_id: &UserId,
        display_name: Option<String>,
        origin_context: Option<OriginContext>,
        now: DateTime<Local>,
    ) -> CoreResult<Transition> {
        match self.eligibility.can_clock_in(&self.records, user_id, now)? {
            ClockInDecision::Allowed => {}
            ClockInDecision::Denied(reason) => {
                debug!(user_id = %user_id, reason = %reason, "Clock-in denied");

                let _ = self.store.append_audit(AuditEvent::new(AuditEventType::ClockInDenied {
                    user_id: user_id.clone(),
                    reason: reason.to_string(),
                }));

                return Ok(Transition::denied(reason));
            }
        }

        let shift = match self
            .records
            .open_shift(user_id, now, origin_context, display_name)
        {
            Ok(shift) => shift,
            Err(CoreError::AlreadyOpen { .. }) => {
                // Storage holds a shift memory missed; resync and answer from it
                self.records.reload()?;
                return match self.eligibility.can_clock_in(&self.records, user_id, now)? {
                    ClockInDecision::Denied(reason) => Ok(Transition::denied(reason)),
                    ClockInDecision::Allowed => Err(CoreError::AlreadyOpen {
                        user_id: user_id.clone(),
                    }),
                };
            }
            Err(e) => return Err(e),
        };

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::ShiftOpened {
            user_id: user_id.clone(),
            origin_context: shift.origin_context.clone(),
            clock_in_at: shift.clock_in_at,
        }));

        info!(
            user_id = %user_id,
            origin_context = ?shift.origin_context,
            "Clocked in"
        );

        Ok(Transition {
            outcome: AttendanceOutcome::ClockedIn {
                shift: shift.to_view(&now),
            },
            event: Some(CoreEvent::ClockedIn { shift }),
        })
    }

    /// Close the user's shift. With nothing open the clock-out is still
    /// recorded and `was_active` is false.
    pub fn clock_out(
        &mut self,
        user_id: &UserId,
        display_name: Option<String>,
        now: DateTime<Local>,
    ) -> CoreResult<Transition> {
        match self.eligibility.can_clock_out(&self.records, user_id) {
            ClockOutDecision::Denied(reason) => return Ok(Transition::denied(reason)),
            ClockOutDecision::AllowedNotActive => {
                warn!(user_id = %user_id, "Clock-out with no open shift");
            }
            ClockOutDecision::Allowed => {}
        }

        self.close(user_id, display_name, ClockOutKind::Manual, now)
    }

    /// Administrative clock-out; refused when nothing is open
    pub fn force_clock_out(
        &mut self,
        user_id: &UserId,
        now: DateTime<Local>,
    ) -> CoreResult<Transition> {
        if !self.records.has_open_shift(user_id) {
            return Ok(Transition::denied(DenyReason::NotClockedIn));
        }

        self.close(user_id, None, ClockOutKind::Forced, now)
    }

    fn close(
        &mut self,
        user_id: &UserId,
        display_name: Option<String>,
        kind: ClockOutKind,
        now: DateTime<Local>,
    ) -> CoreResult<Transition> {
        let closed = self.records.close_shift(user_id, now)?;
        let was_active = closed.is_some();
        let duration = closed.as_ref().map(|shift| shift.elapsed(&now));

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::ShiftClosed {
            user_id: user_id.clone(),
            kind,
            was_active,
            duration,
        }));

        info!(
            user_id = %user_id,
            kind = ?kind,
            was_active,
            duration = ?duration.map(punch_util::format_duration_hm),
            "Clocked out"
        );

        Ok(Transition {
            outcome: AttendanceOutcome::ClockedOut {
                was_active,
                shift: closed.as_ref().map(|shift| shift.to_view(&now)),
            },
            event: Some(Self::clock_out_event(user_id, display_name, kind, now, closed)),
        })
    }

    fn clock_out_event(
        user_id: &UserId,
        display_name: Option<String>,
        kind: ClockOutKind,
        at: DateTime<Local>,
        shift: Option<ShiftRecord>,
    ) -> CoreEvent {
        let display_name =
            display_name.or_else(|| shift.as_ref().and_then(|s| s.display_name.clone()));
        let origin_context = shift.as_ref().and_then(|s| s.origin_context.clone());

        CoreEvent::ClockedOut {
            user_id: user_id.clone(),
            display_name,
            origin_context,
            kind,
            at,
            shift,
        }
    }

    /// Put the user on the exclusion list, discarding any open shift
    /// without logging a clock-out
    pub fn exclude(&mut self, user_id: &UserId) -> CoreResult<Exclusion> {
        let discarded_shift = self.records.exclude(user_id)?;

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::UserExcluded {
            user_id: user_id.clone(),
            discarded_shift: discarded_shift.is_some(),
        }));

        info!(
            user_id = %user_id,
            discarded_shift = discarded_shift.is_some(),
            "User excluded"
        );

        Ok(Exclusion {
            user_id: user_id.clone(),
            discarded_shift,
        })
    }

    /// Take the user off the exclusion list. Returns whether they were on it.
    pub fn include(&mut self, user_id: &UserId) -> CoreResult<bool> {
        let was_excluded = self.records.include(user_id)?;

        if was_excluded {
            let _ = self.store.append_audit(AuditEvent::new(AuditEventType::UserIncluded {
                user_id: user_id.clone(),
            }));
            info!(user_id = %user_id, "User included");
        }

        Ok(was_excluded)
    }

    pub fn list_excluded(&self) -> Vec<UserId> {
        self.records.list_excluded()
    }

    /// Open shifts in clock-in order, optionally limited to one scope
    pub fn list_open(&self, scope: Option<&OriginContext>, now: DateTime<Local>) -> Vec<ShiftView> {
        self.records
            .list_open(scope)
            .iter()
            .map(|shift| shift.to_view(&now))
            .collect()
    }

    pub fn status(&self, user_id: &UserId, now: DateTime<Local>) -> CoreResult<UserStatus> {
        Ok(UserStatus {
            user_id: user_id.clone(),
            excluded: self.records.is_excluded(user_id),
            open_shift: self.records.shift_for(user_id)?.map(|s| s.to_view(&now)),
            last_clock_out: self.records.last_clock_out(user_id)?,
        })
    }

    pub fn open_count(&self) -> usize {
        self.records.open_count()
    }

    pub fn store_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    /// Run the expiry sweep; one `ClockedOut { kind: Auto }` per closed shift
    pub fn tick(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let expired = self.sweeper.sweep(&mut self.records, now);

        expired
            .into_iter()
            .map(|shift| {
                let _ = self.store.append_audit(AuditEvent::new(AuditEventType::ShiftClosed {
                    user_id: shift.user_id.clone(),
                    kind: ClockOutKind::Auto,
                    was_active: true,
                    duration: Some(shift.elapsed(&now)),
                }));

                let user_id = shift.user_id.clone();
                Self::clock_out_event(&user_id, None, ClockOutKind::Auto, now, Some(shift))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use punch_store::SqliteStore;
    use std::time::Duration;

    fn at(hour: u32, min: u32, sec: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 14, hour, min, sec).unwrap()
    }

    fn make_engine() -> AttendanceEngine {
        let policy = AttendancePolicy {
            cooldown: Duration::from_secs(300),
            max_shift: Duration::from_secs(14 * 3600),
            ..Default::default()
        };
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        AttendanceEngine::new(policy, store).unwrap()
    }

    fn event(user: &str, kind: AttendanceEventKind) -> AttendanceEvent {
        AttendanceEvent {
            user_id: UserId::new(user),
            display_name: Some(format!("{user}-name")),
            kind,
            origin_context: Some(OriginContext::new("guild-1")),
            at: None,
        }
    }

    #[test]
    fn test_join_opens_shift() {
        let mut engine = make_engine();

        let t = engine
            .handle_event(event("u1", AttendanceEventKind::JoinedChannel), at(9, 0, 0))
            .unwrap();

        assert!(matches!(t.outcome, AttendanceOutcome::ClockedIn { .. }));
        assert!(matches!(t.event, Some(CoreEvent::ClockedIn { .. })));
        assert_eq!(engine.open_count(), 1);
    }

    #[test]
    fn test_join_while_open_is_denied() {
        let mut engine = make_engine();
        engine
            .handle_event(event("u1", AttendanceEventKind::JoinedChannel), at(9, 0, 0))
            .unwrap();

        let t = engine
            .handle_event(event("u1", AttendanceEventKind::JoinedChannel), at(9, 30, 0))
            .unwrap();

        assert_eq!(
            t.outcome,
            AttendanceOutcome::Denied {
                reason: DenyReason::AlreadyClockedIn { since: at(9, 0, 0) }
            }
        );
        assert!(t.event.is_none());
    }

    #[test]
    fn test_leave_closes_shift() {
        let mut engine = make_engine();
        engine
            .handle_event(event("u1", AttendanceEventKind::JoinedChannel), at(9, 0, 0))
            .unwrap();

        let t = engine
            .handle_event(event("u1", AttendanceEventKind::LeftChannel), at(17, 0, 0))
            .unwrap();

        match t.outcome {
            AttendanceOutcome::ClockedOut { was_active, shift } => {
                assert!(was_active);
                assert_eq!(shift.unwrap().elapsed, Duration::from_secs(8 * 3600));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        match t.event {
            Some(CoreEvent::ClockedOut { kind, origin_context, .. }) => {
                assert_eq!(kind, ClockOutKind::Manual);
                assert_eq!(origin_context, Some(OriginContext::new("guild-1")));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_leave_while_off_duty_is_ignored() {
        let mut engine = make_engine();

        let t = engine
            .handle_event(event("u1", AttendanceEventKind::LeftChannel), at(17, 0, 0))
            .unwrap();

        assert_eq!(t.outcome, AttendanceOutcome::Ignored);
        assert!(t.event.is_none());
        assert_eq!(engine.records().last_clock_out(&UserId::new("u1")).unwrap(), None);
    }

    #[test]
    fn test_clock_out_command_without_shift_is_recorded() {
        let mut engine = make_engine();

        let t = engine
            .handle_event(event("u1", AttendanceEventKind::ClockOutCommand), at(12, 0, 0))
            .unwrap();

        assert_eq!(
            t.outcome,
            AttendanceOutcome::ClockedOut {
                was_active: false,
                shift: None
            }
        );
        assert!(t.event.is_some());
        assert_eq!(
            engine.records().last_clock_out(&UserId::new("u1")).unwrap(),
            Some(at(12, 0, 0))
        );
    }

    #[test]
    fn test_cooldown_after_clock_out() {
        let mut engine = make_engine();
        let u = UserId::new("u1");

        engine.clock_in(&u, None, None, at(9, 0, 0)).unwrap();
        engine.clock_out(&u, None, at(17, 0, 0)).unwrap();

        let early = engine.clock_in(&u, None, None, at(17, 4, 59)).unwrap();
        assert_eq!(
            early.outcome,
            AttendanceOutcome::Denied {
                reason: DenyReason::CooldownActive {
                    available_at: at(17, 5, 0)
                }
            }
        );

        let on_time = engine.clock_in(&u, None, None, at(17, 5, 0)).unwrap();
        assert!(matches!(on_time.outcome, AttendanceOutcome::ClockedIn { .. }));
    }

    #[test]
    fn test_event_timestamp_overrides_now() {
        let mut engine = make_engine();
        let mut ev = event("u1", AttendanceEventKind::ClockInCommand);
        ev.at = Some(at(8, 0, 0));

        let t = engine.handle_event(ev, at(8, 0, 5)).unwrap();
        match t.outcome {
            AttendanceOutcome::ClockedIn { shift } => assert_eq!(shift.clock_in_at, at(8, 0, 0)),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_late_clock_out_does_not_shorten_cooldown() {
        let mut engine = make_engine();
        let u = UserId::new("u1");

        let mut out = event("u1", AttendanceEventKind::ClockOutCommand);
        out.at = Some(at(17, 0, 0));
        engine.handle_event(out, at(17, 0, 0)).unwrap();

        // Delivered late, stamped with a morning time
        let mut late = event("u1", AttendanceEventKind::ClockOutCommand);
        late.at = Some(at(9, 0, 0));
        engine.handle_event(late, at(17, 1, 0)).unwrap();

        assert_eq!(engine.records().last_clock_out(&u).unwrap(), Some(at(17, 0, 0)));

        let t = engine
            .handle_event(event("u1", AttendanceEventKind::ClockInCommand), at(17, 2, 0))
            .unwrap();
        assert_eq!(
            t.outcome,
            AttendanceOutcome::Denied {
                reason: DenyReason::CooldownActive {
                    available_at: at(17, 5, 0)
                }
            }
        );
    }

    #[test]
    fn test_force_clock_out() {
        let mut engine = make_engine();
        let u = UserId::new("u1");

        let none = engine.force_clock_out(&u, at(10, 0, 0)).unwrap();
        assert_eq!(
            none.outcome,
            AttendanceOutcome::Denied {
                reason: DenyReason::NotClockedIn
            }
        );

        engine.clock_in(&u, Some("maria".into()), None, at(9, 0, 0)).unwrap();
        let forced = engine.force_clock_out(&u, at(10, 0, 0)).unwrap();
        let event = forced.event.unwrap();
        assert_eq!(event.action(), punch_api::ClockAction::ClockOutForce);
        assert_eq!(event.log_name(), "maria");
    }

    #[test]
    fn test_exclude_discards_without_event() {
        let mut engine = make_engine();
        let u = UserId::new("u1");
        engine.clock_in(&u, None, None, at(9, 0, 0)).unwrap();

        let exclusion = engine.exclude(&u).unwrap();
        assert!(exclusion.discarded_shift.is_some());
        assert_eq!(engine.open_count(), 0);
        assert_eq!(engine.records().last_clock_out(&u).unwrap(), None);

        let t = engine.clock_in(&u, None, None, at(9, 5, 0)).unwrap();
        assert_eq!(
            t.outcome,
            AttendanceOutcome::Denied {
                reason: DenyReason::Excluded
            }
        );

        assert!(engine.include(&u).unwrap());
        let t = engine.clock_in(&u, None, None, at(9, 6, 0)).unwrap();
        assert!(matches!(t.outcome, AttendanceOutcome::ClockedIn { .. }));
    }

    #[test]
    fn test_tick_expires_long_shift() {
        let mut engine = make_engine();
        let u = UserId::new("u1");
        engine
            .clock_in(&u, Some("maria".into()), Some(OriginContext::new("g")), at(8, 0, 0))
            .unwrap();

        assert!(engine.tick(at(21, 45, 0)).is_empty());

        let events = engine.tick(at(22, 0, 0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action(), punch_api::ClockAction::ClockOutAuto);
        assert_eq!(events[0].log_name(), "maria");
        assert_eq!(engine.open_count(), 0);

        // Cooldown runs from the forced close
        let t = engine.clock_in(&u, None, None, at(22, 2, 0)).unwrap();
        assert!(matches!(t.outcome, AttendanceOutcome::Denied { .. }));
    }

    #[test]
    fn test_stale_memory_resyncs_on_conflict() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let policy = AttendancePolicy::default();
        let mut first = AttendanceEngine::new(policy, store.clone()).unwrap();
        let mut stale = AttendanceEngine::new(policy, store).unwrap();
        let u = UserId::new("u1");

        first.clock_in(&u, None, None, at(9, 0, 0)).unwrap();

        let t = stale.clock_in(&u, None, None, at(9, 1, 0)).unwrap();
        assert_eq!(
            t.outcome,
            AttendanceOutcome::Denied {
                reason: DenyReason::AlreadyClockedIn { since: at(9, 0, 0) }
            }
        );
        assert_eq!(stale.open_count(), 1);
    }

    #[test]
    fn test_status() {
        let mut engine = make_engine();
        let u = UserId::new("u1");
        engine.clock_in(&u, None, None, at(9, 0, 0)).unwrap();

        let status = engine.status(&u, at(9, 30, 0)).unwrap();
        assert!(!status.excluded);
        assert_eq!(
            status.open_shift.map(|s| s.elapsed),
            Some(Duration::from_secs(1800))
        );
        assert!(status.last_clock_out.is_none());
    }
}

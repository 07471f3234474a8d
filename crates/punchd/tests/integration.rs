//! Integration tests for punchd
//!
//! These drive the attendance engine over a real SQLite store through
//! complete workdays.

use chrono::{DateTime, Local, TimeZone};
use punch_api::{
    AttendanceEvent, AttendanceEventKind, AttendanceOutcome, ClockAction, DenyReason, NoticeKind,
};
use punch_config::AttendancePolicy;
use punch_core::{AttendanceEngine, ClockInDecision, ClockStore, EligibilityPolicy};
use punch_sink::{AttendanceSink, MockSink, SinkRow};
use punch_store::{SqliteStore, Store};
use punch_util::{OriginContext, UserId};
use std::sync::Arc;
use std::time::Duration;

fn at(day: u32, hour: u32, min: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 3, day, hour, min, 0).unwrap()
}

fn make_policy() -> AttendancePolicy {
    AttendancePolicy {
        cooldown: Duration::from_secs(5 * 60),
        max_shift: Duration::from_secs(14 * 3600),
        sweep_interval: Duration::from_secs(15 * 60),
        display_offset: None,
    }
}

fn make_engine() -> AttendanceEngine {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    AttendanceEngine::new(make_policy(), store).unwrap()
}

fn voice(user: &str, kind: AttendanceEventKind, when: DateTime<Local>) -> AttendanceEvent {
    AttendanceEvent {
        user_id: UserId::new(user),
        display_name: Some(user.to_uppercase()),
        kind,
        origin_context: Some(OriginContext::new("guild-1")),
        at: Some(when),
    }
}

#[test]
fn test_workday_clock_in_and_out() {
    let mut engine = make_engine();
    let policy = EligibilityPolicy::new(make_policy().cooldown);
    let u = UserId::new("u");

    let t = engine
        .handle_event(voice("u", AttendanceEventKind::JoinedChannel, at(14, 9, 0)), at(14, 9, 0))
        .unwrap();
    assert!(matches!(t.outcome, AttendanceOutcome::ClockedIn { .. }));

    assert_eq!(
        policy.can_clock_in(engine.records(), &u, at(14, 9, 5)).unwrap(),
        ClockInDecision::Denied(DenyReason::AlreadyClockedIn {
            since: at(14, 9, 0)
        })
    );

    engine
        .handle_event(voice("u", AttendanceEventKind::LeftChannel, at(14, 17, 0)), at(14, 17, 0))
        .unwrap();

    assert!(engine.list_open(None, at(14, 17, 0)).is_empty());
    assert_eq!(engine.records().last_clock_out(&u).unwrap(), Some(at(14, 17, 0)));
}

#[test]
fn test_cooldown_after_clock_out() {
    let mut engine = make_engine();
    let policy = EligibilityPolicy::new(make_policy().cooldown);
    let u = UserId::new("u");

    engine.clock_out(&u, None, at(14, 17, 0)).unwrap();

    assert_eq!(
        policy.can_clock_in(engine.records(), &u, at(14, 17, 3)).unwrap(),
        ClockInDecision::Denied(DenyReason::CooldownActive {
            available_at: at(14, 17, 5)
        })
    );
    assert_eq!(
        policy.can_clock_in(engine.records(), &u, at(14, 17, 6)).unwrap(),
        ClockInDecision::Allowed
    );
}

#[test]
fn test_sweeper_closes_shift_at_max_duration() {
    let mut engine = make_engine();
    let u = UserId::new("u");

    engine
        .clock_in(&u, Some("U".into()), Some(OriginContext::new("guild-1")), at(14, 8, 0))
        .unwrap();

    // Sweep every 15 minutes through the day
    let mut now = at(14, 8, 0);
    let mut expired = Vec::new();
    while expired.is_empty() {
        now += chrono::Duration::minutes(15);
        expired = engine.tick(now);
        assert!(now <= at(14, 22, 0), "shift never expired");
    }

    assert_eq!(now, at(14, 22, 0));
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].action(), ClockAction::ClockOutAuto);

    let notice = expired[0].notice();
    assert_eq!(notice.kind, NoticeKind::ShiftExpired);
    assert_eq!(notice.origin_context, Some(OriginContext::new("guild-1")));
    assert_eq!(engine.open_count(), 0);
}

#[test]
fn test_exclusion_discards_open_shift() {
    let mut engine = make_engine();
    let policy = EligibilityPolicy::new(make_policy().cooldown);
    let v = UserId::new("v");

    engine.clock_in(&v, None, None, at(14, 10, 0)).unwrap();
    engine.clock_in(&UserId::new("w"), None, None, at(14, 10, 5)).unwrap();

    let exclusion = engine.exclude(&v).unwrap();
    assert_eq!(
        exclusion.discarded_shift.map(|s| s.clock_in_at),
        Some(at(14, 10, 0))
    );

    let open: Vec<_> = engine
        .list_open(None, at(14, 10, 10))
        .into_iter()
        .map(|s| s.user_id)
        .collect();
    assert_eq!(open, vec![UserId::new("w")]);

    for when in [at(14, 10, 1), at(15, 9, 0), at(20, 12, 0)] {
        assert_eq!(
            policy.can_clock_in(engine.records(), &v, when).unwrap(),
            ClockInDecision::Denied(DenyReason::Excluded)
        );
    }
}

#[test]
fn test_close_shift_is_idempotent() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let mut records = ClockStore::load(store).unwrap();
    let u = UserId::new("u");

    records.open_shift(&u, at(14, 9, 0), None, None).unwrap();

    assert!(records.close_shift(&u, at(14, 17, 0)).unwrap().is_some());
    assert!(records.close_shift(&u, at(14, 17, 1)).unwrap().is_none());
    assert_eq!(records.last_clock_out(&u).unwrap(), Some(at(14, 17, 1)));
}

#[test]
fn test_at_most_one_open_shift_per_user() {
    let mut engine = make_engine();
    let kinds = [
        AttendanceEventKind::JoinedChannel,
        AttendanceEventKind::ClockInCommand,
        AttendanceEventKind::JoinedChannel,
        AttendanceEventKind::LeftChannel,
        AttendanceEventKind::ClockOutCommand,
        AttendanceEventKind::JoinedChannel,
        AttendanceEventKind::ClockInCommand,
    ];

    let mut now = at(14, 8, 0);
    for kind in kinds {
        for user in ["a", "b"] {
            engine.handle_event(voice(user, kind, now), now).unwrap();
        }
        engine.tick(now);

        for user in ["a", "b"] {
            let count = engine
                .list_open(None, now)
                .iter()
                .filter(|s| s.user_id == UserId::new(user))
                .count();
            assert!(count <= 1, "{user} has {count} open shifts");
        }
        now += chrono::Duration::minutes(7);
    }
}

#[test]
fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("punchd.db");
    let u = UserId::new("u");
    let v = UserId::new("v");

    {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        let mut engine = AttendanceEngine::new(make_policy(), store).unwrap();
        engine
            .clock_in(&u, Some("U".into()), Some(OriginContext::new("guild-1")), at(14, 9, 0))
            .unwrap();
        engine.clock_in(&v, None, None, at(14, 9, 30)).unwrap();
        engine.clock_out(&v, None, at(14, 12, 0)).unwrap();
        engine.exclude(&UserId::new("x")).unwrap();
    }

    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let mut engine = AttendanceEngine::new(make_policy(), store).unwrap();

    let open = engine.list_open(None, at(14, 13, 0));
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].user_id, u);
    assert_eq!(open[0].display_name.as_deref(), Some("U"));
    assert_eq!(open[0].origin_context, Some(OriginContext::new("guild-1")));
    assert_eq!(engine.records().last_clock_out(&v).unwrap(), Some(at(14, 12, 0)));
    assert_eq!(engine.list_excluded(), vec![UserId::new("x")]);

    // Cooldown is enforced across the restart
    let t = engine.clock_in(&v, None, None, at(14, 12, 2)).unwrap();
    assert!(matches!(
        t.outcome,
        AttendanceOutcome::Denied {
            reason: DenyReason::CooldownActive { .. }
        }
    ));
}

#[tokio::test]
async fn test_sink_failure_leaves_state_committed() {
    let mut engine = make_engine();
    let sink = MockSink::new();
    sink.set_failing(true);
    let u = UserId::new("u");

    let t = engine.clock_in(&u, Some("U".into()), None, at(14, 9, 0)).unwrap();
    let event = t.event.unwrap();

    let row = SinkRow::new(event.log_name(), event.action(), &event.at(), None);
    assert!(sink.append(&row).await.is_err());

    assert!(engine.records().has_open_shift(&u));
    assert_eq!(engine.open_count(), 1);
}

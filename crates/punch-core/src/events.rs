//! Core events emitted by the engine

use chrono::{DateTime, Local};
use punch_api::{ClockAction, ClockOutKind, Notice, NoticeKind};
use punch_util::{OriginContext, UserId};

use crate::ShiftRecord;

/// A committed attendance transition.
///
/// Emitted only after the change has been persisted; the service turns each
/// one into an attendance log row and a user-facing notice.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    ClockedIn {
        shift: ShiftRecord,
    },

    ClockedOut {
        user_id: UserId,
        display_name: Option<String>,
        origin_context: Option<OriginContext>,
        kind: ClockOutKind,
        at: DateTime<Local>,
        /// The shift that was closed; `None` for a permissive clock-out
        shift: Option<ShiftRecord>,
    },
}

impl CoreEvent {
    pub fn user_id(&self) -> &UserId {
        match self {
            CoreEvent::ClockedIn { shift } => &shift.user_id,
            CoreEvent::ClockedOut { user_id, .. } => user_id,
        }
    }

    pub fn at(&self) -> DateTime<Local> {
        match self {
            CoreEvent::ClockedIn { shift } => shift.clock_in_at,
            CoreEvent::ClockedOut { at, .. } => *at,
        }
    }

    /// Attendance log action
    pub fn action(&self) -> ClockAction {
        match self {
            CoreEvent::ClockedIn { .. } => ClockAction::ClockIn,
            CoreEvent::ClockedOut { kind, .. } => kind.action(),
        }
    }

    /// Name written to the attendance log
    pub fn log_name(&self) -> String {
        match self {
            CoreEvent::ClockedIn { shift } => shift.log_name(),
            CoreEvent::ClockedOut {
                user_id,
                display_name,
                ..
            } => display_name
                .clone()
                .unwrap_or_else(|| user_id.to_string()),
        }
    }

    pub fn notice(&self) -> Notice {
        match self {
            CoreEvent::ClockedIn { shift } => Notice {
                user_id: shift.user_id.clone(),
                display_name: shift.display_name.clone(),
                origin_context: shift.origin_context.clone(),
                kind: NoticeKind::ClockedIn,
                at: shift.clock_in_at,
            },
            CoreEvent::ClockedOut {
                user_id,
                display_name,
                origin_context,
                kind,
                at,
                ..
            } => Notice {
                user_id: user_id.clone(),
                display_name: display_name.clone(),
                origin_context: origin_context.clone(),
                kind: match kind {
                    ClockOutKind::Auto => NoticeKind::ShiftExpired,
                    ClockOutKind::Manual | ClockOutKind::Forced => NoticeKind::ClockedOut,
                },
                at: *at,
            },
        }
    }
}

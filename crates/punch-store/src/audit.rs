//! Audit event types

use chrono::{DateTime, Local};
use punch_api::ClockOutKind;
use punch_util::{OriginContext, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    ServiceStarted,

    ServiceStopped,

    /// Attendance rules loaded
    PolicyLoaded {
        cooldown_secs: u64,
        max_shift_secs: u64,
    },

    ShiftOpened {
        user_id: UserId,
        origin_context: Option<OriginContext>,
        clock_in_at: DateTime<Local>,
    },

    ShiftClosed {
        user_id: UserId,
        kind: ClockOutKind,
        /// False for a permissive clock-out with nothing open
        was_active: bool,
        duration: Option<Duration>,
    },

    ClockInDenied {
        user_id: UserId,
        reason: String,
    },

    UserExcluded {
        user_id: UserId,
        discarded_shift: bool,
    },

    UserIncluded {
        user_id: UserId,
    },

    ClientConnected {
        client_id: String,
        role: String,
        uid: Option<u32>,
    },

    ClientDisconnected {
        client_id: String,
    },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    pub timestamp: DateTime<Local>,

    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: punch_util::now(),
            event,
        }
    }
}

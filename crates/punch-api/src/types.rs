//! Shared types for the punchd API

use chrono::{DateTime, Local};
use punch_util::{OriginContext, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What happened on the chat platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceEventKind {
    /// User entered a voice channel (or moved between channels)
    JoinedChannel,
    /// User left voice entirely
    LeftChannel,
    /// Explicit clock-in command
    ClockInCommand,
    /// Explicit clock-out command
    ClockOutCommand,
}

/// An attendance signal forwarded by the platform bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub user_id: UserId,
    /// Display name used for attendance log rows
    #[serde(default)]
    pub display_name: Option<String>,
    pub kind: AttendanceEventKind,
    #[serde(default)]
    pub origin_context: Option<OriginContext>,
    /// When the event happened; the service clock is used if absent
    #[serde(default)]
    pub at: Option<DateTime<Local>>,
}

/// Why an attendance transition was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DenyReason {
    /// User is on the exclusion list
    Excluded,
    /// A shift is already open
    AlreadyClockedIn { since: DateTime<Local> },
    /// Clocked out too recently
    CooldownActive { available_at: DateTime<Local> },
    /// No open shift to act on
    NotClockedIn,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Excluded => write!(f, "user is excluded from attendance tracking"),
            DenyReason::AlreadyClockedIn { since } => {
                write!(f, "already clocked in since {}", since.format("%H:%M"))
            }
            DenyReason::CooldownActive { available_at } => {
                write!(f, "cooldown active until {}", available_at.format("%H:%M:%S"))
            }
            DenyReason::NotClockedIn => write!(f, "not currently clocked in"),
        }
    }
}

/// How a shift ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockOutKind {
    /// User left voice or used the clock-out command
    Manual,
    /// Administrator forced the clock-out
    Forced,
    /// Shift exceeded the maximum duration
    Auto,
}

impl ClockOutKind {
    pub fn action(self) -> ClockAction {
        match self {
            ClockOutKind::Manual => ClockAction::ClockOut,
            ClockOutKind::Forced => ClockAction::ClockOutForce,
            ClockOutKind::Auto => ClockAction::ClockOutAuto,
        }
    }
}

/// Action column written to the attendance log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockAction {
    #[serde(rename = "Clock In")]
    ClockIn,
    #[serde(rename = "Clock Out")]
    ClockOut,
    #[serde(rename = "Clock Out (Auto)")]
    ClockOutAuto,
    #[serde(rename = "Clock Out (Force)")]
    ClockOutForce,
}

impl ClockAction {
    pub fn label(self) -> &'static str {
        match self {
            ClockAction::ClockIn => "Clock In",
            ClockAction::ClockOut => "Clock Out",
            ClockAction::ClockOutAuto => "Clock Out (Auto)",
            ClockAction::ClockOutForce => "Clock Out (Force)",
        }
    }
}

impl fmt::Display for ClockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// View of an open shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftView {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub clock_in_at: DateTime<Local>,
    pub origin_context: Option<OriginContext>,
    /// Time on duty as of the response
    pub elapsed: Duration,
}

/// Result of feeding one attendance event to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttendanceOutcome {
    ClockedIn {
        shift: ShiftView,
    },
    ClockedOut {
        /// False when no shift was open (permissive clock-out)
        was_active: bool,
        /// The closed shift, if one was open
        shift: Option<ShiftView>,
    },
    Denied {
        reason: DenyReason,
    },
    /// Event carried no attendance meaning (e.g. leaving voice while off duty)
    Ignored,
}

/// Attendance state of a single user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatus {
    pub user_id: UserId,
    pub excluded: bool,
    pub open_shift: Option<ShiftView>,
    pub last_clock_out: Option<DateTime<Local>>,
}

/// Kind of user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    ClockedIn,
    ClockedOut,
    ShiftExpired,
}

/// Notice routed back to the scope a shift belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub origin_context: Option<OriginContext>,
    pub kind: NoticeKind,
    pub at: DateTime<Local>,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Chat-platform bridge: attendance events and queries
    Bridge,
    /// Local administrator: may also exclude, include and force clock-outs
    Admin,
}

impl ClientRole {
    pub fn can_administer(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub open_shifts: usize,
}

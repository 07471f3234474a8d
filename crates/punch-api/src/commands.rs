//! Command types for the punchd protocol

use punch_util::{ClientId, OriginContext, UserId};
use serde::{Deserialize, Serialize};

use crate::{API_VERSION, AttendanceEvent, AttendanceOutcome, HealthStatus, ShiftView, UserStatus};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    pub api_version: u32,
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    pub api_version: u32,
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    PermissionDenied,
    /// A persisted record for this user could not be read
    CorruptRecord,
    StorageError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Voice join/leave or clock command from the platform
    Attendance(AttendanceEvent),

    /// Attendance state of one user
    GetStatus { user_id: UserId },

    /// Who is on duty, optionally limited to one scope
    ListOpen {
        #[serde(default)]
        origin_context: Option<OriginContext>,
    },

    // Admin commands
    /// Opt a user out of tracking (discards any open shift)
    Exclude { user_id: UserId },

    /// Opt a user back in
    Include { user_id: UserId },

    ListExcluded,

    /// Close a user's shift regardless of eligibility
    ForceClockOut { user_id: UserId },

    /// Subscribe to notices (returns immediately, events stream separately)
    SubscribeEvents,

    UnsubscribeEvents,

    GetHealth,

    Ping,
}

impl Command {
    /// Whether the command needs the admin role
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Command::Exclude { .. }
                | Command::Include { .. }
                | Command::ListExcluded
                | Command::ForceClockOut { .. }
        )
    }
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    Outcome {
        outcome: AttendanceOutcome,
    },
    Status(UserStatus),
    OpenShifts {
        shifts: Vec<ShiftView>,
    },
    Excluded {
        user_id: UserId,
        /// Shift discarded by the exclusion, if one was open
        discarded_shift: Option<ShiftView>,
    },
    Included {
        user_id: UserId,
        was_excluded: bool,
    },
    ExcludedUsers {
        users: Vec<UserId>,
    },
    Subscribed {
        client_id: ClientId,
    },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: crate::ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new(role: crate::ClientRole) -> Self {
        Self {
            client_id: ClientId::new(),
            role,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttendanceEventKind, DenyReason};

    #[test]
    fn attendance_request_wire_format() {
        let json = r#"{
            "request_id": 7,
            "api_version": 1,
            "command": {
                "type": "attendance",
                "user_id": "1001",
                "display_name": "maria",
                "kind": "clock_out_command",
                "origin_context": "guild-1"
            }
        }"#;

        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(request.request_id, 7);
        match request.command {
            Command::Attendance(event) => {
                assert_eq!(event.user_id.as_str(), "1001");
                assert_eq!(event.kind, AttendanceEventKind::ClockOutCommand);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn admin_commands_are_flagged() {
        assert!(Command::Exclude { user_id: "u".into() }.is_admin());
        assert!(Command::ForceClockOut { user_id: "u".into() }.is_admin());
        assert!(!Command::ListOpen { origin_context: None }.is_admin());
        assert!(!Command::GetHealth.is_admin());
    }

    #[test]
    fn denied_outcome_response() {
        let resp = Response::success(
            3,
            ResponsePayload::Outcome {
                outcome: AttendanceOutcome::Denied {
                    reason: DenyReason::Excluded,
                },
            },
        );

        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"outcome\":\"denied\""));
        assert!(json.contains("\"code\":\"excluded\""));

        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            parsed.result,
            ResponseResult::Ok(ResponsePayload::Outcome {
                outcome: AttendanceOutcome::Denied { reason: DenyReason::Excluded }
            })
        ));
    }
}

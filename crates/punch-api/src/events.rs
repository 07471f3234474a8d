//! Event types for punchd -> client streaming

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{API_VERSION, Notice};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: punch_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A user-facing notice for the bridge to deliver in its origin context
    Notice(Notice),

    /// Service is shutting down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoticeKind;
    use punch_util::{OriginContext, UserId};

    #[test]
    fn notice_event_serialization() {
        let event = Event::new(EventPayload::Notice(Notice {
            user_id: UserId::new("1001"),
            display_name: Some("maria".into()),
            origin_context: Some(OriginContext::new("guild-1")),
            kind: NoticeKind::ShiftExpired,
            at: punch_util::now(),
        }));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"notice\""));
        assert!(json.contains("\"kind\":\"shift_expired\""));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.api_version, API_VERSION);
        match parsed.payload {
            EventPayload::Notice(notice) => {
                assert_eq!(notice.origin_context.unwrap().as_str(), "guild-1");
            }
            EventPayload::Shutdown => panic!("Expected Notice"),
        }
    }
}

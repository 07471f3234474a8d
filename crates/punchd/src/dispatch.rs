//! Command handling

use punch_api::{
    ClientRole, Command, ErrorCode, ErrorInfo, HealthStatus, Response, ResponsePayload,
};
use punch_core::{AttendanceEngine, CoreError};
use punch_util::ClientId;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::outbox::Outbox;

/// Turns requests into engine calls and engine results into responses.
///
/// The engine lock is held only for the state change itself; delivery of
/// the resulting events happens on the outbox task.
#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<Mutex<AttendanceEngine>>,
    outbox: Outbox,
}

impl Dispatcher {
    pub fn new(engine: Arc<Mutex<AttendanceEngine>>, outbox: Outbox) -> Self {
        Self { engine, outbox }
    }

    /// Run the expiry sweep and queue its clock-outs
    pub async fn sweep(&self) -> usize {
        let now = punch_util::now();
        let events = self.engine.lock().await.tick(now);
        let count = events.len();
        self.outbox.publish(events);
        count
    }

    pub async fn handle(
        &self,
        client_id: &ClientId,
        role: ClientRole,
        request_id: u64,
        command: Command,
    ) -> Response {
        if command.is_admin() && !role.can_administer() {
            warn!(client_id = %client_id, command = ?command, "Admin command refused");
            return Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::PermissionDenied, "Admin role required"),
            );
        }

        match self.execute(client_id, command).await {
            Ok(payload) => Response::success(request_id, payload),
            Err(e) => Response::error(request_id, error_info(&e)),
        }
    }

    async fn execute(
        &self,
        client_id: &ClientId,
        command: Command,
    ) -> Result<ResponsePayload, CoreError> {
        let now = punch_util::now();

        let payload = match command {
            Command::Attendance(event) => {
                let transition = self.engine.lock().await.handle_event(event, now)?;
                self.outbox.publish(transition.event);
                ResponsePayload::Outcome {
                    outcome: transition.outcome,
                }
            }

            Command::GetStatus { user_id } => {
                ResponsePayload::Status(self.engine.lock().await.status(&user_id, now)?)
            }

            Command::ListOpen { origin_context } => ResponsePayload::OpenShifts {
                shifts: self
                    .engine
                    .lock()
                    .await
                    .list_open(origin_context.as_ref(), now),
            },

            Command::Exclude { user_id } => {
                let exclusion = self.engine.lock().await.exclude(&user_id)?;
                ResponsePayload::Excluded {
                    user_id: exclusion.user_id,
                    discarded_shift: exclusion.discarded_shift.map(|s| s.to_view(&now)),
                }
            }

            Command::Include { user_id } => {
                let was_excluded = self.engine.lock().await.include(&user_id)?;
                ResponsePayload::Included {
                    user_id,
                    was_excluded,
                }
            }

            Command::ListExcluded => ResponsePayload::ExcludedUsers {
                users: self.engine.lock().await.list_excluded(),
            },

            Command::ForceClockOut { user_id } => {
                let transition = self.engine.lock().await.force_clock_out(&user_id, now)?;
                self.outbox.publish(transition.event);
                ResponsePayload::Outcome {
                    outcome: transition.outcome,
                }
            }

            Command::SubscribeEvents => ResponsePayload::Subscribed {
                client_id: client_id.clone(),
            },

            Command::UnsubscribeEvents => ResponsePayload::Unsubscribed,

            Command::GetHealth => {
                let engine = self.engine.lock().await;
                let store_ok = engine.store_healthy();
                ResponsePayload::Health(HealthStatus {
                    live: true,
                    ready: store_ok,
                    store_ok,
                    open_shifts: engine.open_count(),
                })
            }

            Command::Ping => ResponsePayload::Pong,
        };

        Ok(payload)
    }
}

fn error_info(e: &CoreError) -> ErrorInfo {
    match e {
        CoreError::CorruptRecord { .. } => {
            warn!(error = %e, "Request touched a corrupt record");
            ErrorInfo::new(ErrorCode::CorruptRecord, e.to_string())
        }
        CoreError::Store(_) => {
            error!(error = %e, "Storage failure");
            ErrorInfo::new(ErrorCode::StorageError, "internal storage error")
        }
        CoreError::AlreadyOpen { .. } => {
            error!(error = %e, "Shift state out of sync with storage");
            ErrorInfo::new(ErrorCode::InternalError, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use punch_api::{
        AttendanceEvent, AttendanceEventKind, AttendanceOutcome, ResponseResult,
    };
    use punch_config::AttendancePolicy;
    use punch_sink::{MockNotifier, MockSink};
    use punch_store::SqliteStore;
    use punch_util::UserId;

    fn setup() -> (Dispatcher, MockSink) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = AttendanceEngine::new(AttendancePolicy::default(), store).unwrap();
        let sink = MockSink::new();
        let (outbox, _handle) =
            Outbox::spawn(Arc::new(sink.clone()), Arc::new(MockNotifier::new()), None);
        (
            Dispatcher::new(Arc::new(Mutex::new(engine)), outbox),
            sink,
        )
    }

    fn join(user: &str) -> Command {
        Command::Attendance(AttendanceEvent {
            user_id: UserId::new(user),
            display_name: None,
            kind: AttendanceEventKind::JoinedChannel,
            origin_context: None,
            at: None,
        })
    }

    #[tokio::test]
    async fn bridge_cannot_administer() {
        let (dispatcher, _) = setup();
        let client = ClientId::new();

        let response = dispatcher
            .handle(
                &client,
                ClientRole::Bridge,
                7,
                Command::Exclude {
                    user_id: UserId::new("u1"),
                },
            )
            .await;

        assert_eq!(response.request_id, 7);
        match response.result {
            ResponseResult::Err(e) => assert_eq!(e.code, ErrorCode::PermissionDenied),
            ResponseResult::Ok(p) => panic!("unexpected success {p:?}"),
        }
    }

    #[tokio::test]
    async fn bridge_clocks_in_admin_excludes() {
        let (dispatcher, _) = setup();
        let client = ClientId::new();

        let response = dispatcher.handle(&client, ClientRole::Bridge, 1, join("u1")).await;
        assert!(matches!(
            response.result,
            ResponseResult::Ok(ResponsePayload::Outcome {
                outcome: AttendanceOutcome::ClockedIn { .. }
            })
        ));

        let response = dispatcher
            .handle(
                &client,
                ClientRole::Admin,
                2,
                Command::Exclude {
                    user_id: UserId::new("u1"),
                },
            )
            .await;
        match response.result {
            ResponseResult::Ok(ResponsePayload::Excluded {
                discarded_shift, ..
            }) => assert!(discarded_shift.is_some()),
            other => panic!("unexpected result {other:?}"),
        }

        let response = dispatcher
            .handle(&client, ClientRole::Admin, 3, Command::GetHealth)
            .await;
        match response.result {
            ResponseResult::Ok(ResponsePayload::Health(health)) => {
                assert!(health.store_ok);
                assert_eq!(health.open_shifts, 0);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}

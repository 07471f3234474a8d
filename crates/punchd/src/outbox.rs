//! Delivery of committed transitions to the attendance log and notifier

use chrono::FixedOffset;
use punch_core::CoreEvent;
use punch_sink::{AttendanceSink, Notifier, SinkRow};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Queue of committed transitions drained by one background task.
///
/// A single worker keeps rows in commit order. Failures are logged and
/// dropped; local state was already committed when the event was queued.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<CoreEvent>,
}

impl Outbox {
    pub fn spawn(
        sink: Arc<dyn AttendanceSink>,
        notifier: Arc<dyn Notifier>,
        display_offset: Option<FixedOffset>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<CoreEvent>();

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                deliver(sink.as_ref(), notifier.as_ref(), display_offset, &event).await;
            }
            debug!("Outbox drained");
        });

        (Self { tx }, handle)
    }

    pub fn publish(&self, events: impl IntoIterator<Item = CoreEvent>) {
        for event in events {
            if self.tx.send(event).is_err() {
                warn!("Outbox closed, dropping attendance event");
            }
        }
    }
}

async fn deliver(
    sink: &dyn AttendanceSink,
    notifier: &dyn Notifier,
    display_offset: Option<FixedOffset>,
    event: &CoreEvent,
) {
    let row = SinkRow::new(event.log_name(), event.action(), &event.at(), display_offset);

    if let Err(e) = sink.append(&row).await {
        warn!(
            sink = sink.name(),
            user_id = %event.user_id(),
            action = %row.action,
            error = %e,
            "Attendance row not recorded"
        );
    }

    match notifier.notify(&event.notice()).await {
        Ok(recipients) => debug!(user_id = %event.user_id(), recipients, "Notice sent"),
        Err(e) => debug!(user_id = %event.user_id(), error = %e, "Notice dropped"),
    }
}

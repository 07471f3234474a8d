//! Notices over IPC

use async_trait::async_trait;
use punch_api::{Event, EventPayload, Notice};
use punch_ipc::IpcServer;
use punch_sink::{Notifier, NotifyError};
use std::sync::Arc;

/// Broadcasts each notice to subscribed IPC clients; the bridge routes it to
/// the notice's origin context.
pub struct IpcNotifier {
    ipc: Arc<IpcServer>,
}

impl IpcNotifier {
    pub fn new(ipc: Arc<IpcServer>) -> Self {
        Self { ipc }
    }
}

#[async_trait]
impl Notifier for IpcNotifier {
    async fn notify(&self, notice: &Notice) -> Result<usize, NotifyError> {
        match self
            .ipc
            .broadcast_event(Event::new(EventPayload::Notice(notice.clone())))
        {
            0 => Err(NotifyError::Undeliverable("no connected clients".into())),
            n => Ok(n),
        }
    }
}

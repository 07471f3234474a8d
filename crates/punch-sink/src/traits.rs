//! Sink and notifier traits

use async_trait::async_trait;
use punch_api::Notice;
use thiserror::Error;

use crate::SinkRow;

/// Errors from attendance sinks
#[derive(Debug, Error)]
pub enum SinkError {
    /// Destination could not be reached
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// Destination answered but refused the row
    #[error("Sink rejected row: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Errors from notice delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notice could not be delivered: {0}")]
    Undeliverable(String),
}

/// Append-only attendance log
#[async_trait]
pub trait AttendanceSink: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Append one row. Rows for the same user must be appended in the
    /// order their transitions were committed.
    async fn append(&self, row: &SinkRow) -> SinkResult<()>;
}

/// Delivers user-facing notices
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notice; returns how many recipients received it
    async fn notify(&self, notice: &Notice) -> Result<usize, NotifyError>;
}

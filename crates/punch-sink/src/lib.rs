//! Outbound side of punchd
//!
//! - [`AttendanceSink`]: append-only attendance log (one row per clock-in
//!   or clock-out), with JSON-lines and webhook implementations
//! - [`Notifier`]: delivers user-facing notices to the scope a shift
//!   belongs to
//!
//! Both are best effort. A failure here never rolls back an attendance
//! transition that has already been committed.

mod jsonl;
mod mock;
mod row;
mod traits;
mod webhook;

pub use jsonl::*;
pub use mock::*;
pub use row::*;
pub use traits::*;
pub use webhook::*;

use punch_config::SinkConfig;
use std::sync::Arc;

/// Sink that drops every row
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait::async_trait]
impl AttendanceSink for NullSink {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn append(&self, _row: &SinkRow) -> SinkResult<()> {
        Ok(())
    }
}

/// Build the sink selected in configuration
pub fn build_sink(config: &SinkConfig) -> SinkResult<Arc<dyn AttendanceSink>> {
    Ok(match config {
        SinkConfig::None => Arc::new(NullSink),
        SinkConfig::Jsonl { path } => Arc::new(JsonlSink::new(path.clone())),
        SinkConfig::Webhook { url, timeout } => Arc::new(WebhookSink::new(url.clone(), *timeout)?),
    })
}

//! JSON-lines file sink

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{AttendanceSink, SinkResult, SinkRow};

/// Appends one JSON object per line to a local file
pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl AttendanceSink for JsonlSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn append(&self, row: &SinkRow) -> SinkResult<()> {
        let mut line = serde_json::to_string(row)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.sync_data().await?;

        debug!(path = %self.path.display(), action = %row.action, "Row appended");
        Ok(())
    }
}

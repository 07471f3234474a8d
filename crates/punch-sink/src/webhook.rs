//! HTTP webhook sink

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::{AttendanceSink, SinkError, SinkResult, SinkRow};

/// POSTs each row as JSON to a fixed URL (e.g. a spreadsheet bridge)
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> SinkResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| SinkError::Unavailable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AttendanceSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn append(&self, row: &SinkRow) -> SinkResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(row)
            .send()
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!(url = %self.url, status = %status, "Webhook row delivered");

        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::Rejected(format!("HTTP {status}")))
        }
    }
}

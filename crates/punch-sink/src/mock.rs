//! In-memory sink and notifier for tests

use async_trait::async_trait;
use punch_api::Notice;
use std::sync::{Arc, Mutex};

use crate::{AttendanceSink, Notifier, NotifyError, SinkError, SinkResult, SinkRow};

/// Records appended rows; can be switched into a failing mode
#[derive(Clone, Default)]
pub struct MockSink {
    rows: Arc<Mutex<Vec<SinkRow>>>,

    /// Make every append fail with `Unavailable`
    pub fail: Arc<Mutex<bool>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<SinkRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().unwrap() = failing;
    }
}

#[async_trait]
impl AttendanceSink for MockSink {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn append(&self, row: &SinkRow) -> SinkResult<()> {
        if *self.fail.lock().unwrap() {
            return Err(SinkError::Unavailable("mock sink offline".into()));
        }
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }
}

/// Records delivered notices
#[derive(Clone, Default)]
pub struct MockNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notice: &Notice) -> Result<usize, NotifyError> {
        self.notices.lock().unwrap().push(notice.clone());
        Ok(1)
    }
}

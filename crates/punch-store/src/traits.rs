//! Store trait definitions

use chrono::{DateTime, Local};
use punch_util::{OriginContext, UserId};

use crate::{AuditEvent, StoreResult};

/// Durable storage for attendance state.
///
/// Every method is a single atomic change; callers keep their in-memory
/// view in step by applying the same change only after the call succeeds.
pub trait Store: Send + Sync {
    // Open shifts

    /// Insert an open shift. Returns `false` (and changes nothing) if the
    /// user already has one.
    fn insert_shift(&self, shift: &NewShift) -> StoreResult<bool>;

    /// Delete the user's open shift and record `at` as their last
    /// clock-out, in one transaction. A stored clock-out later than `at`
    /// is kept. Returns whether a shift row existed.
    fn close_shift(&self, user_id: &UserId, at: DateTime<Local>) -> StoreResult<bool>;

    /// All open shifts in insertion order
    fn load_shifts(&self) -> StoreResult<Vec<StoredShift>>;

    // Last clock-out

    fn load_last_clock_outs(&self) -> StoreResult<Vec<(UserId, StoredTime)>>;

    // Exclusion list

    /// Add the user to the exclusion list and delete any open shift, in one
    /// transaction. Last clock-out is left alone. Returns whether a shift
    /// row was deleted.
    fn exclude_user(&self, user_id: &UserId) -> StoreResult<bool>;

    /// Remove the user from the exclusion list. Returns whether they were on it.
    fn include_user(&self, user_id: &UserId) -> StoreResult<bool>;

    fn load_excluded(&self) -> StoreResult<Vec<UserId>>;

    // Audit log

    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Most recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    fn is_healthy(&self) -> bool;
}

/// Shift about to be persisted
#[derive(Debug, Clone)]
pub struct NewShift {
    pub user_id: UserId,
    pub clock_in_at: DateTime<Local>,
    pub origin_context: Option<OriginContext>,
    pub display_name: Option<String>,
}

/// Shift as read back from storage
#[derive(Debug, Clone, PartialEq)]
pub struct StoredShift {
    pub user_id: UserId,
    pub clock_in_at: StoredTime,
    pub origin_context: Option<OriginContext>,
    pub display_name: Option<String>,
}

/// A persisted timestamp: parsed, or kept verbatim if it does not parse
#[derive(Debug, Clone, PartialEq)]
pub enum StoredTime {
    Valid(DateTime<Local>),
    Corrupt(String),
}

impl StoredTime {
    pub(crate) fn parse(raw: String) -> Self {
        match punch_util::parse_storage_string(&raw) {
            Ok(dt) => StoredTime::Valid(dt),
            Err(_) => StoredTime::Corrupt(raw),
        }
    }
}

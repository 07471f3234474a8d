//! Error types for the attendance core

use punch_store::StoreError;
use punch_util::UserId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Tried to open a shift for a user who already has one
    #[error("User {user_id} already has an open shift")]
    AlreadyOpen { user_id: UserId },

    /// A persisted timestamp for this user does not parse
    #[error("Corrupt {field} for user {user_id}: {value:?}")]
    CorruptRecord {
        user_id: UserId,
        field: &'static str,
        value: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;

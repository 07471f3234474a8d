//! Shared utilities for punchd
//!
//! This crate provides:
//! - ID types (UserId, OriginContext, ClientId)
//! - Wall-clock helpers (mockable `now()`, timestamp formatting)
//! - Default paths for socket, data, and config files

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;

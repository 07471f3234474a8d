//! Protocol types for punchd IPC
//!
//! This crate defines the stable API between punchd and its clients
//! (the chat-platform bridge and the admin CLI):
//! - Commands (attendance events, queries, admin actions)
//! - Responses and attendance outcomes
//! - Events (service -> subscribed clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;

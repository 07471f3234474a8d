//! Attendance state machine for punchd
//!
//! This crate is the heart of punchd, containing:
//! - The clock record store (open shifts, last clock-outs, exclusions) with
//!   write-through persistence
//! - The eligibility policy (may this user clock in / out right now?)
//! - The expiry sweeper (force-closes overlong shifts)
//! - The attendance engine tying them together and emitting `CoreEvent`s

mod clock_store;
mod engine;
mod error;
mod events;
mod exclusion;
mod policy;
mod shift;
mod sweeper;

pub use clock_store::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use exclusion::*;
pub use policy::*;
pub use shift::*;
pub use sweeper::*;

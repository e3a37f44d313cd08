//! Round lifecycle and the serialized coordinator that owns it.
//!
//! - [`Round`] — pure state machine: phase, pot, deadline, leader, entrants
//! - [`settle`] — deterministic pot split into winner/fee/seed shares
//! - [`Command`] — everything the coordinator consumes, one at a time
//! - [`Coordinator`] — the single task that mutates round state
//! - [`Handle`] — cloneable front door for submitting commands

mod command;
mod coordinator;
mod handle;
mod round;
mod settle;

pub use command::*;
pub use coordinator::*;
pub use handle::*;
pub use round::*;
pub use settle::*;

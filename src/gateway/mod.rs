//! WebSocket wire protocol and connection fan-out.
//!
//! The coordinator and the handlers talk to clients exclusively through
//! these types; nothing here knows about rounds or ledgers beyond the
//! numbers it carries.
//!
//! ## Architecture
//!
//! - [`ServerMessage`] / [`ClientMessage`] — the tagged JSON protocol
//! - [`Presence`] — who is online, counted per identity across tabs
//! - [`Broadcast`] — fan-out hub: broadcast to all, unicast by identity
mod broadcast;
mod message;
mod presence;

pub use broadcast::*;
pub use message::*;
pub use presence::*;

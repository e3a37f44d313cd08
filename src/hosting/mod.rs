//! HTTP and WebSocket surface.
//!
//! actix-web app wiring, account/session endpoints, the payment webhook,
//! and the bridge that pumps gateway broadcasts into live WebSocket
//! connections.
//!
//! ## Architecture
//!
//! - [`Server`] — assembles routes and shared state, binds, and runs
//! - [`Auth`] — extractor that resolves a bearer token to an [`Identity`]
//! - [`Session`] — opaque login token, stored hashed with an expiry
//! - [`handlers`] — request handlers for accounts, bids, and the webhook
//!
//! [`Identity`]: crate::Identity
mod auth;
mod handlers;
mod server;
mod session;

pub use auth::*;
pub use handlers::*;
pub use server::*;
pub use session::*;

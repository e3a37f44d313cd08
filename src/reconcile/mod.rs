//! Payment gateway reconciliation.
//!
//! The gateway notifies us of payments over a webhook with at-least-once
//! delivery, so every notice must land exactly once in the ledger no
//! matter how many times it arrives.
//!
//! - [`Notice`] — inbound payment notification, as the gateway sends it
//! - [`CreditEvent`] — the normalized credit a notice asks us to apply
//! - [`Outcome`] — what reconciliation did with a notice
//! - [`Reconciler`] — applies notices against the ledger idempotently
mod notice;
mod reconciler;

pub use notice::*;
pub use reconciler::*;

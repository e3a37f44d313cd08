//! Single-process server for a last-bid countdown wagering game.
//!
//! Clients commit a fixed-size bid ("compete") to a shared pot and extend a
//! running countdown; whoever bid last when the countdown expires wins the
//! lion's share of the pot, the house takes a cut, and a seed fraction rolls
//! into the next round.
//!
//! ## Architecture
//!
//! - [`game`] — round state machine, pure settlement math, and the
//!   coordinator task that serializes every bid/tick/cancel on one queue
//! - [`ledger`] — versioned account store (in-memory and Postgres backends)
//! - [`gateway`] — WebSocket wire protocol, presence registry, and broadcast
//!   fan-out to connected sessions
//! - [`reconcile`] — idempotent application of payment-gateway credit
//!   notifications against the same accounts the rounds debit
//! - [`hosting`] — actix-web HTTP surface and the WebSocket session bridge

pub mod error;
pub mod game;
pub mod gateway;
pub mod hosting;
pub mod ledger;
pub mod reconcile;

pub use error::Error;

/// Balances, pots, stakes, and payout amounts.
pub type Chips = i64;
/// Account identity: the username a bid, balance, or broadcast belongs to.
pub type Identity = String;

/// Default stake every bid commits to the pot.
pub const STAKE: Chips = 100;
/// Balance granted to a freshly registered account.
pub const STARTING_BALANCE: Chips = 1_000;
/// Default countdown armed on every accepted bid.
pub const ROUND_DURATION: std::time::Duration = std::time::Duration::from_secs(240);
/// Default cadence of the coordinator's timer tick (and of timer broadcasts).
pub const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);
/// Session tokens expire a day after login, matching the web session cookie.
pub const SESSION_DURATION: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

/// Payout shares in basis points. Winner and fee round half-up; the seed
/// takes the exact remainder so the three always sum to the pot.
pub const WINNER_BPS: Chips = 8_900;
/// Operator's cut of each settled pot.
pub const FEE_BPS: Chips = 500;
/// Fraction of each settled pot retained to seed the next round.
pub const SEED_BPS: Chips = 600;

/// Initialize terminal logging from `RUST_LOG`, defaulting to info.
pub fn log() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Exit immediately on ctrl-c instead of waiting out graceful shutdown.
pub fn kys() {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.expect("install ctrl-c handler");
        println!();
        log::warn!("violent interrupt received, exiting immediately");
        std::process::exit(0);
    });
}

//! Chip accounting and persistence.
//!
//! One storage seam, two backends: [`MemLedger`] for tests and
//! single-node play, [`PgLedger`] for durable deployments. Everything
//! that touches balances goes through the [`Ledger`] trait so the
//! coordinator and the webhook cannot disagree about money.
//!
//! ## Connectivity
//!
//! - [`db()`] — establishes a database connection from `DB_URL`
//!
//! ## Table Names
//!
//! Constants for all persistent entities: accounts, applied credits,
//! and login sessions.
mod account;
mod ledger;
mod memory;
mod postgres;

pub use account::*;
pub use ledger::*;
pub use memory::*;
pub use postgres::*;

use std::sync::Arc;
use tokio_postgres::Client;

/// Establishes a database connection.
///
/// Connects to PostgreSQL using the `DB_URL` environment variable and
/// returns an `Arc<Client>` suitable for sharing across async tasks.
///
/// # Panics
///
/// Panics if `DB_URL` is not set or if connection fails.
pub async fn db() -> Arc<Client> {
    log::info!("connecting to database");
    let tls = tokio_postgres::tls::NoTls;
    let ref url = std::env::var("DB_URL").expect("DB_URL must be set");
    let (client, connection) = tokio_postgres::connect(url, tls)
        .await
        .expect("database connection failed");
    tokio::spawn(connection);
    client
        .execute("SET client_min_messages TO WARNING", &[])
        .await
        .expect("set client_min_messages");
    Arc::new(client)
}

/// Table for player balances and lifetime records.
#[rustfmt::skip]
pub const ACCOUNTS: &str = "accounts";
/// Table for externally funded credits, keyed by gateway event id.
#[rustfmt::skip]
pub const CREDITS:  &str = "credits";
/// Table for login sessions, keyed by token digest.
#[rustfmt::skip]
pub const SESSIONS: &str = "sessions";

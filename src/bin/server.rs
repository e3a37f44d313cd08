//! Game server binary.
//!
//! Runs the HTTP surface, the WebSocket gateway, and the round
//! coordinator in one process.

use clap::Parser;
use rotopot::*;

#[tokio::main]
async fn main() {
    log();
    kys();
    hosting::Server::run(hosting::Settings::parse())
        .await
        .unwrap();
}

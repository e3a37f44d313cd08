use super::Phase;
use crate::Chips;
use crate::Error;
use crate::Identity;
use std::time::Instant;
use tokio::sync::oneshot;

/// Everything the coordinator task can be asked to do. All round and
/// balance mutation flows through this one queue, which is what makes
/// concurrent bids safe without any locking in the round itself.
pub enum Command {
    /// Commit one stake for `who`. An explicit amount must match the
    /// configured stake. Replies once the debit and the round update
    /// have both happened, or with the reason they did not.
    Bid {
        who: Identity,
        amount: Option<Chips>,
        reply: oneshot::Sender<Result<Receipt, Error>>,
    },
    /// Clock pulse. Carries its own timestamp so the round logic never
    /// reads the wall clock, which keeps expiry testable.
    Tick(Instant),
    /// Void the current round and refund one stake per entrant.
    Cancel {
        reply: oneshot::Sender<Result<(), Error>>,
    },
    /// Current round state, for catching up a fresh connection.
    Snapshot {
        reply: oneshot::Sender<Summary>,
    },
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Bid { who, .. } => write!(f, "bid from {}", who),
            Command::Tick(_) => write!(f, "tick"),
            Command::Cancel { .. } => write!(f, "cancel"),
            Command::Snapshot { .. } => write!(f, "snapshot"),
        }
    }
}

/// What a successful bid bought: the round it landed in, the pot and
/// clock after it, and the bidder's remaining balance.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Receipt {
    pub round: u64,
    pub pot: Chips,
    pub seconds: u64,
    pub balance: Chips,
}

/// Point-in-time view of the round, safe to hand to any client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub round: u64,
    pub phase: Phase,
    pub pot: Chips,
    pub seconds: u64,
    pub last_bidder: Option<Identity>,
}

use crate::Chips;
use crate::Identity;
use serde::Deserialize;
use serde::Serialize;

/// Payment notification as delivered by the gateway webhook. The `id`
/// is the gateway's own event id and is the idempotency key: redelivery
/// reuses it, a distinct payment never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: String,
    pub status: Status,
    pub account: Identity,
    pub amount: Chips,
}

impl Notice {
    /// The credit this notice asks for, if it asks for one at all.
    /// Only an approved payment carries chips.
    pub fn credit(&self) -> Option<CreditEvent> {
        match self.status {
            Status::Approved => Some(CreditEvent {
                id: self.id.clone(),
                account: self.account.clone(),
                amount: self.amount,
            }),
            Status::Pending | Status::Rejected => None,
        }
    }
}

/// Gateway-side payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Approved,
    Pending,
    Rejected,
}

/// A credit that should be applied to an account exactly once,
/// keyed by the gateway event id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditEvent {
    pub id: String,
    pub account: Identity,
    pub amount: Chips,
}

impl std::fmt::Display for CreditEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "credit {} of {} to {}", self.id, self.amount, self.account)
    }
}

/// What became of a notice once reconciliation finished with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Credit landed. Carries the account's balance after it.
    Applied(Chips),
    /// This event id was already applied; nothing changed.
    Replayed,
    /// The notice carried no credit to apply.
    Ignored,
}

impl Outcome {
    pub fn code(&self) -> &'static str {
        match self {
            Outcome::Applied(_) => "applied",
            Outcome::Replayed => "replayed",
            Outcome::Ignored => "ignored",
        }
    }
}

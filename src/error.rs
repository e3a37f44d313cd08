use crate::reconcile::CreditEvent;

/// Errors surfaced by the round coordinator, the ledger, and the reconciler.
///
/// Validation and funds errors return synchronously to the caller and never
/// mutate round or ledger state. `DuplicateCredit` is not a failure: it
/// carries the previously applied event so callers can return the prior
/// result. `Store` and `Gateway` are retryable infrastructure failures.
#[derive(Debug, Clone)]
pub enum Error {
    /// Malformed request, or a bid outside the allowed window or stake.
    Validation(String),
    /// Debit refused: balance below the requested amount.
    InsufficientFunds,
    /// Ledger version mismatch, or the resource is in a conflicting state.
    StateConflict(String),
    /// Idempotent replay: this external transaction was already applied.
    DuplicateCredit(CreditEvent),
    /// Unknown account or session.
    NotFound(String),
    /// Payment gateway unavailable or rejected the exchange.
    Gateway(String),
    /// Backing store failure.
    Store(String),
}

impl Error {
    /// Whether redelivery or retry can succeed where this attempt failed.
    pub fn retryable(&self) -> bool {
        match self {
            Self::StateConflict(_) => true,
            Self::Gateway(_) => true,
            Self::Store(_) => true,
            Self::Validation(_) => false,
            Self::InsufficientFunds => false,
            Self::DuplicateCredit(_) => false,
            Self::NotFound(_) => false,
        }
    }
    /// Stable machine-readable code for wire error frames.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InsufficientFunds => "insufficient_funds",
            Self::StateConflict(_) => "state_conflict",
            Self::DuplicateCredit(_) => "duplicate_credit",
            Self::NotFound(_) => "not_found",
            Self::Gateway(_) => "gateway",
            Self::Store(_) => "store",
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(s) => write!(f, "invalid: {}", s),
            Self::InsufficientFunds => write!(f, "insufficient funds"),
            Self::StateConflict(s) => write!(f, "state conflict: {}", s),
            Self::DuplicateCredit(e) => write!(f, "already applied: {}", e),
            Self::NotFound(s) => write!(f, "not found: {}", s),
            Self::Gateway(s) => write!(f, "gateway failure: {}", s),
            Self::Store(s) => write!(f, "store failure: {}", s),
        }
    }
}

impl std::error::Error for Error {}

impl From<tokio_postgres::Error> for Error {
    fn from(e: tokio_postgres::Error) -> Self {
        Self::Store(e.to_string())
    }
}

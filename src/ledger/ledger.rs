use super::Account;
use crate::Chips;
use crate::Error;
use crate::Identity;
use crate::hosting::Session;
use crate::reconcile::CreditEvent;
use async_trait::async_trait;

/// Storage seam for balances, applied credits, and login sessions.
///
/// Every method is one atomic step against the store: a debit either
/// happens in full or not at all, and `apply_credit` lands a gateway
/// event at most once no matter how often it is retried. Callers own
/// any ordering across calls.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Open an account with the starting balance. `StateConflict` if
    /// the identity is taken.
    async fn create(&self, identity: &Identity, hashword: &str) -> Result<Account, Error>;
    /// Account plus stored password hash, for login. `None` when the
    /// identity is unknown, so callers can fail without an oracle.
    async fn lookup(&self, identity: &Identity) -> Result<Option<(Account, String)>, Error>;
    /// Account by identity. `NotFound` when missing.
    async fn account(&self, identity: &Identity) -> Result<Account, Error>;
    /// Every account, ordered for the leaderboard: wins, then chips
    /// collected, then identity.
    async fn accounts(&self) -> Result<Vec<Account>, Error>;
    /// Replace an account's client preferences.
    async fn update_settings(
        &self,
        identity: &Identity,
        settings: &serde_json::Value,
    ) -> Result<(), Error>;

    /// Commit a stake: debit `amount` and bump the entry records in one
    /// step. `InsufficientFunds` leaves everything untouched. Returns
    /// the balance after the debit.
    async fn stake(&self, identity: &Identity, amount: Chips) -> Result<Chips, Error>;
    /// Pay out a settled pot: credit `amount` and bump the win records.
    /// Returns the balance after the credit.
    async fn award(&self, identity: &Identity, amount: Chips) -> Result<Chips, Error>;
    /// Plain credit with no records, for refunds and the operator fee.
    async fn credit(&self, identity: &Identity, amount: Chips) -> Result<Chips, Error>;
    /// Plain conditional debit, for withdrawals. `InsufficientFunds`
    /// when the balance cannot cover it.
    async fn debit(&self, identity: &Identity, amount: Chips) -> Result<Chips, Error>;
    /// Apply an externally funded credit exactly once. A replayed event
    /// id fails with `DuplicateCredit` carrying the event that was
    /// applied first; the balance is only ever moved by the first copy.
    async fn apply_credit(&self, event: &CreditEvent) -> Result<Chips, Error>;

    /// Persist a freshly minted session.
    async fn open_session(&self, session: &Session) -> Result<(), Error>;
    /// Session by token digest, expired or not. Expiry is the caller's
    /// check.
    async fn find_session(&self, hash: &[u8]) -> Result<Option<Session>, Error>;
    /// Discard a session, ending its logins.
    async fn drop_session(&self, hash: &[u8]) -> Result<(), Error>;

    /// Cheap liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), Error>;
}

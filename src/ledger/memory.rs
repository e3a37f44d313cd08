use super::*;
use crate::Chips;
use crate::Error;
use crate::Identity;
use crate::hosting::Session;
use crate::reconcile::CreditEvent;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory ledger for tests and single-node play. One mutex over the
/// whole state stands in for the transactional guarantees the Postgres
/// backend gets from single-statement updates.
#[derive(Default)]
pub struct MemLedger {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    accounts: HashMap<Identity, Record>,
    credits: HashMap<String, CreditEvent>,
    sessions: HashMap<Vec<u8>, Session>,
}

struct Record {
    account: Account,
    hashword: String,
}

impl MemLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for MemLedger {
    async fn create(&self, identity: &Identity, hashword: &str) -> Result<Account, Error> {
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(identity) {
            return Err(Error::StateConflict(format!(
                "account {} already exists",
                identity
            )));
        }
        let account = Account::new(identity.clone());
        state.accounts.insert(
            identity.clone(),
            Record {
                account: account.clone(),
                hashword: hashword.to_string(),
            },
        );
        Ok(account)
    }

    async fn lookup(&self, identity: &Identity) -> Result<Option<(Account, String)>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .get(identity)
            .map(|record| (record.account.clone(), record.hashword.clone())))
    }

    async fn account(&self, identity: &Identity) -> Result<Account, Error> {
        let state = self.state.lock().await;
        state
            .accounts
            .get(identity)
            .map(|record| record.account.clone())
            .ok_or_else(|| Error::NotFound(identity.clone()))
    }

    async fn accounts(&self) -> Result<Vec<Account>, Error> {
        let state = self.state.lock().await;
        let mut accounts = state
            .accounts
            .values()
            .map(|record| record.account.clone())
            .collect::<Vec<_>>();
        accounts.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(b.collected.cmp(&a.collected))
                .then(a.identity.cmp(&b.identity))
        });
        Ok(accounts)
    }

    async fn update_settings(
        &self,
        identity: &Identity,
        settings: &serde_json::Value,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        let record = state
            .accounts
            .get_mut(identity)
            .ok_or_else(|| Error::NotFound(identity.clone()))?;
        record.account.settings = settings.clone();
        Ok(())
    }

    async fn stake(&self, identity: &Identity, amount: Chips) -> Result<Chips, Error> {
        let mut state = self.state.lock().await;
        let record = state
            .accounts
            .get_mut(identity)
            .ok_or_else(|| Error::NotFound(identity.clone()))?;
        if record.account.balance < amount {
            return Err(Error::InsufficientFunds);
        }
        record.account.balance -= amount;
        record.account.version += 1;
        record.account.entries += 1;
        record.account.wagered += amount;
        Ok(record.account.balance)
    }

    async fn award(&self, identity: &Identity, amount: Chips) -> Result<Chips, Error> {
        let mut state = self.state.lock().await;
        let record = state
            .accounts
            .get_mut(identity)
            .ok_or_else(|| Error::NotFound(identity.clone()))?;
        record.account.balance += amount;
        record.account.version += 1;
        record.account.wins += 1;
        record.account.collected += amount;
        Ok(record.account.balance)
    }

    async fn credit(&self, identity: &Identity, amount: Chips) -> Result<Chips, Error> {
        let mut state = self.state.lock().await;
        let record = state
            .accounts
            .get_mut(identity)
            .ok_or_else(|| Error::NotFound(identity.clone()))?;
        record.account.balance += amount;
        record.account.version += 1;
        Ok(record.account.balance)
    }

    async fn debit(&self, identity: &Identity, amount: Chips) -> Result<Chips, Error> {
        let mut state = self.state.lock().await;
        let record = state
            .accounts
            .get_mut(identity)
            .ok_or_else(|| Error::NotFound(identity.clone()))?;
        if record.account.balance < amount {
            return Err(Error::InsufficientFunds);
        }
        record.account.balance -= amount;
        record.account.version += 1;
        Ok(record.account.balance)
    }

    async fn apply_credit(&self, event: &CreditEvent) -> Result<Chips, Error> {
        let mut state = self.state.lock().await;
        if let Some(prior) = state.credits.get(&event.id) {
            return Err(Error::DuplicateCredit(prior.clone()));
        }
        let record = state
            .accounts
            .get_mut(&event.account)
            .ok_or_else(|| Error::NotFound(event.account.clone()))?;
        record.account.balance += event.amount;
        record.account.version += 1;
        let balance = record.account.balance;
        state.credits.insert(event.id.clone(), event.clone());
        Ok(balance)
    }

    async fn open_session(&self, session: &Session) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.sessions.insert(session.hash().to_vec(), session.clone());
        Ok(())
    }

    async fn find_session(&self, hash: &[u8]) -> Result<Option<Session>, Error> {
        let state = self.state.lock().await;
        Ok(state.sessions.get(hash).cloned())
    }

    async fn drop_session(&self, hash: &[u8]) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.sessions.remove(hash);
        Ok(())
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::STAKE;
    use crate::STARTING_BALANCE;

    fn alice() -> Identity {
        String::from("alice")
    }

    #[tokio::test]
    async fn create_rejects_taken_identity() {
        let ledger = MemLedger::new();
        ledger.create(&alice(), "h1").await.unwrap();
        let refused = ledger.create(&alice(), "h2").await;
        assert!(matches!(refused, Err(Error::StateConflict(_))));
    }

    #[tokio::test]
    async fn stake_rejects_when_short() {
        let ledger = MemLedger::new();
        ledger.create(&alice(), "h").await.unwrap();
        let refused = ledger.stake(&alice(), STARTING_BALANCE + 1).await;
        assert!(matches!(refused, Err(Error::InsufficientFunds)));
        let account = ledger.account(&alice()).await.unwrap();
        assert_eq!(account.balance, STARTING_BALANCE);
        assert_eq!(account.entries, 0);
    }

    #[tokio::test]
    async fn stake_debits_and_records() {
        let ledger = MemLedger::new();
        ledger.create(&alice(), "h").await.unwrap();
        let balance = ledger.stake(&alice(), STAKE).await.unwrap();
        assert_eq!(balance, STARTING_BALANCE - STAKE);
        let account = ledger.account(&alice()).await.unwrap();
        assert_eq!(account.entries, 1);
        assert_eq!(account.wagered, STAKE);
    }

    #[tokio::test]
    async fn award_credits_and_records() {
        let ledger = MemLedger::new();
        ledger.create(&alice(), "h").await.unwrap();
        let balance = ledger.award(&alice(), 178).await.unwrap();
        assert_eq!(balance, STARTING_BALANCE + 178);
        let account = ledger.account(&alice()).await.unwrap();
        assert_eq!(account.wins, 1);
        assert_eq!(account.collected, 178);
    }

    #[tokio::test]
    async fn credit_unknown_account_is_not_found() {
        let ledger = MemLedger::new();
        let refused = ledger.credit(&alice(), 100).await;
        assert!(matches!(refused, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn apply_credit_lands_exactly_once() {
        let ledger = MemLedger::new();
        ledger.create(&alice(), "h").await.unwrap();
        let event = CreditEvent {
            id: String::from("pay_1"),
            account: alice(),
            amount: 500,
        };
        let balance = ledger.apply_credit(&event).await.unwrap();
        assert_eq!(balance, STARTING_BALANCE + 500);
        let replay = ledger.apply_credit(&event).await;
        match replay {
            Err(Error::DuplicateCredit(prior)) => assert_eq!(prior, event),
            other => panic!("expected duplicate credit, got {:?}", other),
        }
        let account = ledger.account(&alice()).await.unwrap();
        assert_eq!(account.balance, STARTING_BALANCE + 500);
    }

    #[tokio::test]
    async fn every_balance_write_bumps_the_version() {
        let ledger = MemLedger::new();
        ledger.create(&alice(), "h").await.unwrap();
        assert_eq!(ledger.account(&alice()).await.unwrap().version, 0);
        ledger.stake(&alice(), STAKE).await.unwrap();
        ledger.award(&alice(), 89).await.unwrap();
        ledger.credit(&alice(), 1).await.unwrap();
        ledger.debit(&alice(), 1).await.unwrap();
        assert_eq!(ledger.account(&alice()).await.unwrap().version, 4);
        ledger.stake(&alice(), STARTING_BALANCE * 2).await.unwrap_err();
        assert_eq!(ledger.account(&alice()).await.unwrap().version, 4);
    }

    #[tokio::test]
    async fn leaderboard_orders_by_wins_then_collected() {
        let ledger = MemLedger::new();
        for name in ["carol", "alice", "bob"] {
            ledger.create(&String::from(name), "h").await.unwrap();
        }
        ledger.award(&String::from("bob"), 178).await.unwrap();
        ledger.award(&String::from("carol"), 89).await.unwrap();
        let names = ledger
            .accounts()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.identity)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["bob", "carol", "alice"]);
    }

    #[tokio::test]
    async fn settings_replace_wholesale() {
        let ledger = MemLedger::new();
        ledger.create(&alice(), "h").await.unwrap();
        let prefs = serde_json::json!({ "sound": false });
        ledger.update_settings(&alice(), &prefs).await.unwrap();
        let account = ledger.account(&alice()).await.unwrap();
        assert_eq!(account.settings, prefs);
    }

    #[tokio::test]
    async fn sessions_round_trip() {
        let ledger = MemLedger::new();
        let (session, token) = Session::mint(alice());
        ledger.open_session(&session).await.unwrap();
        let found = ledger
            .find_session(&Session::digest(&token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.account(), &alice());
        ledger.drop_session(session.hash()).await.unwrap();
        assert!(ledger.find_session(session.hash()).await.unwrap().is_none());
    }
}

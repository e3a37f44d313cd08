use super::*;
use crate::Chips;
use crate::Error;
use crate::Identity;
use crate::STARTING_BALANCE;
use crate::hosting::Session;
use crate::reconcile::CreditEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_postgres::Client;

/// Postgres-backed ledger. Every balance mutation is one conditional
/// statement, so concurrent writers cannot interleave inside a debit or
/// a credit and no row locks are held across awaits.
pub struct PgLedger(Arc<Client>);

impl PgLedger {
    pub fn new(client: Arc<Client>) -> Self {
        Self(client)
    }

    /// Create tables and indices if they do not exist.
    pub async fn migrate(&self) -> Result<(), Error> {
        log::info!("[ledger] running migrations");
        self.0.batch_execute(MIGRATIONS).await?;
        Ok(())
    }

    fn hydrate(row: &tokio_postgres::Row) -> Account {
        Account {
            identity: row.get(0),
            balance: row.get(1),
            version: row.get(2),
            wins: row.get(3),
            entries: row.get(4),
            wagered: row.get(5),
            collected: row.get(6),
            settings: row.get(7),
        }
    }

    /// A conditional debit returned no row: either the account is gone
    /// or the balance could not cover it.
    async fn missing_or_short(&self, identity: &Identity) -> Error {
        let probe = self
            .0
            .query_opt(
                const_format::concatcp!("SELECT 1 FROM ", ACCOUNTS, " WHERE identity = $1"),
                &[identity],
            )
            .await;
        match probe {
            Ok(Some(_)) => Error::InsufficientFunds,
            Ok(None) => Error::NotFound(identity.clone()),
            Err(e) => Error::from(e),
        }
    }

    /// An idempotent credit returned no row: either the event id was
    /// already applied or the account is gone.
    async fn replay_or_missing(&self, event: &CreditEvent) -> Error {
        let prior = self
            .0
            .query_opt(
                const_format::concatcp!("SELECT account, amount FROM ", CREDITS, " WHERE id = $1"),
                &[&event.id],
            )
            .await;
        match prior {
            Ok(Some(row)) => Error::DuplicateCredit(CreditEvent {
                id: event.id.clone(),
                account: row.get(0),
                amount: row.get(1),
            }),
            Ok(None) => Error::NotFound(event.account.clone()),
            Err(e) => Error::from(e),
        }
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn create(&self, identity: &Identity, hashword: &str) -> Result<Account, Error> {
        let row = self
            .0
            .query_opt(
                const_format::concatcp!(
                    "INSERT INTO ",
                    ACCOUNTS,
                    " (identity, hashword, balance) VALUES ($1, $2, $3)
                      ON CONFLICT (identity) DO NOTHING
                      RETURNING identity"
                ),
                &[identity, &hashword, &STARTING_BALANCE],
            )
            .await?;
        match row {
            Some(_) => Ok(Account::new(identity.clone())),
            None => Err(Error::StateConflict(format!(
                "account {} already exists",
                identity
            ))),
        }
    }

    async fn lookup(&self, identity: &Identity) -> Result<Option<(Account, String)>, Error> {
        let row = self
            .0
            .query_opt(
                const_format::concatcp!(
                    "SELECT ",
                    COLUMNS,
                    ", hashword FROM ",
                    ACCOUNTS,
                    " WHERE identity = $1"
                ),
                &[identity],
            )
            .await?;
        Ok(row.map(|row| (Self::hydrate(&row), row.get(8))))
    }

    async fn account(&self, identity: &Identity) -> Result<Account, Error> {
        self.0
            .query_opt(
                const_format::concatcp!("SELECT ", COLUMNS, " FROM ", ACCOUNTS, " WHERE identity = $1"),
                &[identity],
            )
            .await?
            .map(|row| Self::hydrate(&row))
            .ok_or_else(|| Error::NotFound(identity.clone()))
    }

    async fn accounts(&self) -> Result<Vec<Account>, Error> {
        let rows = self
            .0
            .query(
                const_format::concatcp!(
                    "SELECT ",
                    COLUMNS,
                    " FROM ",
                    ACCOUNTS,
                    " ORDER BY wins DESC, collected DESC, identity ASC"
                ),
                &[],
            )
            .await?;
        Ok(rows.iter().map(Self::hydrate).collect())
    }

    async fn update_settings(
        &self,
        identity: &Identity,
        settings: &serde_json::Value,
    ) -> Result<(), Error> {
        let touched = self
            .0
            .execute(
                const_format::concatcp!(
                    "UPDATE ",
                    ACCOUNTS,
                    " SET settings = $2 WHERE identity = $1"
                ),
                &[identity, settings],
            )
            .await?;
        match touched {
            0 => Err(Error::NotFound(identity.clone())),
            _ => Ok(()),
        }
    }

    async fn stake(&self, identity: &Identity, amount: Chips) -> Result<Chips, Error> {
        const SQL: &str = const_format::concatcp!(
            "UPDATE ",
            ACCOUNTS,
            " SET balance = balance - $2,
                  version = version + 1,
                  entries = entries + 1,
                  wagered = wagered + $2
              WHERE identity = $1 AND balance >= $2
              RETURNING balance"
        );
        match self.0.query_opt(SQL, &[identity, &amount]).await? {
            Some(row) => Ok(row.get(0)),
            None => Err(self.missing_or_short(identity).await),
        }
    }

    async fn award(&self, identity: &Identity, amount: Chips) -> Result<Chips, Error> {
        const SQL: &str = const_format::concatcp!(
            "UPDATE ",
            ACCOUNTS,
            " SET balance = balance + $2,
                  version = version + 1,
                  wins = wins + 1,
                  collected = collected + $2
              WHERE identity = $1
              RETURNING balance"
        );
        match self.0.query_opt(SQL, &[identity, &amount]).await? {
            Some(row) => Ok(row.get(0)),
            None => Err(Error::NotFound(identity.clone())),
        }
    }

    async fn credit(&self, identity: &Identity, amount: Chips) -> Result<Chips, Error> {
        const SQL: &str = const_format::concatcp!(
            "UPDATE ",
            ACCOUNTS,
            " SET balance = balance + $2, version = version + 1
              WHERE identity = $1
              RETURNING balance"
        );
        match self.0.query_opt(SQL, &[identity, &amount]).await? {
            Some(row) => Ok(row.get(0)),
            None => Err(Error::NotFound(identity.clone())),
        }
    }

    async fn debit(&self, identity: &Identity, amount: Chips) -> Result<Chips, Error> {
        const SQL: &str = const_format::concatcp!(
            "UPDATE ",
            ACCOUNTS,
            " SET balance = balance - $2, version = version + 1
              WHERE identity = $1 AND balance >= $2
              RETURNING balance"
        );
        match self.0.query_opt(SQL, &[identity, &amount]).await? {
            Some(row) => Ok(row.get(0)),
            None => Err(self.missing_or_short(identity).await),
        }
    }

    async fn apply_credit(&self, event: &CreditEvent) -> Result<Chips, Error> {
        // The insert only fires for a known account and a fresh event id;
        // the balance update only fires if the insert did. One statement,
        // so redelivered webhooks cannot double-credit.
        const SQL: &str = const_format::concatcp!(
            "WITH acct AS (
                SELECT identity FROM ",
            ACCOUNTS,
            " WHERE identity = $2
             ), ins AS (
                INSERT INTO ",
            CREDITS,
            " (id, account, amount)
                SELECT $1, $2, $3 FROM acct
                ON CONFLICT (id) DO NOTHING
                RETURNING id
             )
             UPDATE ",
            ACCOUNTS,
            " SET balance = balance + $3, version = version + 1
             WHERE identity = $2 AND EXISTS (SELECT 1 FROM ins)
             RETURNING balance"
        );
        let row = self
            .0
            .query_opt(SQL, &[&event.id, &event.account, &event.amount])
            .await?;
        match row {
            Some(row) => Ok(row.get(0)),
            None => Err(self.replay_or_missing(event).await),
        }
    }

    async fn open_session(&self, session: &Session) -> Result<(), Error> {
        self.0
            .execute(
                const_format::concatcp!(
                    "INSERT INTO ",
                    SESSIONS,
                    " (hash, account, expires_at) VALUES ($1, $2, $3)"
                ),
                &[&session.hash(), &session.account(), &session.expires_at()],
            )
            .await?;
        Ok(())
    }

    async fn find_session(&self, hash: &[u8]) -> Result<Option<Session>, Error> {
        let row = self
            .0
            .query_opt(
                const_format::concatcp!(
                    "SELECT account, expires_at FROM ",
                    SESSIONS,
                    " WHERE hash = $1"
                ),
                &[&hash],
            )
            .await?;
        Ok(row.map(|row| Session::restore(row.get(0), hash.to_vec(), row.get(1))))
    }

    async fn drop_session(&self, hash: &[u8]) -> Result<(), Error> {
        self.0
            .execute(
                const_format::concatcp!("DELETE FROM ", SESSIONS, " WHERE hash = $1"),
                &[&hash],
            )
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), Error> {
        self.0.execute("SELECT 1", &[]).await?;
        Ok(())
    }
}

/// Account columns in `hydrate` order.
const COLUMNS: &str = "identity, balance, version, wins, entries, wagered, collected, settings";

#[rustfmt::skip]
const MIGRATIONS: &str = const_format::concatcp!(
    "CREATE TABLE IF NOT EXISTS ", ACCOUNTS, " (
        identity    TEXT PRIMARY KEY,
        hashword    TEXT NOT NULL,
        balance     BIGINT NOT NULL,
        version     BIGINT NOT NULL DEFAULT 0,
        wins        BIGINT NOT NULL DEFAULT 0,
        entries     BIGINT NOT NULL DEFAULT 0,
        wagered     BIGINT NOT NULL DEFAULT 0,
        collected   BIGINT NOT NULL DEFAULT 0,
        settings    JSONB NOT NULL DEFAULT '{}'
    );
    CREATE TABLE IF NOT EXISTS ", CREDITS, " (
        id          TEXT PRIMARY KEY,
        account     TEXT NOT NULL REFERENCES ", ACCOUNTS, "(identity) ON DELETE CASCADE,
        amount      BIGINT NOT NULL,
        applied_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    CREATE TABLE IF NOT EXISTS ", SESSIONS, " (
        hash        BYTEA PRIMARY KEY,
        account     TEXT NOT NULL REFERENCES ", ACCOUNTS, "(identity) ON DELETE CASCADE,
        expires_at  TIMESTAMPTZ NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_credits_account ON ", CREDITS, " (account);
    CREATE INDEX IF NOT EXISTS idx_sessions_expires ON ", SESSIONS, " (expires_at);"
);

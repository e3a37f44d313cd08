use crate::Chips;
use crate::Identity;
use crate::STARTING_BALANCE;
use serde::Serialize;

/// A player's chip balance and lifetime records, as the ledger sees
/// them. Serialized as-is for the account endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub identity: Identity,
    pub balance: Chips,
    /// Balance write counter, monotonic per account. Lets clients order
    /// concurrent views of the same balance.
    pub version: i64,
    /// Rounds this account settled as the last bidder.
    pub wins: i64,
    /// Stakes committed across all rounds.
    pub entries: i64,
    /// Chips committed across all rounds.
    pub wagered: Chips,
    /// Chips collected from settled pots.
    pub collected: Chips,
    /// Client preferences, opaque to the server.
    pub settings: serde_json::Value,
}

impl Account {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            balance: STARTING_BALANCE,
            version: 0,
            wins: 0,
            entries: 0,
            wagered: 0,
            collected: 0,
            settings: serde_json::json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_account_gets_the_grubstake() {
        let account = Account::new(String::from("alice"));
        assert_eq!(account.balance, STARTING_BALANCE);
        assert_eq!(account.wins, 0);
        assert_eq!(account.wagered, 0);
    }
}

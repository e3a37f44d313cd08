use super::*;
use crate::Error;
use crate::gateway::Broadcast;
use crate::gateway::ServerMessage;
use crate::ledger::Ledger;
use std::sync::Arc;

/// Applies payment notices against the ledger and announces the
/// resulting balances. Safe under at-least-once webhook delivery: the
/// ledger's idempotency row decides who is first, so two copies of one
/// notice can race and still credit once.
pub struct Reconciler {
    ledger: Arc<dyn Ledger>,
    gateway: Arc<Broadcast>,
}

impl Reconciler {
    pub fn new(ledger: Arc<dyn Ledger>, gateway: Arc<Broadcast>) -> Self {
        Self { ledger, gateway }
    }

    /// Land one notice. `Applied` moved the balance, `Replayed` found
    /// it already moved, `Ignored` had nothing to move. Retryable
    /// errors should be surfaced so the gateway redelivers.
    pub async fn reconcile(&self, notice: &Notice) -> Result<Outcome, Error> {
        let Some(event) = notice.credit() else {
            log::info!("[reconcile] ignoring {:?} notice {}", notice.status, notice.id);
            return Ok(Outcome::Ignored);
        };
        if event.amount <= 0 {
            return Err(Error::Validation(format!(
                "approved credit {} carries non-positive amount {}",
                event.id, event.amount
            )));
        }
        match self.ledger.apply_credit(&event).await {
            Ok(balance) => {
                log::info!("[reconcile] applied {}", event);
                self.gateway.publish(&ServerMessage::coins(
                    event.account.clone(),
                    balance,
                    Some("reload"),
                ));
                Ok(Outcome::Applied(balance))
            }
            Err(Error::DuplicateCredit(prior)) => {
                if prior.account != event.account || prior.amount != event.amount {
                    log::warn!(
                        "[reconcile] replay of {} disagrees with what was applied: {}",
                        event,
                        prior
                    );
                }
                Ok(Outcome::Replayed)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::STARTING_BALANCE;
    use crate::ledger::MemLedger;

    fn alice() -> String {
        String::from("alice")
    }

    fn approved(id: &str, amount: i64) -> Notice {
        Notice {
            id: id.to_string(),
            status: Status::Approved,
            account: alice(),
            amount,
        }
    }

    async fn rig() -> (Reconciler, Arc<MemLedger>, Arc<Broadcast>) {
        let ledger = Arc::new(MemLedger::new());
        ledger.create(&alice(), "h").await.unwrap();
        let gateway = Arc::new(Broadcast::new());
        let reconciler = Reconciler::new(ledger.clone(), gateway.clone());
        (reconciler, ledger, gateway)
    }

    #[tokio::test]
    async fn double_delivery_credits_once() {
        let (reconciler, ledger, _) = rig().await;
        let notice = approved("pay_1", 500);
        let first = reconciler.reconcile(&notice).await.unwrap();
        assert_eq!(first, Outcome::Applied(STARTING_BALANCE + 500));
        let second = reconciler.reconcile(&notice).await.unwrap();
        assert_eq!(second, Outcome::Replayed);
        let account = ledger.account(&alice()).await.unwrap();
        assert_eq!(account.balance, STARTING_BALANCE + 500);
    }

    #[tokio::test]
    async fn applied_credit_is_announced() {
        let (reconciler, _, gateway) = rig().await;
        let (_, mut rx) = gateway.subscribe(alice());
        reconciler.reconcile(&approved("pay_2", 250)).await.unwrap();
        let frame = rx.try_recv().unwrap();
        assert!(frame.contains(r#""reason":"reload""#));
        assert!(frame.contains(r#""balance":1250"#));
    }

    #[tokio::test]
    async fn replay_is_not_reannounced() {
        let (reconciler, _, gateway) = rig().await;
        let notice = approved("pay_3", 100);
        reconciler.reconcile(&notice).await.unwrap();
        let (_, mut rx) = gateway.subscribe(alice());
        reconciler.reconcile(&notice).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn pending_notice_is_ignored() {
        let (reconciler, ledger, _) = rig().await;
        let mut notice = approved("pay_4", 500);
        notice.status = Status::Pending;
        let outcome = reconciler.reconcile(&notice).await.unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        let account = ledger.account(&alice()).await.unwrap();
        assert_eq!(account.balance, STARTING_BALANCE);
    }

    #[tokio::test]
    async fn unknown_account_is_surfaced() {
        let (reconciler, _, _) = rig().await;
        let mut notice = approved("pay_5", 500);
        notice.account = String::from("nobody");
        let refused = reconciler.reconcile(&notice).await;
        assert!(matches!(refused, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn non_positive_amount_is_invalid() {
        let (reconciler, _, _) = rig().await;
        let refused = reconciler.reconcile(&approved("pay_6", 0)).await;
        assert!(matches!(refused, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn mismatched_replay_still_replays() {
        let (reconciler, ledger, _) = rig().await;
        reconciler.reconcile(&approved("pay_7", 100)).await.unwrap();
        let outcome = reconciler.reconcile(&approved("pay_7", 999)).await.unwrap();
        assert_eq!(outcome, Outcome::Replayed);
        let account = ledger.account(&alice()).await.unwrap();
        assert_eq!(account.balance, STARTING_BALANCE + 100);
    }
}

use super::*;
use crate::Chips;
use crate::Error;
use crate::Identity;
use crate::gateway::Broadcast;
use crate::gateway::ServerMessage;
use crate::ledger::Ledger;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::unbounded_channel;

/// The one task that owns the round. Bids, ticks, and cancels arrive on
/// a single queue and are handled to completion one at a time, so two
/// simultaneous bids on the last second cannot race: whichever reached
/// the queue first is the leader.
///
/// Money moves before round state does. A bid debits the stake first
/// and only then touches the round; settlement credits the winner first
/// and only then resets the round, so a ledger failure leaves the round
/// in `Settling` for the next tick to retry instead of losing the pot.
pub struct Coordinator {
    round: Round,
    ledger: Arc<dyn Ledger>,
    gateway: Arc<Broadcast>,
    operator: Option<Identity>,
    getter: UnboundedReceiver<Command>,
}

impl Coordinator {
    pub fn spawn(
        config: RoundConfig,
        ledger: Arc<dyn Ledger>,
        gateway: Arc<Broadcast>,
        operator: Option<Identity>,
    ) -> Handle {
        let (tx, rx) = unbounded_channel();
        let coordinator = Self {
            round: Round::new(config, 1, 0),
            ledger,
            gateway,
            operator,
            getter: rx,
        };
        tokio::spawn(coordinator.run());
        Handle::new(tx)
    }

    async fn run(mut self) {
        log::info!("[coordinator] round {} open for bids", self.round.number());
        while let Some(command) = self.getter.recv().await {
            log::trace!("[coordinator] {}", command);
            match command {
                Command::Bid { who, amount, reply } => {
                    let _ = reply.send(self.bid(who, amount).await);
                }
                Command::Tick(now) => self.tick(now).await,
                Command::Cancel { reply } => {
                    let _ = reply.send(self.cancel().await);
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot(Instant::now()));
                }
            }
        }
        log::info!("[coordinator] command queue closed, stopping");
    }
}

impl Coordinator {
    async fn bid(&mut self, who: Identity, amount: Option<Chips>) -> Result<Receipt, Error> {
        let now = Instant::now();
        let stake = self.round.stake();
        if amount.unwrap_or(stake) != stake {
            return Err(Error::Validation(format!(
                "bids are a fixed {} chip stake",
                stake
            )));
        }
        if let Phase::Closing | Phase::Settling = self.round.phase() {
            return Err(Error::StateConflict(format!(
                "round {} is {}, bids are closed",
                self.round.number(),
                self.round.phase()
            )));
        }
        let balance = self.ledger.stake(&who, stake).await?;
        self.round.bid(&who, now)?;
        let receipt = Receipt {
            round: self.round.number(),
            pot: self.round.pot(),
            seconds: self.round.seconds(now),
            balance,
        };
        log::info!(
            "[coordinator] round {} bid from {}, pot {}",
            receipt.round,
            who,
            receipt.pot
        );
        self.gateway.publish(&ServerMessage::timer(
            receipt.round,
            receipt.seconds,
            receipt.pot,
            Some(who),
        ));
        Ok(receipt)
    }

    async fn tick(&mut self, now: Instant) {
        if self.round.expire(now) {
            log::info!(
                "[coordinator] round {} closed at {} chips",
                self.round.number(),
                self.round.pot()
            );
        }
        if let Phase::Closing | Phase::Settling = self.round.phase() {
            self.round.begin_settlement();
            self.run_settlement().await;
        }
        self.gateway.publish(&ServerMessage::timer(
            self.round.number(),
            self.round.seconds(now),
            self.round.pot(),
            self.round.last_bidder().cloned(),
        ));
    }

    /// Pay out the settling round. On ledger failure the round stays in
    /// `Settling` and the next tick lands back here with the same pot.
    async fn run_settlement(&mut self) {
        let number = self.round.number();
        let pot = self.round.pot();
        let Some(winner) = self.round.last_bidder().cloned() else {
            log::warn!("[coordinator] round {} expired with no bids", number);
            self.round.reset(0);
            return;
        };
        let payout = settle(pot);
        let balance = match self.ledger.award(&winner, payout.winner).await {
            Ok(balance) => balance,
            Err(e) => {
                log::error!(
                    "[coordinator] round {} payout failed, will retry: {}",
                    number,
                    e
                );
                return;
            }
        };
        log::info!(
            "[coordinator] round {} won by {}: {}",
            number,
            winner,
            payout
        );
        self.gateway
            .publish(&ServerMessage::coins(winner, balance, Some("win")));
        self.collect_fee(payout.fee).await;
        self.round.reset(payout.seed);
        log::info!(
            "[coordinator] round {} open with {} chip seed",
            self.round.number(),
            payout.seed
        );
    }

    /// Fee credit is best-effort: the winner is already paid, so a
    /// failure here is logged rather than replayed into a double award.
    async fn collect_fee(&self, fee: Chips) {
        if fee == 0 {
            return;
        }
        match &self.operator {
            Some(operator) => match self.ledger.credit(operator, fee).await {
                Ok(balance) => self.gateway.publish(&ServerMessage::coins(
                    operator.clone(),
                    balance,
                    Some("fee"),
                )),
                Err(e) => log::warn!("[coordinator] fee credit to {} failed: {}", operator, e),
            },
            None => log::debug!("[coordinator] retiring {} chip fee", fee),
        }
    }

    /// Void the round: one stake back per entrant, then a clean reset
    /// with no seed. Refunds continue past individual failures and any
    /// failure is surfaced to the caller after the reset.
    async fn cancel(&mut self) -> Result<(), Error> {
        let number = self.round.number();
        let stake = self.round.stake();
        let entrants = self.round.entrants().to_vec();
        let mut failed = 0;
        for entrant in &entrants {
            match self.ledger.credit(entrant, stake).await {
                Ok(balance) => self.gateway.publish(&ServerMessage::coins(
                    entrant.clone(),
                    balance,
                    Some("refund"),
                )),
                Err(e) => {
                    failed += 1;
                    log::error!("[coordinator] refund to {} failed: {}", entrant, e);
                }
            }
        }
        self.round.reset(0);
        let now = Instant::now();
        self.gateway.publish(&ServerMessage::timer(
            self.round.number(),
            self.round.seconds(now),
            self.round.pot(),
            None,
        ));
        log::info!(
            "[coordinator] round {} cancelled, {} entrants refunded",
            number,
            entrants.len() - failed
        );
        match failed {
            0 => Ok(()),
            n => Err(Error::Store(format!(
                "{} of {} refunds failed",
                n,
                entrants.len()
            ))),
        }
    }

    fn snapshot(&self, now: Instant) -> Summary {
        Summary {
            round: self.round.number(),
            phase: self.round.phase(),
            pot: self.round.pot(),
            seconds: self.round.seconds(now),
            last_bidder: self.round.last_bidder().cloned(),
        }
    }
}

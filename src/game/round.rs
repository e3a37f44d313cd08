use crate::Chips;
use crate::Error;
use crate::Identity;
use crate::ROUND_DURATION;
use crate::STAKE;
use crate::TICK_INTERVAL;
use std::time::Duration;
use std::time::Instant;

/// Knobs for a round: what a bid costs and how the clock runs.
#[derive(Debug, Clone, Copy)]
pub struct RoundConfig {
    pub stake: Chips,
    pub duration: Duration,
    pub tick: Duration,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            stake: STAKE,
            duration: ROUND_DURATION,
            tick: TICK_INTERVAL,
        }
    }
}

/// Lifecycle of a single round. Bids are only accepted in `Open`;
/// `Settling` is entered at most once per round and is only left by
/// `reset`, after the ledger has accepted the payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Open,
    Closing,
    Settling,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Open => write!(f, "open"),
            Phase::Closing => write!(f, "closing"),
            Phase::Settling => write!(f, "settling"),
        }
    }
}

/// One countdown round: the pot, the clock, and who bid into it.
/// All mutation goes through the coordinator task, so nothing here
/// needs interior locking.
#[derive(Debug)]
pub struct Round {
    config: RoundConfig,
    number: u64,
    phase: Phase,
    seed: Chips,
    bids: u32,
    deadline: Option<Instant>,
    last_bidder: Option<Identity>,
    entrants: Vec<Identity>,
}

impl Round {
    pub fn new(config: RoundConfig, number: u64, seed: Chips) -> Self {
        Self {
            config,
            number,
            phase: Phase::Idle,
            seed,
            bids: 0,
            deadline: None,
            last_bidder: None,
            entrants: Vec::new(),
        }
    }

    pub fn with_defaults(number: u64, seed: Chips) -> Self {
        Self::new(RoundConfig::default(), number, seed)
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// What one bid costs in this round.
    pub fn stake(&self) -> Chips {
        self.config.stake
    }

    /// Seed carried in from the previous round plus every stake committed since.
    pub fn pot(&self) -> Chips {
        self.seed + Chips::from(self.bids) * self.config.stake
    }

    pub fn last_bidder(&self) -> Option<&Identity> {
        self.last_bidder.as_ref()
    }

    /// Identities that committed at least one stake this round, in first-bid order.
    pub fn entrants(&self) -> &[Identity] {
        &self.entrants
    }

    /// Time left on the clock. A round that has not opened reports the
    /// full duration; a round past its deadline reports zero.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.phase {
            Phase::Idle => self.config.duration,
            Phase::Open => self
                .deadline
                .map(|deadline| deadline.saturating_duration_since(now))
                .unwrap_or(Duration::ZERO),
            Phase::Closing | Phase::Settling => Duration::ZERO,
        }
    }

    /// Whole seconds left, rounded up so the clock never shows 0 while
    /// bids are still accepted.
    pub fn seconds(&self, now: Instant) -> u64 {
        self.remaining(now).as_millis().div_ceil(1_000) as u64
    }

    /// Commit one stake. The first bid of a round opens it; every bid
    /// pushes the deadline back to the full duration and takes over as
    /// the prospective winner.
    pub fn bid(&mut self, who: &Identity, now: Instant) -> Result<(), Error> {
        match self.phase {
            Phase::Idle | Phase::Open => {
                self.phase = Phase::Open;
                self.bids += 1;
                self.deadline = Some(now + self.config.duration);
                self.last_bidder = Some(who.clone());
                if !self.entrants.iter().any(|entrant| entrant == who) {
                    self.entrants.push(who.clone());
                }
                Ok(())
            }
            Phase::Closing | Phase::Settling => Err(Error::StateConflict(format!(
                "round {} is {}, bids are closed",
                self.number, self.phase
            ))),
        }
    }

    /// Advance the clock. Returns true on the tick that closes the round.
    pub fn expire(&mut self, now: Instant) -> bool {
        match (self.phase, self.deadline) {
            (Phase::Open, Some(deadline)) if now >= deadline => {
                self.phase = Phase::Closing;
                true
            }
            _ => false,
        }
    }

    /// Claim the round for settlement. Succeeds exactly once, on the
    /// `Closing` round; a retry after a failed payout finds the round
    /// already in `Settling` and goes straight back to the ledger.
    pub fn begin_settlement(&mut self) -> bool {
        match self.phase {
            Phase::Closing => {
                self.phase = Phase::Settling;
                true
            }
            _ => false,
        }
    }

    /// Start the next round. Only called once the ledger has accepted
    /// the previous round's payout or refunds.
    pub fn reset(&mut self, seed: Chips) {
        self.number += 1;
        self.phase = Phase::Idle;
        self.seed = seed;
        self.bids = 0;
        self.deadline = None;
        self.last_bidder = None;
        self.entrants.clear();
    }
}

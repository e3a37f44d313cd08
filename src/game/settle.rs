use crate::Chips;
use crate::FEE_BPS;
use crate::WINNER_BPS;

/// How a settled pot is divided. Derived once per round by [`settle`];
/// the three shares always sum exactly to the pot that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub winner: Chips,
    pub fee: Chips,
    pub seed: Chips,
}

impl Payout {
    pub fn pot(&self) -> Chips {
        self.winner + self.fee + self.seed
    }
}

impl std::fmt::Display for Payout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "winner +{} / fee {} / seed {}",
            self.winner, self.fee, self.seed
        )
    }
}

/// Split a pot into winner, fee, and seed shares.
///
/// Winner and fee round half-up independently; the seed is whatever remains,
/// computed by subtraction rather than by rounding its own ratio, so the sum
/// invariant holds for every pot value.
pub fn settle(pot: Chips) -> Payout {
    let winner = half_up(pot, WINNER_BPS);
    let fee = half_up(pot, FEE_BPS);
    let seed = pot - winner - fee;
    Payout { winner, fee, seed }
}

/// `round(pot * bps / 10_000)` with ties away from zero.
fn half_up(pot: Chips, bps: Chips) -> Chips {
    (pot * bps + 5_000) / 10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_two_bid_pot() {
        let payout = settle(200);
        assert_eq!(payout.winner, 178);
        assert_eq!(payout.fee, 10);
        assert_eq!(payout.seed, 12);
    }

    #[test]
    fn empty_pot_pays_nothing() {
        assert_eq!(
            settle(0),
            Payout {
                winner: 0,
                fee: 0,
                seed: 0
            }
        );
    }

    #[test]
    fn single_stake_rounds_half_up() {
        // 89.0 winner exactly, 5.0 fee exactly, 6 left over
        let payout = settle(100);
        assert_eq!(payout.winner, 89);
        assert_eq!(payout.fee, 5);
        assert_eq!(payout.seed, 6);
    }

    #[test]
    fn awkward_pot_still_sums() {
        // 10 * 0.89 = 8.9 -> 9, 10 * 0.05 = 0.5 -> 1, remainder 0
        let payout = settle(10);
        assert_eq!(payout.winner, 9);
        assert_eq!(payout.fee, 1);
        assert_eq!(payout.seed, 0);
    }

    #[test]
    fn shares_sum_to_pot_for_all_small_pots() {
        for pot in 0..=10_000 {
            let payout = settle(pot);
            assert_eq!(payout.pot(), pot, "shares must sum exactly at pot {}", pot);
            assert!(payout.winner >= 0 && payout.fee >= 0 && payout.seed >= 0);
        }
    }

    #[test]
    fn winner_share_dominates() {
        for pot in (100..1_000_000).step_by(37) {
            let payout = settle(pot);
            assert!(payout.winner > payout.fee + payout.seed);
        }
    }
}

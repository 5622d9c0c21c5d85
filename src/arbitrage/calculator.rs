//! Stake, payout and profit calculations for arbitrage opportunities.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use smallvec::SmallVec;
use tracing::instrument;

use super::detector::ArbitrageOpportunity;
use crate::error::StakeError;
use crate::odds::Outcome;

/// Decimal places kept on ROI percentages.
const ROI_DECIMALS: u32 = 4;

/// Stake placed on one outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeStake {
    /// Staked outcome.
    pub outcome: Outcome,
    /// Decimal odds taken.
    pub odds: Decimal,
    /// Amount staked.
    pub stake: Decimal,
    /// Return if this outcome wins (stake × odds).
    pub payout: Decimal,
}

/// Equal-payout stake split for one opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakePlan {
    /// Bankroll spread across the outcomes.
    pub total_stake: Decimal,
    /// Per-outcome stakes in display order; they sum to `total_stake`.
    pub stakes: SmallVec<[OutcomeStake; 3]>,
    /// Smallest payout across outcomes.
    pub guaranteed_return: Decimal,
    /// guaranteed_return − total_stake.
    pub profit: Decimal,
    /// 100 × profit / total_stake.
    pub roi_percent: Decimal,
}

impl StakePlan {
    /// Stake for one outcome.
    pub fn stake_for(&self, outcome: Outcome) -> Option<Decimal> {
        self.stakes
            .iter()
            .find(|s| s.outcome == outcome)
            .map(|s| s.stake)
    }

    /// Sum of per-outcome stakes.
    pub fn staked(&self) -> Decimal {
        self.stakes.iter().map(|s| s.stake).sum()
    }
}

/// Splits a bankroll across an opportunity's outcomes for equal payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeAllocator {
    /// Currency precision in decimal places; `None` keeps full precision.
    decimals: Option<u32>,
}

impl Default for StakeAllocator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DECIMALS)
    }
}

impl StakeAllocator {
    /// Pence / cents.
    pub const DEFAULT_DECIMALS: u32 = 2;

    /// Allocator rounding stakes to `decimals` places.
    pub fn new(decimals: u32) -> Self {
        Self {
            decimals: Some(decimals),
        }
    }

    /// Allocator that never rounds.
    pub fn exact() -> Self {
        Self { decimals: None }
    }

    /// Currency precision, if rounding.
    pub fn decimals(&self) -> Option<u32> {
        self.decimals
    }

    /// Compute the equal-payout stake plan.
    ///
    /// Each stake is `total × (1/odds) / implied_sum`, rounded to the currency
    /// unit; the last outcome takes whatever remains so the stakes sum to
    /// `total_stake` exactly.
    #[instrument(skip(self, opportunity), fields(match_id = %opportunity.match_id))]
    pub fn allocate(
        &self,
        opportunity: &ArbitrageOpportunity,
        total_stake: Decimal,
    ) -> Result<StakePlan, StakeError> {
        if total_stake <= Decimal::ZERO {
            return Err(StakeError::NonPositiveStake(total_stake));
        }
        if opportunity.margin <= Decimal::ZERO {
            return Err(StakeError::NoMargin {
                margin: opportunity.margin,
            });
        }

        let implied_sum = opportunity.implied_probability_sum;
        let legs: SmallVec<[_; 3]> = opportunity.best_odds.iter().collect();
        let last = legs.len().saturating_sub(1);

        let mut stakes: SmallVec<[OutcomeStake; 3]> = SmallVec::new();
        let mut allocated = Decimal::ZERO;

        for (i, leg) in legs.iter().enumerate() {
            let stake = if i == last {
                total_stake - allocated
            } else {
                self.round(total_stake * leg.implied_probability() / implied_sum)
            };
            if stake <= Decimal::ZERO {
                return Err(StakeError::StakeTooSmall {
                    total_stake,
                    outcomes: legs.len(),
                    decimals: self.decimals.unwrap_or(0),
                });
            }
            allocated += stake;
            stakes.push(OutcomeStake {
                outcome: leg.outcome,
                odds: leg.odds,
                stake,
                payout: stake * leg.odds,
            });
        }

        let min_payout = stakes
            .iter()
            .map(|s| s.payout)
            .min()
            .unwrap_or(Decimal::ZERO);
        let guaranteed_return = match self.decimals {
            Some(dp) => min_payout.round_dp_with_strategy(dp, RoundingStrategy::ToNegativeInfinity),
            None => min_payout,
        };
        let profit = guaranteed_return - total_stake;
        let roi_percent = (profit / total_stake * Decimal::ONE_HUNDRED).round_dp(ROI_DECIMALS);

        Ok(StakePlan {
            total_stake,
            stakes,
            guaranteed_return,
            profit,
            roi_percent,
        })
    }

    fn round(&self, value: Decimal) -> Decimal {
        match self.decimals {
            Some(dp) => value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
            None => value,
        }
    }
}

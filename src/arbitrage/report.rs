//! Presentation records for detected opportunities.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::Serialize;
use smallvec::SmallVec;
use time::OffsetDateTime;

use super::calculator::StakePlan;
use super::detector::ArbitrageOpportunity;
use crate::odds::{Fixture, MarketType, Outcome};

/// One row of a report: where to place which stake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeLeg {
    /// Staked outcome.
    pub outcome: Outcome,
    /// Bookmaker offering the best price.
    pub bookmaker: String,
    /// Decimal odds.
    pub odds: Decimal,
    /// Stake to place.
    pub stake: Decimal,
}

/// Everything needed to display one opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpportunityReport {
    /// Provider match identifier.
    pub match_id: String,
    /// Market structure.
    pub market_type: MarketType,
    /// "Home vs Away", when the fixture is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Kickoff, when the fixture is known.
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub kickoff: Option<OffsetDateTime>,
    /// Legs in home, draw, away order.
    pub outcomes: SmallVec<[OutcomeLeg; 3]>,
    /// Σ 1/odds.
    pub implied_probability_sum: Decimal,
    /// 1 − implied_probability_sum.
    pub margin: Decimal,
    /// Total bankroll.
    pub total_stake: Decimal,
    /// Return whichever outcome wins.
    pub guaranteed_return: Decimal,
    /// guaranteed_return − total_stake.
    pub profit: Decimal,
    /// 100 × profit / total_stake.
    pub roi_percent: Decimal,
}

impl OpportunityReport {
    /// Combine an opportunity with its stake plan.
    pub fn new(
        opportunity: &ArbitrageOpportunity,
        plan: &StakePlan,
        fixture: Option<&Fixture>,
    ) -> Self {
        let mut outcomes: SmallVec<[OutcomeLeg; 3]> = opportunity
            .best_odds
            .iter()
            .map(|price| OutcomeLeg {
                outcome: price.outcome,
                bookmaker: price.bookmaker.clone(),
                odds: price.odds,
                stake: plan.stake_for(price.outcome).unwrap_or(Decimal::ZERO),
            })
            .collect();
        outcomes.sort_by_key(|leg| leg.outcome);

        Self {
            match_id: opportunity.match_id.clone(),
            market_type: opportunity.market_type,
            label: fixture.map(Fixture::label),
            kickoff: fixture.and_then(|f| f.commence_time),
            outcomes,
            implied_probability_sum: opportunity.implied_probability_sum,
            margin: opportunity.margin,
            total_stake: plan.total_stake,
            guaranteed_return: plan.guaranteed_return,
            profit: plan.profit,
            roi_percent: plan.roi_percent,
        }
    }

    /// Leg for one outcome.
    pub fn leg(&self, outcome: Outcome) -> Option<&OutcomeLeg> {
        self.outcomes.iter().find(|l| l.outcome == outcome)
    }

    /// Heading line: label (or match id), market, ROI.
    pub fn headline(&self) -> String {
        let name = self.label.as_deref().unwrap_or(&self.match_id);
        let kickoff = self
            .kickoff
            .map(|k| {
                format!(
                    " - KO {:04}-{:02}-{:02} {:02}:{:02} UTC",
                    k.year(),
                    u8::from(k.month()),
                    k.day(),
                    k.hour(),
                    k.minute()
                )
            })
            .unwrap_or_default();
        format!(
            "{}{} [{}] | ROI {}%",
            name,
            kickoff,
            self.market_type,
            self.roi_percent.round_dp(2)
        )
    }
}

/// Descending ROI, then ascending match id.
pub fn compare_reports(a: &OpportunityReport, b: &OpportunityReport) -> Ordering {
    b.roi_percent
        .cmp(&a.roi_percent)
        .then_with(|| a.match_id.cmp(&b.match_id))
        .then_with(|| a.market_type.cmp(&b.market_type))
}

/// Sort reports for display.
pub fn sort_reports(reports: &mut [OpportunityReport]) {
    reports.sort_by(compare_reports);
}

impl std::fmt::Display for OpportunityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.headline())?;
        writeln!(f, "  {:<10} {:<16} {:>8} {:>12}", "Outcome", "Bookmaker", "Odds", "Stake")?;
        for leg in &self.outcomes {
            writeln!(
                f,
                "  {:<10} {:<16} {:>8} {:>12}",
                leg.outcome.label(),
                leg.bookmaker,
                leg.odds,
                leg.stake.round_dp(2)
            )?;
        }
        write!(
            f,
            "  Total Stake: {}  Guaranteed Return: {}  Profit: {}  (ROI: {}%)",
            self.total_stake.round_dp(2),
            self.guaranteed_return.round_dp(2),
            self.profit.round_dp(2),
            self.roi_percent.round_dp(2)
        )
    }
}

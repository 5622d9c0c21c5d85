//! Arbitrage module for detecting and staking opportunities.
//!
//! This module handles:
//! - Best-price selection and margin detection per market
//! - Equal-payout stake allocation
//! - Presentation records for detected opportunities

pub mod calculator;
pub mod detector;
pub mod report;

pub use calculator::{OutcomeStake, StakeAllocator, StakePlan};
pub use detector::{
    check_arbitrage, diagnose_no_opportunity, select_best_odds, ArbitrageOpportunity, BestOdds,
    BestPrice, NoOpportunityDiagnosis, PROBABILITY_EPSILON,
};
pub use report::{sort_reports, OpportunityReport, OutcomeLeg};

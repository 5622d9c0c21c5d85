//! Odds module: typed quotes and their preparation for detection.
//!
//! This module handles:
//! - Raw entry and quote types
//! - Normalization of provider prices into decimal quotes
//! - Grouping of quotes into per-match markets

pub mod grouper;
pub mod normalizer;
pub mod types;

pub use grouper::{group_quotes, GroupedMarkets, MatchMarket};
pub use normalizer::{convert_price, normalize, resolve_outcome, NormalizedBatch, Rejection};
pub use types::{
    Fixture, MarketKey, MarketType, OddsFormat, Outcome, Quote, RawOddsBatch, RawOddsEntry,
};

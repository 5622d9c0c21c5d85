//! Football odds arbitrage detection and stake allocation.
//!
//! This library scans bookmaker prices for football match-result markets and
//! reports every market where backing each outcome at its best available odds
//! returns more than the total staked, whatever the result.
//!
//! # Strategy
//!
//! Each decimal price implies a probability of `1 / odds`. When the best
//! prices across bookmakers imply less than 100% in total, a stake split in
//! proportion to those probabilities pays the same on every outcome:
//!
//! ```text
//! HOME 2.50  (bookmaker A)   implied 40.0%   stake 400
//! DRAW 4.00  (bookmaker B)   implied 25.0%   stake 250
//! AWAY 4.00  (bookmaker C)   implied 25.0%   stake 250
//! ───────────────────────────────────────────────────
//! Total implied: 90.0% < 100% ✅
//! Any result returns 1000 on 900 staked (ROI 11.11%)
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`odds`]: Quote types, normalization and grouping
//! - [`arbitrage`]: Opportunity detection, stake allocation and reports
//! - [`pipeline`]: One scan from raw batch to sorted reports
//! - [`provider`]: Odds sources (The Odds API client, mock)
//! - [`scheduler`]: Periodic polling with retry
//! - [`api`]: HTTP API for health, opportunities and metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod arbitrage;
pub mod config;
pub mod error;
pub mod metrics;
pub mod odds;
pub mod pipeline;
pub mod provider;
pub mod scheduler;
pub mod utils;

pub use config::Config;
pub use error::{ArbError, Result};
pub use pipeline::{scan, scan_with, ScanReport, ScanStats};

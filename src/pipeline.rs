//! Single-pass scan: raw batch in, sorted opportunity reports out.

use std::collections::BTreeMap;

use metrics::counter;
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::arbitrage::{
    check_arbitrage, diagnose_no_opportunity, sort_reports, OpportunityReport, StakeAllocator,
};
use crate::error::StakeError;
use crate::metrics::{timer_scan, METRIC_SCANS_COMPLETED};
use crate::odds::{group_quotes, normalize, MarketKey, RawOddsBatch};

/// Observability counts for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Raw entries in the batch.
    pub entries_received: usize,
    /// Entries that became quotes.
    pub quotes_accepted: usize,
    /// Entries dropped by the normalizer.
    pub rejected: usize,
    /// Dropped entries by reason.
    pub rejected_by_reason: BTreeMap<String, usize>,
    /// Duplicate observations discarded during grouping.
    pub duplicates_superseded: usize,
    /// Markets formed.
    pub markets_grouped: usize,
    /// Markets missing a required outcome.
    pub markets_incomplete: usize,
    /// Keys of the incomplete markets.
    pub incomplete_markets: Vec<MarketKey>,
    /// Opportunities reported.
    pub opportunities: usize,
}

/// Output of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// When the scanned batch was fetched.
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
    /// Opportunities, highest ROI first.
    pub opportunities: Vec<OpportunityReport>,
    /// Counts for observability.
    pub stats: ScanStats,
}

/// Scan a batch, staking `total_stake` on every opportunity at currency precision.
pub fn scan(batch: &RawOddsBatch, total_stake: Decimal) -> Result<ScanReport, StakeError> {
    scan_with(batch, total_stake, &StakeAllocator::default())
}

/// Scan a batch with an explicit allocator.
///
/// Fails only when `total_stake` is not positive; bad entries and incomplete
/// markets degrade to fewer opportunities.
#[instrument(skip_all, fields(entries = batch.entries.len(), total_stake = %total_stake))]
pub fn scan_with(
    batch: &RawOddsBatch,
    total_stake: Decimal,
    allocator: &StakeAllocator,
) -> Result<ScanReport, StakeError> {
    if total_stake <= Decimal::ZERO {
        return Err(StakeError::NonPositiveStake(total_stake));
    }

    let _timer = timer_scan();

    let normalized = normalize(batch);
    let mut stats = ScanStats {
        entries_received: batch.entries.len(),
        quotes_accepted: normalized.quotes.len(),
        rejected: normalized.rejections.len(),
        rejected_by_reason: normalized.rejected_by_reason(),
        ..ScanStats::default()
    };

    let grouped = group_quotes(normalized.quotes);
    stats.duplicates_superseded = grouped.superseded();
    stats.markets_grouped = grouped.len();
    stats.incomplete_markets = grouped.incomplete();
    stats.markets_incomplete = stats.incomplete_markets.len();

    let mut opportunities = Vec::new();
    for market in grouped.iter() {
        let Some(opportunity) = check_arbitrage(market) else {
            debug!("{}", diagnose_no_opportunity(market));
            continue;
        };

        match allocator.allocate(&opportunity, total_stake) {
            Ok(plan) => opportunities.push(OpportunityReport::new(
                &opportunity,
                &plan,
                batch.fixture(&opportunity.match_id),
            )),
            Err(e) => warn!(match_id = %opportunity.match_id, error = %e, "Skipping opportunity"),
        }
    }

    sort_reports(&mut opportunities);
    stats.opportunities = opportunities.len();

    counter!(METRIC_SCANS_COMPLETED).increment(1);
    info!(
        entries = stats.entries_received,
        rejected = stats.rejected,
        markets = stats.markets_grouped,
        incomplete = stats.markets_incomplete,
        opportunities = stats.opportunities,
        "Scan complete"
    );

    Ok(ScanReport {
        fetched_at: batch.fetched_at,
        opportunities,
        stats,
    })
}

//! Raw odds normalization: parse, validate, and convert to decimal quotes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use metrics::counter;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use super::types::{Fixture, MarketType, OddsFormat, Outcome, Quote, RawOddsBatch, RawOddsEntry};
use crate::error::RejectReason;
use crate::metrics::METRIC_ENTRIES_REJECTED;

/// A dropped raw entry and why it was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Bookmaker of the dropped entry.
    pub bookmaker: String,
    /// Match of the dropped entry.
    pub match_id: String,
    /// Outcome label of the dropped entry.
    pub outcome_label: String,
    /// Reason for dropping.
    pub reason: RejectReason,
}

/// Result of normalizing one batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Valid quotes, in input order.
    pub quotes: Vec<Quote>,
    /// Dropped entries, in input order.
    pub rejections: Vec<Rejection>,
}

impl NormalizedBatch {
    /// Rejection counts keyed by reason kind.
    pub fn rejected_by_reason(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for rejection in &self.rejections {
            *counts.entry(rejection.reason.kind().to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// Convert a price in the given convention to decimal odds.
///
/// Only parses; the `> 1.0` check happens in [`normalize`].
pub fn convert_price(price: &str, format: OddsFormat) -> Result<Decimal, RejectReason> {
    let text = price.trim();
    let unparseable = || RejectReason::UnparseableOdds {
        price: price.to_string(),
    };

    if text.is_empty() {
        return Err(unparseable());
    }

    let format = match format {
        OddsFormat::Auto => infer_format(text),
        explicit => explicit,
    };

    match format {
        OddsFormat::Decimal | OddsFormat::Auto => {
            Decimal::from_str(text).map_err(|_| unparseable())
        }
        OddsFormat::Fractional => {
            let (num, den) = text.split_once('/').ok_or_else(unparseable)?;
            let num = Decimal::from_str(num.trim()).map_err(|_| unparseable())?;
            let den = Decimal::from_str(den.trim()).map_err(|_| unparseable())?;
            if num.is_sign_negative() || den <= Decimal::ZERO {
                return Err(unparseable());
            }
            num.checked_div(den)
                .and_then(|ratio| ratio.checked_add(Decimal::ONE))
                .ok_or_else(unparseable)
        }
        OddsFormat::American => {
            let (negative, digits) = match text.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, text.strip_prefix('+').unwrap_or(text)),
            };
            let magnitude = Decimal::from_str(digits.trim()).map_err(|_| unparseable())?;
            // American lines are never inside (-100, +100).
            if magnitude < Decimal::ONE_HUNDRED {
                return Err(unparseable());
            }
            let payout = if negative {
                Decimal::ONE_HUNDRED.checked_div(magnitude)
            } else {
                magnitude.checked_div(Decimal::ONE_HUNDRED)
            };
            payout
                .and_then(|p| p.checked_add(Decimal::ONE))
                .ok_or_else(unparseable)
        }
    }
}

fn infer_format(text: &str) -> OddsFormat {
    if text.contains('/') {
        OddsFormat::Fractional
    } else if text.starts_with('+') || text.starts_with('-') {
        OddsFormat::American
    } else {
        OddsFormat::Decimal
    }
}

/// Map a provider outcome label to an outcome.
///
/// Accepts the generic vocabulary (`home`, `1`, `draw`, `X`, ...) and, when
/// the fixture is known, the team names.
pub fn resolve_outcome(label: &str, fixture: Option<&Fixture>) -> Option<Outcome> {
    let label = label.trim();
    if let Ok(outcome) = Outcome::from_str(label) {
        return Some(outcome);
    }

    let fixture = fixture?;
    if label.eq_ignore_ascii_case(fixture.home_team.trim()) {
        Some(Outcome::Home)
    } else if label.eq_ignore_ascii_case(fixture.away_team.trim()) {
        Some(Outcome::Away)
    } else {
        None
    }
}

/// Infer the market type from the distinct outcomes one bookmaker listed.
pub fn infer_market_type(outcomes: &BTreeSet<Outcome>) -> Option<MarketType> {
    match outcomes.len() {
        3 => Some(MarketType::ThreeWay),
        2 if !outcomes.contains(&Outcome::Draw) => Some(MarketType::TwoWay),
        _ => None,
    }
}

/// Normalize a raw batch into decimal quotes.
///
/// Market type is inferred per (match, bookmaker) from the outcome labels
/// that bookmaker listed, whether or not their prices turn out valid.
#[instrument(skip_all, fields(entries = batch.entries.len()))]
pub fn normalize(batch: &RawOddsBatch) -> NormalizedBatch {
    let resolved: Vec<Option<Outcome>> = batch
        .entries
        .iter()
        .map(|entry| resolve_outcome(&entry.outcome_label, batch.fixture(&entry.match_id)))
        .collect();

    let mut listed: HashMap<(&str, &str), BTreeSet<Outcome>> = HashMap::new();
    for (entry, outcome) in batch.entries.iter().zip(&resolved) {
        if let Some(outcome) = outcome {
            listed
                .entry((entry.match_id.as_str(), entry.bookmaker.as_str()))
                .or_default()
                .insert(*outcome);
        }
    }

    let mut out = NormalizedBatch::default();

    for (entry, outcome) in batch.entries.iter().zip(resolved) {
        match normalize_entry(entry, outcome, &listed) {
            Ok(quote) => out.quotes.push(quote),
            Err(reason) => {
                debug!(
                    bookmaker = %entry.bookmaker,
                    match_id = %entry.match_id,
                    label = %entry.outcome_label,
                    reason = %reason,
                    "Dropping odds entry"
                );
                counter!(METRIC_ENTRIES_REJECTED, "reason" => reason.kind()).increment(1);
                out.rejections.push(Rejection {
                    bookmaker: entry.bookmaker.clone(),
                    match_id: entry.match_id.clone(),
                    outcome_label: entry.outcome_label.clone(),
                    reason,
                });
            }
        }
    }

    debug!(
        accepted = out.quotes.len(),
        rejected = out.rejections.len(),
        "Batch normalized"
    );

    out
}

fn normalize_entry(
    entry: &RawOddsEntry,
    outcome: Option<Outcome>,
    listed: &HashMap<(&str, &str), BTreeSet<Outcome>>,
) -> Result<Quote, RejectReason> {
    let outcome = outcome.ok_or_else(|| RejectReason::UnknownOutcome {
        label: entry.outcome_label.clone(),
    })?;

    let outcomes = listed
        .get(&(entry.match_id.as_str(), entry.bookmaker.as_str()))
        .ok_or(RejectReason::UnknownMarketType { distinct: 0 })?;
    let market_type = infer_market_type(outcomes).ok_or(RejectReason::UnknownMarketType {
        distinct: outcomes.len(),
    })?;

    let decimal_odds = convert_price(&entry.price, entry.format)?;
    if decimal_odds <= Decimal::ONE {
        return Err(RejectReason::OddsNotAboveOne { odds: decimal_odds });
    }

    Ok(Quote {
        bookmaker: entry.bookmaker.clone(),
        match_id: entry.match_id.clone(),
        market_type,
        outcome,
        decimal_odds,
        observed_at: entry.observed_at,
    })
}

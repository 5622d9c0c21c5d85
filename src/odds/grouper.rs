//! Grouping of quotes into per-match markets.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use super::types::{MarketKey, MarketType, Outcome, Quote};

/// All quotes for one (match, market type), at most one per (bookmaker, outcome).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchMarket {
    /// Provider match identifier.
    pub match_id: String,
    /// Market structure.
    pub market_type: MarketType,
    quotes: BTreeMap<(String, Outcome), Quote>,
}

/// What happened when a quote was offered to a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    /// First quote for this (bookmaker, outcome).
    New,
    /// Replaced an older observation.
    Replaced,
    /// Dropped: an observation at least as recent is already held.
    Stale,
}

impl MatchMarket {
    /// Create an empty market.
    pub fn new(match_id: impl Into<String>, market_type: MarketType) -> Self {
        Self {
            match_id: match_id.into(),
            market_type,
            quotes: BTreeMap::new(),
        }
    }

    /// Market identity.
    pub fn key(&self) -> MarketKey {
        MarketKey::new(self.match_id.clone(), self.market_type)
    }

    /// Offer a quote. The later `observed_at` wins; equal timestamps keep the
    /// quote already held.
    pub fn insert(&mut self, quote: Quote) -> Insert {
        match self.quotes.entry((quote.bookmaker.clone(), quote.outcome)) {
            Entry::Vacant(slot) => {
                slot.insert(quote);
                Insert::New
            }
            Entry::Occupied(mut slot) => {
                if quote.observed_at > slot.get().observed_at {
                    slot.insert(quote);
                    Insert::Replaced
                } else {
                    Insert::Stale
                }
            }
        }
    }

    /// All retained quotes, ordered by (bookmaker, outcome).
    pub fn quotes(&self) -> impl Iterator<Item = &Quote> {
        self.quotes.values()
    }

    /// Quotes for one outcome.
    pub fn quotes_for(&self, outcome: Outcome) -> impl Iterator<Item = &Quote> {
        self.quotes.values().filter(move |q| q.outcome == outcome)
    }

    /// Number of retained quotes.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether no quotes are retained.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Distinct bookmakers quoting this market.
    pub fn bookmakers(&self) -> BTreeSet<&str> {
        self.quotes.keys().map(|(b, _)| b.as_str()).collect()
    }

    /// Required outcomes with no quote at all.
    pub fn missing_outcomes(&self) -> Vec<Outcome> {
        self.market_type
            .required_outcomes()
            .iter()
            .copied()
            .filter(|o| self.quotes_for(*o).next().is_none())
            .collect()
    }

    /// Whether every required outcome has at least one quote.
    pub fn is_complete(&self) -> bool {
        self.missing_outcomes().is_empty()
    }
}

/// Markets keyed by (match, market type), iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedMarkets {
    markets: BTreeMap<MarketKey, MatchMarket>,
    superseded: usize,
}

impl GroupedMarkets {
    /// Iterate markets in key order.
    pub fn iter(&self) -> impl Iterator<Item = &MatchMarket> {
        self.markets.values()
    }

    /// Look up one market.
    pub fn get(&self, key: &MarketKey) -> Option<&MatchMarket> {
        self.markets.get(key)
    }

    /// Number of markets.
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    /// Whether there are no markets.
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// Keys of markets missing at least one required outcome.
    pub fn incomplete(&self) -> Vec<MarketKey> {
        self.markets
            .iter()
            .filter(|(_, m)| !m.is_complete())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Duplicate (bookmaker, outcome) observations discarded while grouping.
    pub fn superseded(&self) -> usize {
        self.superseded
    }
}

/// Group quotes by (match, market type).
#[instrument(skip_all)]
pub fn group_quotes(quotes: impl IntoIterator<Item = Quote>) -> GroupedMarkets {
    let mut grouped = GroupedMarkets::default();

    for quote in quotes {
        let key = MarketKey::new(quote.match_id.clone(), quote.market_type);
        let market = grouped
            .markets
            .entry(key)
            .or_insert_with_key(|k| MatchMarket::new(k.match_id.clone(), k.market_type));

        match market.insert(quote) {
            Insert::New => {}
            Insert::Replaced | Insert::Stale => grouped.superseded += 1,
        }
    }

    debug!(
        markets = grouped.len(),
        superseded = grouped.superseded,
        "Quotes grouped"
    );

    grouped
}

//! Arbitrage opportunity detection.

use metrics::counter;
use rust_decimal::Decimal;
use serde::Serialize;
use smallvec::SmallVec;
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use crate::metrics::{METRIC_MARKETS_INCOMPLETE, METRIC_OPPORTUNITIES_DETECTED};
use crate::odds::{MarketType, MatchMarket, Outcome, Quote};

/// Implied-probability sums within this distance of 1.0 count as no margin.
///
/// Guards against rounding noise (three `1/3.00` terms do not sum to exactly one).
pub const PROBABILITY_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// Best available price for one outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestPrice {
    /// Priced outcome.
    pub outcome: Outcome,
    /// Bookmaker offering the price.
    pub bookmaker: String,
    /// Decimal odds.
    pub odds: Decimal,
    /// When the price was observed.
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
}

impl BestPrice {
    fn from_quote(quote: &Quote) -> Self {
        Self {
            outcome: quote.outcome,
            bookmaker: quote.bookmaker.clone(),
            odds: quote.decimal_odds,
            observed_at: quote.observed_at,
        }
    }

    /// Implied probability of this price.
    pub fn implied_probability(&self) -> Decimal {
        Decimal::ONE / self.odds
    }
}

/// Best price per required outcome, in display order (home, draw, away).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BestOdds {
    prices: SmallVec<[BestPrice; 3]>,
}

impl BestOdds {
    /// Best price for one outcome.
    pub fn get(&self, outcome: Outcome) -> Option<&BestPrice> {
        self.prices.iter().find(|p| p.outcome == outcome)
    }

    /// Prices in display order.
    pub fn iter(&self) -> impl Iterator<Item = &BestPrice> {
        self.prices.iter()
    }

    /// Number of priced outcomes.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Always false for odds built by [`select_best_odds`].
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Σ 1/odds, summed smallest term first.
    pub fn implied_probability_sum(&self) -> Decimal {
        let mut terms: SmallVec<[Decimal; 3]> =
            self.prices.iter().map(BestPrice::implied_probability).collect();
        terms.sort();
        terms.into_iter().sum()
    }
}

/// A market whose best prices imply less than 100% in total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArbitrageOpportunity {
    /// Provider match identifier.
    pub match_id: String,
    /// Market structure.
    pub market_type: MarketType,
    /// Best price per outcome.
    pub best_odds: BestOdds,
    /// Σ 1/best_odds.
    pub implied_probability_sum: Decimal,
    /// 1 − implied_probability_sum, always > 0.
    pub margin: Decimal,
}

/// Pick the best quote per required outcome.
///
/// Highest odds win; ties go to the earliest observation, then to the
/// bookmaker name. Returns `None` if any required outcome is unquoted.
pub fn select_best_odds(market: &MatchMarket) -> Option<BestOdds> {
    let mut prices = SmallVec::new();

    for &outcome in market.market_type.required_outcomes() {
        let best = market.quotes_for(outcome).reduce(|best, candidate| {
            let better = candidate.decimal_odds > best.decimal_odds
                || (candidate.decimal_odds == best.decimal_odds
                    && (candidate.observed_at, &candidate.bookmaker)
                        < (best.observed_at, &best.bookmaker));
            if better {
                candidate
            } else {
                best
            }
        })?;
        prices.push(BestPrice::from_quote(best));
    }

    Some(BestOdds { prices })
}

/// Check one market for an arbitrage opportunity.
///
/// Incomplete markets and markets without strictly positive margin yield `None`.
#[instrument(skip(market), fields(match_id = %market.match_id, market_type = %market.market_type))]
pub fn check_arbitrage(market: &MatchMarket) -> Option<ArbitrageOpportunity> {
    let Some(best_odds) = select_best_odds(market) else {
        counter!(METRIC_MARKETS_INCOMPLETE).increment(1);
        debug!(missing = ?market.missing_outcomes(), "Market incomplete");
        return None;
    };

    let implied_probability_sum = best_odds.implied_probability_sum();
    if implied_probability_sum >= Decimal::ONE - PROBABILITY_EPSILON {
        debug!(implied_sum = %implied_probability_sum, "No arbitrage opportunity");
        return None;
    }

    let opportunity = ArbitrageOpportunity {
        match_id: market.match_id.clone(),
        market_type: market.market_type,
        best_odds,
        implied_probability_sum,
        margin: Decimal::ONE - implied_probability_sum,
    };

    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(1);
    info!(
        implied_sum = %opportunity.implied_probability_sum.round_dp(6),
        margin = %opportunity.margin.round_dp(6),
        "Arbitrage opportunity detected"
    );

    Some(opportunity)
}

/// Get diagnostic information about why a market has no opportunity.
pub fn diagnose_no_opportunity(market: &MatchMarket) -> NoOpportunityDiagnosis {
    let best_odds = select_best_odds(market);
    NoOpportunityDiagnosis {
        match_id: market.match_id.clone(),
        market_type: market.market_type,
        bookmakers: market.bookmakers().len(),
        missing: market.missing_outcomes(),
        implied_probability_sum: best_odds.map(|b| b.implied_probability_sum()),
    }
}

/// Diagnostic information for debugging.
#[derive(Debug, Clone)]
pub struct NoOpportunityDiagnosis {
    /// Provider match identifier.
    pub match_id: String,
    /// Market structure.
    pub market_type: MarketType,
    /// Distinct bookmakers quoting the market.
    pub bookmakers: usize,
    /// Outcomes with no quote.
    pub missing: Vec<Outcome>,
    /// Best-price implied sum, if the market is complete.
    pub implied_probability_sum: Option<Decimal>,
}

impl std::fmt::Display for NoOpportunityDiagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} | books={} | implied={}",
            self.match_id,
            self.market_type,
            self.bookmakers,
            self.implied_probability_sum
                .map(|d| d.round_dp(4).to_string())
                .unwrap_or_else(|| "N/A".to_string()),
        )?;
        if !self.missing.is_empty() {
            let missing: Vec<String> = self.missing.iter().map(|o| o.to_string()).collect();
            write!(f, " | missing={}", missing.join(","))?;
        }
        Ok(())
    }
}

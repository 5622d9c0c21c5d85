//! Odds types: raw provider entries and the canonical quotes built from them.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

/// Match result outcome.
///
/// Ordering follows display order: home, draw, away.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Outcome {
    /// Home side wins.
    #[strum(to_string = "home", serialize = "1")]
    Home,
    /// Draw.
    #[strum(to_string = "draw", serialize = "x", serialize = "tie")]
    Draw,
    /// Away side wins.
    #[strum(to_string = "away", serialize = "2")]
    Away,
}

impl Outcome {
    /// Human label used in tables.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Home => "Home Win",
            Outcome::Draw => "Draw",
            Outcome::Away => "Away Win",
        }
    }
}

/// Outcome structure of a match market.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    /// Home / away.
    #[strum(to_string = "2-way")]
    TwoWay,
    /// Home / draw / away.
    #[strum(to_string = "3-way")]
    ThreeWay,
}

impl MarketType {
    /// Outcomes that must all be covered for the market to be priced.
    pub fn required_outcomes(&self) -> &'static [Outcome] {
        match self {
            MarketType::TwoWay => &[Outcome::Home, Outcome::Away],
            MarketType::ThreeWay => &[Outcome::Home, Outcome::Draw, Outcome::Away],
        }
    }

    /// Whether `outcome` belongs to this market type.
    pub fn allows(&self, outcome: Outcome) -> bool {
        self.required_outcomes().contains(&outcome)
    }
}

/// Identity of a grouped market.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketKey {
    /// Provider match identifier.
    pub match_id: String,
    /// Market structure.
    pub market_type: MarketType,
}

impl MarketKey {
    /// Create a new market key.
    pub fn new(match_id: impl Into<String>, market_type: MarketType) -> Self {
        Self {
            match_id: match_id.into(),
            market_type,
        }
    }
}

impl std::fmt::Display for MarketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.match_id, self.market_type)
    }
}

/// One validated bookmaker price for one outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Bookmaker display name.
    pub bookmaker: String,
    /// Provider match identifier.
    pub match_id: String,
    /// Market the quote belongs to.
    pub market_type: MarketType,
    /// Priced outcome.
    pub outcome: Outcome,
    /// Decimal odds, always > 1.0.
    pub decimal_odds: Decimal,
    /// When the bookmaker last updated this price.
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
}

impl Quote {
    /// Implied probability (1 / odds).
    pub fn implied_probability(&self) -> Decimal {
        Decimal::ONE / self.decimal_odds
    }
}

/// Price convention of a raw entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OddsFormat {
    /// `2.50`
    Decimal,
    /// `3/2`
    Fractional,
    /// `+150` / `-200`
    American,
    /// Inferred from the text.
    #[default]
    Auto,
}

/// Raw odds entry as delivered by an odds source, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOddsEntry {
    /// Bookmaker display name.
    pub bookmaker: String,
    /// Provider match identifier.
    pub match_id: String,
    /// Outcome label in the provider's vocabulary.
    pub outcome_label: String,
    /// Price text in `format`.
    pub price: String,
    /// Price convention.
    #[serde(default)]
    pub format: OddsFormat,
    /// When the price was observed.
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
}

/// Match metadata delivered alongside odds entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    /// Provider match identifier.
    pub match_id: String,
    /// Home team name.
    pub home_team: String,
    /// Away team name.
    pub away_team: String,
    /// Kickoff time.
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub commence_time: Option<OffsetDateTime>,
}

impl Fixture {
    /// "Home vs Away".
    pub fn label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

/// One polling cycle's worth of raw odds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOddsBatch {
    /// Raw per-bookmaker, per-outcome entries.
    pub entries: Vec<RawOddsEntry>,
    /// Known fixtures keyed by match id.
    #[serde(default)]
    pub fixtures: BTreeMap<String, Fixture>,
    /// When the batch was fetched.
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
}

impl RawOddsBatch {
    /// Create an empty batch stamped with `fetched_at`.
    pub fn empty(fetched_at: OffsetDateTime) -> Self {
        Self {
            entries: Vec::new(),
            fixtures: BTreeMap::new(),
            fetched_at,
        }
    }

    /// Fixture for a match, if known.
    pub fn fixture(&self, match_id: &str) -> Option<&Fixture> {
        self.fixtures.get(match_id)
    }

    /// Whether the batch holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

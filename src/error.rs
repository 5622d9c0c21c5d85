//! Unified error types for the arbitrage scanner.

use rust_decimal::Decimal;
use strum::IntoStaticStr;
use thiserror::Error;

/// Unified error type for the arbitrage scanner.
#[derive(Error, Debug)]
pub enum ArbError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Stake allocation request was rejected.
    #[error("stake error: {0}")]
    Stake(#[from] StakeError),

    /// Odds provider error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a raw odds entry was dropped during normalization.
///
/// These never abort a batch; they are recorded and counted.
#[derive(Error, Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    /// Price text could not be read in the declared (or inferred) format.
    #[error("unparseable odds {price:?}")]
    UnparseableOdds {
        /// Raw price text.
        price: String,
    },

    /// Price converted fine but is not a valid decimal price.
    #[error("odds {odds} not above 1.0")]
    OddsNotAboveOne {
        /// Converted decimal odds.
        odds: Decimal,
    },

    /// Outcome label does not map to home, draw or away.
    #[error("unknown outcome label {label:?}")]
    UnknownOutcome {
        /// Raw outcome label.
        label: String,
    },

    /// The bookmaker's outcome set for the match is neither 2-way nor 3-way.
    #[error("cannot infer market type from {distinct} distinct outcome(s)")]
    UnknownMarketType {
        /// Number of distinct outcomes the bookmaker listed.
        distinct: usize,
    },
}

impl RejectReason {
    /// Stable snake_case name, used as a metric label.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Stake allocation errors. These indicate caller misuse, not bad data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakeError {
    /// Total stake must be strictly positive.
    #[error("total stake must be positive, got {0}")]
    NonPositiveStake(Decimal),

    /// The market has no positive arbitrage margin.
    #[error("no arbitrage margin: margin {margin} <= 0")]
    NoMargin {
        /// Margin of the rejected opportunity.
        margin: Decimal,
    },

    /// The stake is too small to give every outcome at least one currency unit.
    #[error("total stake {total_stake} too small to cover {outcomes} outcomes at {decimals} decimal places")]
    StakeTooSmall {
        /// Requested total stake.
        total_stake: Decimal,
        /// Number of outcomes to cover.
        outcomes: usize,
        /// Currency precision in decimal places.
        decimals: u32,
    },
}

/// Odds provider errors.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No API key configured.
    #[error("ODDS_API_KEY is not set")]
    MissingApiKey,

    /// 401 from the provider.
    #[error("401 - unauthorized: the API key is invalid or expired")]
    Unauthorized,

    /// 403 from the provider.
    #[error("403 - forbidden: this key may not have access to {sport}")]
    Forbidden {
        /// Requested sport key.
        sport: String,
    },

    /// 429 from the provider.
    #[error("429 - rate limit exceeded")]
    RateLimited {
        /// Seconds to wait, if the provider said.
        retry_after_seconds: Option<u64>,
    },

    /// Any other non-success status.
    #[error("{code} - {reason}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Canonical reason phrase.
        reason: String,
    },

    /// Response body could not be parsed.
    #[error("failed to parse odds response: {0}")]
    Parse(String),

    /// Transport failure.
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ProviderError {
    /// Whether retrying within the same cycle can help.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http(_) => true,
            ProviderError::Status { code, .. } => *code >= 500,
            ProviderError::MissingApiKey
            | ProviderError::Unauthorized
            | ProviderError::Forbidden { .. }
            | ProviderError::RateLimited { .. }
            | ProviderError::Parse(_) => false,
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ArbError>;

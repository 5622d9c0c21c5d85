//! Application configuration loaded from environment variables.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::arbitrage::StakeAllocator;
use crate::odds::OddsFormat;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Odds Provider ===
    /// The Odds API key.
    #[serde(default)]
    pub odds_api_key: String,

    /// The Odds API base URL.
    #[serde(default = "default_odds_api_url")]
    pub odds_api_url: String,

    /// Sport key to poll.
    #[serde(default = "default_sport")]
    pub sport: String,

    /// Comma-separated bookmaker regions.
    #[serde(default = "default_regions")]
    pub regions: String,

    /// Comma-separated bookmaker keys.
    #[serde(default = "default_bookmakers")]
    pub bookmakers: String,

    /// Odds format to request (decimal or american).
    #[serde(default = "default_odds_format")]
    pub odds_format: OddsFormat,

    /// HTTP timeout for provider requests.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    // === Staking ===
    /// Base total stake per opportunity.
    #[serde(default = "default_base_stake")]
    pub base_stake: Decimal,

    /// Stake multiplier (1, 2 or 3).
    #[serde(default = "default_multiplier")]
    pub stake_multiplier: u8,

    /// Currency precision for stakes, in decimal places.
    #[serde(default = "default_stake_decimals")]
    pub stake_decimals: u32,

    // === Scheduling ===
    /// Seconds between polling cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Fetch attempts per polling cycle.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,

    /// Base delay between fetch retries; doubles each attempt.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    // === Server Configuration ===
    /// HTTP server port for health/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Emit logs as JSON.
    #[serde(default)]
    pub log_json: bool,
}

fn default_odds_api_url() -> String {
    "https://api.the-odds-api.com".to_string()
}

fn default_sport() -> String {
    "soccer".to_string()
}

fn default_regions() -> String {
    "uk,us,eu,au".to_string()
}

fn default_bookmakers() -> String {
    [
        "williamhill",
        "ladbrokes",
        "bet365",
        "skybet",
        "betfair",
        "bwin",
        "unibet",
        "betvictor",
        "coral",
        "888sport",
        "betfred",
        "betway",
        "marathonbet",
        "pinnacle",
        "matchbook",
        "boylesports",
        "10bet",
        "betbright",
        "parimatch",
        "betradar",
    ]
    .join(",")
}

fn default_odds_format() -> OddsFormat {
    OddsFormat::Decimal
}

fn default_http_timeout() -> u64 {
    30
}

fn default_base_stake() -> Decimal {
    Decimal::new(1000, 0) // £1,000
}

fn default_multiplier() -> u8 {
    1
}

fn default_stake_decimals() -> u32 {
    StakeAllocator::DEFAULT_DECIMALS
}

fn default_poll_interval() -> u64 {
    900 // 15 minutes
}

fn default_fetch_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    2000
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            odds_api_key: String::new(),
            odds_api_url: default_odds_api_url(),
            sport: default_sport(),
            regions: default_regions(),
            bookmakers: default_bookmakers(),
            odds_format: default_odds_format(),
            http_timeout_secs: default_http_timeout(),
            base_stake: default_base_stake(),
            stake_multiplier: default_multiplier(),
            stake_decimals: default_stake_decimals(),
            poll_interval_secs: default_poll_interval(),
            fetch_retries: default_fetch_retries(),
            retry_backoff_ms: default_retry_backoff(),
            port: default_port(),
            rust_log: default_log_level(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_stake <= Decimal::ZERO {
            return Err("BASE_STAKE must be positive".to_string());
        }

        if !(1..=3).contains(&self.stake_multiplier) {
            return Err("STAKE_MULTIPLIER must be 1, 2 or 3".to_string());
        }

        if self.stake_decimals > 8 {
            return Err("STAKE_DECIMALS must be at most 8".to_string());
        }

        if self.poll_interval_secs == 0 {
            return Err("POLL_INTERVAL_SECS must be positive".to_string());
        }

        if self.sport.trim().is_empty() {
            return Err("SPORT is required".to_string());
        }

        Ok(())
    }

    /// Check the settings needed to poll the live provider.
    pub fn validate_provider(&self) -> Result<(), String> {
        self.validate()?;

        if self.odds_api_key.trim().is_empty() {
            return Err("ODDS_API_KEY is required".to_string());
        }

        if !matches!(self.odds_format, OddsFormat::Decimal | OddsFormat::American) {
            return Err("ODDS_FORMAT must be decimal or american".to_string());
        }

        Ok(())
    }

    /// Stake budget per opportunity (base × multiplier).
    pub fn total_stake(&self) -> Decimal {
        self.base_stake * Decimal::from(self.stake_multiplier)
    }

    /// Allocator at the configured currency precision.
    pub fn allocator(&self) -> StakeAllocator {
        StakeAllocator::new(self.stake_decimals)
    }

    /// Polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_values_are_sensible() {
        let config = Config::default();
        assert_eq!(config.base_stake, dec!(1000));
        assert_eq!(config.poll_interval(), Duration::from_secs(900));
        assert_eq!(config.odds_format, OddsFormat::Decimal);
        assert!(config.bookmakers.starts_with("williamhill,ladbrokes"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn total_stake_applies_multiplier() {
        let config = Config {
            base_stake: dec!(500),
            stake_multiplier: 3,
            ..Config::default()
        };
        assert_eq!(config.total_stake(), dec!(1500));
    }

    #[test]
    fn validate_rejects_bad_multiplier_and_stake() {
        let config = Config {
            stake_multiplier: 4,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            base_stake: Decimal::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn provider_validation_requires_api_key() {
        let config = Config::default();
        assert!(config.validate_provider().is_err());

        let config = Config {
            odds_api_key: "key".to_string(),
            ..Config::default()
        };
        assert!(config.validate_provider().is_ok());
    }
}

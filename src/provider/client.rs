//! The Odds API client.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use super::types::ApiEvent;
use super::OddsSource;
use crate::config::Config;
use crate::error::ProviderError;
use crate::metrics::record_fetch_latency;
use crate::odds::{Fixture, OddsFormat, RawOddsBatch, RawOddsEntry};

/// Provider label used in metrics.
const PROVIDER: &str = "the-odds-api";

/// Only the match-result market is scanned.
const H2H_MARKET: &str = "h2h";

/// The Odds API v4 client.
#[derive(Debug, Clone)]
pub struct OddsApiClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL (without `/v4`).
    base_url: String,
    /// API key.
    api_key: String,
    /// Sport key, e.g. "soccer" or "soccer_epl".
    sport: String,
    /// Comma-separated regions.
    regions: String,
    /// Comma-separated bookmaker keys.
    bookmakers: String,
    /// Odds format requested from the API.
    odds_format: OddsFormat,
}

impl OddsApiClient {
    /// Create a new client from config.
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http,
            base_url: config.odds_api_url.trim_end_matches('/').to_string(),
            api_key: config.odds_api_key.clone(),
            sport: config.sport.clone(),
            regions: config.regions.clone(),
            bookmakers: config.bookmakers.clone(),
            odds_format: requested_format(config.odds_format),
        })
    }

    /// Sport being polled.
    pub fn sport(&self) -> &str {
        &self.sport
    }

    /// Fetch the raw event list.
    #[instrument(skip(self), fields(sport = %self.sport))]
    pub async fn fetch_events(&self) -> Result<Vec<ApiEvent>, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let url = format!("{}/v4/sports/{}/odds", self.base_url, self.sport);
        let start = Instant::now();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", self.regions.as_str()),
                ("markets", H2H_MARKET),
                ("oddsFormat", format_param(self.odds_format)),
                ("bookmakers", self.bookmakers.as_str()),
            ])
            .send()
            .await?;

        record_fetch_latency(start, PROVIDER);

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(map_status(status, retry_after, &self.sport));
        }

        if let Some(remaining) = response
            .headers()
            .get("x-requests-remaining")
            .and_then(|v| v.to_str().ok())
        {
            debug!(remaining = %remaining, "Provider quota");
        }

        let body = response.text().await?;
        let events: Vec<ApiEvent> =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;

        info!(events = events.len(), "Fetched odds");
        Ok(events)
    }
}

impl OddsSource for OddsApiClient {
    async fn fetch_batch(&self) -> Result<RawOddsBatch, ProviderError> {
        let events = self.fetch_events().await?;
        Ok(events_to_batch(
            &events,
            self.odds_format,
            OffsetDateTime::now_utc(),
        ))
    }
}

/// Read provider events saved as JSON.
pub async fn read_events_file(path: &Path) -> crate::Result<Vec<ApiEvent>> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Load one batch from an events file, or from the live API when no file is given.
pub async fn load_batch(config: &Config, file: Option<&Path>) -> crate::Result<RawOddsBatch> {
    match file {
        Some(path) => {
            info!("Reading events from {}", path.display());
            let events = read_events_file(path).await?;
            Ok(events_to_batch(
                &events,
                config.odds_format,
                OffsetDateTime::now_utc(),
            ))
        }
        None => {
            let client = OddsApiClient::new(config)?;
            info!("Fetching {} odds...", client.sport());
            Ok(client.fetch_batch().await?)
        }
    }
}

/// The API serves decimal or American prices only.
fn requested_format(configured: OddsFormat) -> OddsFormat {
    match configured {
        OddsFormat::American => OddsFormat::American,
        _ => OddsFormat::Decimal,
    }
}

fn format_param(format: OddsFormat) -> &'static str {
    match format {
        OddsFormat::American => "american",
        _ => "decimal",
    }
}

/// Map a non-success status to a provider error.
pub fn map_status(status: StatusCode, retry_after: Option<u64>, sport: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED => ProviderError::Unauthorized,
        StatusCode::FORBIDDEN => ProviderError::Forbidden {
            sport: sport.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            retry_after_seconds: retry_after,
        },
        other => ProviderError::Status {
            code: other.as_u16(),
            reason: other.canonical_reason().unwrap_or("unknown").to_string(),
        },
    }
}

fn parse_time(value: Option<&str>) -> Option<OffsetDateTime> {
    value.and_then(|v| OffsetDateTime::parse(v, &Rfc3339).ok())
}

/// Flatten API events into a raw batch.
///
/// Each h2h outcome becomes one entry; the market's (else the bookmaker's)
/// last update is the observation time, falling back to `fetched_at`.
pub fn events_to_batch(
    events: &[ApiEvent],
    format: OddsFormat,
    fetched_at: OffsetDateTime,
) -> RawOddsBatch {
    let mut entries = Vec::new();
    let mut fixtures = BTreeMap::new();

    for event in events {
        fixtures.insert(
            event.id.clone(),
            Fixture {
                match_id: event.id.clone(),
                home_team: event.home_team.clone(),
                away_team: event.away_team.clone(),
                commence_time: parse_time(event.commence_time.as_deref()),
            },
        );

        for bookmaker in &event.bookmakers {
            let bookmaker_update = parse_time(bookmaker.last_update.as_deref());

            for market in bookmaker.markets.iter().filter(|m| m.key == H2H_MARKET) {
                let observed_at = parse_time(market.last_update.as_deref())
                    .or(bookmaker_update)
                    .unwrap_or(fetched_at);

                entries.extend(market.outcomes.iter().map(|outcome| RawOddsEntry {
                    bookmaker: bookmaker.title.clone(),
                    match_id: event.id.clone(),
                    outcome_label: outcome.name.clone(),
                    price: outcome.price_text(),
                    format,
                    observed_at,
                }));
            }
        }
    }

    RawOddsBatch {
        entries,
        fixtures,
        fetched_at,
    }
}

//! Mock odds source for unit testing.
//!
//! This module provides an in-memory source that can be used in tests
//! without making real network requests, plus a builder for raw batches.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::macros::datetime;
use time::OffsetDateTime;

use super::OddsSource;
use crate::error::ProviderError;
use crate::odds::{Fixture, OddsFormat, RawOddsBatch, RawOddsEntry};

/// Default observation time for builder entries.
pub const MOCK_OBSERVED_AT: OffsetDateTime = datetime!(2025-03-01 12:00 UTC);

/// Configuration for mock source behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fail this many fetches with a retryable 503 before succeeding.
    pub transient_failures: u32,
    /// Fail every fetch with a non-retryable 401.
    pub unauthorized: bool,
    /// Simulated latency.
    pub latency: Option<Duration>,
}

/// Mock odds source serving queued batches in order.
///
/// Once the queue is drained it serves empty batches.
#[derive(Debug, Clone, Default)]
pub struct MockOddsSource {
    config: MockConfig,
    batches: Arc<Mutex<VecDeque<RawOddsBatch>>>,
    pending_failures: Arc<AtomicU32>,
    fetches: Arc<AtomicU32>,
}

impl MockOddsSource {
    /// Create a new mock source with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            pending_failures: Arc::new(AtomicU32::new(config.transient_failures)),
            config,
            ..Self::default()
        }
    }

    /// Queue a batch.
    pub fn push_batch(&self, batch: RawOddsBatch) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push_back(batch);
        }
    }

    /// Number of fetch calls so far, failed ones included.
    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl OddsSource for MockOddsSource {
    async fn fetch_batch(&self) -> Result<RawOddsBatch, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.config.latency {
            tokio::time::sleep(latency).await;
        }

        if self.config.unauthorized {
            return Err(ProviderError::Unauthorized);
        }

        let failing = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ProviderError::Status {
                code: 503,
                reason: "Service Unavailable".to_string(),
            });
        }

        let next = self.batches.lock().ok().and_then(|mut b| b.pop_front());
        Ok(next.unwrap_or_else(|| RawOddsBatch::empty(OffsetDateTime::now_utc())))
    }
}

/// Builder for raw odds batches.
#[derive(Debug, Clone)]
pub struct RawOddsBatchBuilder {
    entries: Vec<RawOddsEntry>,
    fixtures: BTreeMap<String, Fixture>,
    fetched_at: OffsetDateTime,
}

impl Default for RawOddsBatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RawOddsBatchBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            fixtures: BTreeMap::new(),
            fetched_at: MOCK_OBSERVED_AT,
        }
    }

    /// Register a fixture without kickoff time.
    pub fn fixture(mut self, match_id: &str, home_team: &str, away_team: &str) -> Self {
        self.fixtures.insert(
            match_id.to_string(),
            Fixture {
                match_id: match_id.to_string(),
                home_team: home_team.to_string(),
                away_team: away_team.to_string(),
                commence_time: None,
            },
        );
        self
    }

    /// Add an auto-format entry observed at [`MOCK_OBSERVED_AT`].
    pub fn quote(self, bookmaker: &str, match_id: &str, label: &str, price: &str) -> Self {
        self.quote_with_format(bookmaker, match_id, label, price, OddsFormat::Auto)
    }

    /// Add an entry with an explicit price format.
    pub fn quote_with_format(
        self,
        bookmaker: &str,
        match_id: &str,
        label: &str,
        price: &str,
        format: OddsFormat,
    ) -> Self {
        self.entry(bookmaker, match_id, label, price, format, MOCK_OBSERVED_AT)
    }

    /// Add an auto-format entry with an explicit observation time.
    pub fn quote_at(
        self,
        bookmaker: &str,
        match_id: &str,
        label: &str,
        price: &str,
        observed_at: OffsetDateTime,
    ) -> Self {
        self.entry(bookmaker, match_id, label, price, OddsFormat::Auto, observed_at)
    }

    fn entry(
        mut self,
        bookmaker: &str,
        match_id: &str,
        label: &str,
        price: &str,
        format: OddsFormat,
        observed_at: OffsetDateTime,
    ) -> Self {
        self.entries.push(RawOddsEntry {
            bookmaker: bookmaker.to_string(),
            match_id: match_id.to_string(),
            outcome_label: label.to_string(),
            price: price.to_string(),
            format,
            observed_at,
        });
        self
    }

    /// Set the batch fetch time.
    pub fn fetched_at(mut self, fetched_at: OffsetDateTime) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// Build the batch.
    pub fn build(self) -> RawOddsBatch {
        RawOddsBatch {
            entries: self.entries,
            fixtures: self.fixtures,
            fetched_at: self.fetched_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_source_serves_batches_in_order() {
        let source = MockOddsSource::new();
        source.push_batch(RawOddsBatchBuilder::new().quote("A", "m1", "home", "2.0").build());
        source.push_batch(RawOddsBatchBuilder::new().build());

        assert_eq!(source.fetch_batch().await.unwrap().entries.len(), 1);
        assert!(source.fetch_batch().await.unwrap().is_empty());
        assert!(source.fetch_batch().await.unwrap().is_empty());
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn mock_source_failure_modes() {
        let flaky = MockOddsSource::with_config(MockConfig {
            transient_failures: 2,
            ..MockConfig::default()
        });
        assert!(flaky.fetch_batch().await.is_err());
        assert!(flaky.fetch_batch().await.is_err());
        assert!(flaky.fetch_batch().await.is_ok());

        let locked = MockOddsSource::with_config(MockConfig {
            unauthorized: true,
            ..MockConfig::default()
        });
        assert!(matches!(
            locked.fetch_batch().await,
            Err(ProviderError::Unauthorized)
        ));
    }

    #[test]
    fn builder_collects_entries_and_fixtures() {
        let batch = RawOddsBatchBuilder::new()
            .fixture("m1", "Leeds", "Hull")
            .quote("A", "m1", "Leeds", "2.0")
            .quote_with_format("B", "m1", "Hull", "6/4", OddsFormat::Fractional)
            .build();

        assert_eq!(batch.entries.len(), 2);
        assert_eq!(batch.entries[1].format, OddsFormat::Fractional);
        assert!(batch.fixture("m1").is_some());
    }
}

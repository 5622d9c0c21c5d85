//! Polling scheduler: fetch, scan, publish on a fixed interval.

use std::future::Future;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::api::AppState;
use crate::arbitrage::StakeAllocator;
use crate::config::Config;
use crate::error::{ProviderError, Result};
use crate::metrics::inc_fetch_failures;
use crate::odds::RawOddsBatch;
use crate::pipeline::{scan_with, ScanReport};
use crate::provider::OddsSource;

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Time between cycle starts.
    pub interval: Duration,
    /// Fetch attempts per cycle, at least one.
    pub fetch_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_backoff: Duration,
    /// Stake budget per opportunity.
    pub total_stake: Decimal,
    /// Stake allocator.
    pub allocator: StakeAllocator,
}

impl SchedulerSettings {
    /// Build settings from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            fetch_attempts: config.fetch_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            total_stake: config.total_stake(),
            allocator: config.allocator(),
        }
    }

    /// Backoff before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.retry_backoff.saturating_mul(factor)
    }
}

/// Outcome of one polling cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Scan ran and was published.
    Published {
        /// Opportunities in the published report.
        opportunities: usize,
    },
    /// Fetch failed after all attempts; nothing was scanned.
    Skipped,
}

/// Runs the pipeline against an odds source at a fixed interval.
pub struct Scheduler<S> {
    source: S,
    settings: SchedulerSettings,
    state: AppState,
    run_lock: Mutex<()>,
}

impl<S: OddsSource> Scheduler<S> {
    /// Create a scheduler publishing into `state`.
    pub fn new(source: S, settings: SchedulerSettings, state: AppState) -> Self {
        Self {
            source,
            settings,
            state,
            run_lock: Mutex::new(()),
        }
    }

    /// Scheduler settings.
    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Run a single cycle.
    ///
    /// Waits for any cycle already in flight to finish first.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let _guard = match self.run_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Previous scan still running, waiting");
                self.run_lock.lock().await
            }
        };

        let batch = match self.fetch_with_retry().await {
            Ok(batch) => batch,
            Err(e) => {
                inc_fetch_failures();
                warn!("Fetch failed, skipping cycle: {}", e);
                return Ok(CycleOutcome::Skipped);
            }
        };

        let report = self.scan(&batch)?;
        let opportunities = report.opportunities.len();
        for opportunity in &report.opportunities {
            info!("{}", opportunity.headline());
        }

        self.state.publish(report).await;
        Ok(CycleOutcome::Published { opportunities })
    }

    /// Run cycles until `shutdown` resolves.
    ///
    /// The first cycle starts immediately. A cycle that overruns the interval
    /// delays the next tick rather than bursting.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            interval_secs = self.settings.interval.as_secs(),
            total_stake = %self.settings.total_stake,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_cycle().await {
                        Ok(outcome) => debug!(?outcome, "Cycle finished"),
                        Err(e) => error!("Cycle failed: {}", e),
                    }
                }
            }
        }
    }

    fn scan(&self, batch: &RawOddsBatch) -> Result<ScanReport> {
        Ok(scan_with(
            batch,
            self.settings.total_stake,
            &self.settings.allocator,
        )?)
    }

    async fn fetch_with_retry(&self) -> std::result::Result<RawOddsBatch, ProviderError> {
        let attempts = self.settings.fetch_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.source.fetch_batch().await {
                Ok(batch) => {
                    debug!(attempt, entries = batch.entries.len(), "Fetched batch");
                    return Ok(batch);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.settings.backoff_for(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Fetch failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{MockConfig, MockOddsSource, RawOddsBatchBuilder};
    use rust_decimal_macros::dec;

    fn settings() -> SchedulerSettings {
        SchedulerSettings {
            interval: Duration::from_millis(20),
            fetch_attempts: 3,
            retry_backoff: Duration::from_millis(1),
            total_stake: dec!(100),
            allocator: StakeAllocator::default(),
        }
    }

    fn two_way_arb() -> RawOddsBatch {
        RawOddsBatchBuilder::new()
            .quote("A", "m1", "home", "2.10")
            .quote("A", "m1", "away", "1.50")
            .quote("B", "m1", "home", "1.50")
            .quote("B", "m1", "away", "2.10")
            .build()
    }

    #[test]
    fn backoff_doubles() {
        let settings = SchedulerSettings {
            retry_backoff: Duration::from_millis(2000),
            ..settings()
        };
        assert_eq!(settings.backoff_for(1), Duration::from_millis(2000));
        assert_eq!(settings.backoff_for(2), Duration::from_millis(4000));
        assert_eq!(settings.backoff_for(3), Duration::from_millis(8000));
    }

    #[test]
    fn settings_from_config() {
        let config = Config {
            base_stake: dec!(500),
            stake_multiplier: 2,
            ..Config::default()
        };
        let settings = SchedulerSettings::from_config(&config);
        assert_eq!(settings.total_stake, dec!(1000));
        assert_eq!(settings.interval, Duration::from_secs(900));
        assert_eq!(settings.fetch_attempts, 3);
        assert_eq!(settings.allocator.decimals(), Some(2));
    }

    #[tokio::test]
    async fn cycle_publishes_report() {
        let source = MockOddsSource::new();
        source.push_batch(two_way_arb());
        let state = AppState::new();
        let scheduler = Scheduler::new(source, settings(), state.clone());

        let outcome = scheduler.run_cycle().await.unwrap();

        assert_eq!(outcome, CycleOutcome::Published { opportunities: 1 });
        assert!(state.is_ready());
        let latest = state.latest.read().await;
        assert_eq!(latest.as_ref().unwrap().opportunities[0].match_id, "m1");
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let source = MockOddsSource::with_config(MockConfig {
            transient_failures: 2,
            ..MockConfig::default()
        });
        source.push_batch(two_way_arb());
        let scheduler = Scheduler::new(source.clone(), settings(), AppState::new());

        let outcome = scheduler.run_cycle().await.unwrap();

        assert_eq!(outcome, CycleOutcome::Published { opportunities: 1 });
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_skip_the_cycle() {
        let source = MockOddsSource::with_config(MockConfig {
            transient_failures: 5,
            ..MockConfig::default()
        });
        let state = AppState::new();
        let scheduler = Scheduler::new(source.clone(), settings(), state.clone());

        let outcome = scheduler.run_cycle().await.unwrap();

        assert_eq!(outcome, CycleOutcome::Skipped);
        assert_eq!(source.fetch_count(), 3);
        assert!(!state.is_ready());
        assert!(state.latest.read().await.is_none());
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let source = MockOddsSource::with_config(MockConfig {
            unauthorized: true,
            ..MockConfig::default()
        });
        let scheduler = Scheduler::new(source.clone(), settings(), AppState::new());

        assert_eq!(scheduler.run_cycle().await.unwrap(), CycleOutcome::Skipped);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn overlapping_cycles_run_one_after_another() {
        let source = MockOddsSource::with_config(MockConfig {
            latency: Some(Duration::from_millis(50)),
            ..MockConfig::default()
        });
        source.push_batch(two_way_arb());
        let state = AppState::new();
        let scheduler = Scheduler::new(source.clone(), settings(), state.clone());

        let (first, second) = tokio::join!(scheduler.run_cycle(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            // The first cycle is mid-fetch; nothing is published yet.
            assert_eq!(state.scans_completed(), 0);
            scheduler.run_cycle().await
        });

        assert_eq!(first.unwrap(), CycleOutcome::Published { opportunities: 1 });
        assert_eq!(second.unwrap(), CycleOutcome::Published { opportunities: 0 });
        assert_eq!(source.fetch_count(), 2);
        assert_eq!(state.scans_completed(), 2);
        let latest = state.latest.read().await;
        assert!(latest.as_ref().unwrap().opportunities.is_empty());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let source = MockOddsSource::new();
        let state = AppState::new();
        let scheduler = Scheduler::new(source.clone(), settings(), state.clone());

        scheduler
            .run(tokio::time::sleep(Duration::from_millis(70)))
            .await;

        assert!(source.fetch_count() >= 2);
        assert_eq!(state.scans_completed() as u32, source.fetch_count());
    }
}

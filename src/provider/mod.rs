//! Odds provider module: where raw batches come from.
//!
//! This module handles:
//! - The `OddsSource` seam used by the scheduler
//! - The Odds API v4 client and its wire types
//! - Mock source and batch builder for testing

use std::future::Future;

use crate::error::ProviderError;
use crate::odds::RawOddsBatch;

pub mod client;
pub mod mock;
pub mod types;

pub use client::{events_to_batch, load_batch, read_events_file, OddsApiClient};
pub use mock::{MockConfig, MockOddsSource, RawOddsBatchBuilder};
pub use types::ApiEvent;

/// Supplies one raw batch per polling cycle.
///
/// Implementations own transport concerns; a returned batch may be empty
/// but never partially transport-failed.
pub trait OddsSource: Send + Sync {
    /// Fetch the current batch.
    fn fetch_batch(&self) -> impl Future<Output = Result<RawOddsBatch, ProviderError>> + Send;
}

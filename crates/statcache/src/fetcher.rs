//! Capability for retrieving a named dataset from an upstream source.

use async_trait::async_trait;
use common::{Dataset, Error, Timeframe};

/// Retrieves the dataset for a named stat over a timeframe.
///
/// The cache consumes this capability; any conforming implementation (the
/// remote HTTP client, an in-memory stub) is substitutable.
#[async_trait]
pub trait StatFetcher: Send + Sync {
    async fn fetch(&self, name: &str, tf: &Timeframe) -> Result<Dataset, Error>;
}

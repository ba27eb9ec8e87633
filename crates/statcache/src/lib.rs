//! Short-lived dataset cache and derived-rate computation.
//!
//! [`StatCache`] deduplicates upstream fetches for a bounded time window and
//! serves last-known-good data without re-hitting the upstream on every
//! request. [`StatCache::get_rate`] combines two concurrently fetched series
//! into a point-wise retention rate.

mod cache;
mod fetcher;
mod rate;

pub use cache::{spawn_sweeper, StatCache, SweeperHandle};
pub use fetcher::StatFetcher;
pub use rate::safe_rate;

//! In-memory dataset cache with TTL-driven background eviction.
//!
//! Uses `DashMap` so lookups and inserts are atomic per key and no lock is
//! ever held across the upstream network call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::config::CacheConfig;
use common::{Dataset, Error, Timeframe};
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::fetcher::StatFetcher;

struct CacheEntry {
    fetched_at: Instant,
    data: Arc<Dataset>,
}

/// Cache of fetched datasets keyed by stat name and timeframe.
///
/// Entries are never refreshed in place: a re-fetch overwrites the slot with
/// a brand-new entry, and the sweep removes entries older than the TTL.
/// Capacity is unbounded apart from time-based eviction.
pub struct StatCache {
    fetcher: Arc<dyn StatFetcher>,
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    sweep_interval: Duration,
}

impl StatCache {
    pub fn new(fetcher: Arc<dyn StatFetcher>, config: &CacheConfig) -> Self {
        StatCache {
            fetcher,
            entries: DashMap::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
        }
    }

    fn key(name: &str, tf: &Timeframe) -> String {
        format!("{name}{tf}")
    }

    /// Return the cached dataset for `(name, tf)`, fetching it on a miss.
    ///
    /// Two concurrent misses for the same key may both call the fetcher and
    /// both insert; the last writer wins. That race is accepted: the cache
    /// optimizes for never blocking the network call, not for single-flight
    /// de-duplication. A failed fetch stores nothing.
    pub async fn get(&self, name: &str, tf: &Timeframe) -> Result<Arc<Dataset>, Error> {
        let key = Self::key(name, tf);
        if let Some(entry) = self.entries.get(&key) {
            debug!("cache hit for {}", key);
            return Ok(entry.data.clone());
        }

        debug!("cache miss for {}, fetching upstream", key);
        let data = Arc::new(self.fetcher.fetch(name, tf).await?);
        self.entries.insert(
            key,
            CacheEntry {
                fetched_at: Instant::now(),
                data: data.clone(),
            },
        );
        Ok(data)
    }

    /// Remove every entry older than the TTL. Returns the eviction count.
    pub fn evict_expired(&self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.fetched_at.elapsed() <= ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Handle to the background sweep task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweep task to exit and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

/// Spawn the periodic eviction task for `cache`.
///
/// The task sweeps on the cache's configured interval until the returned
/// handle is stopped, binding the sweep lifetime to the server's own.
pub fn spawn_sweeper(cache: Arc<StatCache>) -> SweeperHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let sweep_interval = cache.sweep_interval;

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let evicted = cache.evict_expired();
                    if evicted > 0 {
                        debug!("evicted {} expired entries, {} remain", evicted, cache.len());
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }
    });

    SweeperHandle { shutdown, handle }
}

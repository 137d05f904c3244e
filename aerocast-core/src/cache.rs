//! In-memory memoization of fetched series, keyed by rounded coordinates.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::{
    aggregate::YearRange, error::Result, model::Location, provider::ClimateSource,
    series::DailySeries,
};

/// Coordinates are compared at 4 decimal places (~11 m).
const COORDINATE_SCALE: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    lat: i64,
    lon: i64,
    years: (i32, i32),
}

impl CacheKey {
    fn new(location: Location, years: YearRange) -> Self {
        Self {
            lat: (location.lat * COORDINATE_SCALE).round() as i64,
            lon: (location.lon * COORDINATE_SCALE).round() as i64,
            years: (years.start, years.end),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    series: Arc<DailySeries>,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    capacity: usize,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl<S: ClimateSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration, capacity: usize) -> Self {
        Self { inner, ttl, capacity: capacity.max(1), entries: RwLock::new(HashMap::new()) }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    async fn fresh(&self, key: &CacheKey) -> Option<Arc<DailySeries>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.series))
    }

    async fn store(&self, key: CacheKey, series: Arc<DailySeries>) {
        let mut entries = self.entries.write().await;

        entries.retain(|_, e| e.fetched_at.elapsed() < self.ttl);
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries.iter().min_by_key(|(_, e)| e.fetched_at).map(|(k, _)| *k);
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(key, CacheEntry { series, fetched_at: Instant::now() });
    }
}

#[async_trait]
impl<S: ClimateSource> ClimateSource for CachedSource<S> {
    async fn fetch(&self, location: Location, years: YearRange) -> Result<Arc<DailySeries>> {
        let key = CacheKey::new(location, years);

        if let Some(series) = self.fresh(&key).await {
            tracing::debug!(lat = location.lat, lon = location.lon, "series cache hit");
            return Ok(series);
        }

        // Failures are never cached.
        let series = self.inner.fetch(location, years).await?;
        self.store(key, Arc::clone(&series)).await;

        Ok(series)
    }
}

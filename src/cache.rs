//! Availability cache for slot listings.
//!
//! The cache has no staleness tolerance of its own: the reservation manager
//! invalidates it synchronously after every committing reserve or release,
//! and the TTL only bounds entries that were never invalidated.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use moka::future::Cache;

use crate::config::CacheConfig;
use crate::metrics::get_metrics;
use crate::service::ServiceKind;
use crate::slots::DayAvailability;

/// Cache key for an availability listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AvailabilityKey {
    /// Service being listed.
    pub service: ServiceKind,
    /// First date of the listing.
    pub from_date: NaiveDate,
    /// Listing size cap.
    pub limit: usize,
}

/// Cache of grouped availability listings.
#[derive(Clone)]
pub struct AvailabilityCache {
    listings: Cache<AvailabilityKey, Arc<Vec<DayAvailability>>>,
    enabled: bool,
}

impl AvailabilityCache {
    /// Create a new cache from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let listings = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .build();

        Self {
            listings,
            enabled: config.enabled,
        }
    }

    /// Create a disabled cache.
    pub fn disabled() -> Self {
        Self {
            listings: Cache::builder().max_capacity(0).build(),
            enabled: false,
        }
    }

    /// Get a cached listing.
    pub async fn get(&self, key: &AvailabilityKey) -> Option<Arc<Vec<DayAvailability>>> {
        if !self.enabled {
            return None;
        }

        let result = self.listings.get(key).await;
        let metrics = get_metrics();
        if result.is_some() {
            metrics.cache_hits_total.inc();
        } else {
            metrics.cache_misses_total.inc();
        }
        result
    }

    /// Store a listing.
    pub async fn set(&self, key: AvailabilityKey, listing: Vec<DayAvailability>) {
        if !self.enabled {
            return;
        }
        self.listings.insert(key, Arc::new(listing)).await;
    }

    /// Invalidate every cached listing for a service.
    ///
    /// Moka does not support filtered invalidation, so this drops all
    /// listings; the next read repopulates from the store.
    pub fn invalidate_service(&self, _service: ServiceKind) {
        self.listings.invalidate_all();
    }

    /// Number of cached listings.
    pub fn entry_count(&self) -> u64 {
        self.listings.entry_count()
    }
}

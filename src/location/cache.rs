//! Last-known-position cache.
//!
//! Holds the most recently acquired GeoFix so readers (the alert dispatcher,
//! the presentation layer) never block waiting for a fresh fix. Overwritten
//! on every acquisition; the durable mirror lives in the store module.

use std::sync::RwLock;

use crate::types::GeoFix;

/// Non-blocking holder for the latest resolved position.
pub struct GeofixCache {
    latest: RwLock<Option<GeoFix>>,
}

impl GeofixCache {
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(None),
        }
    }

    /// Seed the cache, e.g. with a fix restored from the durable store.
    pub fn with_fix(fix: GeoFix) -> Self {
        Self {
            latest: RwLock::new(Some(fix)),
        }
    }

    /// The most recent fix, if any has ever been acquired.
    pub fn latest(&self) -> Option<GeoFix> {
        *self.latest.read().unwrap()
    }

    /// Overwrite with a newer fix.
    pub fn store(&self, fix: GeoFix) {
        *self.latest.write().unwrap() = Some(fix);
    }

    /// Drop the cached fix.
    pub fn clear(&self) {
        *self.latest.write().unwrap() = None;
    }
}

impl Default for GeofixCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_reads_none() {
        let cache = GeofixCache::new();
        assert!(cache.latest().is_none());
    }

    #[test]
    fn test_store_overwrites() {
        let cache = GeofixCache::new();
        cache.store(GeoFix::new(1.0, 2.0));
        cache.store(GeoFix::new(3.0, 4.0));

        let fix = cache.latest().unwrap();
        assert_eq!(fix.latitude, 3.0);
        assert_eq!(fix.longitude, 4.0);
    }

    #[test]
    fn test_seeded_cache() {
        let cache = GeofixCache::with_fix(GeoFix::new(53.3498, -6.2603));
        assert!(cache.latest().is_some());
        cache.clear();
        assert!(cache.latest().is_none());
    }
}

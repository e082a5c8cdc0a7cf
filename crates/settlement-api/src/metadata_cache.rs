//! The structure-metadata cache: a 5-minute, read-mostly cache of
//! `structure_defs`, invalidated by TTL expiry or an explicit bump after a
//! definition change.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use settlement_types::StructureDef;

struct CacheEntry {
    defs: Vec<StructureDef>,
    fetched_at: Instant,
}

/// Caches the full structure-definition table behind a TTL.
///
/// Definitions change only through an (out-of-scope) admin seeding
/// process, so a stale read within the TTL window is an acceptable
/// tradeoff against hitting the database on every `GET
/// /structures/metadata` request.
pub struct StructureMetadataCache {
    entry: RwLock<Option<CacheEntry>>,
}

/// The outcome of a cache lookup: whether the returned definitions came
/// from cache or a fresh load, and how old the cached copy was.
pub struct CacheLookup {
    /// The structure definitions served.
    pub defs: Vec<StructureDef>,
    /// Whether this result was served from cache.
    pub cached: bool,
    /// Age of the cached copy, in seconds (0 for a fresh load).
    pub cache_age_seconds: u64,
}

impl StructureMetadataCache {
    /// Create an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self { entry: RwLock::new(None) }
    }

    /// Return the cached definitions if still within `ttl`, else `None`.
    fn fresh(&self, ttl: Duration) -> Option<CacheLookup> {
        let guard = self.entry.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = guard.as_ref()?;
        let age = entry.fetched_at.elapsed();
        if age > ttl {
            return None;
        }
        Some(CacheLookup {
            defs: entry.defs.clone(),
            cached: true,
            cache_age_seconds: age.as_secs(),
        })
    }

    /// Fetch structure definitions, loading from `loader` on a cache miss
    /// or TTL expiry and re-populating the cache with the fresh result.
    ///
    /// # Errors
    ///
    /// Returns whatever error `loader` returns on a cache miss.
    pub async fn get_or_load<E, F, Fut>(&self, ttl: Duration, loader: F) -> Result<CacheLookup, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<StructureDef>, E>>,
    {
        if let Some(hit) = self.fresh(ttl) {
            return Ok(hit);
        }

        let defs = loader().await?;
        let mut guard = self.entry.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(CacheEntry { defs: defs.clone(), fetched_at: Instant::now() });

        Ok(CacheLookup { defs, cached: false, cache_age_seconds: 0 })
    }

    /// Force the next lookup to reload, called after a definition change.
    pub fn invalidate(&self) {
        let mut guard = self.entry.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = None;
    }
}

impl Default for StructureMetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

//! Listing cache and the coordinator that keeps it coherent with the store.
//!
//! Cached entries hold the rendered object entries of a listing, keyed by the
//! canonical listing URL of their directory (see `path_resolver::listing_url`).
//! The collection entry is rendered per request so that its href always
//! echoes the caller's path. The cache is an optimization only: every failure
//! here is logged and dropped, and the blob store stays the source of truth.

use crate::services::path_resolver::listing_url;
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::{sync::RwLock, task::JoinHandle};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Default entry lifetime: one week.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(604_800);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// The rendered object entries of a listing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedListing {
    pub entries: String,
    /// Directory generation the entries were rendered under.
    pub generation: u64,
    pub content_type: String,
}

/// Storage for rendered listings, addressed by listing URL.
#[async_trait]
pub trait ListingCache: Send + Sync {
    async fn lookup(&self, url: &str) -> CacheResult<Option<CachedListing>>;

    async fn store(&self, url: &str, listing: CachedListing, ttl: Duration) -> CacheResult<()>;

    /// Remove the entry for `url`; returns whether one was present.
    async fn delete(&self, url: &str) -> CacheResult<bool>;
}

/// Process-local TTL cache.
#[derive(Default)]
pub struct MemoryListingCache {
    entries: RwLock<HashMap<String, (CachedListing, Instant)>>,
}

impl MemoryListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl ListingCache for MemoryListingCache {
    async fn lookup(&self, url: &str) -> CacheResult<Option<CachedListing>> {
        {
            let entries = self.entries.read().await;
            match entries.get(url) {
                None => return Ok(None),
                Some((listing, expires_at)) if *expires_at > Instant::now() => {
                    return Ok(Some(listing.clone()));
                }
                Some(_) => {}
            }
        }
        // expired
        self.entries.write().await.remove(url);
        Ok(None)
    }

    async fn store(&self, url: &str, listing: CachedListing, ttl: Duration) -> CacheResult<()> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(url.to_string(), (listing, expires_at));
        Ok(())
    }

    async fn delete(&self, url: &str) -> CacheResult<bool> {
        Ok(self.entries.write().await.remove(url).is_some())
    }
}

/// Read-through access to the listing cache plus background invalidation.
///
/// Invalidations run as detached tasks tracked by a `TaskTracker`; handlers
/// never wait for them. Each directory carries a generation number that
/// `invalidate` bumps before its task is spawned. A listing rendered under an
/// older generation is never served: `lookup` treats it as a miss, and
/// `store` skips it or removes it again when the bump lands mid-write.
#[derive(Clone)]
pub struct CacheCoordinator {
    cache: Arc<dyn ListingCache>,
    ttl: Duration,
    enabled: bool,
    tasks: TaskTracker,
    generations: Arc<Mutex<HashMap<String, u64>>>,
}

impl CacheCoordinator {
    pub fn new(cache: Arc<dyn ListingCache>, ttl: Duration, enabled: bool) -> Self {
        Self {
            cache,
            ttl,
            enabled,
            tasks: TaskTracker::new(),
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current generation of a directory. Read it before listing the store
    /// and tag the rendered listing with it.
    pub fn generation(&self, directory: &str) -> u64 {
        self.generation_of(&listing_url(directory))
    }

    /// Cached listing for a directory, if caching is on and an entry is live.
    pub async fn lookup(&self, directory: &str) -> Option<CachedListing> {
        if !self.enabled {
            return None;
        }
        let url = listing_url(directory);
        match self.cache.lookup(&url).await {
            Ok(Some(hit)) if hit.generation != self.generation_of(&url) => {
                debug!(%url, "ignoring listing rendered before an invalidation");
                None
            }
            Ok(hit) => hit,
            Err(err) => {
                warn!(%url, error = %err, "listing cache lookup failed");
                None
            }
        }
    }

    /// Save a listing rendered while the directory was at `listing.generation`.
    pub async fn store(&self, directory: &str, listing: CachedListing) {
        if !self.enabled {
            return;
        }
        let url = listing_url(directory);
        let generation = listing.generation;
        if self.generation_of(&url) != generation {
            debug!(%url, "skipping listing rendered before an invalidation");
            return;
        }
        if let Err(err) = self.cache.store(&url, listing, self.ttl).await {
            warn!(%url, error = %err, "listing cache store failed");
            return;
        }
        // invalidated while the write was in flight
        if self.generation_of(&url) != generation {
            if let Err(err) = self.cache.delete(&url).await {
                warn!(%url, error = %err, "listing cache invalidation failed");
            }
        }
    }

    /// Drop the cached listing of `directory` in the background.
    ///
    /// The generation is bumped before this returns, so listings rendered
    /// earlier can no longer be stored. The returned handle may be ignored;
    /// failures are logged by the task.
    pub fn invalidate(&self, directory: &str) -> JoinHandle<()> {
        let url = listing_url(directory);
        self.bump(&url);
        let cache = self.cache.clone();
        self.tasks.spawn(async move {
            match cache.delete(&url).await {
                Ok(removed) => debug!(%url, removed, "invalidated listing cache entry"),
                Err(err) => warn!(%url, error = %err, "listing cache invalidation failed"),
            }
        })
    }

    /// Drop the cached listing of `directory` and wait for the cache to answer.
    pub async fn invalidate_now(&self, directory: &str) -> CacheResult<bool> {
        let url = listing_url(directory);
        self.bump(&url);
        let removed = self.cache.delete(&url).await?;
        debug!(%url, removed, "invalidated listing cache entry");
        Ok(removed)
    }

    /// Wait until every background cache task spawned so far has finished.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    fn generation_of(&self, url: &str) -> u64 {
        let generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        generations.get(url).copied().unwrap_or(0)
    }

    fn bump(&self, url: &str) {
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        *generations.entry(url.to_string()).or_insert(0) += 1;
    }
}

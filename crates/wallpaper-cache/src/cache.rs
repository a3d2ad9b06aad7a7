//! Wallpaper cache manager: idempotent fetch on top of the store, eviction
//! policy and fetcher

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::eviction::EvictionPolicy;
use crate::fetcher::{Fetcher, HttpConfig, HttpTransport, Transport};
use crate::key;
use crate::store::Store;
use crate::types::{format_size, CacheEntry, CacheStats, Metadata};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Maps wallpaper URLs to local files, downloading on a miss
pub struct WallpaperCache<T = HttpTransport> {
    store: Store,
    policy: EvictionPolicy,
    fetcher: Fetcher<T>,
    /// Serializes every mutation (miss path and clear)
    write_lock: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl WallpaperCache<HttpTransport> {
    /// Create a cache downloading over HTTP with the given client settings
    pub fn with_http(config: CacheConfig, http: HttpConfig) -> Result<Self> {
        Self::new(config, HttpTransport::new(http)?)
    }
}

impl<T: Transport> WallpaperCache<T> {
    pub fn new(config: CacheConfig, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: Store::new(config.cache_dir),
            policy: EvictionPolicy::new(config.max_entries, config.max_size_bytes),
            fetcher: Fetcher::new(transport),
            write_lock: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Create the cache directory and sweep leftovers of interrupted fetches
    pub fn init(&self) -> Result<()> {
        self.store.init()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn transport(&self) -> &T {
        self.fetcher.transport()
    }

    /// Local path of the wallpaper at `url`, downloading it on a miss
    pub async fn fetch(&self, url: &str, metadata: Option<Metadata>) -> Result<PathBuf> {
        self.fetch_with_cancel(url, metadata, &CancellationToken::new())
            .await
    }

    /// Like [`fetch`](Self::fetch), aborting with [`CacheError::Cancelled`]
    /// once `cancel` fires. A cancelled fetch leaves no file behind.
    pub async fn fetch_with_cancel(
        &self,
        url: &str,
        metadata: Option<Metadata>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let derived = key::derive(url);

        if let Some(path) = self.store.find(&derived.key) {
            return Ok(self.record_hit(&derived.key, path));
        }

        let _guard = tokio::select! {
            _ = cancel.cancelled() => return Err(CacheError::Cancelled),
            guard = self.write_lock.lock() => guard,
        };

        // Another caller may have finished the same download while we waited
        if let Some(path) = self.store.find(&derived.key) {
            return Ok(self.record_hit(&derived.key, path));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %derived.key, url, "Cache miss");

        match self.policy.maybe_evict(&self.store) {
            Ok(report) if !report.evicted.is_empty() || report.failed > 0 => {
                info!(
                    evicted = report.evicted.len(),
                    failed = report.failed,
                    "Evicted old wallpapers"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Eviction pass failed, continuing with fetch"),
        }

        let mut pending = self.store.begin_write(&derived.key, derived.extension)?;

        let transfer = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CacheError::Cancelled),
            result = self.fetcher.transfer(url, &mut pending) => result,
        };

        if let Err(e) = transfer {
            warn!(url, error = %e, "Wallpaper download failed");
            return Err(e);
        }

        let path = self.store.commit(pending, metadata.as_ref())?;
        info!(url, path = ?path, "Cached wallpaper");
        Ok(path)
    }

    fn record_hit(&self, key: &str, path: PathBuf) -> PathBuf {
        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(key, "Cache hit");
        path
    }

    /// Read-only lookup; never touches the network
    pub fn get(&self, url: &str) -> Result<CacheEntry> {
        self.store.get(&key::cache_key(url))
    }

    pub fn count(&self) -> Result<usize> {
        self.store.count()
    }

    pub fn total_size_bytes(&self) -> Result<u64> {
        self.store.total_size_bytes()
    }

    /// Total stored size as status text, e.g. `"12.34 MB"`
    pub fn size(&self) -> Result<String> {
        Ok(format_size(self.total_size_bytes()?))
    }

    /// Directory scan on the blocking pool
    async fn scan(&self) -> Result<Vec<CacheEntry>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            store
                .enumerate()
                .map(|entries| entries.collect::<Vec<CacheEntry>>())
        })
        .await
        .map_err(std::io::Error::from)?
    }

    /// All stored entries, most recently written first
    pub async fn list(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = self.scan().await?;
        entries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(entries)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let entries = self.scan().await?;

        Ok(CacheStats {
            entries: entries.len(),
            total_size: entries.iter().map(|e| e.size).sum(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }

    /// Delete every entry, leaving an empty, writable cache directory
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.clear()
    }
}

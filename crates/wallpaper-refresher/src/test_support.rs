//! Test doubles for the cache transport and the wallpaper applier

use crate::applier::{WallpaperApplier, WallpaperStyle};
use crate::error::Result;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use wallpaper_cache::{ByteStream, CacheConfig, CacheError, Transport, WallpaperCache};

/// Serves a small fixed body for known URLs and 404s everything else
pub struct StubTransport {
    urls: HashSet<String>,
}

impl StubTransport {
    pub fn serving(urls: &[&str]) -> Self {
        Self {
            urls: urls.iter().map(|u| u.to_string()).collect(),
        }
    }
}

impl Transport for StubTransport {
    async fn open(&self, url: &str) -> wallpaper_cache::Result<ByteStream> {
        if !self.urls.contains(url) {
            return Err(CacheError::Network(format!("{} returned status 404", url)));
        }
        let body = Bytes::from(format!("image bytes for {}", url));
        Ok(Box::pin(futures::stream::iter(vec![Ok::<_, CacheError>(body)])))
    }
}

pub fn stub_cache(dir: &Path, transport: StubTransport) -> Arc<WallpaperCache<StubTransport>> {
    let config = CacheConfig {
        cache_dir: dir.to_path_buf(),
        max_entries: 10,
        max_size_bytes: 1024 * 1024,
    };
    let cache = WallpaperCache::new(config, transport).unwrap();
    cache.init().unwrap();
    Arc::new(cache)
}

type Applied = Arc<Mutex<Vec<(PathBuf, WallpaperStyle)>>>;

/// Remembers every apply call instead of touching the desktop
#[derive(Default)]
pub struct RecordingApplier {
    applied: Applied,
}

impl RecordingApplier {
    pub fn applied(&self) -> Applied {
        self.applied.clone()
    }
}

impl WallpaperApplier for RecordingApplier {
    fn apply<'a>(&'a self, path: &'a Path, style: WallpaperStyle) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.applied.lock().unwrap().push((path.to_path_buf(), style));
            Ok(())
        })
    }
}

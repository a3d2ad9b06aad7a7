//! Local wallpaper cache
//!
//! Maps remote image URLs to files in a cache directory. Downloads are
//! streamed into a temporary file and renamed into place only once complete,
//! so a stored entry is always whole. The cache is bounded by entry count and
//! total size; when either bound is reached the least recently written fifth
//! of the entries is evicted before the next download.
//!
//! ```no_run
//! use wallpaper_cache::{CacheConfig, HttpConfig, WallpaperCache};
//!
//! # async fn example() -> wallpaper_cache::Result<()> {
//! let cache = WallpaperCache::with_http(CacheConfig::default(), HttpConfig::default())?;
//! cache.init()?;
//!
//! let path = cache.fetch("https://images.example.com/photo.jpg", None).await?;
//! println!("{} ({} cached)", path.display(), cache.size()?);
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod error;
mod eviction;
mod fetcher;
pub mod key;
mod store;
mod types;

pub use cache::WallpaperCache;
pub use config::CacheConfig;
pub use error::{CacheError, ErrorKind, Result};
pub use eviction::{EvictionPolicy, EvictionReport};
pub use fetcher::{ByteStream, Fetcher, HttpConfig, HttpTransport, Transport};
pub use store::{Entries, PendingEntry, Store, PARTIAL_PREFIX};
pub use tokio_util::sync::CancellationToken;
pub use types::{format_size, CacheEntry, CacheStats, ImageExtension, Metadata, METADATA_SUFFIX};

//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Caller-supplied descriptive fields persisted verbatim in the sidecar file
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Suffix of the sidecar file holding an entry's metadata
pub const METADATA_SUFFIX: &str = "json";

/// Image file extensions the cache stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageExtension {
    #[default]
    Jpg,
    Png,
    Webp,
}

impl ImageExtension {
    pub const ALL: [ImageExtension; 3] =
        [ImageExtension::Jpg, ImageExtension::Png, ImageExtension::Webp];

    /// Extension including the leading dot, as used in file names
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageExtension::Jpg => ".jpg",
            ImageExtension::Png => ".png",
            ImageExtension::Webp => ".webp",
        }
    }

    /// Match a bare extension (no dot, any case). `jpeg` normalizes to `Jpg`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageExtension::Jpg),
            "png" => Some(ImageExtension::Png),
            "webp" => Some(ImageExtension::Webp),
            _ => None,
        }
    }
}

/// A stored wallpaper as seen by enumerating the cache directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub path: PathBuf,
    pub extension: ImageExtension,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub last_modified: DateTime<Utc>,
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Render a byte count the way the status display shows it, e.g. `"12.34 MB"`
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

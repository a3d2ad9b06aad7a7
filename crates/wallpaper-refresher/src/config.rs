//! Refresher configuration
//!
//! Read from a JSON file; any field the file leaves out keeps its default,
//! section by section. A handful of environment variables override the file.

use crate::applier::WallpaperStyle;
use crate::error::{RefresherError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use wallpaper_cache::{CacheConfig, HttpConfig, Metadata};

const DEFAULT_CONFIG_PATH: &str = "config.json";
const BYTES_PER_MB: u64 = 1024 * 1024;
const SECS_PER_HOUR: u64 = 60 * 60;
/// One year
const MAX_INTERVAL_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub cache: CacheSection,
    pub refresh: RefreshSection,
    pub wallpaper_mode: WallpaperStyle,
    pub images: Vec<ImageSpec>,
    pub http: HttpSection,
    /// Command used to set the wallpaper; the image path is appended
    pub apply_command: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub dir: PathBuf,
    pub max_size_mb: u64,
    pub max_images: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSection {
    pub interval_hours: u64,
    pub fetch_on_start: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
    pub headers: BTreeMap<String, String>,
}

/// A wallpaper the refresher may fetch, with metadata stored next to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3010,
            cache: CacheSection::default(),
            refresh: RefreshSection::default(),
            wallpaper_mode: WallpaperStyle::Fill,
            images: Vec::new(),
            http: HttpSection::default(),
            apply_command: None,
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
            max_size_mb: 500,
            max_images: 50,
        }
    }
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            interval_hours: 1,
            fetch_on_start: true,
        }
    }
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
            headers: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from `CONFIG_PATH` (default `config.json`), then apply
    /// environment overrides
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = Self::load(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(data) => {
                let config = serde_json::from_slice(&data)?;
                info!(path = ?path, "Loaded config");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = ?path, "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `CACHE_DIR`, `PORT`, `MAX_CACHE_SIZE_MB` and `MAX_CACHE_IMAGES`
    /// as returned by `var`. Unparseable numbers are ignored.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("CACHE_DIR") {
            self.cache.dir = PathBuf::from(dir);
        }
        if let Some(port) = var("PORT").and_then(|s| s.parse().ok()) {
            self.port = port;
        }
        if let Some(mb) = var("MAX_CACHE_SIZE_MB").and_then(|s| s.parse().ok()) {
            self.cache.max_size_mb = mb;
        }
        if let Some(n) = var("MAX_CACHE_IMAGES").and_then(|s| s.parse().ok()) {
            self.cache.max_images = n;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.cache_config().validate()?;
        if self.refresh.interval_hours == 0 {
            return Err(RefresherError::Config(
                "refresh.interval_hours must be positive".to_string(),
            ));
        }
        if self.refresh.interval_hours > MAX_INTERVAL_HOURS {
            return Err(RefresherError::Config(format!(
                "refresh.interval_hours must be at most {}",
                MAX_INTERVAL_HOURS
            )));
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            cache_dir: self.cache.dir.clone(),
            max_entries: self.cache.max_images,
            max_size_bytes: self.cache.max_size_mb.saturating_mul(BYTES_PER_MB),
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            timeout: Duration::from_secs(self.http.timeout_secs),
            user_agent: self.http.user_agent.clone().unwrap_or(defaults.user_agent),
            headers: self
                .http
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_hours.saturating_mul(SECS_PER_HOUR))
    }
}

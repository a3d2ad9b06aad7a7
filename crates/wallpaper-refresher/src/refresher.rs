//! Periodic fetch-and-apply loop

use crate::applier::{WallpaperApplier, WallpaperStyle};
use crate::error::{RefresherError, Result};
use crate::source::ImageSource;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wallpaper_cache::{HttpTransport, Transport, WallpaperCache};

/// Outcome of the most recent refreshes, for status display
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStatus {
    pub last_run: Option<DateTime<Utc>>,
    pub last_path: Option<PathBuf>,
    pub last_error: Option<String>,
    pub refreshes: u64,
    pub failures: u64,
}

pub struct Refresher<T = HttpTransport> {
    cache: Arc<WallpaperCache<T>>,
    source: Box<dyn ImageSource>,
    applier: Box<dyn WallpaperApplier>,
    style: WallpaperStyle,
    status: RwLock<RefreshStatus>,
    /// Fires on shutdown; also aborts an in-flight download
    shutdown: CancellationToken,
}

impl<T: Transport> Refresher<T> {
    pub fn new(
        cache: Arc<WallpaperCache<T>>,
        source: Box<dyn ImageSource>,
        applier: Box<dyn WallpaperApplier>,
        style: WallpaperStyle,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            cache,
            source,
            applier,
            style,
            status: RwLock::new(RefreshStatus::default()),
            shutdown,
        }
    }

    pub fn cache(&self) -> &WallpaperCache<T> {
        &self.cache
    }

    pub async fn status(&self) -> RefreshStatus {
        self.status.read().await.clone()
    }

    /// Fetch the next image and apply it. On failure the current wallpaper
    /// is left in place.
    pub async fn refresh_once(&self) -> Result<PathBuf> {
        let result = self.fetch_and_apply().await;

        let mut status = self.status.write().await;
        status.last_run = Some(Utc::now());
        match &result {
            Ok(path) => {
                status.refreshes += 1;
                status.last_path = Some(path.clone());
                status.last_error = None;
            }
            Err(e) => {
                status.failures += 1;
                status.last_error = Some(e.to_string());
            }
        }

        result
    }

    async fn fetch_and_apply(&self) -> Result<PathBuf> {
        let image = self.source.next_image().ok_or(RefresherError::NoSource)?;
        let path = self
            .cache
            .fetch_with_cancel(&image.url, image.metadata, &self.shutdown)
            .await?;
        self.applier.apply(&path, self.style).await?;
        Ok(path)
    }

    /// Refresh every `interval` until shutdown. Failures are logged and
    /// recorded in the status; the loop keeps going.
    pub async fn run(&self, interval: Duration, fetch_on_start: bool) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !fetch_on_start {
            // The first tick completes immediately
            ticker.tick().await;
        }

        info!(interval_secs = interval.as_secs(), "Refresher started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.refresh_once().await {
                        Ok(path) => info!(path = ?path, "Scheduled refresh complete"),
                        Err(e) => warn!(error = %e, "Scheduled refresh failed"),
                    }
                }
            }
        }
        info!("Refresher stopped");
    }
}

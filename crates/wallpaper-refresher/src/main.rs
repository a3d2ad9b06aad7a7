//! Wallpaper Refresher - keeps a local cache of wallpapers and rotates them
//!
//! Downloads images into a bounded on-disk cache, applies them on a fixed
//! interval and exposes a small control API on localhost.

mod applier;
mod config;
mod error;
mod refresher;
mod server;
mod source;
mod types;

#[cfg(test)]
mod test_support;

use crate::applier::{CommandApplier, LogApplier, WallpaperApplier};
use crate::config::Config;
use crate::error::{RefresherError, Result};
use crate::refresher::Refresher;
use crate::server::{start_server, ServerState, SharedState};
use crate::source::UrlListSource;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};
use wallpaper_cache::{HttpTransport, WallpaperCache};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("wallpaper_refresher=info".parse()?)
        .add_directive("wallpaper_cache=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Wallpaper Refresher...");

    let config = Config::from_env()?;
    info!("Port: {}", config.port);
    info!("Cache dir: {:?}", config.cache.dir);
    info!("Max cache size: {} MB", config.cache.max_size_mb);
    info!("Max cached images: {}", config.cache.max_images);
    info!("Refresh interval: {} hours", config.refresh.interval_hours);

    let cache = WallpaperCache::with_http(config.cache_config(), config.http_config())?;
    cache.init()?;
    info!("Cache holds {} images ({})", cache.count()?, cache.size()?);

    let source = UrlListSource::new(config.images.clone());
    if source.is_empty() {
        warn!("No images configured; scheduled refreshes will fail until some are added");
    } else {
        info!("Configured images: {}", source.len());
    }

    let applier: Box<dyn WallpaperApplier> = match &config.apply_command {
        Some(argv) => Box::new(CommandApplier::new(argv)?),
        None => Box::new(LogApplier),
    };

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
            }
            shutdown.cancel();
        });
    }

    let refresher: Arc<Refresher<HttpTransport>> = Arc::new(Refresher::new(
        Arc::new(cache),
        Box::new(source),
        applier,
        config.wallpaper_mode,
        shutdown.clone(),
    ));

    let refresh_task = {
        let refresher = refresher.clone();
        let interval = config.refresh_interval();
        let fetch_on_start = config.refresh.fetch_on_start;
        tokio::spawn(async move { refresher.run(interval, fetch_on_start).await })
    };

    let state: SharedState<HttpTransport> = Arc::new(ServerState::new(refresher));

    // Serve until ctrl-c
    let served = start_server(state, config.port, shutdown.clone()).await;
    shutdown.cancel();
    served.map_err(|e| RefresherError::Config(format!("Server error: {}", e)))?;

    if let Err(e) = refresh_task.await {
        warn!(error = %e, "Refresher task ended abnormally");
    }

    info!("Stopped");
    Ok(())
}

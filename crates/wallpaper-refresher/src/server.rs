//! Local control API
//!
//! Provides /health, /status, /cache (GET lists, DELETE clears) and
//! POST /refresh for the status display and manual actions.

use crate::refresher::Refresher;
use crate::types::{CacheListing, ErrorResponse, HealthResponse, RefreshResponse};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use wallpaper_cache::{format_size, Transport};

/// Shared state for the HTTP server
pub struct ServerState<T> {
    pub refresher: Arc<Refresher<T>>,
    pub started_at: DateTime<Utc>,
}

impl<T> ServerState<T> {
    pub fn new(refresher: Arc<Refresher<T>>) -> Self {
        Self {
            refresher,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState<T> = Arc<ServerState<T>>;

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

/// Create the HTTP router
pub fn create_router<T: Transport + 'static>(state: SharedState<T>) -> Router {
    Router::new()
        .route("/health", get(health::<T>))
        .route("/status", get(status::<T>))
        .route("/cache", get(list_cache::<T>).delete(clear_cache::<T>))
        .route("/refresh", post(refresh::<T>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server; returns once `shutdown` fires
pub async fn start_server<T: Transport + 'static>(
    state: SharedState<T>,
    port: u16,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting control server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

/// Health check endpoint
async fn health<T: Transport>(State(state): State<SharedState<T>>) -> Response {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    match state.refresher.cache().stats().await {
        Ok(cache) => Json(HealthResponse {
            status: "ok".to_string(),
            uptime_secs,
            cache,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read cache stats");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Last refresh outcome
async fn status<T: Transport>(State(state): State<SharedState<T>>) -> Response {
    Json(state.refresher.status().await).into_response()
}

/// List cached wallpapers, newest first
async fn list_cache<T: Transport>(State(state): State<SharedState<T>>) -> Response {
    match state.refresher.cache().list().await {
        Ok(entries) => {
            let total_size_bytes = entries.iter().map(|e| e.size).sum();
            Json(CacheListing {
                count: entries.len(),
                total_size_bytes,
                total_size: format_size(total_size_bytes),
                entries,
            })
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list cache");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Delete all cached wallpapers
async fn clear_cache<T: Transport>(State(state): State<SharedState<T>>) -> Response {
    match state.refresher.cache().clear().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!(error = %e, "Failed to clear cache");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Fetch and apply the next wallpaper now
async fn refresh<T: Transport>(State(state): State<SharedState<T>>) -> Response {
    match state.refresher.refresh_once().await {
        Ok(path) => Json(RefreshResponse { path }).into_response(),
        Err(e) => {
            warn!(error = %e, "Manual refresh failed");
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

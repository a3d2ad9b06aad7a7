//! Response bodies of the control API

use serde::Serialize;
use std::path::PathBuf;
use wallpaper_cache::{CacheEntry, CacheStats};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
}

/// Cache contents for the status display
#[derive(Debug, Serialize)]
pub struct CacheListing {
    pub count: usize,
    pub total_size_bytes: u64,
    /// Human readable, e.g. `"12.34 MB"`
    pub total_size: String,
    pub entries: Vec<CacheEntry>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            uptime_secs: 3600,
            cache: CacheStats {
                entries: 12,
                total_size: 50_000_000,
                hits: 500,
                misses: 50,
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"ok\""));
        assert!(json.contains("3600"));
        assert!(json.contains("500"));
    }

    #[test]
    fn test_cache_listing_serialization() {
        let listing = CacheListing {
            count: 0,
            total_size_bytes: 0,
            total_size: "0.00 MB".to_string(),
            entries: Vec::new(),
        };

        let json: serde_json::Value = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["total_size"], "0.00 MB");
        assert!(json["entries"].as_array().unwrap().is_empty());
    }
}

//! Error types for the wallpaper refresher

use std::fmt;

#[derive(Debug)]
pub enum RefresherError {
    Cache(wallpaper_cache::CacheError),
    Io(Box<std::io::Error>),
    ConfigParse(serde_json::Error),
    Config(String),
    Apply(String),
    NoSource,
}

impl fmt::Display for RefresherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefresherError::Cache(err) => write!(f, "Cache error: {}", err),
            RefresherError::Io(err) => write!(f, "IO error: {}", err),
            RefresherError::ConfigParse(err) => write!(f, "Invalid config file: {}", err),
            RefresherError::Config(msg) => write!(f, "Configuration error: {}", msg),
            RefresherError::Apply(msg) => write!(f, "Failed to apply wallpaper: {}", msg),
            RefresherError::NoSource => write!(f, "No wallpaper source configured"),
        }
    }
}

impl std::error::Error for RefresherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RefresherError::Cache(err) => Some(err),
            RefresherError::Io(err) => Some(err.as_ref()),
            RefresherError::ConfigParse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<wallpaper_cache::CacheError> for RefresherError {
    fn from(err: wallpaper_cache::CacheError) -> Self {
        RefresherError::Cache(err)
    }
}

impl From<std::io::Error> for RefresherError {
    fn from(err: std::io::Error) -> Self {
        RefresherError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for RefresherError {
    fn from(err: serde_json::Error) -> Self {
        RefresherError::ConfigParse(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for RefresherError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        RefresherError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RefresherError>;

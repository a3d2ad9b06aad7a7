//! Error types for the wallpaper cache

use std::fmt;

/// Coarse classification of a [`CacheError`], used by callers for status text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Io,
    NotFound,
    Cancelled,
    Config,
}

#[derive(Debug)]
pub enum CacheError {
    /// Transfer failed after the request was sent (bad status, short body)
    Network(String),
    /// Transport-level failure from the HTTP client
    Http(Box<reqwest::Error>),
    Io(Box<std::io::Error>),
    NotFound(String),
    Cancelled,
    Config(String),
}

impl CacheError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CacheError::Network(_) | CacheError::Http(_) => ErrorKind::Network,
            CacheError::Io(_) => ErrorKind::Io,
            CacheError::NotFound(_) => ErrorKind::NotFound,
            CacheError::Cancelled => ErrorKind::Cancelled,
            CacheError::Config(_) => ErrorKind::Config,
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Network(msg) => write!(f, "Network error: {}", msg),
            CacheError::Http(err) => write!(f, "HTTP error: {}", err),
            CacheError::Io(err) => write!(f, "IO error: {}", err),
            CacheError::NotFound(key) => write!(f, "Not in cache: {}", key),
            CacheError::Cancelled => write!(f, "Fetch cancelled"),
            CacheError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Http(err) => Some(err.as_ref()),
            CacheError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::Http(Box::new(err))
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(Box::new(err))
    }
}

impl From<tempfile::PersistError> for CacheError {
    fn from(err: tempfile::PersistError) -> Self {
        CacheError::Io(Box::new(err.error))
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

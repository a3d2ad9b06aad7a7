//! Mapping from a remote image URL to its cache key and file extension

use crate::types::ImageExtension;
use sha2::{Digest, Sha256};
use url::Url;

/// Cache key and file extension derived from a source URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKey {
    pub key: String,
    pub extension: ImageExtension,
}

impl DerivedKey {
    /// File name of the image under the cache directory
    pub fn file_name(&self) -> String {
        format!("{}{}", self.key, self.extension.as_str())
    }
}

/// Derive the cache key and extension for `url`
pub fn derive(url: &str) -> DerivedKey {
    DerivedKey {
        key: cache_key(url),
        extension: extension_for(url),
    }
}

/// Hex-encoded SHA-256 of the URL string
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Infer the image extension from the URL path, defaulting to `.jpg`
pub fn extension_for(url: &str) -> ImageExtension {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        // Not an absolute URL; drop any query or fragment by hand
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .and_then(|(_, ext)| ImageExtension::from_extension(ext))
        .unwrap_or_default()
}

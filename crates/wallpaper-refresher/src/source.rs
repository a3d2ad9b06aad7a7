//! Where the refresher gets its next wallpaper URL

use crate::config::ImageSpec;
use std::sync::atomic::{AtomicUsize, Ordering};
use wallpaper_cache::Metadata;

/// Image chosen by a source, ready to hand to the cache
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub url: String,
    pub metadata: Option<Metadata>,
}

pub trait ImageSource: Send + Sync {
    /// Next image to show, or `None` if the source has nothing to offer
    fn next_image(&self) -> Option<SourceImage>;
}

/// Cycles through a fixed list of images
#[derive(Debug)]
pub struct UrlListSource {
    images: Vec<ImageSpec>,
    cursor: AtomicUsize,
}

impl UrlListSource {
    pub fn new(images: Vec<ImageSpec>) -> Self {
        Self {
            images,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageSource for UrlListSource {
    fn next_image(&self) -> Option<SourceImage> {
        if self.images.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.images.len();
        let spec = &self.images[index];
        Some(SourceImage {
            url: spec.url.clone(),
            metadata: spec.metadata.clone(),
        })
    }
}

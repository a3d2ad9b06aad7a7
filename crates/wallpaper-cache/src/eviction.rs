//! Count- and size-bounded eviction, least recently written first

use crate::error::Result;
use crate::store::Store;
use crate::types::CacheEntry;
use tracing::{debug, warn};

/// Fraction of entries dropped per eviction pass, as a divisor
const EVICTION_BATCH_DIVISOR: usize = 5;

/// Capacity bounds enforced before every insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    pub max_entries: usize,
    pub max_size_bytes: u64,
}

/// Outcome of a single [`EvictionPolicy::maybe_evict`] pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Keys removed, oldest first
    pub evicted: Vec<String>,
    /// Entries that were selected but whose image could not be deleted
    pub failed: usize,
}

impl EvictionPolicy {
    pub fn new(max_entries: usize, max_size_bytes: u64) -> Self {
        Self {
            max_entries,
            max_size_bytes,
        }
    }

    /// Whether a store holding `count` entries totalling `total_size` bytes
    /// must evict before accepting another entry
    pub fn should_evict(&self, count: usize, total_size: u64) -> bool {
        count >= self.max_entries || total_size > self.max_size_bytes
    }

    /// Number of entries dropped by the batch step when `count` entries exist
    pub fn batch_size(count: usize) -> usize {
        count.div_ceil(EVICTION_BATCH_DIVISOR).max(1)
    }

    /// Evict the oldest fifth of the cache if either bound is reached.
    ///
    /// If the size bound still does not hold after the batch, keeps removing
    /// the oldest remaining entry until it does. Deletion failures are logged
    /// and counted; they never fail the pass.
    pub fn maybe_evict(&self, store: &Store) -> Result<EvictionReport> {
        let mut entries: Vec<CacheEntry> = store.enumerate()?.collect();
        let count = entries.len();
        let total_size: u64 = entries.iter().map(|e| e.size).sum();

        let mut report = EvictionReport::default();
        if !self.should_evict(count, total_size) {
            return Ok(report);
        }

        // Ties on mtime fall back to key order so a pass is reproducible
        entries.sort_by(|a, b| {
            a.last_modified
                .cmp(&b.last_modified)
                .then_with(|| a.key.cmp(&b.key))
        });

        let batch = Self::batch_size(count);
        debug!(count, total_size, batch, "Cache over capacity, evicting");

        let mut remaining_size = total_size;
        for (index, entry) in entries.iter().enumerate() {
            if index >= batch && remaining_size <= self.max_size_bytes {
                break;
            }

            let removed = match store.remove(&entry.key) {
                Ok(()) => true,
                Err(e) => {
                    // The image may be gone even though its sidecar was not
                    let image_removed = !store.exists(&entry.key);
                    warn!(key = %entry.key, error = %e, image_removed, "Failed to evict cache entry");
                    image_removed
                }
            };

            if removed {
                remaining_size = remaining_size.saturating_sub(entry.size);
                debug!(key = %entry.key, size = entry.size, "Evicted cache entry");
                report.evicted.push(entry.key.clone());
            } else {
                report.failed += 1;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageExtension;
    use std::fs::File;
    use std::path::Path;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn set_age(path: &Path, secs_after_epoch_base: u64) {
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(base + Duration::from_secs(secs_after_epoch_base))
            .unwrap();
    }

    /// Store `n` entries of `size` bytes, `k0` oldest
    fn populate(store: &Store, n: usize, size: usize) {
        for i in 0..n {
            let path = store
                .write(&format!("k{}", i), ImageExtension::Jpg, &vec![0u8; size], None)
                .unwrap();
            set_age(&path, i as u64 * 10);
        }
    }

    fn remaining_keys(store: &Store) -> Vec<String> {
        let mut keys: Vec<String> = store.enumerate().unwrap().map(|e| e.key).collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_batch_size() {
        assert_eq!(EvictionPolicy::batch_size(0), 1);
        assert_eq!(EvictionPolicy::batch_size(1), 1);
        assert_eq!(EvictionPolicy::batch_size(5), 1);
        assert_eq!(EvictionPolicy::batch_size(6), 2);
        assert_eq!(EvictionPolicy::batch_size(10), 2);
        assert_eq!(EvictionPolicy::batch_size(11), 3);
    }

    #[test]
    fn test_should_evict_bounds() {
        let policy = EvictionPolicy::new(5, 100);
        assert!(!policy.should_evict(4, 100));
        assert!(policy.should_evict(5, 0));
        assert!(policy.should_evict(0, 101));
    }

    #[test]
    fn test_no_eviction_under_bounds() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        store.init().unwrap();
        populate(&store, 3, 10);

        let report = EvictionPolicy::new(5, 1000).maybe_evict(&store).unwrap();
        assert!(report.evicted.is_empty());
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_count_bound_evicts_oldest_fifth() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        store.init().unwrap();
        populate(&store, 10, 10);

        let report = EvictionPolicy::new(10, 1_000_000)
            .maybe_evict(&store)
            .unwrap();

        assert_eq!(report.evicted, vec!["k0", "k1"]);
        assert_eq!(report.failed, 0);
        assert_eq!(store.count().unwrap(), 8);
    }

    #[test]
    fn test_eviction_order_follows_mtime_not_name() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        store.init().unwrap();

        // Names sort opposite to age
        for (key, age) in [("a", 50), ("b", 40), ("c", 30), ("d", 20), ("e", 10)] {
            let path = store.write(key, ImageExtension::Png, b"x", None).unwrap();
            set_age(&path, age);
        }

        let report = EvictionPolicy::new(5, 1_000).maybe_evict(&store).unwrap();
        assert_eq!(report.evicted, vec!["e"]);
        assert_eq!(remaining_keys(&store), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_size_bound_continues_past_batch() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        store.init().unwrap();
        // 5 entries x 100 bytes = 500 bytes against a 250 byte bound
        populate(&store, 5, 100);

        let report = EvictionPolicy::new(50, 250).maybe_evict(&store).unwrap();

        assert_eq!(report.evicted, vec!["k0", "k1", "k2"]);
        assert_eq!(remaining_keys(&store), vec!["k3", "k4"]);
        assert!(store.total_size_bytes().unwrap() <= 250);
    }

    #[test]
    fn test_sidecar_failure_still_frees_image_bytes() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        store.init().unwrap();
        populate(&store, 3, 100);
        std::fs::create_dir(dir.path().join("k0.json")).unwrap();
        std::fs::write(dir.path().join("k0.json").join("inner"), b"x").unwrap();

        let report = EvictionPolicy::new(50, 250).maybe_evict(&store).unwrap();

        assert_eq!(report.evicted, vec!["k0"]);
        assert_eq!(report.failed, 0);
        assert_eq!(remaining_keys(&store), vec!["k1", "k2"]);
        assert_eq!(store.total_size_bytes().unwrap(), 200);
    }

    #[test]
    fn test_eviction_removes_sidecars() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        store.init().unwrap();

        let mut metadata = crate::types::Metadata::new();
        metadata.insert("id".to_string(), "old".into());
        let path = store
            .write("old", ImageExtension::Jpg, b"x", Some(&metadata))
            .unwrap();
        set_age(&path, 0);
        let path = store.write("new", ImageExtension::Jpg, b"x", None).unwrap();
        set_age(&path, 10);

        EvictionPolicy::new(2, 1_000).maybe_evict(&store).unwrap();

        assert!(!store.exists("old"));
        assert!(!dir.path().join("old.json").exists());
        assert!(store.exists("new"));
    }
}

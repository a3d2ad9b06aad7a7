//! On-disk storage of cached wallpapers and their metadata sidecars
//!
//! Layout: one image per entry named `<key><extension>` and an optional
//! `<key>.json` sidecar. Images only become visible under their final name
//! through a rename from a temporary file in the same directory, so readers
//! never observe a partially written entry.

use crate::error::{CacheError, Result};
use crate::types::{CacheEntry, ImageExtension, Metadata, METADATA_SUFFIX};
use chrono::{DateTime, Utc};
use std::fs::{self, File, ReadDir};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Prefix of in-progress temporary files; never treated as entries
pub const PARTIAL_PREFIX: &str = ".partial-";

/// Directory-backed store of cache entries
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

/// An entry being written. Dropping it without [`Store::commit`] deletes the
/// temporary file, leaving the cache as it was.
#[derive(Debug)]
pub struct PendingEntry {
    key: String,
    extension: ImageExtension,
    file: NamedTempFile,
}

impl PendingEntry {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn extension(&self) -> ImageExtension {
        self.extension
    }

    /// Handle to the temporary file receiving the image bytes
    pub fn file(&self) -> &File {
        self.file.as_file()
    }

    pub fn file_mut(&mut self) -> &mut File {
        self.file.as_file_mut()
    }
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory if absent. Sweeps temporary files left
    /// behind by an interrupted transfer and sidecars whose image is gone.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let mut swept = 0usize;
        for dir_entry in fs::read_dir(&self.dir)?.flatten() {
            let name = dir_entry.file_name();
            let name = name.to_string_lossy();
            let stale = name.starts_with(PARTIAL_PREFIX) || self.is_orphan_sidecar(&name);
            if !stale {
                continue;
            }
            match fs::remove_file(dir_entry.path()) {
                Ok(()) => swept += 1,
                Err(e) => warn!(path = ?dir_entry.path(), error = %e, "Failed to remove stale file"),
            }
        }

        info!(cache_dir = ?self.dir, swept, "Cache store initialized");
        Ok(())
    }

    fn is_orphan_sidecar(&self, name: &str) -> bool {
        match name
            .strip_suffix(METADATA_SUFFIX)
            .and_then(|rest| rest.strip_suffix('.'))
        {
            Some(key) if !key.is_empty() => !self.exists(key),
            _ => false,
        }
    }

    fn image_path(&self, key: &str, extension: ImageExtension) -> PathBuf {
        self.dir.join(format!("{}{}", key, extension.as_str()))
    }

    fn metadata_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, METADATA_SUFFIX))
    }

    /// Path of the stored image for `key`, whichever extension it was saved with
    pub fn find(&self, key: &str) -> Option<PathBuf> {
        ImageExtension::ALL
            .iter()
            .map(|ext| self.image_path(key, *ext))
            .find(|path| path.is_file())
    }

    pub fn exists(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Read-only lookup of a single entry
    pub fn get(&self, key: &str) -> Result<CacheEntry> {
        let path = self
            .find(key)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        read_entry(&self.dir, &path)?.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Open a temporary file in the cache directory for a new entry
    pub fn begin_write(&self, key: &str, extension: ImageExtension) -> Result<PendingEntry> {
        let file = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;

        Ok(PendingEntry {
            key: key.to_string(),
            extension,
            file,
        })
    }

    /// Make a fully written entry visible under its final name.
    ///
    /// The sidecar is written first so an image is never visible without the
    /// metadata it was fetched with. Without metadata any leftover sidecar for
    /// the key is removed. If the image rename fails the sidecar is removed
    /// again.
    pub fn commit(&self, pending: PendingEntry, metadata: Option<&Metadata>) -> Result<PathBuf> {
        pending.file.as_file().sync_all()?;

        let metadata_path = self.metadata_path(&pending.key);
        match metadata {
            Some(metadata) => self.write_metadata(&pending.key, metadata)?,
            None => remove_if_present(&metadata_path)?,
        }

        let path = self.image_path(&pending.key, pending.extension);
        if let Err(e) = pending.file.persist(&path) {
            if metadata.is_some() {
                if let Err(rollback) = remove_if_present(&metadata_path) {
                    warn!(path = ?metadata_path, error = %rollback, "Failed to remove sidecar of uncommitted entry");
                }
            }
            return Err(e.into());
        }

        debug!(key = %pending.key, path = ?path, "Committed cache entry");
        Ok(path)
    }

    /// Store an in-memory image in one step
    pub fn write(
        &self,
        key: &str,
        extension: ImageExtension,
        bytes: &[u8],
        metadata: Option<&Metadata>,
    ) -> Result<PathBuf> {
        let mut pending = self.begin_write(key, extension)?;
        pending.file_mut().write_all(bytes)?;
        self.commit(pending, metadata)
    }

    fn write_metadata(&self, key: &str, metadata: &Metadata) -> Result<()> {
        let mut tmp = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, metadata).map_err(io::Error::from)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.metadata_path(key))?;
        Ok(())
    }

    /// Sidecar metadata for `key`; absent or unreadable sidecars yield `None`
    pub fn load_metadata(&self, key: &str) -> Option<Metadata> {
        load_metadata_at(&self.metadata_path(key))
    }

    /// Delete the image and its sidecar. Missing files are not an error.
    ///
    /// Every path is attempted even if an earlier one fails; the first failure
    /// is returned. Use [`Store::exists`] to tell whether the image survived.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut first_err = None;
        let paths = ImageExtension::ALL
            .iter()
            .map(|ext| self.image_path(key, *ext))
            .chain(std::iter::once(self.metadata_path(key)));

        for path in paths {
            if let Err(e) = remove_if_present(&path) {
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Scan the cache directory. Each call starts a fresh scan.
    pub fn enumerate(&self) -> Result<Entries> {
        Ok(Entries {
            dir: self.dir.clone(),
            read_dir: fs::read_dir(&self.dir)?,
        })
    }

    pub fn total_size_bytes(&self) -> Result<u64> {
        Ok(self.enumerate()?.map(|entry| entry.size).sum())
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.enumerate()?.count())
    }

    /// Delete everything in the cache directory and recreate it empty
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.dir)?;
        info!(cache_dir = ?self.dir, "Cache cleared");
        Ok(())
    }
}

/// Lazy iterator over the entries in a cache directory
pub struct Entries {
    dir: PathBuf,
    read_dir: ReadDir,
}

impl Iterator for Entries {
    type Item = CacheEntry;

    fn next(&mut self) -> Option<CacheEntry> {
        for dir_entry in self.read_dir.by_ref() {
            let dir_entry = match dir_entry {
                Ok(dir_entry) => dir_entry,
                Err(e) => {
                    warn!(cache_dir = ?self.dir, error = %e, "Failed to read cache directory entry");
                    continue;
                }
            };

            match read_entry(&self.dir, &dir_entry.path()) {
                Ok(Some(entry)) => return Some(entry),
                Ok(None) => continue,
                // Removed between listing and stat
                Err(e) => {
                    debug!(path = ?dir_entry.path(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            }
        }
        None
    }
}

/// Split `<key><ext>` into its parts if `name` is a recognized image file name
fn parse_file_name(name: &str) -> Option<(&str, ImageExtension)> {
    if name.starts_with(PARTIAL_PREFIX) {
        return None;
    }
    ImageExtension::ALL.iter().find_map(|ext| {
        name.strip_suffix(ext.as_str())
            .filter(|key| !key.is_empty())
            .map(|key| (key, *ext))
    })
}

fn read_entry(dir: &Path, path: &Path) -> Result<Option<CacheEntry>> {
    let Some((key, extension)) = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(parse_file_name)
    else {
        return Ok(None);
    };

    let stat = fs::metadata(path)?;
    if !stat.is_file() {
        return Ok(None);
    }

    let metadata = load_metadata_at(&dir.join(format!("{}.{}", key, METADATA_SUFFIX)));

    Ok(Some(CacheEntry {
        key: key.to_string(),
        path: path.to_path_buf(),
        extension,
        size: stat.len(),
        metadata,
        last_modified: DateTime::<Utc>::from(stat.modified()?),
    }))
}

fn load_metadata_at(path: &Path) -> Option<Metadata> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = ?path, error = %e, "Failed to read metadata sidecar");
            return None;
        }
    };

    match serde_json::from_slice(&data) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            warn!(path = ?path, error = %e, "Corrupt metadata sidecar");
            None
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

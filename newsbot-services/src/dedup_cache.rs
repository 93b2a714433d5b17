//! Dedup Cache
//!
//! Persistent record of processed article URLs with TTL-based expiry.
//! The whole table lives in memory and is written through to a JSON file on
//! every mutation, so a crash loses at most the in-flight batch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

/// Default entry lifetime
pub const DEFAULT_TTL_HOURS: u64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum DedupCacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// URL -> last processed time, backed by a flat JSON file
pub struct DedupCache {
    path: PathBuf,
    ttl: Duration,
    entries: BTreeMap<String, DateTime<Utc>>,
}

impl DedupCache {
    /// Open the cache at `path`.
    ///
    /// A missing file starts an empty cache. An unreadable or corrupt file is
    /// logged and also degrades to an empty cache.
    pub fn open(path: impl AsRef<Path>, ttl_hours: u64) -> Self {
        let path = path.as_ref().to_path_buf();

        let entries = match load_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load cache {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        info!(
            "Initialized dedup cache at: {} ({} entries, ttl {}h)",
            path.display(),
            entries.len(),
            ttl_hours
        );

        Self {
            path,
            ttl: i64::try_from(ttl_hours)
                .ok()
                .and_then(Duration::try_hours)
                .unwrap_or(Duration::MAX),
            entries,
        }
    }

    /// Whether `url` was processed within the TTL.
    ///
    /// Expired entries are purged (and the purge persisted) on lookup.
    pub fn is_cached(&mut self, url: &str) -> bool {
        let Some(processed_at) = self.entries.get(url).copied() else {
            return false;
        };

        let expires_at = processed_at
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        if Utc::now() > expires_at {
            debug!("Cache entry expired for {}", url);
            self.entries.remove(url);
            self.persist_logged();
            return false;
        }

        true
    }

    /// Record `url` as processed now and persist immediately
    pub fn add(&mut self, url: &str) {
        self.add_at(url, Utc::now());
    }

    /// Record `url` with an explicit processing time and persist immediately
    pub fn add_at(&mut self, url: &str, processed_at: DateTime<Utc>) {
        self.entries.insert(url.to_string(), processed_at);
        self.persist_logged();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full table to disk.
    ///
    /// Writes to a sibling temp file and renames it over the target.
    pub fn persist(&self) -> Result<(), DedupCacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(&self.entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// A failed write keeps the in-memory entry
    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            error!("Failed to save cache {}: {}", self.path.display(), e);
        }
    }
}

fn load_entries(path: &Path) -> Result<BTreeMap<String, DateTime<Utc>>, DedupCacheError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

//! Cache Module
//!
//! Keeps the summary of the last complete run so reads do not have to replay
//! the suite. The cache is advisory: anything unreadable counts as absent and
//! the summary is recomputed.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{CacheConfig, CacheStorage};
use crate::coverage::CoverageSummary;

/// Key the summary is stored under
pub const SUMMARY_CACHE_KEY: &str = "rewrite_testing_summary";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to access cache file '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode cached summary: {0}")]
    EncodeError(#[from] serde_json::Error),
}

/// Store for the last computed summary
pub trait SummaryStore: Send + Sync {
    fn read(&self) -> Option<CoverageSummary>;

    fn write(&self, summary: &CoverageSummary) -> Result<(), CacheError>;

    fn invalidate(&self) -> Result<(), CacheError>;
}

/// Stored form of a summary
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    computed_at: DateTime<Utc>,
    summary: CoverageSummary,
}

/// Summary cache backed by memory or a JSON file
pub struct SummaryCache {
    /// In-memory entries, keyed by cache key
    memory_cache: DashMap<String, CacheEntry>,

    /// Cache configuration
    config: CacheConfig,
}

impl SummaryCache {
    /// Create a new summary cache
    pub fn new(config: &CacheConfig) -> Self {
        info!(
            "Initializing summary cache: enable={}, storage={:?}",
            config.enable, config.storage
        );

        Self {
            memory_cache: DashMap::new(),
            config: config.clone(),
        }
    }

    /// When the cached summary was computed
    pub fn computed_at(&self) -> Option<DateTime<Utc>> {
        self.entry().map(|entry| entry.computed_at)
    }

    fn entry(&self) -> Option<CacheEntry> {
        if !self.config.enable {
            return None;
        }

        match self.config.storage {
            CacheStorage::Memory => self
                .memory_cache
                .get(SUMMARY_CACHE_KEY)
                .map(|entry| entry.clone()),
            CacheStorage::Disk => self.read_disk(),
        }
    }

    fn disk_file(&self) -> PathBuf {
        PathBuf::from(&self.config.disk_path).join(format!("{}.json", SUMMARY_CACHE_KEY))
    }

    fn read_disk(&self) -> Option<CacheEntry> {
        let path = self.disk_file();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cannot read cached summary {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&contents) {
            Ok(entry) if entry.key == SUMMARY_CACHE_KEY => Some(entry),
            Ok(entry) => {
                warn!("Ignoring cached summary stored under '{}'", entry.key);
                None
            }
            Err(e) => {
                warn!("Ignoring unreadable cached summary {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_disk(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let dir = PathBuf::from(&self.config.disk_path);
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::IoError {
            path: dir.clone(),
            source: e,
        })?;

        let path = self.disk_file();
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(entry)?;
        std::fs::write(&tmp, body).map_err(|e| CacheError::IoError {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| CacheError::IoError {
            path: path.clone(),
            source: e,
        })
    }
}

impl SummaryStore for SummaryCache {
    fn read(&self) -> Option<CoverageSummary> {
        let entry = self.entry();
        match &entry {
            Some(_) => debug!("Cache hit: {}", SUMMARY_CACHE_KEY),
            None => debug!("Cache miss: {}", SUMMARY_CACHE_KEY),
        }
        entry.map(|entry| entry.summary)
    }

    fn write(&self, summary: &CoverageSummary) -> Result<(), CacheError> {
        if !self.config.enable {
            return Ok(());
        }

        let entry = CacheEntry {
            key: SUMMARY_CACHE_KEY.to_string(),
            computed_at: Utc::now(),
            summary: summary.clone(),
        };

        match self.config.storage {
            CacheStorage::Memory => {
                self.memory_cache.insert(SUMMARY_CACHE_KEY.to_string(), entry);
            }
            CacheStorage::Disk => self.write_disk(&entry)?,
        }

        debug!("Cache set: {}", SUMMARY_CACHE_KEY);
        Ok(())
    }

    fn invalidate(&self) -> Result<(), CacheError> {
        info!("Purging cached summary");

        self.memory_cache.remove(SUMMARY_CACHE_KEY);

        if self.config.storage == CacheStorage::Disk {
            let path = self.disk_file();
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::IoError { path, source: e }),
            }
        }

        Ok(())
    }
}

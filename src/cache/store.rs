//! Durable on-disk copy of a cached resource list.
//!
//! Only the team-members resource uses this: a JSON file per resource name
//! under the platform cache directory, carrying the records and the instant
//! they were fetched. The TTL check is applied on load, so an expired file is
//! ignored rather than served as fresh. Any read or write failure degrades to
//! "no durable copy" instead of surfacing to the caller.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

/// Directory name under the platform cache dir
const APP_DIR: &str = "sheetcache";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> StoredData<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }
}

#[derive(Debug, Clone)]
pub struct DiskStore {
    cache_dir: PathBuf,
}

impl DiskStore {
    pub fn open(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    /// Open the store at the platform default location
    pub fn default_location() -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Self::open(cache_dir.join(APP_DIR))
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    /// Load the durable copy if it exists, parses, and is younger than the
    /// TTL. Everything else - missing file, corrupt JSON, expired entry -
    /// returns `None`.
    pub fn load<T: DeserializeOwned>(&self, name: &str, ttl_minutes: i64) -> Option<StoredData<T>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return None;
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!(cache = name, error = %e, "Failed to read durable cache file");
                return None;
            }
        };

        let stored: StoredData<T> = match serde_json::from_str(&contents) {
            Ok(s) => s,
            Err(e) => {
                debug!(cache = name, error = %e, "Failed to parse durable cache file");
                return None;
            }
        };

        if stored.age_minutes() >= ttl_minutes {
            debug!(cache = name, age_minutes = stored.age_minutes(), "Durable cache expired");
            return None;
        }

        Some(stored)
    }

    pub fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let stored = StoredData::new(data);
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(self.cache_path(name), contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        Ok(())
    }

    pub fn remove(&self, name: &str) {
        let path = self.cache_path(name);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                debug!(cache = name, error = %e, "Failed to remove durable cache file");
            }
        }
    }
}

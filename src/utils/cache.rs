//! Cache service for fetched inputs. It is injected into the fetch layer; the
//! analytical core never reads or writes it.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// Kind of cached data; each kind has its own time-to-live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheCategory {
    Games,
    Lines,
    Stats,
    Analysis,
}

impl CacheCategory {
    pub const ALL: [CacheCategory; 4] = [
        CacheCategory::Games,
        CacheCategory::Lines,
        CacheCategory::Stats,
        CacheCategory::Analysis,
    ];

    pub fn ttl(&self) -> Duration {
        match self {
            CacheCategory::Games => Duration::hours(6),
            CacheCategory::Lines => Duration::hours(1),
            CacheCategory::Stats => Duration::hours(12),
            CacheCategory::Analysis => Duration::minutes(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::Games => "games",
            CacheCategory::Lines => "lines",
            CacheCategory::Stats => "stats",
            CacheCategory::Analysis => "analysis",
        }
    }
}

pub trait CacheStore {
    /// Fresh value for `key`, or None when missing or expired
    fn get(&self, key: &str, category: CacheCategory) -> Option<Value>;

    fn put(&self, key: &str, category: CacheCategory, value: Value) -> Result<()>;

    /// Drop one category, or everything when `category` is None
    fn invalidate(&self, category: Option<CacheCategory>) -> Result<()>;
}

/// Typed read through any cache store
pub fn get_typed<T: DeserializeOwned>(
    cache: &dyn CacheStore,
    key: &str,
    category: CacheCategory,
) -> Option<T> {
    let value = cache.get(key, category)?;
    match serde_json::from_value(value) {
        Ok(typed) => Some(typed),
        Err(e) => {
            warn!(key, category = category.as_str(), error = %e, "Discarding unreadable cache entry");
            None
        }
    }
}

/// Typed write through any cache store
pub fn put_typed<T: Serialize>(
    cache: &dyn CacheStore,
    key: &str,
    category: CacheCategory,
    value: &T,
) -> Result<()> {
    let value = serde_json::to_value(value).context("Failed to serialize cache value")?;
    cache.put(key, category, value)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    cached_at: DateTime<Utc>,
    value: Value,
}

impl CacheEntry {
    fn is_fresh(&self, category: CacheCategory, now: DateTime<Utc>) -> bool {
        now - self.cached_at <= category.ttl()
    }
}

/// One JSON file per entry under a cache directory
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn entry_path(&self, key: &str, category: CacheCategory) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", category.as_str(), encode_key(key)))
    }
}

/// Filename-safe, one-to-one key encoding: ASCII alphanumerics and '-' are
/// kept, every other byte becomes `_xx` (hex)
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("_{:02x}", byte));
        }
    }
    encoded
}

impl CacheStore for FileCache {
    fn get(&self, key: &str, category: CacheCategory) -> Option<Value> {
        let path = self.entry_path(key, category);
        let json = std::fs::read_to_string(&path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&json) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache read error");
                return None;
            }
        };

        if entry.is_fresh(category, Utc::now()) {
            Some(entry.value)
        } else {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "Failed to remove expired cache entry");
            }
            None
        }
    }

    fn put(&self, key: &str, category: CacheCategory, value: Value) -> Result<()> {
        let entry = CacheEntry {
            cached_at: Utc::now(),
            value,
        };
        let path = self.entry_path(key, category);
        let json = serde_json::to_string(&entry).context("Failed to serialize cache entry")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write cache file {}", path.display()))?;
        Ok(())
    }

    fn invalidate(&self, category: Option<CacheCategory>) -> Result<()> {
        let prefixes: Vec<String> = match category {
            Some(category) => vec![format!("{}_", category.as_str())],
            None => CacheCategory::ALL
                .iter()
                .map(|c| format!("{}_", c.as_str()))
                .collect(),
        };

        for dir_entry in std::fs::read_dir(&self.dir).context("Failed to read cache directory")? {
            let path = dir_entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.ends_with(".json") && prefixes.iter().any(|p| name.starts_with(p.as_str())) {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
        Ok(())
    }
}

/// In-process cache, mainly for tests and one-shot runs
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<(CacheCategory, String), CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn backdate(&self, key: &str, category: CacheCategory, age: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            if let Some(entry) = entries.get_mut(&(category, key.to_string())) {
                entry.cached_at = entry.cached_at - age;
            }
        }
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str, category: CacheCategory) -> Option<Value> {
        let mut entries = self.entries.lock().ok()?;
        let cache_key = (category, key.to_string());
        let fresh = entries.get(&cache_key)?.is_fresh(category, Utc::now());
        if fresh {
            entries.get(&cache_key).map(|entry| entry.value.clone())
        } else {
            entries.remove(&cache_key);
            None
        }
    }

    fn put(&self, key: &str, category: CacheCategory, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory cache lock poisoned"))?;
        entries.insert(
            (category, key.to_string()),
            CacheEntry {
                cached_at: Utc::now(),
                value,
            },
        );
        Ok(())
    }

    fn invalidate(&self, category: Option<CacheCategory>) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory cache lock poisoned"))?;
        match category {
            Some(category) => entries.retain(|(c, _), _| *c != category),
            None => entries.clear(),
        }
        Ok(())
    }
}

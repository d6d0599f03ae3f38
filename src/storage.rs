//! The storage module keeps the persistent image cache: a JSON object on disk
//! mapping `brand__generic` keys to the last image search result.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::IMAGE_CACHE_TTL_DAYS;

/// Cached result of one image search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// `None` records that the search found no usable image.
    pub image_url: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// A real image URL is known.
    Hit(String),
    /// A recent search found nothing; don't ask again yet.
    Negative,
    /// Nothing usable is cached, the remote service has to be asked.
    Miss,
}

/// Builds the cache key of a brand/generic pair.
pub fn cache_key(brand_name: &str, generic_name: &str) -> String {
    format!("{brand_name}__{generic_name}").to_lowercase()
}

/// The image cache, loaded once per run and saved at the end when changed.
///
/// Entries are held as raw JSON so that one malformed value only costs a
/// refetch of that item.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: BTreeMap<String, Value>,
    dirty: bool,
}

impl ImageCache {
    /// Loads the cache from `path`.
    ///
    /// A missing, unreadable or malformed file gives an empty cache.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!("Starting with empty image cache, {}: {err}", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str::<BTreeMap<String, Value>>(&raw) {
            Ok(entries) => {
                debug!("Loaded {} image cache entries", entries.len());
                Self {
                    entries,
                    dirty: false,
                }
            }
            Err(err) => {
                debug!("Ignoring malformed image cache {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Writes the cache as pretty-printed JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory can't be created, or the file can't
    /// be written.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write image cache {}", path.display()))?;
        self.dirty = false;

        Ok(())
    }

    /// Decodes the entry stored under `key`.
    ///
    /// String values are the double-encoded form written by older tooling and
    /// are decoded a second time.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.entries.get(key)? {
            Value::String(encoded) => serde_json::from_str(encoded).ok(),
            value => serde_json::from_value(value.clone()).ok(),
        }
    }

    /// Decides whether `key` needs a remote lookup at time `now`.
    pub fn lookup(&self, key: &str, now: DateTime<Utc>) -> CacheLookup {
        if !self.entries.contains_key(key) {
            return CacheLookup::Miss;
        }

        let entry = match self.get(key) {
            Some(entry) => entry,
            None => {
                debug!("Malformed image cache entry for {key}");
                return CacheLookup::Miss;
            }
        };

        match entry.image_url.filter(|url| !url.is_empty()) {
            Some(url) => CacheLookup::Hit(url),
            None if now - entry.fetched_at < Duration::days(IMAGE_CACHE_TTL_DAYS) => {
                CacheLookup::Negative
            }
            None => CacheLookup::Miss,
        }
    }

    /// Stores a search result, replacing whatever was there.
    pub fn record(&mut self, key: &str, image_url: Option<String>, now: DateTime<Utc>) {
        let entry = CacheEntry {
            image_url,
            fetched_at: now,
        };
        match serde_json::to_value(&entry) {
            Ok(value) => {
                self.entries.insert(key.to_string(), value);
                self.dirty = true;
            }
            Err(err) => debug!("Unable to encode image cache entry for {key}: {err}"),
        }
    }

    /// Tells whether any entry changed since loading or the last save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

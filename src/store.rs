// Durable hotel list cache
// Persists the scraped hotel list across runs with a 24 hour shelf life

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::wire::Hotel;

pub const HOTEL_CACHE_FILE: &str = "afpesp_hotels_cache.json";

// Hotel list together with the moment it was stored, in epoch milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedHotels {
    pub data: Vec<Hotel>,
    pub timestamp: i64,
}

// Backend seam: the cache does not care where the payload lives
pub trait HotelListStore: Send + Sync {
    fn load(&self) -> Option<PersistedHotels>;

    fn save(&self, payload: &PersistedHotels) -> bool;

    fn clear(&self);
}

// JSON file on disk, the normal backend
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HotelListStore for FileStore {
    fn load(&self) -> Option<PersistedHotels> {
        let body = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&body) {
            Ok(payload) => Some(payload),
            Err(e) => {
                // An unreadable file would fail every load; drop it now
                warn!("Discarding unreadable hotel cache: {}", e);
                let _ = fs::remove_file(&self.path);
                None
            }
        }
    }

    fn save(&self, payload: &PersistedHotels) -> bool {
        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not encode hotel cache: {}", e);
                return false;
            }
        };
        if fs::write(&self.path, &body).is_ok() {
            return true;
        }
        // The first write may have hit a stale or partial file; clear and retry once
        self.clear();
        match fs::write(&self.path, &body) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not persist hotel cache: {}", e);
                false
            }
        }
    }

    fn clear(&self) {
        let _ = fs::remove_file(&self.path);
    }
}

// Fallback backend when the cache path is not writable
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<PersistedHotels>>,
}

impl HotelListStore for MemoryStore {
    fn load(&self) -> Option<PersistedHotels> {
        self.slot.lock().clone()
    }

    fn save(&self, payload: &PersistedHotels) -> bool {
        *self.slot.lock() = Some(payload.clone());
        true
    }

    fn clear(&self) {
        *self.slot.lock() = None;
    }
}

// Write/read/delete round trip telling whether the cache directory is usable
fn storage_usable(path: &Path) -> bool {
    let trial = path.with_extension("storage_test");
    if fs::write(&trial, b"ok").is_err() {
        return false;
    }
    let readable = matches!(fs::read(&trial), Ok(body) if body == b"ok");
    let _ = fs::remove_file(&trial);
    readable
}

// Picks the file backend when the path is usable, memory otherwise
pub fn select_store(path: impl Into<PathBuf>) -> Box<dyn HotelListStore> {
    let path = path.into();
    if storage_usable(&path) {
        Box::new(FileStore::new(path))
    } else {
        warn!("Hotel cache path is not writable; keeping the hotel list in memory only");
        Box::new(MemoryStore::default())
    }
}

pub fn default_cache_path() -> PathBuf {
    std::env::temp_dir().join(HOTEL_CACHE_FILE)
}

// Diagnostic view of the durable cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotelCacheStats {
    pub exists: bool,
    pub expired: bool,
    pub count: Option<usize>,
    pub age_minutes: Option<i64>,
    pub remaining_minutes: Option<i64>,
    pub size_bytes: Option<usize>,
}

// 24 hour cache over a pluggable store
pub struct HotelListCache {
    store: Box<dyn HotelListStore>,
    ttl: Duration,
}

impl HotelListCache {
    pub fn new(store: Box<dyn HotelListStore>) -> Self {
        Self {
            store,
            ttl: Duration::hours(24),
        }
    }

    pub fn get(&self) -> Option<Vec<Hotel>> {
        self.get_at(Utc::now())
    }

    // An expired payload is cleared on sight so later loads start clean
    pub fn get_at(&self, now: DateTime<Utc>) -> Option<Vec<Hotel>> {
        let payload = self.store.load()?;
        if self.is_stale(&payload, now) {
            debug!("Hotel cache expired; discarding {} entries", payload.data.len());
            self.store.clear();
            return None;
        }
        Some(payload.data)
    }

    pub fn set(&self, hotels: &[Hotel]) -> bool {
        self.set_at(hotels, Utc::now())
    }

    pub fn set_at(&self, hotels: &[Hotel], now: DateTime<Utc>) -> bool {
        let payload = PersistedHotels {
            data: hotels.to_vec(),
            timestamp: now.timestamp_millis(),
        };
        self.store.save(&payload)
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn stats(&self) -> HotelCacheStats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> HotelCacheStats {
        match self.store.load() {
            Some(payload) => {
                let age_ms = now.timestamp_millis() - payload.timestamp;
                let remaining_ms = self.ttl.num_milliseconds() - age_ms;
                HotelCacheStats {
                    exists: true,
                    expired: age_ms >= self.ttl.num_milliseconds(),
                    count: Some(payload.data.len()),
                    age_minutes: Some(age_ms / 60_000),
                    remaining_minutes: Some(remaining_ms / 60_000),
                    size_bytes: serde_json::to_string(&payload).map(|body| body.len()).ok(),
                }
            }
            None => HotelCacheStats {
                exists: false,
                expired: false,
                count: None,
                age_minutes: None,
                remaining_minutes: None,
                size_bytes: None,
            },
        }
    }

    fn is_stale(&self, payload: &PersistedHotels, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() - payload.timestamp >= self.ttl.num_milliseconds()
    }
}

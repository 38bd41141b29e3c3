// In-memory response cache with TTL
// Keeps recent API payloads so repeated lookups skip the network

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

// Tuning knobs for the response cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            default_ttl: Duration::seconds(300),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    // An entry is stale the instant its age reaches the TTL
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.stored_at >= self.ttl
    }
}

// Counters for cache behaviour, updated lock-free
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub insert_count: AtomicUsize,
    pub eviction_count: AtomicUsize,
    pub expired_count: AtomicUsize,
}

// Snapshot of the counters for reporting
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub entries: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub insert_count: usize,
    pub eviction_count: usize,
    pub expired_count: usize,
}

// Diagnostic view of a single cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStats {
    pub exists: bool,
    pub expired: bool,
    pub age_seconds: Option<u64>,
    pub remaining_seconds: Option<u64>,
}

pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    stats: CacheStats,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Utc::now())
    }

    // Lookup with an injectable clock so expiry can be tested deterministically
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if !entry.is_expired_at(now) {
                    self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                    return Some(entry.data.clone());
                }
                true
            }
            None => false,
        };
        // The map guard is released above; removing here cannot deadlock
        if expired {
            self.entries.remove(key);
            self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
        }
        self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
        None
    }

    pub fn set(&self, key: String, data: Value, ttl: Option<Duration>) {
        self.set_at(key, data, ttl, Utc::now());
    }

    // Entries carry their own ttl; None falls back to the configured default
    pub fn set_at(&self, key: String, data: Value, ttl: Option<Duration>, now: DateTime<Utc>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_entries {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                data,
                stored_at: now,
                ttl: ttl.unwrap_or(self.config.default_ttl),
            },
        );
        self.stats.insert_count.fetch_add(1, Ordering::SeqCst);
    }

    fn evict_oldest(&self) {
        // Clone the key out so no shard lock is held during the remove
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().stored_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.stats.eviction_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_stats(&self, key: &str) -> EntryStats {
        self.entry_stats_at(key, Utc::now())
    }

    pub fn entry_stats_at(&self, key: &str, now: DateTime<Utc>) -> EntryStats {
        match self.entries.get(key) {
            Some(entry) => {
                let age = now - entry.stored_at;
                EntryStats {
                    exists: true,
                    expired: entry.is_expired_at(now),
                    age_seconds: Some(age.num_seconds().max(0) as u64),
                    remaining_seconds: Some((entry.ttl - age).num_seconds().max(0) as u64),
                }
            }
            None => EntryStats {
                exists: false,
                expired: false,
                age_seconds: None,
                remaining_seconds: None,
            },
        }
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            entries: self.entries.len(),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            insert_count: self.stats.insert_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

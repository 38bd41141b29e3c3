// Main library file for the busca_vagas client

// Export modules for each part of the vacancy search stack
pub mod cache;
pub mod client;
pub mod extract;
pub mod result;
pub mod store;
pub mod wire;

// Re-export key types for convenience
pub use cache::{CacheConfig, CacheStatsReport, EntryStats, ResponseCache};
pub use client::{
    ApiError, CacheStatsSnapshot, ClientConfig, ClientError, ClientStatsReport, HttpTransport,
    RawReply, RetryConfig, TimeoutConfig, Transport, VacancyClient,
};
pub use extract::{Extraction, VacancyExtractor, VacancyRecord};
pub use result::{
    ALL_HOTELS, Availability, HotelGroup, QueryDetails, SearchRequest, SearchResult, WeekendBatch,
    WeekendOutcome, WeekendStatus,
};
pub use store::{HotelCacheStats, HotelListCache, HotelListStore, PersistedHotels};
pub use wire::{HealthStatus, Hotel, RawSearchData};

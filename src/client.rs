// HTTP client for the busca_vagas API
// Wraps the remote scraper endpoints with caching, timeouts and retries

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::cache::{CacheConfig, CacheStatsReport, ResponseCache};
use crate::extract::VacancyExtractor;
use crate::result::{
    assemble, assemble_weekends, SearchRequest, SearchResult, WeekendBatch, WeekendOutcome,
};
use crate::store::{default_cache_path, select_store, HotelCacheStats, HotelListCache};
use crate::wire::{envelope_failure, HealthStatus, Hotel, RawSearchData};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api";

pub const DEFAULT_WEEKEND_COUNT: usize = 8;
pub const MAX_WEEKEND_COUNT: usize = 12;

// Errors surfaced by API operations
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Server error: {status_code} - {message}")]
    Server { status_code: u16, message: String },

    #[error("Client error: {status_code} - {message}")]
    Client { status_code: u16, message: String },

    #[error("API error: {0}")]
    Application(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    // Only transient server failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Server { .. })
    }
}

// Errors raised while building a client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Init(String),
}

// Per-operation request budgets, in milliseconds
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub default_ms: u64,
    pub search_ms: u64,
    pub weekend_search_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_ms: 30_000,
            search_ms: 60_000,
            weekend_search_ms: 600_000,
        }
    }
}

// max_retries counts total attempts, not extra ones
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub hotel_cache_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeouts: TimeoutConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            hotel_cache_path: None,
        }
    }
}

pub fn build_health_url(base_url: &str) -> String {
    format!("{}/health", base_url)
}

pub fn build_hotels_url(base_url: &str) -> String {
    format!("{}/vagas/hoteis", base_url)
}

pub fn build_scrape_url(base_url: &str) -> String {
    format!("{}/vagas/hoteis/scrape", base_url)
}

pub fn build_search_url(base_url: &str, hotel: &str, checkin: &str, checkout: &str) -> String {
    format!(
        "{}/vagas/search?hotel={}&checkin={}&checkout={}",
        base_url, hotel, checkin, checkout
    )
}

pub fn build_weekend_search_url(base_url: &str, count: usize) -> String {
    format!("{}/vagas/search/weekends?count={}", base_url, count)
}

// Friday/Sunday pairs counted from today; a Friday today is weekend one
pub fn upcoming_weekends(today: NaiveDate, count: usize) -> Vec<(NaiveDate, NaiveDate)> {
    let until_friday = (5 - today.weekday().num_days_from_sunday() as i64).rem_euclid(7);
    (0..count)
        .map(|week| {
            let friday = today + chrono::Duration::days(until_friday + 7 * week as i64);
            (friday, friday + chrono::Duration::days(2))
        })
        .collect()
}

fn validate_weekend_count(count: usize) -> Result<(), ApiError> {
    if (1..=MAX_WEEKEND_COUNT).contains(&count) {
        Ok(())
    } else {
        Err(ApiError::InvalidRequest(
            "Weekend count must be between 1 and 12".to_string(),
        ))
    }
}

fn validate_search_dates(request: &SearchRequest) -> Result<(), ApiError> {
    if request.checkin < request.checkout {
        Ok(())
    } else {
        Err(ApiError::InvalidRequest(
            "Check-in date must be before check-out date".to_string(),
        ))
    }
}

// One raw HTTP exchange
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

// Transport seam so tests can script responses
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawReply, ApiError>;
}

pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Init(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawReply, ApiError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(RawReply { status, body })
    }
}

// Counters for client activity, updated lock-free
#[derive(Debug, Default)]
pub struct ClientStats {
    pub requests_sent: AtomicUsize,
    pub requests_failed: AtomicUsize,
    pub retries: AtomicUsize,
    pub cache_hits: AtomicUsize,
    pub searches_run: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClientStatsReport {
    pub requests_sent: usize,
    pub requests_failed: usize,
    pub retries: usize,
    pub cache_hits: usize,
    pub searches_run: usize,
}

// Both cache layers in one view
#[derive(Debug, Clone)]
pub struct CacheStatsSnapshot {
    pub hotel_cache: HotelCacheStats,
    pub response_cache: CacheStatsReport,
}

pub struct VacancyClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    response_cache: ResponseCache,
    hotel_cache: HotelListCache,
    extractor: VacancyExtractor,
    stats: ClientStats,
}

impl VacancyClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = Arc::new(HttpTransport::new()?);
        Self::with_transport(config, transport)
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        if config.base_url.is_empty() {
            return Err(ClientError::Config("base_url must not be empty".to_string()));
        }
        let path = config.hotel_cache_path.clone().unwrap_or_else(default_cache_path);
        let response_cache = ResponseCache::new(config.cache.clone());
        let hotel_cache = HotelListCache::new(select_store(path));
        info!("VacancyClient ready for {}", config.base_url);
        Ok(Self {
            config,
            transport,
            response_cache,
            hotel_cache,
            extractor: VacancyExtractor::new(),
            stats: ClientStats::default(),
        })
    }

    pub async fn check_health(&self) -> Result<HealthStatus, ApiError> {
        let url = build_health_url(&self.config.base_url);
        debug!("Checking API health at {}", url);
        let envelope = self
            .fetch_envelope(&url, self.config.timeouts.default_ms)
            .await?;
        serde_json::from_value(envelope)
            .map_err(|e| ApiError::Application(format!("Unexpected response shape: {}", e)))
    }

    pub async fn hotels(&self) -> Result<Vec<Hotel>, ApiError> {
        self.hotels_at(false, Utc::now()).await
    }

    pub async fn refresh_hotels(&self) -> Result<Vec<Hotel>, ApiError> {
        self.hotels_at(true, Utc::now()).await
    }

    // The durable cache answers first; a forced refresh drops both cache
    // layers for the hotel list before going to the network.
    pub async fn hotels_at(
        &self,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Hotel>, ApiError> {
        let url = build_hotels_url(&self.config.base_url);
        if force_refresh {
            self.response_cache.invalidate(&url);
            self.hotel_cache.clear();
        } else if let Some(cached) = self.hotel_cache.get_at(now) {
            self.stats.cache_hits.fetch_add(1, Ordering::SeqCst);
            debug!("Serving hotel list from durable cache");
            return Ok(cached);
        }
        let envelope = self
            .fetch_envelope_at(&url, self.config.timeouts.default_ms, now)
            .await?;
        let hotels: Vec<Hotel> = Self::payload(&envelope)?;
        if !self.hotel_cache.set_at(&hotels, now) {
            warn!("Could not persist hotel list; next call will hit the API again");
        }
        info!("Retrieved {} hotels from API", hotels.len());
        Ok(hotels)
    }

    // Live scrape of the reservation site dropdown. Slow, so it runs on the
    // search budget, and it never touches the durable hotel cache.
    pub async fn scrape_hotels(&self) -> Result<Vec<Hotel>, ApiError> {
        let url = build_scrape_url(&self.config.base_url);
        let envelope = self
            .fetch_envelope(&url, self.config.timeouts.search_ms)
            .await?;
        Self::payload(&envelope)
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult, ApiError> {
        self.search_at(request, Utc::now()).await
    }

    pub async fn search_at(
        &self,
        request: &SearchRequest,
        now: DateTime<Utc>,
    ) -> Result<SearchResult, ApiError> {
        validate_search_dates(request)?;
        let url = build_search_url(
            &self.config.base_url,
            &request.hotel,
            &request.checkin.to_string(),
            &request.checkout.to_string(),
        );
        debug!("Searching vacancies: {}", url);
        let envelope = self
            .fetch_envelope_at(&url, self.config.timeouts.search_ms, now)
            .await?;
        let raw: RawSearchData = Self::payload(&envelope)?;
        let extraction = self.extractor.extract(&raw.content);
        self.stats.searches_run.fetch_add(1, Ordering::SeqCst);
        let result = assemble(request, &extraction);
        info!("Search finished: {}", result.summary);
        Ok(result)
    }

    pub async fn search_default_weekends(&self) -> Result<WeekendBatch, ApiError> {
        self.search_weekends(DEFAULT_WEEKEND_COUNT).await
    }

    pub async fn search_weekends(&self, count: usize) -> Result<WeekendBatch, ApiError> {
        self.search_weekends_from(Utc::now().date_naive(), count).await
    }

    // Searches every upcoming weekend concurrently. A weekend that fails
    // becomes an error outcome; it never aborts its siblings.
    pub async fn search_weekends_from(
        &self,
        today: NaiveDate,
        count: usize,
    ) -> Result<WeekendBatch, ApiError> {
        validate_weekend_count(count)?;
        info!("Searching {} weekend(s); this can take several minutes", count);
        let weekends = upcoming_weekends(today, count);
        let searches = weekends.iter().enumerate().map(|(index, (friday, sunday))| {
            let request = SearchRequest::all_hotels(*friday, *sunday);
            async move {
                match self.search(&request).await {
                    Ok(result) => WeekendOutcome::from_result(index + 1, *friday, *sunday, result),
                    Err(error) => {
                        warn!("Weekend {} failed: {}", index + 1, error);
                        WeekendOutcome::from_error(index + 1, *friday, *sunday, error.to_string())
                    }
                }
            }
        });
        let deadline = Duration::from_millis(self.config.timeouts.weekend_search_ms);
        let outcomes = timeout(deadline, join_all(searches))
            .await
            .map_err(|_| ApiError::Timeout(self.config.timeouts.weekend_search_ms))?;
        Ok(assemble_weekends(outcomes))
    }

    pub fn clear_cache(&self) {
        self.response_cache.clear();
        self.hotel_cache.clear();
        debug!("All caches cleared");
    }

    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache_stats_at(Utc::now())
    }

    pub fn cache_stats_at(&self, now: DateTime<Utc>) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hotel_cache: self.hotel_cache.stats_at(now),
            response_cache: self.response_cache.stats(),
        }
    }

    pub fn stats(&self) -> ClientStatsReport {
        ClientStatsReport {
            requests_sent: self.stats.requests_sent.load(Ordering::SeqCst),
            requests_failed: self.stats.requests_failed.load(Ordering::SeqCst),
            retries: self.stats.retries.load(Ordering::SeqCst),
            cache_hits: self.stats.cache_hits.load(Ordering::SeqCst),
            searches_run: self.stats.searches_run.load(Ordering::SeqCst),
        }
    }

    async fn fetch_envelope(&self, url: &str, timeout_ms: u64) -> Result<Value, ApiError> {
        self.fetch_envelope_at(url, timeout_ms, Utc::now()).await
    }

    // Cache-through fetch with retries. Every successful envelope is cached
    // under its URL; failures are returned as-is and never cached.
    async fn fetch_envelope_at(
        &self,
        url: &str,
        timeout_ms: u64,
        now: DateTime<Utc>,
    ) -> Result<Value, ApiError> {
        if let Some(cached) = self.response_cache.get_at(url, now) {
            self.stats.cache_hits.fetch_add(1, Ordering::SeqCst);
            debug!("Serving {} from response cache", url);
            return Ok(cached);
        }
        let mut attempt = 0;
        loop {
            match self.attempt_fetch(url, timeout_ms).await {
                Ok(envelope) => {
                    self.response_cache.set_at(url.to_string(), envelope.clone(), None, now);
                    return Ok(envelope);
                }
                Err(error) => {
                    attempt += 1;
                    if attempt >= self.config.retry.max_retries || !error.is_retryable() {
                        self.stats.requests_failed.fetch_add(1, Ordering::SeqCst);
                        return Err(error);
                    }
                    let backoff = Self::calculate_backoff(&self.config.retry, attempt - 1);
                    warn!(
                        "Attempt {} for {} failed ({}); retrying in {:?}",
                        attempt, url, error, backoff
                    );
                    self.stats.retries.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn attempt_fetch(&self, url: &str, timeout_ms: u64) -> Result<Value, ApiError> {
        self.stats.requests_sent.fetch_add(1, Ordering::SeqCst);
        let reply = timeout(Duration::from_millis(timeout_ms), self.transport.get(url))
            .await
            .map_err(|_| ApiError::Timeout(timeout_ms))??;
        if reply.status >= 500 {
            return Err(ApiError::Server {
                status_code: reply.status,
                message: http_error_message(&reply),
            });
        }
        if reply.status >= 400 {
            return Err(ApiError::Client {
                status_code: reply.status,
                message: http_error_message(&reply),
            });
        }
        let envelope: Value = serde_json::from_str(&reply.body)
            .map_err(|e| ApiError::Application(format!("Invalid JSON response: {}", e)))?;
        if let Some(message) = envelope_failure(&envelope) {
            return Err(ApiError::Application(message));
        }
        Ok(envelope)
    }

    fn payload<T: DeserializeOwned>(envelope: &Value) -> Result<T, ApiError> {
        let data = envelope
            .get("data")
            .ok_or_else(|| ApiError::Application("Response missing data field".to_string()))?;
        serde_json::from_value(data.clone())
            .map_err(|e| ApiError::Application(format!("Unexpected response shape: {}", e)))
    }

    fn calculate_backoff(retry: &RetryConfig, attempt: u32) -> Duration {
        let base = (retry.initial_backoff_ms as f64
            * retry.backoff_multiplier.powf(attempt as f64))
        .min(retry.max_backoff_ms as f64);
        let jitter = rand::random::<f64>() * retry.jitter_factor * base;
        Duration::from_millis((base * (1.0 - retry.jitter_factor / 2.0) + jitter) as u64)
    }
}

fn http_error_message(reply: &RawReply) -> String {
    serde_json::from_str::<Value>(&reply.body)
        .ok()
        .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", reply.status))
}

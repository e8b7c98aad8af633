// src/config.rs
//
// Runtime configuration
//
// Defaults first, environment overrides second. Nothing is read from files.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

const APP_DIR_NAME: &str = "serieshub";

// ============================================================================
// STORE LOCATIONS
// ============================================================================

/// Where the three stores live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub catalog_db: PathBuf,
    pub recommendation_db: PathBuf,
    pub broker_db: PathBuf,
    pub pool_size: u32,
}

impl AppConfig {
    /// All stores under one directory
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            catalog_db: data_dir.join("catalog.db"),
            recommendation_db: data_dir.join("recommendation_log.db"),
            broker_db: data_dir.join("broker.db"),
            data_dir,
            pool_size: 8,
        }
    }

    /// Defaults, then `SERIESHUB_*` overrides.
    ///
    /// An explicit database path wins over the data directory.
    pub fn from_env() -> AppResult<Self> {
        let mut config = match env::var_os("SERIESHUB_DATA_DIR") {
            Some(dir) => Self::in_dir(dir),
            None => Self::default(),
        };

        if let Some(path) = env::var_os("SERIESHUB_CATALOG_DB") {
            config.catalog_db = PathBuf::from(path);
        }
        if let Some(path) = env::var_os("SERIESHUB_RECOMMENDATION_DB") {
            config.recommendation_db = PathBuf::from(path);
        }
        if let Some(path) = env::var_os("SERIESHUB_BROKER_DB") {
            config.broker_db = PathBuf::from(path);
        }
        if let Some(size) = parse_var::<u32>("SERIESHUB_POOL_SIZE")? {
            config.pool_size = size.max(1);
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::in_dir(base.join(APP_DIR_NAME))
    }
}

// ============================================================================
// EVENT CONSUMER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    pub episode_completed_queue: String,
    pub review_created_queue: String,
    /// Upper bound on handlers running at once, across both queues
    pub max_in_flight: usize,
    /// How long an empty durable queue is left alone before polling again
    pub poll_interval: Duration,
    /// Lease on a claimed message; an unsettled message is redelivered after it
    pub visibility_timeout: Duration,
    /// Delay before a nacked message becomes visible again
    pub redelivery_delay: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            episode_completed_queue: "recommendation-log.episode-completed".to_string(),
            review_created_queue: "recommendation-log.review-created".to_string(),
            max_in_flight: 16,
            poll_interval: Duration::from_millis(250),
            visibility_timeout: Duration::from_secs(30),
            redelivery_delay: Duration::from_secs(1),
        }
    }
}

impl ConsumerConfig {
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(queue) = env::var("SERIESHUB_CONSUMER_EPISODE_QUEUE") {
            config.episode_completed_queue = queue;
        }
        if let Ok(queue) = env::var("SERIESHUB_CONSUMER_REVIEW_QUEUE") {
            config.review_created_queue = queue;
        }
        if let Some(max) = parse_var::<usize>("SERIESHUB_CONSUMER_MAX_IN_FLIGHT")? {
            config.max_in_flight = max.max(1);
        }
        if let Some(ms) = parse_var::<u64>("SERIESHUB_CONSUMER_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>("SERIESHUB_CONSUMER_VISIBILITY_TIMEOUT_SECS")? {
            config.visibility_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>("SERIESHUB_CONSUMER_REDELIVERY_DELAY_MS")? {
            config.redelivery_delay = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(name: &str) -> AppResult<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{} has an invalid value: '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}

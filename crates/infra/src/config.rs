//! Environment-driven configuration.
//!
//! Values come from process environment variables (optionally seeded from a
//! `.env` file by [`load_dotenv`]). Parsing goes through a lookup function so
//! tests can supply their own map instead of touching the real environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::jobs::{BackoffStrategy, RetryPolicy};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Loads `.env` from the working directory if present. Missing files are fine.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn string(&self, key: &'static str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn optional(&self, key: &'static str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        }
    }
}

/// Queue worker and operator CLI settings.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub redis_url: String,
    pub queue_key: String,
    pub dead_letter_key: String,
    /// Required for anything that persists; checked by [`WorkerConfig::database_url`].
    pub database_url: Option<String>,
    pub ocr_service_url: String,
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
    pub fetch_timeout: Duration,
    pub extract_timeout: Duration,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);
        let retries: u32 = env.parse("WORKER_RETRIES", 3)?;
        if retries == 0 {
            return Err(ConfigError::Invalid {
                key: "WORKER_RETRIES",
                value: "0".into(),
                reason: "at least one attempt is required".into(),
            });
        }
        let strategy: BackoffStrategy = env.parse("WORKER_BACKOFF_STRATEGY", BackoffStrategy::Linear)?;
        let backoff = Duration::from_secs(env.parse("WORKER_BACKOFF_SECS", 2u64)?);

        Ok(Self {
            redis_url: env.string("REDIS_URL", "redis://localhost:6379/0"),
            queue_key: env.string("JOB_QUEUE_KEY", "ocr_jobs"),
            dead_letter_key: env.string("DEAD_LETTER_KEY", "ocr_dead_letter"),
            database_url: env.optional("DATABASE_URL"),
            ocr_service_url: env.string("OCR_SERVICE_URL", "http://localhost:8000/extract"),
            poll_interval: Duration::from_millis(env.parse("WORKER_POLL_INTERVAL_MS", 1000u64)?),
            retry: RetryPolicy::new(retries, backoff, strategy),
            fetch_timeout: Duration::from_secs(env.parse("FETCH_TIMEOUT_SECS", 20u64)?),
            extract_timeout: Duration::from_secs(env.parse("EXTRACT_TIMEOUT_SECS", 60u64)?),
        })
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url.as_deref().ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    /// `/health` next to the configured extraction endpoint.
    pub fn ocr_health_url(&self) -> String {
        let base = self.ocr_service_url.trim_end_matches('/');
        let base = base.strip_suffix("/extract").unwrap_or(base);
        format!("{base}/health")
    }
}

/// HTTP extraction service settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub max_upload_size: usize,
    /// When absent, `/extract` is not mounted.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub ocr_model: String,
    pub ocr_max_side: u32,
    pub vision_max_side: u32,
    pub ocr_timeout: Duration,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);
        Ok(Self {
            bind_addr: env.parse("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?,
            max_upload_size: env.parse("MAX_UPLOAD_SIZE", 8 * 1024 * 1024)?,
            openai_api_key: env.optional("OPENAI_API_KEY"),
            openai_model: env.string("OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: env.string("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            ocr_model: env.string("OCR_MODEL", "swe+eng"),
            ocr_max_side: env.parse("OCR_MAX_SIDE", 1400)?,
            vision_max_side: env.parse("VISION_MAX_SIDE", 1600)?,
            ocr_timeout: Duration::from_secs(env.parse("OCR_TIMEOUT_SECS", 60u64)?),
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_upload_size: 8 * 1024 * 1024,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".into(),
            openai_base_url: "https://api.openai.com/v1".into(),
            ocr_model: "swe+eng".into(),
            ocr_max_side: 1400,
            vision_max_side: 1600,
            ocr_timeout: Duration::from_secs(60),
        }
    }
}

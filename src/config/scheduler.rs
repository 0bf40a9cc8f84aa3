//! Scheduler configuration structures.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Environment variable holding [`SchedulerConfig::max_requests`].
pub const ENV_MAX_REQUESTS: &str = "ADMISSION_MAX_REQUESTS";
/// Environment variable holding [`SchedulerConfig::interval_ms`].
pub const ENV_INTERVAL_MS: &str = "ADMISSION_INTERVAL_MS";
/// Environment variable holding [`SchedulerConfig::concurrency`].
pub const ENV_CONCURRENCY: &str = "ADMISSION_CONCURRENCY";
/// Environment variable holding [`SchedulerConfig::retry_limit`].
pub const ENV_RETRY_LIMIT: &str = "ADMISSION_RETRY_LIMIT";

/// Limits for a single scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Admissions allowed per window.
    pub max_requests: u32,
    /// Window length in milliseconds; also the reset period.
    pub interval_ms: u64,
    /// Maximum simultaneously executing tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Retries after the first failed attempt before a task fails for good.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
}

const fn default_concurrency() -> u32 {
    SchedulerConfig::DEFAULT_CONCURRENCY
}

const fn default_retry_limit() -> u32 {
    SchedulerConfig::DEFAULT_RETRY_LIMIT
}

impl SchedulerConfig {
    /// Concurrency used when none is configured.
    pub const DEFAULT_CONCURRENCY: u32 = 1;
    /// Retry limit used when none is configured.
    pub const DEFAULT_RETRY_LIMIT: u32 = 3;

    /// Config with default concurrency and retry limit.
    #[must_use]
    pub fn new(max_requests: u32, interval: Duration) -> Self {
        Self {
            max_requests,
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            concurrency: Self::DEFAULT_CONCURRENCY,
            retry_limit: Self::DEFAULT_RETRY_LIMIT,
        }
    }

    /// Set the concurrency limit.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the retry limit.
    #[must_use]
    pub const fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Window length as a `Duration`.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first zero-valued limit found.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_requests == 0 {
            return Err("max_requests must be greater than 0".into());
        }
        if self.interval_ms == 0 {
            return Err("interval_ms must be greater than 0".into());
        }
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `ADMISSION_*` environment variables, reading a
    /// `.env` file first if one exists.
    ///
    /// # Errors
    ///
    /// Fails when a required variable is missing, a value is not a number, or
    /// the result does not validate.
    pub fn from_env() -> AppResult<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(err).context("failed to load .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup using the
    /// `ADMISSION_*` variable names.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env), minus the `.env` handling.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> AppResult<String> {
            lookup(key).with_context(|| format!("{key} is not set"))
        };

        let max_requests = parse_var(ENV_MAX_REQUESTS, &required(ENV_MAX_REQUESTS)?)?;
        let interval_ms = parse_var(ENV_INTERVAL_MS, &required(ENV_INTERVAL_MS)?)?;
        let concurrency = lookup(ENV_CONCURRENCY)
            .map(|raw| parse_var(ENV_CONCURRENCY, &raw))
            .transpose()?
            .unwrap_or(Self::DEFAULT_CONCURRENCY);
        let retry_limit = lookup(ENV_RETRY_LIMIT)
            .map(|raw| parse_var(ENV_RETRY_LIMIT, &raw))
            .transpose()?
            .unwrap_or(Self::DEFAULT_RETRY_LIMIT);

        let cfg = Self {
            max_requests,
            interval_ms,
            concurrency,
            retry_limit,
        };
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

fn parse_var<N>(key: &str, raw: &str) -> AppResult<N>
where
    N: std::str::FromStr,
    N::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{key}={raw:?} is not a valid number"))
}

/// Named scheduler profiles, e.g. one per upstream API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSetConfig {
    /// Map of scheduler name to configuration.
    pub schedulers: HashMap<String, SchedulerConfig>,
}

impl SchedulerSetConfig {
    /// Validate all schedulers and ensure at least one exists.
    ///
    /// # Errors
    ///
    /// Names the first invalid entry.
    pub fn validate(&self) -> Result<(), String> {
        if self.schedulers.is_empty() {
            return Err("at least one scheduler must be defined".into());
        }
        for (name, scheduler) in &self.schedulers {
            scheduler
                .validate()
                .map_err(|e| format!("scheduler `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse a scheduler set from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

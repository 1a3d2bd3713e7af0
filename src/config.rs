//! Run configuration: worker pool sizes, retry policy and browser timeouts.

use crate::executor::{RetryPolicy, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_RETRIES};
use std::time::Duration;
use thiserror::Error;

/// Invalid request or configuration, detected before any scraping starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Keyword cannot be empty")]
    EmptyKeyword,

    #[error("At least one location is required")]
    NoLocations,

    #[error("Location cannot be empty")]
    EmptyLocation,

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: i64 },
}

/// Converts a signed user-supplied value into a strictly positive one.
pub fn require_positive(field: &'static str, value: i64) -> Result<u64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(value as u64)
}

/// Timeouts and pacing used by browser-backed listing sources.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserSettings {
    /// Navigation timeout for search result pages
    pub page_load_timeout: Duration,

    /// Navigation timeout for detail pages
    pub detail_load_timeout: Duration,

    /// Maximum wait for an expected element to appear
    pub element_wait_timeout: Duration,

    /// Consecutive probes without new results before enumeration stops
    pub max_stale_probes: u32,

    /// Pause after each scroll so lazily loaded cards can render
    pub probe_delay: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            page_load_timeout: Duration::from_secs(60),
            detail_load_timeout: Duration::from_secs(30),
            element_wait_timeout: Duration::from_secs(10),
            max_stale_probes: 5,
            probe_delay: Duration::from_secs(2),
        }
    }
}

/// Configuration for a [`HarvestPipeline`](crate::harvest::HarvestPipeline) run.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestConfig {
    /// Concurrent (platform, location) tasks
    pub platform_workers: usize,

    /// Concurrent detail fetches inside one task
    pub detail_workers: usize,

    /// Extra passes over failed detail fetches
    pub max_retries: u32,

    /// Backoff between retry passes
    pub retry_policy: RetryPolicy,

    /// Upper bound for one whole task; a task that exceeds it yields nothing
    pub task_timeout: Duration,

    pub browser: BrowserSettings,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            platform_workers: 3,
            detail_workers: DEFAULT_MAX_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_policy: RetryPolicy::default(),
            task_timeout: Duration::from_secs(15 * 60),
            browser: BrowserSettings::default(),
        }
    }
}

impl HarvestConfig {
    pub fn with_platform_workers(mut self, workers: usize) -> Self {
        self.platform_workers = workers;
        self
    }

    pub fn with_detail_workers(mut self, workers: usize) -> Self {
        self.detail_workers = workers;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_browser(mut self, browser: BrowserSettings) -> Self {
        self.browser = browser;
        self
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositive`] when a worker pool would be empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.platform_workers == 0 {
            return Err(ConfigError::NonPositive {
                field: "platform_workers",
                value: 0,
            });
        }
        if self.detail_workers == 0 {
            return Err(ConfigError::NonPositive {
                field: "detail_workers",
                value: 0,
            });
        }
        Ok(())
    }
}

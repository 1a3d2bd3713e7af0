use futures::FutureExt;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

/// Default number of in-flight workers when none is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Default number of extra passes over failed items.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Upper bound on a single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Exponential backoff applied between retry passes.
///
/// The delay before retry pass `n` (0-indexed) is
/// `base_delay * backoff_factor^n`, capped at [`MAX_BACKOFF`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            base_delay,
            backoff_factor,
        }
    }

    /// Policy without any delay between passes.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, 1.0)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.backoff_factor.max(0.0).powi(exponent);
        Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor)
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), 2.0)
    }
}

/// Everything a [`RetryingExecutor::run`] call produced.
#[derive(Debug)]
pub struct BatchOutcome<I, T> {
    /// Successful results in completion order.
    pub results: Vec<T>,

    /// Items that were still failing once the retry budget ran out.
    pub abandoned: Vec<I>,

    /// Number of passes executed (1 + retry passes actually run).
    pub passes: u32,
}

/// Bounded-concurrency map with retry over failed items.
///
/// Each item is handed to the worker exactly once per pass. A worker reports
/// one of three outcomes:
/// - `Ok(Some(value))`: collected into the results
/// - `Ok(None)`: intentionally nothing to collect; never retried
/// - `Err(_)` (or a panic): logged and scheduled for the next pass
///
/// Passes repeat over exactly the failed set until it is empty or the retry
/// budget is spent. Results arrive in completion order.
pub struct RetryingExecutor {
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    max_retries: u32,
    policy: RetryPolicy,
    description: String,
}

impl RetryingExecutor {
    pub fn new(max_concurrency: usize, max_retries: u32) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            max_retries,
            policy: RetryPolicy::default(),
            description: "items".to_string(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the noun used in progress logs (e.g., "LinkedIn jobs").
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[instrument(
        skip(self, items, worker),
        fields(description = %self.description, total = items.len())
    )]
    pub async fn run<I, T, E, F, Fut>(&self, items: Vec<I>, worker: F) -> BatchOutcome<I, T>
    where
        I: Clone + Debug + Send + Sync + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    {
        let mut results = Vec::new();
        if items.is_empty() {
            return BatchOutcome {
                results,
                abandoned: Vec::new(),
                passes: 0,
            };
        }

        let worker = Arc::new(worker);
        let mut pending = items;
        let mut retries_left = self.max_retries;
        let mut passes = 0;

        let abandoned = loop {
            passes += 1;
            let failed = self.run_pass(&pending, &worker, &mut results).await;

            if failed.is_empty() {
                break Vec::new();
            }
            if retries_left == 0 {
                warn!(
                    failed = failed.len(),
                    "Retry budget exhausted for {}", self.description
                );
                break failed;
            }

            let delay = self.policy.delay_for(self.max_retries - retries_left);
            retries_left -= 1;
            info!(
                failed = failed.len(),
                retries_left,
                delay_ms = delay.as_millis() as u64,
                "Retrying failed {}", self.description
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            pending = failed;
        };

        info!(
            successful = results.len(),
            abandoned = abandoned.len(),
            passes,
            "Completed processing {}", self.description
        );

        BatchOutcome {
            results,
            abandoned,
            passes,
        }
    }

    /// Runs one pass over `items` and returns the ones that failed.
    async fn run_pass<I, T, E, F, Fut>(
        &self,
        items: &[I],
        worker: &Arc<F>,
        results: &mut Vec<T>,
    ) -> Vec<I>
    where
        I: Clone + Debug + Send + Sync + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    {
        let total = items.len();
        let mut set = JoinSet::new();

        for (index, item) in items.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&self.semaphore);
            let worker = Arc::clone(worker);
            set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (index, Err(format!("Semaphore error: {}", e))),
                };
                let attempt = AssertUnwindSafe(async move { worker(item).await })
                    .catch_unwind()
                    .await;
                let outcome = match attempt {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("worker panicked".to_string()),
                };
                (index, outcome)
            });
        }

        let mut failed = Vec::new();
        let mut reported = vec![false; total];
        let mut completed = 0;
        while let Some(joined) = set.join_next().await {
            completed += 1;
            match joined {
                Ok((index, outcome)) => {
                    reported[index] = true;
                    match outcome {
                        Ok(Some(value)) => {
                            results.push(value);
                            info!("Processed {}/{} {}", completed, total, self.description);
                        }
                        Ok(None) => {
                            debug!("No result for {} {}/{}", self.description, completed, total);
                        }
                        Err(message) => {
                            let item = &items[index];
                            error!(
                                item = ?item,
                                error = %message,
                                "Error processing {}", self.description
                            );
                            failed.push(item.clone());
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Worker task for {} was lost", self.description);
                }
            }
        }

        // A lost worker never reported its index; treat its item as failed.
        failed.extend(unreported(items, &reported));
        failed
    }
}

/// Items whose worker never reported back.
fn unreported<I: Clone>(items: &[I], reported: &[bool]) -> Vec<I> {
    items
        .iter()
        .zip(reported)
        .filter(|(_, done)| !**done)
        .map(|(item, _)| item.clone())
        .collect()
}

impl Default for RetryingExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_RETRIES)
    }
}

//! Concurrent harvest orchestration.
//!
//! [`HarvestPipeline`] expands a [`HarvestRequest`] into one [`ScrapeTask`]
//! per (platform, location) pair and runs them on a bounded worker pool.
//! Inside a task, detail pages are fetched through a [`RetryingExecutor`].
//! Results flow back to a single consumer that owns URL deduplication, so no
//! lock is needed around the seen set.
//!
//! Failures never cross task boundaries: an unknown platform, a failed
//! enumeration, a panic or a timeout turn that task into a zero-record
//! outcome while the rest of the run continues.

use futures::FutureExt;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use crate::config::{ConfigError, HarvestConfig};
use crate::executor::RetryingExecutor;
use crate::model::{JobRecord, ListingReference, ScrapeTask};
use crate::registry::SourceRegistry;

pub const DEFAULT_LIMIT: usize = 100;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

// ============================================================================
// Request
// ============================================================================

/// What to search for and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRequest {
    pub keyword: String,
    pub locations: Vec<String>,

    /// Platform ids; empty means every registered platform
    pub platforms: Vec<String>,

    /// Maximum listing references per task
    pub limit: usize,

    pub lookback_days: u32,
}

impl HarvestRequest {
    pub fn new(keyword: impl Into<String>, locations: Vec<String>) -> Self {
        Self {
            keyword: keyword.into(),
            locations,
            platforms: Vec::new(),
            limit: DEFAULT_LIMIT,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    pub fn with_platforms(mut self, platforms: Vec<String>) -> Self {
        self.platforms = platforms;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keyword.trim().is_empty() {
            return Err(ConfigError::EmptyKeyword);
        }
        if self.locations.is_empty() {
            return Err(ConfigError::NoLocations);
        }
        if self.locations.iter().any(|l| l.trim().is_empty()) {
            return Err(ConfigError::EmptyLocation);
        }
        if self.limit == 0 {
            return Err(ConfigError::NonPositive {
                field: "limit",
                value: 0,
            });
        }
        if self.lookback_days == 0 {
            return Err(ConfigError::NonPositive {
                field: "days",
                value: 0,
            });
        }
        Ok(())
    }

    /// Platform-major cross product of `platforms` and the requested locations.
    pub fn tasks(&self, platforms: &[String]) -> Vec<ScrapeTask> {
        platforms
            .iter()
            .flat_map(|platform| {
                self.locations.iter().map(move |location| ScrapeTask {
                    platform: platform.trim().to_lowercase(),
                    keyword: self.keyword.trim().to_string(),
                    location: location.trim().to_string(),
                    limit: self.limit,
                    lookback_days: self.lookback_days,
                })
            })
            .collect()
    }
}

// ============================================================================
// Report Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Failed(String),
    TimedOut,
}

/// Per-task accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub platform: String,
    pub location: String,
    pub status: TaskStatus,

    /// Listing references enumerated
    pub references: usize,

    /// Records returned by the task before deduplication
    pub found: usize,

    /// Records kept after deduplication
    pub unique: usize,

    /// Records dropped because their URL was already seen
    pub duplicates: usize,

    /// References still failing after the retry budget
    pub abandoned: usize,
}

impl TaskOutcome {
    fn missing(task: &ScrapeTask) -> Self {
        Self {
            platform: task.platform.clone(),
            location: task.location.clone(),
            status: TaskStatus::Failed("task did not report back".into()),
            references: 0,
            found: 0,
            unique: 0,
            duplicates: 0,
            abandoned: 0,
        }
    }
}

/// Statistics about a harvest run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct HarvestStats {
    /// Total time spent on the run (milliseconds)
    pub total_duration_ms: u64,

    /// Outcomes in task order
    pub tasks: Vec<TaskOutcome>,

    /// Unique records per requested platform id; failed platforms report zero
    pub records_per_platform: BTreeMap<String, usize>,

    pub duplicates_removed: usize,
    pub records_with_posted_date: usize,
}

/// Deduplicated records plus run statistics.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// Sorted by platform, then URL
    pub records: Vec<JobRecord>,
    pub stats: HarvestStats,
}

impl HarvestReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn log_summary(&self) {
        info!(
            total = self.records.len(),
            duplicates_removed = self.stats.duplicates_removed,
            with_posted_date = self.stats.records_with_posted_date,
            duration_ms = self.stats.total_duration_ms,
            "Harvest finished"
        );
        for (platform, count) in &self.stats.records_per_platform {
            info!(platform = %platform, count, "Jobs per platform");
        }
        for task in &self.stats.tasks {
            match &task.status {
                TaskStatus::Completed => {}
                TaskStatus::Failed(reason) => {
                    warn!(
                        platform = %task.platform,
                        location = %task.location,
                        reason = %reason,
                        "Task failed"
                    )
                }
                TaskStatus::TimedOut => {
                    warn!(platform = %task.platform, location = %task.location, "Task timed out")
                }
            }
        }
        if self.records.is_empty() {
            warn!("No jobs found. Try a different keyword, more locations or a longer lookback");
        }
    }
}

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that abort a run before any task starts.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ConfigError),
}

// ============================================================================
// Deduplication
// ============================================================================

/// Canonical URLs already emitted during one run.
#[derive(Debug, Default)]
pub struct SeenUrls {
    urls: HashSet<String>,
}

impl SeenUrls {
    /// Returns `true` if `url` was not seen before.
    pub fn insert(&mut self, url: &str) -> bool {
        if self.urls.contains(url) {
            return false;
        }
        self.urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

// ============================================================================
// Task Execution
// ============================================================================

/// What a single task hands back to the consumer.
#[derive(Debug)]
struct TaskHarvest {
    records: Vec<JobRecord>,
    references: usize,
    abandoned: usize,
    status: TaskStatus,
}

impl TaskHarvest {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            references: 0,
            abandoned: 0,
            status: TaskStatus::Failed(reason.into()),
        }
    }

    fn timed_out() -> Self {
        Self {
            status: TaskStatus::TimedOut,
            ..Self::failed("")
        }
    }
}

#[instrument(skip_all, fields(task = %task.label()))]
async fn harvest_task(
    registry: &SourceRegistry,
    task: &ScrapeTask,
    config: &HarvestConfig,
) -> TaskHarvest {
    let source = match registry.create(&task.platform) {
        Ok(source) => source,
        Err(e) => {
            error!(error = %e, "Cannot start task");
            return TaskHarvest::failed(e.to_string());
        }
    };

    info!(platform = source.platform(), location = %task.location, "Starting scraper");
    let references = match source.list_references(task).await {
        Ok(references) => references,
        Err(e) => {
            error!(error = %e, "Listing enumeration failed");
            return TaskHarvest::failed(e.to_string());
        }
    };
    let reference_count = references.len();
    info!(count = reference_count, "Collected job links, visiting each for details");

    let executor = RetryingExecutor::new(config.detail_workers, config.max_retries)
        .with_policy(config.retry_policy)
        .with_description(format!("{} jobs", source.platform()));

    let shared_task = Arc::new(task.clone());
    let worker_source = Arc::clone(&source);
    let outcome = executor
        .run(references, move |reference: ListingReference| {
            let source = Arc::clone(&worker_source);
            let task = Arc::clone(&shared_task);
            async move { source.fetch_detail(&task, &reference).await }
        })
        .await;

    TaskHarvest {
        records: outcome.results,
        references: reference_count,
        abandoned: outcome.abandoned.len(),
        status: TaskStatus::Completed,
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs harvest requests against a [`SourceRegistry`].
///
/// # Example
///
/// ```ignore
/// let registry = SourceRegistry::with_browser(driver, BrowserSettings::default());
/// let pipeline = HarvestPipeline::new(registry)
///     .with_config(HarvestConfig::default().with_platform_workers(2));
///
/// let request = HarvestRequest::new("sre", vec!["Berlin".into()]);
/// let report = pipeline.execute(&request).await?;
/// export_records(&report.records, Path::new("jobs"))?;
/// ```
pub struct HarvestPipeline {
    registry: Arc<SourceRegistry>,
    config: HarvestConfig,
}

impl HarvestPipeline {
    pub fn new(registry: SourceRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            config: HarvestConfig::default(),
        }
    }

    pub fn with_config(mut self, config: HarvestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Runs every (platform, location) task and merges their records.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] when the request or the
    /// configuration is invalid. Task-level failures are reported in
    /// [`HarvestStats::tasks`] instead.
    pub async fn execute(&self, request: &HarvestRequest) -> Result<HarvestReport, PipelineError> {
        request.validate()?;
        self.config.validate()?;

        let platforms = if request.platforms.is_empty() {
            self.registry.platforms()
        } else {
            request.platforms.clone()
        };
        let tasks = request.tasks(&platforms);
        let start = Instant::now();

        info!(
            keyword = %request.keyword,
            tasks = tasks.len(),
            workers = self.config.platform_workers,
            "Starting harvest"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.platform_workers));
        let mut set = JoinSet::new();

        for (index, task) in tasks.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let registry = Arc::clone(&self.registry);
            let config = self.config.clone();

            set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, TaskHarvest::failed("worker pool closed"));
                };

                let run = AssertUnwindSafe(harvest_task(&registry, &task, &config)).catch_unwind();
                let harvest = match timeout(config.task_timeout, run).await {
                    Ok(Ok(harvest)) => harvest,
                    Ok(Err(_)) => {
                        error!(task = %task.label(), "Task panicked");
                        TaskHarvest::failed("task panicked")
                    }
                    Err(_) => {
                        warn!(
                            task = %task.label(),
                            timeout_secs = config.task_timeout.as_secs(),
                            "Task timed out"
                        );
                        TaskHarvest::timed_out()
                    }
                };
                (index, harvest)
            });
        }

        // Single consumer: the only place records are merged and deduplicated.
        // Finished tasks are parked by index and merged in task order, so the
        // surviving copy of a shared URL does not depend on scheduling.
        let mut finished: Vec<Option<TaskHarvest>> = std::iter::repeat_with(|| None)
            .take(tasks.len())
            .collect();

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, harvest)) => {
                    info!(
                        task = %tasks[index].label(),
                        found = harvest.records.len(),
                        "Task finished"
                    );
                    finished[index] = Some(harvest);
                }
                Err(e) => error!(error = %e, "Task join failed"),
            }
        }

        let mut seen = SeenUrls::default();
        let mut records = Vec::new();
        let mut outcomes = Vec::with_capacity(tasks.len());

        for (task, harvest) in tasks.iter().zip(finished) {
            let Some(harvest) = harvest else {
                outcomes.push(TaskOutcome::missing(task));
                continue;
            };

            let found = harvest.records.len();
            let before = records.len();
            records.extend(
                harvest
                    .records
                    .into_iter()
                    .filter(|record| seen.insert(&record.url)),
            );
            let unique = records.len() - before;
            let duplicates = found - unique;

            if duplicates > 0 {
                info!(task = %task.label(), duplicates, "Removed duplicate listings");
            }

            outcomes.push(TaskOutcome {
                platform: task.platform.clone(),
                location: task.location.clone(),
                status: harvest.status,
                references: harvest.references,
                found,
                unique,
                duplicates,
                abandoned: harvest.abandoned,
            });
        }

        records.sort_by(|a, b| (&a.platform, &a.url).cmp(&(&b.platform, &b.url)));

        let mut records_per_platform = BTreeMap::new();
        for outcome in &outcomes {
            *records_per_platform.entry(outcome.platform.clone()).or_insert(0) += outcome.unique;
        }

        let stats = HarvestStats {
            total_duration_ms: start.elapsed().as_millis() as u64,
            duplicates_removed: outcomes.iter().map(|o| o.duplicates).sum(),
            records_with_posted_date: records.iter().filter(|r| r.posted_date.is_some()).count(),
            records_per_platform,
            tasks: outcomes,
        };

        Ok(HarvestReport { records, stats })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RetryPolicy;
    use crate::traits::{ListingSource, SourceError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves canned references per location; every detail fetch succeeds
    /// after `flaky_failures` transient errors per URL.
    struct ScriptedSource {
        name: &'static str,
        references: HashMap<String, Vec<ListingReference>>,
        flaky_failures: usize,
        attempts: Mutex<HashMap<String, usize>>,
        fetches: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        delay: Duration,
        location_delays: HashMap<String, Duration>,
    }

    impl ScriptedSource {
        fn new(name: &'static str, per_location: &[(&str, &[&str])]) -> Self {
            Self {
                name,
                references: per_location
                    .iter()
                    .map(|(location, urls)| {
                        let refs = urls
                            .iter()
                            .map(|url| ListingReference::new(*url, "SRE"))
                            .collect();
                        (location.to_string(), refs)
                    })
                    .collect(),
                flaky_failures: 0,
                attempts: Mutex::new(HashMap::new()),
                fetches: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
                delay: Duration::ZERO,
                location_delays: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl ListingSource for ScriptedSource {
        fn platform(&self) -> &str {
            self.name
        }

        async fn list_references(
            &self,
            task: &ScrapeTask,
        ) -> Result<Vec<ListingReference>, SourceError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            let delay = self
                .location_delays
                .get(&task.location)
                .copied()
                .unwrap_or(self.delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.references
                .get(&task.location)
                .cloned()
                .ok_or_else(|| SourceError::Parse(format!("no results page for {}", task.location)))
        }

        async fn fetch_detail(
            &self,
            task: &ScrapeTask,
            reference: &ListingReference,
        ) -> Result<Option<JobRecord>, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let count = attempts.entry(reference.url.clone()).or_insert(0);
                *count += 1;
                *count
            };
            if attempt <= self.flaky_failures {
                return Err(SourceError::DetailNotLoaded(reference.url.clone()));
            }
            Ok(Some(JobRecord {
                title: reference.title.clone(),
                company: "Acme".into(),
                location: task.location.clone(),
                url: reference.url.clone(),
                platform: self.name.to_string(),
                description: None,
                key_responsibilities: None,
                skills: None,
                years_of_experience: None,
                posted_date: Some("2025-11-20".into()),
                email: None,
            }))
        }
    }

    fn config() -> HarvestConfig {
        HarvestConfig::default().with_retry_policy(RetryPolicy::immediate())
    }

    fn pipeline_with(sources: Vec<(&str, Arc<ScriptedSource>)>) -> HarvestPipeline {
        let mut registry = SourceRegistry::new();
        for (id, source) in sources {
            registry.register(id, move || Arc::clone(&source) as Arc<dyn ListingSource>);
        }
        HarvestPipeline::new(registry).with_config(config())
    }

    fn request(locations: &[&str]) -> HarvestRequest {
        HarvestRequest::new("sre", locations.iter().map(|l| l.to_string()).collect())
    }

    #[test]
    fn test_request_validation() {
        assert_eq!(
            HarvestRequest::new("  ", vec!["Berlin".into()]).validate(),
            Err(ConfigError::EmptyKeyword)
        );
        assert_eq!(request(&[]).validate(), Err(ConfigError::NoLocations));
        assert_eq!(request(&["Berlin", " "]).validate(), Err(ConfigError::EmptyLocation));
        assert!(request(&["Berlin"]).with_limit(0).validate().is_err());
        assert!(request(&["Berlin"]).with_lookback_days(0).validate().is_err());
        assert!(request(&["Berlin"]).validate().is_ok());
    }

    #[test]
    fn test_tasks_are_platform_major() {
        let tasks = request(&["Berlin", "Pune"]).tasks(&["LinkedIn".into(), "naukri".into()]);
        let labels: Vec<_> = tasks.iter().map(ScrapeTask::label).collect();
        assert_eq!(
            labels,
            vec!["linkedin/Berlin", "linkedin/Pune", "naukri/Berlin", "naukri/Pune"]
        );
    }

    #[test]
    fn test_seen_urls() {
        let mut seen = SeenUrls::default();
        assert!(seen.insert("https://a.test/1"));
        assert!(!seen.insert("https://a.test/1"));
        assert!(seen.contains("https://a.test/1"));
        assert_eq!(seen.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_across_locations_are_removed() {
        let source = Arc::new(ScriptedSource::new(
            "Alpha",
            &[
                ("Berlin", &["https://a.test/1", "https://a.test/2"]),
                ("Remote", &["https://a.test/2", "https://a.test/3"]),
            ],
        ));
        let pipeline = pipeline_with(vec![("alpha", source)]);

        let report = pipeline.execute(&request(&["Berlin", "Remote"])).await.unwrap();

        let urls: Vec<_> = report.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test/1", "https://a.test/2", "https://a.test/3"]);
        assert_eq!(report.stats.duplicates_removed, 1);
        assert_eq!(report.stats.records_per_platform.get("alpha"), Some(&3));
        assert_eq!(report.stats.records_with_posted_date, 3);
        let found: usize = report.stats.tasks.iter().map(|t| t.found).sum();
        assert_eq!(found, 4);
    }

    #[tokio::test]
    async fn test_failed_enumeration_only_fails_its_task() {
        let source = Arc::new(ScriptedSource::new("Alpha", &[("Berlin", &["https://a.test/1"])]));
        let pipeline = pipeline_with(vec![("alpha", source)]);

        let report = pipeline.execute(&request(&["Berlin", "Atlantis"])).await.unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.stats.tasks[0].status, TaskStatus::Completed);
        assert!(matches!(report.stats.tasks[1].status, TaskStatus::Failed(_)));
        assert_eq!(report.stats.tasks[1].unique, 0);
    }

    #[tokio::test]
    async fn test_unknown_platform_reports_zero() {
        let source = Arc::new(ScriptedSource::new("Alpha", &[("Berlin", &["https://a.test/1"])]));
        let pipeline = pipeline_with(vec![("alpha", source)]);

        let report = pipeline
            .execute(&request(&["Berlin"]).with_platforms(vec!["alpha".into(), "monster".into()]))
            .await
            .unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.stats.records_per_platform.get("monster"), Some(&0));
        match &report.stats.tasks[1].status {
            TaskStatus::Failed(reason) => assert!(reason.contains("Unknown platform: monster")),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transient_detail_failures_are_retried() {
        let mut source = ScriptedSource::new(
            "Alpha",
            &[("Berlin", &["https://a.test/1", "https://a.test/2"])],
        );
        source.flaky_failures = 2;
        let source = Arc::new(source);
        let pipeline = pipeline_with(vec![("alpha", Arc::clone(&source))]);

        let report = pipeline.execute(&request(&["Berlin"])).await.unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.stats.tasks[0].abandoned, 0);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_abandons_references() {
        let mut source = ScriptedSource::new("Alpha", &[("Berlin", &["https://a.test/1"])]);
        source.flaky_failures = usize::MAX;
        let source = Arc::new(source);
        let mut registry = SourceRegistry::new();
        let shared = Arc::clone(&source);
        registry.register("alpha", move || Arc::clone(&shared) as Arc<dyn ListingSource>);
        let pipeline = HarvestPipeline::new(registry).with_config(config().with_max_retries(1));

        let report = pipeline.execute(&request(&["Berlin"])).await.unwrap();

        assert!(report.is_empty());
        assert_eq!(report.stats.tasks[0].abandoned, 1);
        assert_eq!(report.stats.tasks[0].status, TaskStatus::Completed);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_task_timeout_yields_empty_outcome() {
        let mut slow = ScriptedSource::new("Slow", &[("Berlin", &["https://slow.test/1"])]);
        slow.delay = Duration::from_secs(5);
        let fast = ScriptedSource::new("Fast", &[("Berlin", &["https://fast.test/1"])]);

        let mut registry = SourceRegistry::new();
        let slow = Arc::new(slow);
        let fast = Arc::new(fast);
        registry.register("slow", move || Arc::clone(&slow) as Arc<dyn ListingSource>);
        registry.register("fast", move || Arc::clone(&fast) as Arc<dyn ListingSource>);
        let pipeline = HarvestPipeline::new(registry)
            .with_config(config().with_task_timeout(Duration::from_millis(100)));

        let report = pipeline.execute(&request(&["Berlin"])).await.unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].platform, "Fast");
        let slow_task = report.stats.tasks.iter().find(|t| t.platform == "slow").unwrap();
        assert_eq!(slow_task.status, TaskStatus::TimedOut);
        assert_eq!(report.stats.records_per_platform.get("slow"), Some(&0));
    }

    #[tokio::test]
    async fn test_records_sorted_by_platform_then_url() {
        let beta = Arc::new(ScriptedSource::new(
            "Beta",
            &[("Berlin", &["https://b.test/2", "https://b.test/1"])],
        ));
        let alpha = Arc::new(ScriptedSource::new("Alpha", &[("Berlin", &["https://a.test/9"])]));
        let pipeline = pipeline_with(vec![("beta", beta), ("alpha", alpha)]);

        let report = pipeline.execute(&request(&["Berlin"])).await.unwrap();

        let keys: Vec<_> = report
            .records
            .iter()
            .map(|r| (r.platform.as_str(), r.url.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("Alpha", "https://a.test/9"),
                ("Beta", "https://b.test/1"),
                ("Beta", "https://b.test/2"),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_platform_workers_bound_concurrent_tasks() {
        let locations = ["Berlin", "Lisbon", "Madrid", "Oslo", "Paris", "Rome"];
        const URLS: &[&str] = &["https://a.test/1"];
        let per_location: Vec<(&str, &[&str])> =
            locations.iter().map(|location| (*location, URLS)).collect();
        let mut source = ScriptedSource::new("Alpha", &per_location);
        source.delay = Duration::from_millis(30);
        let source = Arc::new(source);

        let mut registry = SourceRegistry::new();
        let shared = Arc::clone(&source);
        registry.register("alpha", move || Arc::clone(&shared) as Arc<dyn ListingSource>);
        let pipeline =
            HarvestPipeline::new(registry).with_config(config().with_platform_workers(2));

        let report = pipeline.execute(&request(&locations)).await.unwrap();

        assert_eq!(report.stats.tasks.len(), 6);
        assert!(report
            .stats
            .tasks
            .iter()
            .all(|t| t.status == TaskStatus::Completed));
        let peak = source.peak_in_flight.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak in-flight tasks was {}", peak);
    }

    #[tokio::test]
    async fn test_earlier_task_wins_shared_url() {
        let mut source = ScriptedSource::new(
            "Alpha",
            &[
                ("Berlin", &["https://a.test/shared"]),
                ("Remote", &["https://a.test/shared"]),
            ],
        );
        // Berlin lists slowly, so Remote finishes first.
        source
            .location_delays
            .insert("Berlin".into(), Duration::from_millis(50));
        let pipeline = pipeline_with(vec![("alpha", Arc::new(source))]);

        let report = pipeline.execute(&request(&["Berlin", "Remote"])).await.unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].location, "Berlin");
        assert_eq!(report.stats.tasks[0].unique, 1);
        assert_eq!(report.stats.tasks[1].duplicates, 1);
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_before_work() {
        let source = Arc::new(ScriptedSource::new("Alpha", &[("Berlin", &["https://a.test/1"])]));
        let pipeline = pipeline_with(vec![("alpha", Arc::clone(&source))]);

        let err = pipeline.execute(&request(&["Berlin"]).with_limit(0)).await.unwrap_err();

        assert!(matches!(err, PipelineError::InvalidRequest(_)));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }
}

use async_trait::async_trait;
use job_harvester::executor::RetryPolicy;
use job_harvester::export::export_records;
use job_harvester::harvest::{HarvestPipeline, HarvestRequest, TaskStatus};
use job_harvester::{
    HarvestConfig, JobRecord, ListingReference, ListingSource, ScrapeTask, SourceError,
    SourceRegistry,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Deterministic board: every location lists the same three postings plus
/// one that is local to the location. Postings whose id ends in 7 are old
/// and get filtered out as `Ok(None)`. Detail pages show no location, so each
/// task fills in its own searched location and shared postings differ per task.
struct FixtureBoard {
    name: &'static str,
    host: &'static str,
}

/// Listing latency per location; earlier locations finish last.
fn listing_delay(location: &str) -> Duration {
    let millis = match location {
        "Berlin" => 40,
        "Lisbon" => 20,
        _ => 0,
    };
    Duration::from_millis(millis)
}

#[async_trait]
impl ListingSource for FixtureBoard {
    fn platform(&self) -> &str {
        self.name
    }

    async fn list_references(
        &self,
        task: &ScrapeTask,
    ) -> Result<Vec<ListingReference>, SourceError> {
        tokio::time::sleep(listing_delay(&task.location)).await;
        let mut references: Vec<_> = [1, 2, 7]
            .iter()
            .map(|id| ListingReference::new(format!("https://{}/jobs/{}", self.host, id), "SRE"))
            .collect();
        references.push(ListingReference::new(
            format!("https://{}/jobs/{}", self.host, task.location.to_lowercase()),
            "Site Reliability Engineer",
        ));
        references.truncate(task.limit);
        Ok(references)
    }

    async fn fetch_detail(
        &self,
        task: &ScrapeTask,
        reference: &ListingReference,
    ) -> Result<Option<JobRecord>, SourceError> {
        if reference.url.ends_with('7') {
            return Ok(None);
        }
        Ok(Some(JobRecord {
            title: reference.title.clone(),
            company: "Initech".into(),
            location: task.location.clone(),
            url: reference.url.clone(),
            platform: self.name.to_string(),
            description: Some("Responsibilities:\nOn-call\nSkills:\nRust".into()),
            key_responsibilities: Some("On-call".into()),
            skills: Some("Rust".into()),
            years_of_experience: None,
            posted_date: None,
            email: Some("jobs@initech.test".into()),
        }))
    }
}

struct BrokenBoard;

#[async_trait]
impl ListingSource for BrokenBoard {
    fn platform(&self) -> &str {
        "Broken"
    }

    async fn list_references(
        &self,
        _task: &ScrapeTask,
    ) -> Result<Vec<ListingReference>, SourceError> {
        Err(SourceError::AuthWall {
            url: "https://broken.test/login".into(),
            title: "Sign in".into(),
        })
    }

    async fn fetch_detail(
        &self,
        _task: &ScrapeTask,
        _reference: &ListingReference,
    ) -> Result<Option<JobRecord>, SourceError> {
        panic!("never reached");
    }
}

fn pipeline() -> HarvestPipeline {
    let mut registry = SourceRegistry::new();
    registry.register("alpha", || {
        Arc::new(FixtureBoard {
            name: "Alpha",
            host: "alpha.test",
        })
    });
    registry.register("beta", || {
        Arc::new(FixtureBoard {
            name: "Beta",
            host: "beta.test",
        })
    });
    registry.register("broken", || Arc::new(BrokenBoard));

    HarvestPipeline::new(registry).with_config(
        HarvestConfig::default()
            .with_platform_workers(2)
            .with_retry_policy(RetryPolicy::immediate()),
    )
}

fn request() -> HarvestRequest {
    HarvestRequest::new("sre", vec!["Berlin".into(), "Lisbon".into(), "Remote".into()])
}

#[tokio::test]
async fn test_full_run_deduplicates_across_tasks() {
    let report = pipeline().execute(&request()).await.unwrap();

    // Per board: jobs/1 and jobs/2 shared by all locations, plus one per location.
    assert_eq!(report.records.len(), 10);
    assert_eq!(report.stats.records_per_platform.get("alpha"), Some(&5));
    assert_eq!(report.stats.records_per_platform.get("beta"), Some(&5));
    assert_eq!(report.stats.records_per_platform.get("broken"), Some(&0));
    // Each board sees jobs/1 and jobs/2 again in two of its three locations.
    assert_eq!(report.stats.duplicates_removed, 8);
    assert_eq!(report.stats.tasks.len(), 9);

    let mut urls: Vec<_> = report.records.iter().map(|r| r.url.clone()).collect();
    urls.dedup();
    assert_eq!(urls.len(), report.records.len());
}

#[tokio::test]
async fn test_failing_platform_does_not_affect_others() {
    let report = pipeline().execute(&request()).await.unwrap();

    let broken: Vec<_> = report
        .stats
        .tasks
        .iter()
        .filter(|t| t.platform == "broken")
        .collect();
    assert_eq!(broken.len(), 3);
    for task in broken {
        match &task.status {
            TaskStatus::Failed(reason) => assert!(reason.contains("login wall")),
            other => panic!("unexpected status {:?}", other),
        }
        assert_eq!(task.unique, 0);
    }
    assert!(report.records.iter().all(|r| r.platform != "Broken"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_repeated_runs_export_identical_files() {
    let dir = TempDir::new().unwrap();

    let first = pipeline().execute(&request()).await.unwrap();
    let first_paths = export_records(&first.records, &dir.path().join("first")).unwrap();
    let expected_csv = std::fs::read(&first_paths.csv).unwrap();
    let expected_json = std::fs::read(&first_paths.json).unwrap();

    for run in 0..10 {
        let report = pipeline().execute(&request()).await.unwrap();
        let base = dir.path().join(format!("run{}", run));
        let paths = export_records(&report.records, &base).unwrap();
        assert_eq!(std::fs::read(&paths.csv).unwrap(), expected_csv);
        assert_eq!(std::fs::read(&paths.json).unwrap(), expected_json);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_first_location_keeps_shared_postings() {
    let report = pipeline().execute(&request()).await.unwrap();

    // Berlin is listed first but finishes last; its copy must still win.
    for host in ["alpha.test", "beta.test"] {
        for id in [1, 2] {
            let url = format!("https://{}/jobs/{}", host, id);
            let record = report.records.iter().find(|r| r.url == url).unwrap();
            assert_eq!(record.location, "Berlin", "{}", url);
        }
    }
    let berlin = report
        .stats
        .tasks
        .iter()
        .find(|t| t.platform == "alpha" && t.location == "Berlin")
        .unwrap();
    assert_eq!((berlin.unique, berlin.duplicates), (3, 0));
}

#[tokio::test]
async fn test_limit_applies_per_task() {
    let report = pipeline()
        .execute(&request().with_platforms(vec!["alpha".into()]).with_limit(1))
        .await
        .unwrap();

    // Only jobs/1 is listed for each location.
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.stats.duplicates_removed, 2);
}

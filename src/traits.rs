use crate::harvest::browser::BrowserError;
use crate::model::{JobRecord, ListingReference, ScrapeTask};
use async_trait::async_trait;
use thiserror::Error;

/// Failures raised while listing or fetching from a platform.
///
/// Every variant is treated as retryable by the executor; an intentional
/// "no record" outcome is `Ok(None)`, not an error.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),
    #[error("Redirected to login wall at {url} (title: {title})")]
    AuthWall { url: String, title: String },
    #[error("Detail page did not load: {0}")]
    DetailNotLoaded(String),
    #[error("Failed to parse page content: {0}")]
    Parse(String),
}

#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Returns the display name of the platform (e.g., "LinkedIn").
    fn platform(&self) -> &str;

    /// Enumerates search results into at most `task.limit` distinct references
    /// whose titles match `task.keyword`.
    async fn list_references(&self, task: &ScrapeTask)
        -> Result<Vec<ListingReference>, SourceError>;

    /// Fetches one detail page. `Ok(None)` means the page was reached but the
    /// listing does not belong in the result set.
    async fn fetch_detail(
        &self,
        task: &ScrapeTask,
        reference: &ListingReference,
    ) -> Result<Option<JobRecord>, SourceError>;
}

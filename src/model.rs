use serde::{Deserialize, Serialize};
use url::Url;

/// A fully fetched and normalized job posting.
///
/// Field order is the column order of the CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String, // as reported by the detail page
    pub url: String,      // canonical, identity key
    pub platform: String,
    pub description: Option<String>,
    pub key_responsibilities: Option<String>,
    pub skills: Option<String>,
    pub years_of_experience: Option<String>,
    pub posted_date: Option<String>, // YYYY-MM-DD
    pub email: Option<String>,
}

/// Handle to a detail page discovered while enumerating search results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingReference {
    pub url: String,
    pub title: String,
}

impl ListingReference {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// One (platform, location) unit of work scheduled by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeTask {
    pub platform: String,
    pub keyword: String,
    pub location: String,
    pub limit: usize,
    pub lookback_days: u32,
}

impl ScrapeTask {
    /// Short `platform/location` label used in logs and stats.
    pub fn label(&self) -> String {
        format!("{}/{}", self.platform, self.location)
    }
}

/// Resolves `href` against `base` and drops the fragment.
///
/// Returns `None` for unparseable links and for non-HTTP schemes such as
/// `javascript:` or `mailto:`.
pub fn canonical_url(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let mut resolved = base.join(href.trim()).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.into())
}

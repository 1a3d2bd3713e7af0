//! Generic browser-backed [`ListingSource`] driven by a [`PlatformProfile`].

use crate::config::BrowserSettings;
use crate::extract::{
    extract_email, infer_company, is_within_days, keyword_matches, location_matches,
    normalize_posted_date, segment_description,
};
use crate::harvest::browser::{
    first_attribute, first_non_empty, first_text, BrowserDriver, BrowserSession, ElementHandle,
};
use crate::model::{canonical_url, JobRecord, ListingReference, ScrapeTask};
use crate::traits::{ListingSource, SourceError};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Placeholder used when a detail page does not expose a field.
pub const UNKNOWN: &str = "Unknown";

/// Site-specific knowledge for one job board: URLs, selectors and scripts.
///
/// Every selector list is an ordered fallback chain; the first selector that
/// yields a non-empty value wins.
#[derive(Clone, Copy)]
pub struct PlatformProfile {
    /// Registry id, lower case
    pub id: &'static str,

    /// Display name written into each record
    pub name: &'static str,

    /// Base for resolving relative links
    pub base_url: &'static str,

    pub search_url: fn(&ScrapeTask) -> Result<Url, url::ParseError>,

    /// Any of these marks the search results as rendered
    pub results_ready: &'static [&'static str],
    pub card: &'static [&'static str],
    pub card_title: &'static [&'static str],
    pub card_link: &'static [&'static str],

    /// Clicks a "see more results" control, if the board has one
    pub load_more_script: Option<&'static str>,

    /// Dismisses cookie banners or sign-up modals
    pub dismiss_overlay_script: Option<&'static str>,

    /// Any of these marks a detail page as rendered
    pub detail_ready: &'static [&'static str],

    /// Expands a collapsed job description
    pub expand_description_script: Option<&'static str>,

    pub title: &'static [&'static str],
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    pub description: &'static [&'static str],
    pub posted: &'static [&'static str],

    /// Page titles or headings containing any of these indicate a login wall
    pub auth_wall_markers: &'static [&'static str],

    /// Guess the company from the description header when no selector matches
    pub infer_company_from_description: bool,
}

impl fmt::Debug for PlatformProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformProfile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PlatformProfile {
    /// Case-insensitive check for login/sign-up interstitials.
    pub fn is_auth_wall(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.auth_wall_markers
            .iter()
            .any(|marker| text.contains(&marker.to_lowercase()))
    }
}

/// A [`ListingSource`] that scrapes a job board through a [`BrowserDriver`].
///
/// Each enumeration and each detail fetch opens its own browser session and
/// closes it before returning.
pub struct BrowserSource {
    profile: PlatformProfile,
    driver: Arc<dyn BrowserDriver>,
    settings: BrowserSettings,
    today: Option<NaiveDate>,
}

impl BrowserSource {
    pub fn new(
        profile: PlatformProfile,
        driver: Arc<dyn BrowserDriver>,
        settings: BrowserSettings,
    ) -> Self {
        Self {
            profile,
            driver,
            settings,
            today: None,
        }
    }

    /// Pins the reference date for relative posting dates.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    async fn run_optional_script(&self, session: &dyn BrowserSession, script: Option<&str>) {
        if let Some(script) = script {
            if let Err(e) = session.evaluate(script).await {
                debug!(platform = self.profile.id, error = %e, "Page script failed");
            }
        }
    }

    async fn collect_references(
        &self,
        session: &dyn BrowserSession,
        task: &ScrapeTask,
    ) -> Result<Vec<ListingReference>, SourceError> {
        let url = (self.profile.search_url)(task)
            .map_err(|e| SourceError::Parse(format!("invalid search URL: {}", e)))?;

        info!(platform = self.profile.name, url = %url, "Navigating to search results");
        session
            .navigate(url.as_str(), self.settings.page_load_timeout)
            .await?;
        self.run_optional_script(session, self.profile.dismiss_overlay_script)
            .await;
        session
            .wait_for_selector(self.profile.results_ready, self.settings.element_wait_timeout)
            .await?;

        let mut references = Vec::new();
        let mut seen = HashSet::new();
        let mut stale_probes = 0;

        while references.len() < task.limit && stale_probes < self.settings.max_stale_probes {
            let added = self
                .probe_cards(session, task, &mut references, &mut seen)
                .await;
            if added == 0 {
                stale_probes += 1;
            } else {
                stale_probes = 0;
                debug!(
                    platform = self.profile.name,
                    collected = references.len(),
                    "Collected more listing references"
                );
            }
            if references.len() >= task.limit || stale_probes >= self.settings.max_stale_probes {
                break;
            }

            if let Err(e) = session.scroll_to_bottom().await {
                debug!(platform = self.profile.id, error = %e, "Scroll failed");
            }
            self.run_optional_script(session, self.profile.load_more_script)
                .await;
            if !self.settings.probe_delay.is_zero() {
                tokio::time::sleep(self.settings.probe_delay).await;
            }
        }

        info!(
            platform = self.profile.name,
            location = %task.location,
            count = references.len(),
            "Collected job links"
        );
        Ok(references)
    }

    /// Reads the currently rendered cards and appends new matching references.
    async fn probe_cards(
        &self,
        session: &dyn BrowserSession,
        task: &ScrapeTask,
        references: &mut Vec<ListingReference>,
        seen: &mut HashSet<String>,
    ) -> usize {
        let before = references.len();
        let cards = first_non_empty(session, self.profile.card).await;

        for card in cards {
            if references.len() >= task.limit {
                break;
            }
            let Some(reference) = self.read_card(card.as_ref()).await else {
                continue;
            };
            if !keyword_matches(&reference.title, &task.keyword) {
                debug!(title = %reference.title, "Skipping card that does not match keyword");
                continue;
            }
            if seen.insert(reference.url.clone()) {
                references.push(reference);
            }
        }

        references.len() - before
    }

    async fn read_card(&self, card: &dyn ElementHandle) -> Option<ListingReference> {
        let title = first_text(card, self.profile.card_title).await?;
        let href = first_attribute(card, self.profile.card_link, "href").await?;
        let url = canonical_url(self.profile.base_url, &href)?;
        Some(ListingReference::new(url, title))
    }

    async fn read_detail(
        &self,
        session: &dyn BrowserSession,
        task: &ScrapeTask,
        reference: &ListingReference,
    ) -> Result<Option<JobRecord>, SourceError> {
        let profile = &self.profile;

        session
            .navigate(&reference.url, self.settings.detail_load_timeout)
            .await?;
        self.run_optional_script(session, profile.dismiss_overlay_script)
            .await;

        let page_title = session.title().await.unwrap_or_default();
        if profile.is_auth_wall(&page_title) {
            return Err(SourceError::AuthWall {
                url: reference.url.clone(),
                title: page_title,
            });
        }

        session
            .wait_for_selector(profile.detail_ready, self.settings.element_wait_timeout)
            .await
            .map_err(|e| SourceError::DetailNotLoaded(format!("{}: {}", reference.url, e)))?;
        self.run_optional_script(session, profile.expand_description_script)
            .await;

        let heading = first_text(session, profile.title).await;
        if let Some(heading) = heading.as_deref().filter(|h| profile.is_auth_wall(h)) {
            return Err(SourceError::AuthWall {
                url: reference.url.clone(),
                title: heading.to_string(),
            });
        }
        let title = heading
            .or_else(|| Some(reference.title.clone()).filter(|t| !t.trim().is_empty()))
            .unwrap_or_else(|| UNKNOWN.to_string());

        let description = first_text(session, profile.description)
            .await
            .unwrap_or_default();

        let company = match first_text(session, profile.company).await {
            Some(company) => company,
            None if profile.infer_company_from_description => {
                infer_company(&description).unwrap_or_else(|| UNKNOWN.to_string())
            }
            None => UNKNOWN.to_string(),
        };

        let reported_location = first_text(session, profile.location).await;
        if let Some(reported) = reported_location.as_deref() {
            if !location_matches(reported, &task.location) {
                info!(
                    platform = profile.name,
                    title = %title,
                    reported,
                    searched = %task.location,
                    "Skipping listing outside searched location"
                );
                return Ok(None);
            }
        }
        let location = reported_location.unwrap_or_else(|| task.location.clone());

        let today = self.today();
        let posted_date = match first_text(session, profile.posted).await {
            Some(text) => normalize_posted_date(&text, today),
            None => None,
        };
        if !is_within_days(posted_date.as_deref(), task.lookback_days, today) {
            info!(
                platform = profile.name,
                title = %title,
                posted = posted_date.as_deref().unwrap_or_default(),
                "Skipping listing older than lookback window"
            );
            return Ok(None);
        }

        let sections = segment_description(&description);
        let email = extract_email(&description);

        info!(platform = profile.name, title = %title, company = %company, "Fetched job");
        Ok(Some(JobRecord {
            title,
            company,
            location,
            url: reference.url.clone(),
            platform: profile.name.to_string(),
            description: Some(description).filter(|d| !d.is_empty()),
            key_responsibilities: sections.responsibilities,
            skills: sections.skills,
            years_of_experience: sections.years_of_experience,
            posted_date,
            email,
        }))
    }
}

async fn close_session(session: Box<dyn BrowserSession>) {
    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close browser session");
    }
}

#[async_trait]
impl ListingSource for BrowserSource {
    fn platform(&self) -> &str {
        self.profile.name
    }

    #[instrument(skip(self, task), fields(platform = self.profile.id, location = %task.location))]
    async fn list_references(
        &self,
        task: &ScrapeTask,
    ) -> Result<Vec<ListingReference>, SourceError> {
        let session = self.driver.open_session().await?;
        let outcome = self.collect_references(session.as_ref(), task).await;
        close_session(session).await;
        outcome
    }

    async fn fetch_detail(
        &self,
        task: &ScrapeTask,
        reference: &ListingReference,
    ) -> Result<Option<JobRecord>, SourceError> {
        let session = self.driver.open_session().await?;
        let outcome = self.read_detail(session.as_ref(), task, reference).await;
        close_session(session).await;
        outcome
    }
}

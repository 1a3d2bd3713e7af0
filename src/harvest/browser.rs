//! Boundary to the browser automation engine.
//!
//! Listing sources only talk to a browser through these traits, so the
//! rendering engine can be swapped (CDP, WebDriver, a test double) without
//! touching scraping logic. Element lookups take ordered fallback lists of
//! selectors; a list where nothing matches is a soft miss (`None`), never an
//! error.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors reported by a browser backend.
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to launch browser session: {0}")]
    Launch(String),

    #[error("Navigation to '{url}' failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Browser session error: {0}")]
    Session(String),
}

/// Anything that can be searched for child elements.
#[async_trait]
pub trait QueryScope: Send + Sync {
    async fn query_all(
        &self,
        selector: &str,
    ) -> Result<Vec<Box<dyn ElementHandle>>, BrowserError>;
}

/// A DOM element handle.
#[async_trait]
pub trait ElementHandle: QueryScope {
    /// Rendered text of the element.
    async fn text(&self) -> Result<String, BrowserError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError>;
}

/// One browser tab, owned by a single listing or detail fetch.
///
/// Callers must invoke [`BrowserSession::close`] on every exit path.
#[async_trait]
pub trait BrowserSession: QueryScope {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Waits until any of `selectors` matches and returns the one that did.
    async fn wait_for_selector(
        &self,
        selectors: &[&str],
        timeout: Duration,
    ) -> Result<String, BrowserError>;

    async fn title(&self) -> Result<String, BrowserError>;

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError>;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

/// Factory for browser sessions.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// Returns all elements matched by the earliest selector with any match.
pub async fn first_non_empty<S>(scope: &S, selectors: &[&str]) -> Vec<Box<dyn ElementHandle>>
where
    S: QueryScope + ?Sized,
{
    for selector in selectors {
        match scope.query_all(selector).await {
            Ok(found) if !found.is_empty() => return found,
            Ok(_) => {}
            Err(e) => debug!(selector, error = %e, "Selector lookup failed"),
        }
    }
    Vec::new()
}

/// Returns the trimmed text of the first fallback selector with non-empty text.
pub async fn first_text<S>(scope: &S, selectors: &[&str]) -> Option<String>
where
    S: QueryScope + ?Sized,
{
    for selector in selectors {
        let Ok(found) = scope.query_all(selector).await else {
            continue;
        };
        for element in found {
            if let Ok(text) = element.text().await {
                let text = text.trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
        }
    }
    None
}

/// Returns the first non-empty value of `attribute` across the fallback selectors.
pub async fn first_attribute<S>(scope: &S, selectors: &[&str], attribute: &str) -> Option<String>
where
    S: QueryScope + ?Sized,
{
    for selector in selectors {
        let Ok(found) = scope.query_all(selector).await else {
            continue;
        };
        for element in found {
            if let Ok(Some(value)) = element.attribute(attribute).await {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

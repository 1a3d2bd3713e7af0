//! Headless Chromium backend over the DevTools protocol.

use crate::harvest::browser::{
    BrowserDriver, BrowserError, BrowserSession, ElementHandle, QueryScope,
};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Launches one shared Chromium process and hands out a fresh tab per session.
pub struct ChromiumDriver {
    browser: Browser,
}

impl ChromiumDriver {
    /// Downloads Chromium on first use (cached on disk) and starts it.
    pub async fn launch(headless: bool) -> Result<Self, BrowserError> {
        let download_path = std::env::temp_dir().join("job-harvester-chromium");
        tokio::fs::create_dir_all(&download_path)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let fetcher = BrowserFetcher::new(
            BrowserFetcherOptions::builder()
                .with_path(&download_path)
                .build()
                .map_err(|e| BrowserError::Launch(e.to_string()))?,
        );
        let installed = fetcher
            .fetch()
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(installed.executable_path)
            .window_size(1920, 1080)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", USER_AGENT));
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        tokio::spawn(async move { while handler.next().await.is_some() {} });

        info!(headless, "Chromium launched");
        Ok(Self { browser })
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Session(e.to_string()))?;
        Ok(Box::new(ChromiumSession {
            page,
            closed: AtomicBool::new(false),
        }))
    }
}

/// One Chromium tab. Dropping an unclosed session closes the tab in the background.
pub struct ChromiumSession {
    page: Page,
    closed: AtomicBool,
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let page = self.page.clone();
            runtime.spawn(async move {
                let _ = page.close().await;
            });
        }
    }
}

fn wrap(elements: Vec<Element>) -> Vec<Box<dyn ElementHandle>> {
    elements
        .into_iter()
        .map(|element| Box::new(ChromiumElement { element }) as Box<dyn ElementHandle>)
        .collect()
}

#[async_trait]
impl QueryScope for ChromiumSession {
    async fn query_all(
        &self,
        selector: &str,
    ) -> Result<Vec<Box<dyn ElementHandle>>, BrowserError> {
        // CDP reports "no node found" as an error; treat it as an empty match.
        match self.page.find_elements(selector).await {
            Ok(elements) => Ok(wrap(elements)),
            Err(e) => {
                debug!(selector, error = %e, "No elements found");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(BrowserError::Timeout {
                what: format!("navigation to {}", url),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn wait_for_selector(
        &self,
        selectors: &[&str],
        timeout: Duration,
    ) -> Result<String, BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            for selector in selectors {
                if let Ok(found) = self.page.find_elements(*selector).await {
                    if !found.is_empty() {
                        return Ok(selector.to_string());
                    }
                }
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    what: selectors.join(", "),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn title(&self) -> Result<String, BrowserError> {
        self.page
            .get_title()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| BrowserError::Session(e.to_string()))
    }

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        self.evaluate(SCROLL_TO_BOTTOM).await.map(|_| ())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| BrowserError::Session(e.to_string()))
    }
}

struct ChromiumElement {
    element: Element,
}

#[async_trait]
impl QueryScope for ChromiumElement {
    async fn query_all(
        &self,
        selector: &str,
    ) -> Result<Vec<Box<dyn ElementHandle>>, BrowserError> {
        match self.element.find_elements(selector).await {
            Ok(elements) => Ok(wrap(elements)),
            Err(e) => {
                debug!(selector, error = %e, "No child elements found");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    async fn text(&self) -> Result<String, BrowserError> {
        self.element
            .inner_text()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| BrowserError::Session(e.to_string()))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
        self.element
            .attribute(name)
            .await
            .map_err(|e| BrowserError::Session(e.to_string()))
    }
}

//! Page fetching through a WebDriver session.
//!
//! Each fetch opens a scratch tab, navigates, waits for the document to
//! finish loading, extracts the page content, and always closes the tab
//! again, so the session's original window is left untouched.

use crate::error::FetchError;
use crate::extract;
use crate::page::PageContent;
use fantoccini::{Client, ClientBuilder};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use url::Url;

/// Default WebDriver endpoint, overridable with the WEBDRIVER_URL
/// environment variable
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// URL schemes that can never be fetched through a browser session
pub const BLOCKED_SCHEMES: &[&str] = &[
    "chrome",
    "chrome-extension",
    "moz-extension",
    "about",
    "edge",
    "view-source",
];

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub webdriver_url: String,
    /// Delay between document readiness polls
    pub poll_interval: Duration,
    /// Readiness polls before giving up and extracting anyway
    pub max_poll_attempts: usize,
    /// Extra wait after the document reports complete, for late scripts
    pub settle_delay: Duration,
    /// Hard ceiling on a single fetch, covering the full poll budget
    pub overall_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            webdriver_url: std::env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| DEFAULT_WEBDRIVER_URL.to_string()),
            poll_interval: Duration::from_millis(500),
            max_poll_attempts: 120,
            settle_delay: Duration::from_secs(2),
            overall_timeout: Duration::from_secs(90),
        }
    }
}

/// Anything that can turn a URL into extracted page content
pub trait PageSource {
    async fn fetch(&self, url: &str) -> Result<PageContent, FetchError>;
}

pub struct PageFetcher {
    client: Client,
    config: FetcherConfig,
}

impl PageFetcher {
    /// Connects a new WebDriver session
    pub async fn connect(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = ClientBuilder::native()
            .connect(&config.webdriver_url)
            .await?;
        ::log::info!("Connected to WebDriver at {}", config.webdriver_url);
        Ok(Self { client, config })
    }

    /// Ends the WebDriver session
    pub async fn close(self) -> Result<(), FetchError> {
        self.client.close().await?;
        Ok(())
    }

    async fn load_and_extract(&self, target: &Url) -> Result<PageContent, FetchError> {
        self.client.goto(target.as_str()).await?;

        let mut complete = false;
        for attempt in 0..self.config.max_poll_attempts {
            match self
                .client
                .execute("return document.readyState", vec![])
                .await
            {
                Ok(state) if state.as_str() == Some("complete") => {
                    complete = true;
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    ::log::debug!("readyState poll {} failed for {}: {}", attempt, target, e);
                }
            }
            sleep(self.config.poll_interval).await;
        }

        if !complete {
            // Some pages never report complete; take what has rendered
            ::log::warn!("{} did not finish loading, extracting anyway", target);
            sleep(Duration::from_secs(1)).await;
        }
        sleep(self.config.settle_delay).await;

        let html = self.client.source().await?;
        Ok(extract::extract(&html, target))
    }
}

impl PageSource for PageFetcher {
    async fn fetch(&self, url: &str) -> Result<PageContent, FetchError> {
        let target = validate_url(url)?;

        // Already on the page: extract in place without opening a tab
        if let Ok(current) = self.client.current_url().await {
            if current.as_str() == target.as_str() {
                ::log::debug!("Session already at {}, extracting in place", target);
                let html = self.client.source().await?;
                return Ok(extract::extract(&html, &target));
            }
        }

        let original = self.client.window().await?;
        let scratch = self.client.new_window(true).await?;
        self.client.switch_to_window(scratch.handle).await?;

        let result = timeout(self.config.overall_timeout, self.load_and_extract(&target)).await;

        // Tear down the scratch tab on every path
        if let Err(e) = self.client.close_window().await {
            ::log::warn!("Failed to close scratch tab for {}: {}", target, e);
        }
        if let Err(e) = self.client.switch_to_window(original).await {
            ::log::warn!("Failed to restore original window: {}", e);
        }

        match result {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Timeout(self.config.overall_timeout)),
        }
    }
}

/// Rejects URLs a browser session cannot or must not visit
pub fn validate_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    if BLOCKED_SCHEMES.contains(&parsed.scheme()) {
        return Err(FetchError::BlockedScheme(parsed.scheme().to_string()));
    }
    Ok(parsed)
}

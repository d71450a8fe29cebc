//! Disposable browser pages with bounded operations and guaranteed release.

pub mod webdriver;

pub use webdriver::WebDriverEngine;

use crate::config::ScraperConfig;
use crate::error::{self, ScrapeError, Stage};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Opens fresh, isolated pages. No page is ever shared between two requests.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>, ScrapeError>;
}

/// The page operations the scraper needs from a browser.
///
/// Implementations report a missing element as [`ScrapeError::ElementNotFound`]
/// and an expired wait as [`ScrapeError::Timeout`].
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError>;

    /// Replaces the document with `markup` without any network access
    async fn set_content(&self, markup: &str) -> Result<(), ScrapeError>;

    /// Current rendered markup
    async fn content(&self) -> Result<String, ScrapeError>;

    /// Clicks the element matching `selector`, waiting for it to appear
    async fn click(&self, selector: &str) -> Result<(), ScrapeError>;

    /// Text content of the first element matching `selector`
    async fn text_of(&self, selector: &str) -> Result<Option<String>, ScrapeError>;

    /// PNG of the first element matching `selector`
    async fn screenshot_of(&self, selector: &str) -> Result<Vec<u8>, ScrapeError>;

    async fn close(&self) -> Result<(), ScrapeError>;
}

/// Bounds applied to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Per page operation
    pub operation: Duration,
    /// Fixed pause after navigation or content injection
    pub settle: Duration,
    /// Opening the page itself (browser/context startup)
    pub startup: Duration,
}

impl SessionLimits {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            operation: config.operation_timeout(),
            settle: config.settle_delay(),
            startup: config.startup_timeout(),
        }
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::from_config(&ScraperConfig::default())
    }
}

/// One request's page.
///
/// Every operation is bounded by [`SessionLimits::operation`]. Call
/// [`BrowserSession::release`] on every exit path; if a session is dropped
/// unreleased (panic, cancelled task) the page is closed in the background.
pub struct BrowserSession {
    page: Option<Box<dyn BrowserPage>>,
    limits: SessionLimits,
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("open", &self.page.is_some())
            .field("limits", &self.limits)
            .finish()
    }
}

impl BrowserSession {
    /// Opens a page, giving up after [`SessionLimits::startup`].
    ///
    /// The open runs as its own task, so a page that only arrives after the
    /// deadline is still closed.
    pub async fn acquire(
        engine: Arc<dyn BrowserEngine>,
        limits: SessionLimits,
    ) -> Result<Self, ScrapeError> {
        let mut opening = tokio::spawn(async move { engine.open_page().await });

        let page = match tokio::time::timeout(limits.startup, &mut opening).await {
            Ok(Ok(page)) => page?,
            Ok(Err(e)) => {
                return Err(ScrapeError::Browser(format!("opening a page failed: {}", e)));
            }
            Err(_) => {
                tokio::spawn(async move {
                    if let Ok(Ok(page)) = opening.await {
                        ::log::warn!("closing a page that opened after the startup deadline");
                        if let Err(e) = page.close().await {
                            error::log_absorbed(Stage::Releasing, &e);
                        }
                    }
                });
                return Err(ScrapeError::timeout("open page", limits.startup));
            }
        };
        ::log::debug!("browser session acquired");

        Ok(Self {
            page: Some(page),
            limits,
        })
    }

    pub async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        let page = self.page()?;
        self.bounded("navigate", page.navigate(url)).await
    }

    pub async fn set_content(&self, markup: &str) -> Result<(), ScrapeError> {
        let page = self.page()?;
        self.bounded("set content", page.set_content(markup)).await
    }

    pub async fn content(&self) -> Result<String, ScrapeError> {
        let page = self.page()?;
        self.bounded("read content", page.content()).await
    }

    pub async fn click(&self, selector: &str) -> Result<(), ScrapeError> {
        let page = self.page()?;
        self.bounded("click", page.click(selector)).await
    }

    pub async fn text_of(&self, selector: &str) -> Result<Option<String>, ScrapeError> {
        let page = self.page()?;
        self.bounded("extract text", page.text_of(selector)).await
    }

    pub async fn screenshot_of(&self, selector: &str) -> Result<Vec<u8>, ScrapeError> {
        let page = self.page()?;
        self.bounded("screenshot", page.screenshot_of(selector)).await
    }

    /// Fixed pause letting client-side rendering finish
    pub async fn settle(&self) {
        if !self.limits.settle.is_zero() {
            tokio::time::sleep(self.limits.settle).await;
        }
    }

    /// Closes the page. Close failures are logged, never returned.
    pub async fn release(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = self.bounded("close page", page.close()).await {
                error::log_absorbed(Stage::Releasing, &e);
            }
            ::log::debug!("browser session released");
        }
    }

    fn page(&self) -> Result<&dyn BrowserPage, ScrapeError> {
        self.page
            .as_deref()
            .ok_or_else(|| ScrapeError::Browser("browser session already released".to_string()))
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        work: impl Future<Output = Result<T, ScrapeError>>,
    ) -> Result<T, ScrapeError> {
        match tokio::time::timeout(self.limits.operation, work).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::timeout(operation, self.limits.operation)),
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        ::log::warn!("browser session dropped without release, closing in background");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        error::log_absorbed(Stage::Releasing, &e);
                    }
                });
            }
            Err(_) => ::log::error!("no runtime to close the dropped browser session on"),
        }
    }
}

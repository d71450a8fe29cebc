//! Request orchestration: validate, load, dismiss overlay, extract, release.

pub mod extractor;
pub mod loader;
pub mod overlay;


pub use extractor::{ContentExtractor, Extraction};
pub use loader::PageLoader;
pub use overlay::OverlayDismisser;

use crate::browser::{BrowserEngine, BrowserSession, SessionLimits, WebDriverEngine};
use crate::cache::ContentCache;
use crate::config::ScraperConfig;
use crate::error::{self, Disposition, ScrapeError, Stage};
use crate::request::{CheckedRequest, ScrapingRequest};
use crate::results::ScrapingOutcome;
use crate::selector::{Selector, SelectorStatus, SelectorSyntaxValidator, SelectorValidity};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Where a request currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeState {
    Idle,
    Validating,
    Loading,
    DismissingOverlay,
    Extracting,
    Done,
}

impl ScrapeState {
    /// The failure stage a state reports errors under
    fn stage(self) -> Stage {
        match self {
            ScrapeState::Idle | ScrapeState::Validating => Stage::Validating,
            ScrapeState::Loading => Stage::Loading,
            ScrapeState::DismissingOverlay => Stage::DismissingOverlay,
            ScrapeState::Extracting => Stage::Extracting,
            ScrapeState::Done => Stage::Releasing,
        }
    }
}

impl fmt::Display for ScrapeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Runs scraping requests.
///
/// Cheap to clone; clones share the engine and the cache, so one `Scraper`
/// can serve any number of concurrent requests, each in its own page.
#[derive(Clone)]
pub struct Scraper {
    engine: Arc<dyn BrowserEngine>,
    validator: SelectorSyntaxValidator,
    loader: PageLoader,
    dismisser: OverlayDismisser,
    extractor: ContentExtractor,
    limits: SessionLimits,
}

impl Scraper {
    /// Create a scraper with default limits, screenshotting into the temp dir
    pub fn new(engine: Arc<dyn BrowserEngine>, cache: ContentCache) -> Self {
        let config = ScraperConfig::default();
        let validator = SelectorSyntaxValidator::default();
        Self {
            engine,
            dismisser: OverlayDismisser::new(validator.clone()),
            validator,
            loader: PageLoader::new(cache),
            extractor: ContentExtractor::new(config.screenshots_dir.clone()),
            limits: SessionLimits::from_config(&config),
        }
    }

    /// WebDriver-backed scraper with the configured cache backend
    pub fn from_config(config: &ScraperConfig) -> Self {
        let engine = Arc::new(WebDriverEngine::from_config(config));
        Self::new(engine, ContentCache::from_config(&config.cache)).with_config(config)
    }

    /// Apply limits and the screenshots directory from `config`
    pub fn with_config(mut self, config: &ScraperConfig) -> Self {
        self.limits = SessionLimits::from_config(config);
        self.extractor = ContentExtractor::new(config.screenshots_dir.clone());
        self
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_screenshots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extractor = ContentExtractor::new(dir);
        self
    }

    pub fn cache(&self) -> &ContentCache {
        self.loader.cache()
    }

    /// Check a selector's syntax without touching a browser
    pub fn validate(&self, selector: &Selector) -> Result<SelectorValidity, ScrapeError> {
        self.validator.validate_selector(selector)
    }

    /// Scrape one element.
    ///
    /// Never fails: every problem is reported as a status on the outcome. A
    /// page opened for the request is released before this returns, whatever
    /// the outcome.
    pub async fn scrape(&self, request: ScrapingRequest) -> ScrapingOutcome {
        let mut state = ScrapeState::Idle;
        let target = request.url.clone();

        advance(&mut state, ScrapeState::Validating, &target);
        let checked = match self.preflight(request) {
            Ok(checked) => checked,
            Err(e) => return failed(state, e),
        };

        advance(&mut state, ScrapeState::Loading, &target);
        let session = match BrowserSession::acquire(self.engine.clone(), self.limits).await {
            Ok(session) => session,
            Err(e) => return failed(state, e),
        };

        let outcome = self.run(&session, &checked, &mut state).await;
        session.release().await;

        advance(&mut state, ScrapeState::Done, &target);
        ::log::info!("scrape of {} finished: {}", target, outcome.status());
        outcome
    }

    /// Rejects bad input before any browser work
    fn preflight(&self, request: ScrapingRequest) -> Result<CheckedRequest, ScrapeError> {
        let checked = request.check()?;
        let validity = self.validator.validate_selector(&checked.selector)?;

        if validity.selector.status() != Some(SelectorStatus::Valid) {
            for diagnostic in &validity.diagnostics {
                ::log::debug!("selector {}: {}", validity.selector.path(), diagnostic);
            }
            return Err(ScrapeError::InvalidSelector {
                path: validity.selector.path().to_string(),
            });
        }

        Ok(CheckedRequest {
            selector: validity.selector,
            ..checked
        })
    }

    /// Everything that needs the page. Returns instead of bailing so the
    /// caller always gets to release.
    async fn run(
        &self,
        session: &BrowserSession,
        request: &CheckedRequest,
        state: &mut ScrapeState,
    ) -> ScrapingOutcome {
        let target = request.url.as_str();

        let page = match self
            .loader
            .load(session, &request.url, request.use_cache)
            .await
        {
            Ok(page) => page,
            Err(e) => return failed(*state, e),
        };

        if request.popup.is_some() {
            advance(state, ScrapeState::DismissingOverlay, target);
            self.dismisser
                .dismiss(session, request.popup.as_ref())
                .await;
        }

        advance(state, ScrapeState::Extracting, target);
        match self
            .extractor
            .extract(session, &request.selector, &request.url)
            .await
        {
            Ok(Extraction::Found { text, screenshot }) => ScrapingOutcome::Success {
                text_content: text,
                screenshot,
                page,
            },
            Ok(Extraction::Empty) => ScrapingOutcome::NoContent {},
            Err(e) => failed(*state, e),
        }
    }
}

fn advance(state: &mut ScrapeState, next: ScrapeState, target: &str) {
    ::log::debug!("{}: {} -> {}", target, state, next);
    *state = next;
}

/// Turns a failure into the outcome the caller sees
fn failed(state: ScrapeState, error: ScrapeError) -> ScrapingOutcome {
    let stage = state.stage();
    match error::disposition(stage, &error) {
        Disposition::Surface(status) => {
            ::log::warn!("scrape failed while {}: {}", state, error);
            ScrapingOutcome::failure(status, error.to_string())
        }
        // nothing left to fall back on at this level
        Disposition::Absorb => {
            error::log_absorbed(stage, &error);
            ScrapingOutcome::error(error.to_string())
        }
    }
}

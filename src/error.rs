use crate::results::ScrapingStatus;
use std::time::Duration;
use thiserror::Error;

/// Every failure a scraping request can run into
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Blank selector, unparseable URL: rejected before any browser work
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// Selector failed the syntax check
    #[error("invalid selector '{path}'")]
    InvalidSelector { path: String },

    #[error("Unsupported language {0}, only CSS is currently supported")]
    UnsupportedLanguage(String),

    /// A bounded browser operation did not complete in time
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The locator resolved to zero elements
    #[error("the selector {0} could not be found")]
    ElementNotFound(String),

    #[error("cache failure: {0}")]
    Cache(String),

    #[error("screenshot failure: {0}")]
    Screenshot(String),

    /// Anything the browser engine reports that has no better class
    #[error("{0}")]
    Browser(String),
}

impl ScrapeError {
    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        ScrapeError::Timeout { operation, after }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ScrapeError::Timeout { .. })
    }
}

/// Where in a request a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Loading,
    Caching,
    DismissingOverlay,
    Extracting,
    Capturing,
    Releasing,
}

/// What to do with a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Report it to the caller with this status
    Surface(ScrapingStatus),
    /// Log it and carry on
    Absorb,
}

/// The swallow-vs-surface table. Every call site that catches a failure asks here.
pub fn disposition(stage: Stage, error: &ScrapeError) -> Disposition {
    use Disposition::{Absorb, Surface};

    match (stage, error) {
        // Fidelity steps never change the outcome
        (Stage::DismissingOverlay | Stage::Caching | Stage::Capturing | Stage::Releasing, _) => {
            Absorb
        }
        (_, ScrapeError::Cache(_) | ScrapeError::Screenshot(_)) => Absorb,

        (_, ScrapeError::InvalidSelector { .. }) => Surface(ScrapingStatus::InvalidSelector),
        (_, ScrapeError::Timeout { .. }) => Surface(ScrapingStatus::NoContent),
        (_, ScrapeError::ElementNotFound(_)) => Surface(ScrapingStatus::ElementNotFound),
        (
            _,
            ScrapeError::InvalidInput(_)
            | ScrapeError::UnsupportedLanguage(_)
            | ScrapeError::Browser(_),
        ) => Surface(ScrapingStatus::Error),
    }
}

/// Logs an absorbed failure at the level its stage calls for
pub fn log_absorbed(stage: Stage, error: &ScrapeError) {
    if stage == Stage::DismissingOverlay && error.is_timeout() {
        ::log::info!("Overlay not dismissed, it never appeared: {}", error);
    } else {
        ::log::error!("Ignoring failure while {:?}: {}", stage, error);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire discriminator of a [`ScrapingOutcome`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapingStatus {
    Success,
    /// No error, but no content could be scraped
    NoContent,
    ElementNotFound,
    InvalidSelector,
    Error,
}

impl ScrapingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapingStatus::Success => "success",
            ScrapingStatus::NoContent => "no_content",
            ScrapingStatus::ElementNotFound => "element_not_found",
            ScrapingStatus::InvalidSelector => "invalid_selector",
            ScrapingStatus::Error => "error",
        }
    }
}

impl fmt::Display for ScrapingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The markup a request was evaluated against, and where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    /// URL of the page
    pub url: String,

    /// Raw markup, either rendered by the browser or read back from the cache
    pub content: String,

    /// Whether the markup came from the content cache
    pub is_cached: bool,

    /// When the markup was fetched (the cache entry's update time on a hit)
    pub fetched_at: DateTime<Utc>,
}

impl PageSnapshot {
    /// Snapshot of markup just rendered by the browser
    pub fn fresh(url: String, content: String) -> Self {
        Self {
            url,
            content,
            is_cached: false,
            fetched_at: Utc::now(),
        }
    }

    /// Snapshot of markup served from the cache
    pub fn cached(url: String, content: String, updated_at: DateTime<Utc>) -> Self {
        Self {
            url,
            content,
            is_cached: true,
            fetched_at: updated_at,
        }
    }
}

/// Result of one scraping attempt. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapingOutcome {
    #[serde(rename_all = "camelCase")]
    Success {
        text_content: String,
        /// Base64 PNG of the element, empty when capture failed
        screenshot: String,
        page: PageSnapshot,
    },
    NoContent {},
    ElementNotFound {},
    InvalidSelector {},
    Error { message: String },
}

impl ScrapingOutcome {
    pub fn status(&self) -> ScrapingStatus {
        match self {
            ScrapingOutcome::Success { .. } => ScrapingStatus::Success,
            ScrapingOutcome::NoContent {} => ScrapingStatus::NoContent,
            ScrapingOutcome::ElementNotFound {} => ScrapingStatus::ElementNotFound,
            ScrapingOutcome::InvalidSelector {} => ScrapingStatus::InvalidSelector,
            ScrapingOutcome::Error { .. } => ScrapingStatus::Error,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ScrapingOutcome::Error {
            message: message.into(),
        }
    }

    /// Builds the payload-free outcome for a non-success status.
    ///
    /// `Success` has no payload-free form, so it degrades to an error carrying `message`.
    pub fn failure(status: ScrapingStatus, message: String) -> Self {
        match status {
            ScrapingStatus::NoContent => ScrapingOutcome::NoContent {},
            ScrapingStatus::ElementNotFound => ScrapingOutcome::ElementNotFound {},
            ScrapingStatus::InvalidSelector => ScrapingOutcome::InvalidSelector {},
            ScrapingStatus::Error | ScrapingStatus::Success => ScrapingOutcome::Error { message },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScrapingOutcome::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_discriminator_on_the_wire() {
        let cases = [
            (ScrapingOutcome::NoContent {}, "no_content"),
            (ScrapingOutcome::ElementNotFound {}, "element_not_found"),
            (ScrapingOutcome::InvalidSelector {}, "invalid_selector"),
            (ScrapingOutcome::error("boom"), "error"),
        ];
        for (outcome, expected) in cases {
            let value = serde_json::to_value(&outcome).unwrap();
            assert_eq!(value["status"], expected);
            assert_eq!(outcome.status().as_str(), expected);
        }
    }

    #[test]
    fn test_success_serializes_camel_case_fields() {
        let page = PageSnapshot::fresh(
            "http://example.com/".to_string(),
            "<p>hi</p>".to_string(),
        );
        let outcome = ScrapingOutcome::Success {
            text_content: "hi".to_string(),
            screenshot: String::new(),
            page,
        };

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["textContent"], "hi");
        assert_eq!(value["screenshot"], "");
        assert_eq!(value["page"]["isCached"], json!(false));
        assert!(value["page"]["fetchedAt"].is_string());
    }

    #[test]
    fn test_error_carries_message() {
        let value = serde_json::to_value(ScrapingOutcome::error("no session")).unwrap();
        assert_eq!(value, json!({"status": "error", "message": "no session"}));
    }

    #[test]
    fn test_failure_never_builds_success() {
        let outcome = ScrapingOutcome::failure(ScrapingStatus::Success, "oops".to_string());
        assert_eq!(outcome.status(), ScrapingStatus::Error);
    }
}

use crate::error::ScrapeError;
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

/// Inbound request: evaluate one selector against one URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapingRequest {
    pub selector: Selector,

    /// Absolute URL of the page, as sent by the client
    pub url: String,

    /// Clicked before extraction to get rid of a cookie/consent overlay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup_dismiss_selector: Option<Selector>,

    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn default_use_cache() -> bool {
    true
}

impl ScrapingRequest {
    pub fn new(selector: Selector, url: impl Into<String>) -> Self {
        Self {
            selector,
            url: url.into(),
            popup_dismiss_selector: None,
            use_cache: default_use_cache(),
        }
    }

    pub fn with_popup(mut self, popup: Selector) -> Self {
        self.popup_dismiss_selector = Some(popup);
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Boundary check: non-blank selector, absolute URL
    pub fn check(self) -> Result<CheckedRequest, ScrapeError> {
        if self.selector.is_blank() {
            return Err(ScrapeError::InvalidInput(
                "undefined selector or selector path".to_string(),
            ));
        }

        let url = Url::parse(self.url.trim())
            .map_err(|e| ScrapeError::InvalidInput(format!("url '{}': {}", self.url, e)))?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(ScrapeError::InvalidInput(format!(
                "url '{}' is not an absolute web URL",
                self.url
            )));
        }

        // a blank popup selector means "no popup"
        let popup = self.popup_dismiss_selector.filter(|s| !s.is_blank());

        Ok(CheckedRequest {
            selector: self.selector,
            url,
            popup,
            use_cache: self.use_cache,
        })
    }
}

/// A request that passed the boundary check
#[derive(Debug, Clone)]
pub struct CheckedRequest {
    pub selector: Selector,
    pub url: Url,
    pub popup: Option<Selector>,
    pub use_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_defaults() {
        let request: ScrapingRequest = serde_json::from_str(
            r#"{"selector": {"path": ".content"}, "url": "http://example.com"}"#,
        )
        .unwrap();
        assert!(request.use_cache);
        assert!(request.popup_dismiss_selector.is_none());
        assert_eq!(request.selector.path(), ".content");
    }

    #[test]
    fn test_popup_field_name() {
        let request: ScrapingRequest = serde_json::from_str(
            r##"{"selector": {"path": ".a"}, "url": "http://example.com",
                "popupDismissSelector": {"path": "#accept"}, "useCache": false}"##,
        )
        .unwrap();
        assert!(!request.use_cache);
        assert_eq!(request.popup_dismiss_selector.unwrap().path(), "#accept");
    }

    #[test]
    fn test_missing_path_is_rejected() {
        let request: ScrapingRequest =
            serde_json::from_str(r#"{"selector": {}, "url": "http://example.com"}"#).unwrap();
        assert!(matches!(request.check(), Err(ScrapeError::InvalidInput(_))));
    }

    #[test]
    fn test_unparseable_urls_are_rejected() {
        for url in ["", "example.com/page", "not a url", "mailto:someone@example.com"] {
            let request = ScrapingRequest::new(Selector::css(".a"), url);
            assert!(
                matches!(request.check(), Err(ScrapeError::InvalidInput(_))),
                "{} should be rejected",
                url
            );
        }
    }

    #[test]
    fn test_blank_popup_becomes_none() {
        let checked = ScrapingRequest::new(Selector::css(".a"), "https://example.com/p?q=1")
            .with_popup(Selector::css("  "))
            .check()
            .unwrap();
        assert!(checked.popup.is_none());
        assert_eq!(checked.url.path(), "/p");
    }
}

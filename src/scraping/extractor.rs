use crate::browser::BrowserSession;
use crate::error::{self, ScrapeError, Stage};
use crate::selector::Selector;
use crate::utils;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::path::PathBuf;
use url::Url;

/// What the target element yielded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Text plus a base64 PNG of the element (empty if capture failed)
    Found { text: String, screenshot: String },
    /// The element exists but its text content is empty
    Empty,
}

/// Locates the target element, reads its text, then captures it
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    screenshots_dir: PathBuf,
}

impl ContentExtractor {
    pub fn new(screenshots_dir: impl Into<PathBuf>) -> Self {
        Self {
            screenshots_dir: screenshots_dir.into(),
        }
    }

    /// Text comes first: a missing element fails here, before any screenshot
    /// file exists.
    pub async fn extract(
        &self,
        session: &BrowserSession,
        selector: &Selector,
        url: &Url,
    ) -> Result<Extraction, ScrapeError> {
        let text = session.text_of(selector.path()).await?.unwrap_or_default();
        // only an empty string counts; whitespace is returned as found
        if text.is_empty() {
            ::log::info!("no content found for selector {}", selector.path());
            return Ok(Extraction::Empty);
        }

        let screenshot = match self.capture(session, selector, url).await {
            Ok(encoded) => encoded,
            Err(e) => {
                error::log_absorbed(Stage::Capturing, &e);
                String::new()
            }
        };

        Ok(Extraction::Found { text, screenshot })
    }

    /// Writes the element's PNG to a temporary file, reads it back as base64
    /// and deletes the file.
    async fn capture(
        &self,
        session: &BrowserSession,
        selector: &Selector,
        url: &Url,
    ) -> Result<String, ScrapeError> {
        let png = session
            .screenshot_of(selector.path())
            .await
            .map_err(|e| ScrapeError::Screenshot(e.to_string()))?;

        // removed on drop too, so every exit path cleans up
        let artifact = tempfile::Builder::new()
            .prefix(&utils::screenshot_prefix(url))
            .suffix(".png")
            .tempfile_in(&self.screenshots_dir)
            .map_err(|e| screenshot_io("creating screenshot file", e))?
            .into_temp_path();

        tokio::fs::write(&artifact, &png)
            .await
            .map_err(|e| screenshot_io("writing screenshot", e))?;
        let written = tokio::fs::read(&artifact)
            .await
            .map_err(|e| screenshot_io("reading screenshot back", e))?;
        artifact
            .close()
            .map_err(|e| screenshot_io("removing screenshot", e))?;

        Ok(STANDARD.encode(written))
    }
}

fn screenshot_io(context: &str, error: std::io::Error) -> ScrapeError {
    ScrapeError::Screenshot(format!("{}: {}", context, error))
}

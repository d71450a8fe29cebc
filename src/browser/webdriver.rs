use super::{BrowserEngine, BrowserPage};
use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Well-known local endpoints tried when the configured one refuses a session
const FALLBACK_WEBDRIVER_URLS: [&str; 2] = [
    "http://localhost:9515", // ChromeDriver default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

const SET_CONTENT_SCRIPT: &str = r#"
    document.open();
    document.write(arguments[0]);
    document.close();
    return true;
"#;

/// Browser engine backed by a WebDriver server (chromedriver, geckodriver, ...).
///
/// Each page is its own WebDriver session, so nothing leaks between requests.
#[derive(Debug, Clone)]
pub struct WebDriverEngine {
    webdriver_url: String,
    headless: bool,
    operation_timeout: Duration,
}

impl WebDriverEngine {
    pub fn new(webdriver_url: impl Into<String>) -> Self {
        let defaults = ScraperConfig::default();
        Self {
            webdriver_url: webdriver_url.into(),
            headless: defaults.headless,
            operation_timeout: defaults.operation_timeout(),
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            operation_timeout: config.operation_timeout(),
        }
    }

    fn capabilities(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        if self.headless {
            caps.insert(
                "goog:chromeOptions".to_string(),
                json!({"args": ["--headless=new", "--disable-gpu", "--no-sandbox"]}),
            );
            caps.insert(
                "moz:firefoxOptions".to_string(),
                json!({"args": ["-headless"]}),
            );
        }
        caps
    }

    async fn connect(&self, url: &str) -> Result<Client, String> {
        ClientBuilder::native()
            .capabilities(self.capabilities())
            .connect(url)
            .await
            .map_err(|e| e.to_string())
    }

    /// Connects to the configured WebDriver, then to the fallback endpoints
    async fn connect_to_webdriver(&self) -> Result<Client, ScrapeError> {
        let first_error = match self.connect(&self.webdriver_url).await {
            Ok(client) => {
                ::log::debug!("connected to WebDriver at {}", self.webdriver_url);
                return Ok(client);
            }
            Err(e) => {
                ::log::error!(
                    "failed to connect to WebDriver at {}: {}",
                    self.webdriver_url,
                    e
                );
                e
            }
        };

        for url in FALLBACK_WEBDRIVER_URLS {
            if url == self.webdriver_url {
                continue; // Skip if it's the same as the one we already tried
            }

            ::log::info!("trying fallback WebDriver URL: {}", url);
            if let Ok(client) = self.connect(url).await {
                ::log::debug!("connected to fallback WebDriver at {}", url);
                return Ok(client);
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(ScrapeError::Browser(format!(
            "could not open a WebDriver session at {}: {}",
            self.webdriver_url, first_error
        )))
    }
}

#[async_trait]
impl BrowserEngine for WebDriverEngine {
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>, ScrapeError> {
        let client = self.connect_to_webdriver().await?;
        Ok(Box::new(WebDriverPage {
            client,
            wait_limit: self.operation_timeout,
        }))
    }
}

/// One WebDriver session
pub struct WebDriverPage {
    client: Client,
    wait_limit: Duration,
}

impl WebDriverPage {
    async fn find(&self, selector: &str) -> Result<fantoccini::elements::Element, ScrapeError> {
        self.client
            .find(Locator::Css(selector))
            .await
            .map_err(|e| classify(e, "locate", Some(selector), self.wait_limit))
    }
}

#[async_trait]
impl BrowserPage for WebDriverPage {
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        ::log::debug!("navigating to {}", url);
        self.client
            .goto(url)
            .await
            .map_err(|e| classify(e, "navigate", None, self.wait_limit))
    }

    async fn set_content(&self, markup: &str) -> Result<(), ScrapeError> {
        self.client
            .execute(SET_CONTENT_SCRIPT, vec![json!(markup)])
            .await
            .map(|_| ())
            .map_err(|e| classify(e, "set content", None, self.wait_limit))
    }

    async fn content(&self) -> Result<String, ScrapeError> {
        self.client
            .source()
            .await
            .map_err(|e| classify(e, "read content", None, self.wait_limit))
    }

    async fn click(&self, selector: &str) -> Result<(), ScrapeError> {
        let element = self
            .client
            .wait()
            .at_most(self.wait_limit)
            .for_element(Locator::Css(selector))
            .await
            .map_err(|e| classify(e, "click", Some(selector), self.wait_limit))?;
        element
            .click()
            .await
            .map(|_| ())
            .map_err(|e| classify(e, "click", Some(selector), self.wait_limit))
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>, ScrapeError> {
        let element = self.find(selector).await?;
        element
            .prop("textContent")
            .await
            .map_err(|e| classify(e, "extract text", Some(selector), self.wait_limit))
    }

    async fn screenshot_of(&self, selector: &str) -> Result<Vec<u8>, ScrapeError> {
        let element = self.find(selector).await?;
        element
            .screenshot()
            .await
            .map_err(|e| classify(e, "screenshot", Some(selector), self.wait_limit))
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| ScrapeError::Browser(format!("failed to close session: {}", e)))
    }
}

/// Maps a WebDriver command error onto the scrape taxonomy
fn classify(
    error: CmdError,
    operation: &'static str,
    selector: Option<&str>,
    wait_limit: Duration,
) -> ScrapeError {
    if error.is_no_such_element() {
        return ScrapeError::ElementNotFound(selector.unwrap_or_default().to_string());
    }
    if matches!(error, CmdError::WaitTimeout) || error.is_timeout() || error.is_script_timeout() {
        return ScrapeError::timeout(operation, wait_limit);
    }
    if error.is_invalid_selector() {
        return ScrapeError::InvalidSelector {
            path: selector.unwrap_or_default().to_string(),
        };
    }

    let message = error.to_string();
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("unable to find session") || lowered.contains("invalid session id") {
        ::log::warn!("lost WebDriver session while trying to {}", operation);
    }
    ScrapeError::Browser(format!("failed to {}: {}", operation, message))
}

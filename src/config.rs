use crate::utils::millis;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the scraper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Ask the browser for a headless session
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Upper bound for any single page operation (navigate, click, locate, screenshot)
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Pause after navigation or content injection so client-side rendering can finish
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Upper bound for opening a browser session
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,

    /// Where screenshots are written before being encoded and deleted
    #[serde(default = "default_screenshots_dir")]
    pub screenshots_dir: PathBuf,

    #[serde(default)]
    pub cache: CacheBackendConfig,
}

/// Backing store of the content cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CacheBackendConfig {
    /// Process-local, lost on exit
    Memory,

    /// One directory per site under `root_dir`
    Filesystem {
        #[serde(default = "default_cache_dir")]
        root_dir: PathBuf,
    },
}

impl Default for CacheBackendConfig {
    fn default() -> Self {
        CacheBackendConfig::Filesystem {
            root_dir: default_cache_dir(),
        }
    }
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_operation_timeout_ms() -> u64 {
    1000
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_startup_timeout_ms() -> u64 {
    30_000
}

fn default_screenshots_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".page-cache")
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            operation_timeout_ms: default_operation_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            startup_timeout_ms: default_startup_timeout_ms(),
            screenshots_dir: default_screenshots_dir(),
            cache: CacheBackendConfig::default(),
        }
    }
}

impl ScraperConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Override settings from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Override settings from `lookup` (WEBDRIVER_URL, SCREENSHOTS_DIR); empty values are ignored
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(webdriver_url) = lookup("WEBDRIVER_URL").filter(|v| !v.is_empty()) {
            self.webdriver_url = webdriver_url;
        }
        if let Some(dir) = lookup("SCREENSHOTS_DIR").filter(|v| !v.is_empty()) {
            self.screenshots_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn operation_timeout(&self) -> Duration {
        millis(self.operation_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        millis(self.settle_delay_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        millis(self.startup_timeout_ms)
    }
}

// Re-export modules
pub mod browser;
pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod results;
pub mod scraping;
pub mod selector;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::ScraperConfig;
pub use error::ScrapeError;
pub use request::ScrapingRequest;
pub use results::{PageSnapshot, ScrapingOutcome, ScrapingStatus};
pub use scraping::Scraper;
pub use selector::{Selector, SelectorLanguage, SelectorStatus, SelectorSyntaxValidator};

use clap::{Parser, Subcommand};
use scrape_eval::{ScrapingRequest, Selector};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scrape-eval")]
#[command(about = "Evaluates CSS selectors against live or cached web pages")]
#[command(version)]
pub struct Args {
    /// JSON configuration file (WebDriver URL, timeouts, cache backend)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape the text and a screenshot of one element
    Scrape {
        /// Absolute URL of the page
        url: String,

        /// CSS selector of the element to extract
        #[arg(short, long)]
        selector: String,

        /// CSS selector of a cookie/consent button to click first
        #[arg(short, long)]
        popup: Option<String>,

        /// Always fetch the page instead of reading the cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Check the syntax of a CSS selector without opening a browser
    Validate {
        /// Selector path
        path: String,
    },
}

/// Build a scraping request from the `scrape` arguments
pub fn to_request(
    url: &str,
    selector: &str,
    popup: Option<&str>,
    no_cache: bool,
) -> ScrapingRequest {
    let request = ScrapingRequest::new(Selector::css(selector), url).with_cache(!no_cache);
    match popup {
        Some(popup) => request.with_popup(Selector::css(popup)),
        None => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_arguments() {
        let args = Args::parse_from([
            "scrape-eval",
            "scrape",
            "https://example.com/",
            "--selector",
            ".content",
            "--popup",
            "#accept",
            "--no-cache",
        ]);
        let Command::Scrape {
            url,
            selector,
            popup,
            no_cache,
        } = args.command
        else {
            panic!("expected the scrape command");
        };

        let request = to_request(&url, &selector, popup.as_deref(), no_cache);
        assert_eq!(request.selector.path(), ".content");
        assert_eq!(
            request.popup_dismiss_selector.as_ref().map(|s| s.path()),
            Some("#accept")
        );
        assert!(!request.use_cache);
    }

    #[test]
    fn test_global_config_flag() {
        let args = Args::parse_from(["scrape-eval", "validate", "div > p", "--config", "c.json"]);
        assert_eq!(args.config, Some(PathBuf::from("c.json")));
        assert!(matches!(args.command, Command::Validate { path } if path == "div > p"));
    }
}

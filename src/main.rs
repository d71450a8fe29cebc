use clap::Parser;
use scrape_eval::{Scraper, ScraperConfig, Selector};
use std::process::ExitCode;

mod args;
use args::{Args, Command, to_request};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match ScraperConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                ::log::error!("Failed to load config from {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ScraperConfig::default(),
    }
    .with_env_overrides();

    let scraper = Scraper::from_config(&config);

    let rendered = match args.command {
        Command::Scrape {
            url,
            selector,
            popup,
            no_cache,
        } => {
            ::log::info!(
                "Scraping {} for selector {} through WebDriver at {}",
                url,
                selector,
                config.webdriver_url
            );
            let request = to_request(&url, &selector, popup.as_deref(), no_cache);
            let outcome = scraper.scrape(request).await;
            serde_json::to_string_pretty(&outcome)
        }
        Command::Validate { path } => match scraper.validate(&Selector::css(path)) {
            Ok(validity) => serde_json::to_string_pretty(&validity),
            Err(e) => {
                ::log::error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    match rendered {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            ::log::error!("Failed to render result: {}", e);
            ExitCode::FAILURE
        }
    }
}

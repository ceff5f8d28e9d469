//! # News Window
//!
//! Searches Google News RSS for a topic over a chosen time range, splitting
//! the range into date windows so each feed request stays under the
//! upstream's per-query cap, then merges, deduplicates, sorts and normalizes
//! the results. A summary of the merged headlines can be requested from
//! Gemini.
//!
//! ## Usage
//!
//! ```sh
//! news_window serve --bind 0.0.0.0:3000
//! news_window search "人工智能" --range 7d --summarize
//! ```
//!
//! ## Architecture
//!
//! 1. **Partition**: split the range into contiguous date windows
//! 2. **Fetch**: query every window concurrently, tolerating failures
//! 3. **Aggregate**: dedupe by link, sort newest first, cap, normalize
//! 4. **Resolve** (optional): follow wrapper links to publisher URLs
//! 5. **Summarize** (on request): prompt the model with the merged list

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod api;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod partition;
mod scrapers;
mod search;
mod server;
mod utils;

#[cfg(test)]
mod test_support;

use api::{GeminiSummarizer, RetrySummarizer, Summarizer};
use cli::{Cli, Command};
use config::Config;
use models::NewsItem;
use outputs::json;
use search::SearchQuery;
use utils::truncate_for_log;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = Config::load(args.config.as_deref()).inspect_err(|e| {
        error!(error = %e, "Failed to load configuration");
    })?;

    match args.command {
        Command::Serve { bind } => server::serve(config, &bind).await?,
        Command::Search {
            topic,
            range,
            resolve_links,
            summarize,
            json_output_dir,
        } => {
            let start_time = std::time::Instant::now();
            let query = SearchQuery {
                topic,
                range,
                resolve_links,
            };
            let items = search::search(&config, &query, Utc::now()).await?;
            info!(count = items.len(), "Search complete");

            match json_output_dir {
                Some(dir) => {
                    let path = json::write_results(&items, &dir, &query.topic, query.range).await?;
                    println!("{}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&items)?),
            }

            if summarize {
                match summarize_items(&config, &query.topic, &items).await {
                    Ok(text) => println!("\n{text}"),
                    Err(e) => {
                        warn!(error = %e, "Summary failed; results were still produced");
                        eprintln!("summary unavailable: {e}");
                    }
                }
            }

            let elapsed = start_time.elapsed();
            info!(?elapsed, "Execution complete");
        }
    }

    Ok(())
}

async fn summarize_items(
    config: &Config,
    topic: &str,
    items: &[NewsItem],
) -> Result<String, error::NewsError> {
    if items.is_empty() {
        return Err(error::NewsError::MissingParameter("news"));
    }
    let max_items = config.summary_max_items();
    let gemini = GeminiSummarizer::new(&config.summary, max_items)?;
    let summarizer = RetrySummarizer::new(
        gemini,
        config.summary.max_retries,
        std::time::Duration::from_secs(1),
    );
    let news = &items[..items.len().min(max_items)];
    let text = summarizer.summarize(topic, news).await?;
    debug!(preview = %truncate_for_log(&text, 200), "Summary received");
    Ok(text)
}

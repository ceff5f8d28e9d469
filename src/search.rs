//! One search request, end to end.
//!
//! ```text
//! topic + range ─► partition ─► fetch_window × N (concurrent) ─► aggregate ─► resolve_links?
//! ```
//!
//! Every window is awaited to completion before anything is merged. A window
//! that errors or times out is logged and contributes nothing; the search
//! only fails when no window succeeded at all.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::aggregate::{aggregate, dedupe_by_link};
use crate::config::Config;
use crate::error::NewsError;
use crate::models::{NewsItem, NewsRecord};
use crate::partition::{TimeRange, partition};
use crate::scrapers::{google_news, resolver};

/// What the caller asked for.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub topic: String,
    pub range: TimeRange,
    /// Follow wrapper links to publisher URLs.
    pub resolve_links: bool,
}

/// Run a search relative to `now`.
#[instrument(level = "info", skip_all, fields(topic = %query.topic, range = %query.range))]
pub async fn search(
    config: &Config,
    query: &SearchQuery,
    now: DateTime<Utc>,
) -> Result<Vec<NewsItem>, NewsError> {
    let topic = query.topic.trim();
    if topic.is_empty() {
        return Err(NewsError::MissingParameter("q"));
    }
    let display_offset = config.display_offset()?;
    let t0 = Instant::now();

    let windows = partition(query.range, now);
    let queries: Vec<String> = windows.iter().map(|window| window.query(topic)).collect();
    let outcomes = join_all(
        queries
            .iter()
            .map(|q| google_news::fetch_window(config, q)),
    )
    .await;

    let mut failed = 0usize;
    let batches: Vec<Vec<NewsRecord>> = windows
        .iter()
        .zip(outcomes)
        .map(|(window, outcome)| match outcome {
            Ok(records) => records,
            Err(e) => {
                failed += 1;
                warn!(%window, error = %e, "Feed window failed; it contributes no items");
                Vec::new()
            }
        })
        .collect();

    if failed == windows.len() {
        return Err(NewsError::AllWindowsFailed { failed });
    }

    let mut items = aggregate(batches, config.max_results, &display_offset);
    if query.resolve_links && !items.is_empty() {
        items = dedupe_by_link(resolver::resolve_links(config, items).await);
    }

    info!(
        windows = windows.len(),
        failed,
        count = items.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Search complete"
    );
    Ok(items)
}

//! JSON output for CLI searches.
//!
//! Files are organized by the local date of the search:
//! ```text
//! json_output_dir/
//! └── 2024-06-10/
//!     ├── rust_7d.json
//!     └── 人工智能_1y.json
//! ```

use chrono::Local;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::error::NewsError;
use crate::models::NewsItem;
use crate::partition::TimeRange;
use crate::utils::{ensure_writable_dir, slugify_title};

/// File name for one search's results.
pub fn results_filename(topic: &str, range: TimeRange) -> String {
    let slug = slugify_title(topic);
    let slug = if slug.is_empty() { "search".to_string() } else { slug };
    format!("{slug}_{range}.json")
}

/// Write `items` under `{json_output_dir}/{date}/` and return the file path.
#[instrument(level = "info", skip(items), fields(count = items.len()))]
pub async fn write_results(
    items: &[NewsItem],
    json_output_dir: &str,
    topic: &str,
    range: TimeRange,
) -> Result<PathBuf, NewsError> {
    let json = serde_json::to_string_pretty(items)?;

    let full_json_dir = format!(
        "{}/{}",
        json_output_dir.trim_end_matches('/'),
        Local::now().date_naive()
    );
    if let Err(e) = ensure_writable_dir(&full_json_dir).await {
        error!(%full_json_dir, error = %e, "Failed to prepare JSON dir");
        return Err(e);
    }

    let path = PathBuf::from(&full_json_dir).join(results_filename(topic, range));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote search results");
    Ok(path)
}

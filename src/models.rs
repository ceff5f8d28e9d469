//! Data models for feed records and the normalized items served to callers.
//!
//! - [`NewsRecord`]: one `<item>` as extracted from the upstream RSS feed
//! - [`NewsItem`]: a cleaned, display-ready record produced by the aggregator
//! - [`SummaryRequest`] / [`SummaryResponse`]: the summary endpoint contract
//!
//! Field names follow the JSON shape the browser front end expects, hence the
//! `pubDate` rename.

use serde::{Deserialize, Serialize};

/// Placeholder used when neither the feed nor the title names a publisher.
pub const UNKNOWN_SOURCE: &str = "unknown source";

/// Placeholder link for items the feed delivered without one.
pub const MISSING_LINK: &str = "#";

/// A raw news item as extracted from an RSS `<item>` block.
///
/// Every field falls back to an empty string when the feed omits it, so a
/// partially broken item still flows through the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsRecord {
    /// Headline, usually with a trailing `" - <publisher>"` suffix.
    pub title: String,
    /// Article link; for Google News this is a redirect wrapper.
    pub link: String,
    /// Publish date text, normally RFC 2822.
    pub pub_date: String,
    /// Publisher name from the `<source>` element.
    pub source: String,
}

/// A normalized news item, ready for display or summarization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    /// Display timestamp (`YYYY/MM/DD HH:MM`) or the raw feed text when it
    /// could not be parsed.
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    pub source: String,
}

/// Body of `POST /api/summary`.
///
/// Both fields are optional at the serde level so that a missing field is
/// reported as a 400 by the handler instead of a generic extractor rejection.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub news: Option<Vec<NewsItem>>,
    #[serde(default)]
    pub topic: Option<String>,
}

/// Successful summary reply.
#[derive(Debug, Deserialize, Serialize)]
pub struct SummaryResponse {
    pub text: String,
}

/// Error body shared by every endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

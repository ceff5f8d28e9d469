//! Google News RSS search.
//!
//! Requests look like
//! `https://news.google.com/rss/search?q=<topic after:YYYY-MM-DD>&hl=zh-CN&gl=CN&ceid=CN:zh-Hans`
//! and return RSS 2.0 with one `<item>` per story:
//!
//! ```xml
//! <item>
//!   <title>Headline - Publisher</title>
//!   <link>https://news.google.com/rss/articles/CBMi...?oc=5</link>
//!   <pubDate>Mon, 10 Jun 2024 10:00:00 GMT</pubDate>
//!   <source url="https://publisher.example">Publisher</source>
//! </item>
//! ```
//!
//! Items are pulled out with tolerant pattern matching rather than a strict
//! XML reader, so one malformed item (or a truncated body) costs at most its
//! own fields instead of the whole feed.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::CLIENT;
use crate::config::Config;
use crate::error::NewsError;
use crate::models::NewsRecord;

static ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<item(?:\s[^>]*)?>(.*?)</item>").unwrap());
static TITLE_RE: Lazy<Regex> = Lazy::new(|| field_regex("title"));
static LINK_RE: Lazy<Regex> = Lazy::new(|| field_regex("link"));
static PUB_DATE_RE: Lazy<Regex> = Lazy::new(|| field_regex("pubDate"));
static SOURCE_RE: Lazy<Regex> = Lazy::new(|| field_regex("source"));

fn field_regex(tag: &str) -> Regex {
    Regex::new(&format!(r"(?s)<{tag}(?:\s[^>]*)?>(.*?)</{tag}>")).unwrap()
}

/// Build the feed URL for one query.
pub fn feed_url(config: &Config, query: &str) -> String {
    format!(
        "{}?q={}&hl={}&gl={}&ceid={}",
        config.feed_endpoint,
        urlencoding::encode(query),
        urlencoding::encode(&config.language),
        urlencoding::encode(&config.region),
        urlencoding::encode(&config.edition),
    )
}

/// Fetch and parse one feed window.
///
/// A non-2xx status or a timeout is returned as an error; the caller decides
/// how to degrade. At most `config.per_window_limit` records are returned,
/// in feed order.
#[instrument(level = "info", skip(config), fields(%query))]
pub async fn fetch_window(config: &Config, query: &str) -> Result<Vec<NewsRecord>, NewsError> {
    let url = feed_url(config, query);
    let t0 = Instant::now();

    let res = CLIENT
        .get(&url)
        .timeout(config.fetch_timeout())
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), "Feed returned non-success status");
        return Err(NewsError::Upstream {
            status: status.as_u16(),
        });
    }

    let xml = res.text().await?;
    let records = parse_feed(&xml, config.per_window_limit);

    info!(
        count = records.len(),
        bytes = xml.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Fetched feed window"
    );
    Ok(records)
}

/// Extract up to `limit` records from an RSS body.
pub fn parse_feed(xml: &str, limit: usize) -> Vec<NewsRecord> {
    let records: Vec<NewsRecord> = ITEM_RE
        .captures_iter(xml)
        .take(limit)
        .map(|cap| parse_item(&cap[1]))
        .collect();
    debug!(count = records.len(), "Parsed feed items");
    records
}

fn parse_item(item: &str) -> NewsRecord {
    NewsRecord {
        title: extract(item, &TITLE_RE),
        link: extract(item, &LINK_RE),
        pub_date: extract(item, &PUB_DATE_RE),
        source: extract(item, &SOURCE_RE),
    }
}

/// First match of `re` in `item`, with CDATA markers removed, entities
/// decoded and whitespace trimmed. Missing fields come back empty.
fn extract(item: &str, re: &Regex) -> String {
    let Some(raw) = re.captures(item).and_then(|c| c.get(1)) else {
        return String::new();
    };
    let raw = raw.as_str();

    if raw.contains("<![CDATA[") {
        return raw
            .replace("<![CDATA[", "")
            .replace("]]>", "")
            .trim()
            .to_string();
    }

    let text = raw.trim();
    match quick_xml::escape::unescape(text) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(e) => {
            debug!(error = %e, "Entity decoding failed; keeping raw text");
            text.to_string()
        }
    }
}

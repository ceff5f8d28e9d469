//! Merge per-window feed results into one ordered, bounded list.
//!
//! Steps, in order:
//!
//! 1. concatenate all windows (newest window first)
//! 2. de-duplicate by link, first occurrence wins; empty links share the `#`
//!    placeholder and so collapse into one entry
//! 3. derive a timestamp from `pubDate` (unparsable → epoch)
//! 4. stable sort, newest first
//! 5. truncate to the cap
//! 6. normalize titles, sources and display dates
//!
//! No I/O happens here.

use chrono::{DateTime, FixedOffset};
use itertools::Itertools;
use std::cmp::Reverse;
use tracing::debug;

use crate::models::{MISSING_LINK, NewsItem, NewsRecord, UNKNOWN_SOURCE};

const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Parse a feed date. Google emits RFC 2822; RFC 3339 is accepted too.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
}

/// Sort key: seconds since the epoch, or 0 when the date did not parse.
fn sort_key(date: &Option<DateTime<FixedOffset>>) -> i64 {
    date.map_or(0, |d| d.timestamp())
}

/// Combine window results into at most `max_results` normalized items.
pub fn aggregate(
    windows: Vec<Vec<NewsRecord>>,
    max_results: usize,
    display_offset: &FixedOffset,
) -> Vec<NewsItem> {
    let raw_count: usize = windows.iter().map(Vec::len).sum();

    let mut dated: Vec<(Option<DateTime<FixedOffset>>, NewsRecord)> = windows
        .into_iter()
        .flatten()
        .map(|mut record| {
            if record.link.trim().is_empty() {
                record.link = MISSING_LINK.to_string();
            }
            record
        })
        .unique_by(|record| record.link.clone())
        .map(|record| (parse_pub_date(&record.pub_date), record))
        .collect();

    let unique_count = dated.len();

    // Vec::sort_by_key is stable, so equal timestamps keep arrival order.
    dated.sort_by_key(|(date, _)| Reverse(sort_key(date)));
    dated.truncate(max_results);

    debug!(
        raw = raw_count,
        unique = unique_count,
        kept = dated.len(),
        "Aggregated feed windows"
    );

    dated
        .into_iter()
        .map(|(date, record)| normalize(record, date, display_offset))
        .collect()
}

/// Drop later items whose link repeats an earlier one.
///
/// Used after link resolution, when two wrapper links can land on the same
/// publisher URL.
pub fn dedupe_by_link(items: Vec<NewsItem>) -> Vec<NewsItem> {
    items
        .into_iter()
        .unique_by(|item| item.link.clone())
        .collect()
}

fn normalize(
    record: NewsRecord,
    date: Option<DateTime<FixedOffset>>,
    display_offset: &FixedOffset,
) -> NewsItem {
    let title = record.title.trim();
    let source = record.source.trim();

    let (title, source) = if source.is_empty() {
        match split_source_suffix(title) {
            Some((head, tail)) => (head.to_string(), tail.to_string()),
            None => (title.to_string(), UNKNOWN_SOURCE.to_string()),
        }
    } else {
        (strip_source_suffix(title, source), source.to_string())
    };

    let pub_date = match date {
        Some(d) => d
            .with_timezone(display_offset)
            .format(DISPLAY_FORMAT)
            .to_string(),
        None => record.pub_date.trim().to_string(),
    };

    NewsItem {
        title,
        link: record.link,
        pub_date,
        source,
    }
}

/// Remove a trailing `" - <source>"` from `title`, repeatedly, so the result
/// is a fixed point. A title that is nothing but the suffix is left alone.
pub fn strip_source_suffix(title: &str, source: &str) -> String {
    let mut current = title.trim();
    if source.is_empty() {
        return current.to_string();
    }

    while let Some(head) = current
        .strip_suffix(source)
        .and_then(|rest| rest.strip_suffix(" - "))
    {
        let head = head.trim_end();
        if head.is_empty() {
            break;
        }
        current = head;
    }
    current.to_string()
}

/// Split `"Headline - Publisher"` into its parts, using the last separator.
fn split_source_suffix(title: &str) -> Option<(&str, &str)> {
    let (head, tail) = title.rsplit_once(" - ")?;
    let (head, tail) = (head.trim(), tail.trim());
    (!head.is_empty() && !tail.is_empty()).then_some((head, tail))
}

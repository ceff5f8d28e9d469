//! Upstream access: the Google News RSS search feed and its redirect links.
//!
//! | Module | Job |
//! |--------|-----|
//! | [`google_news`] | One RSS request per query, parsed into [`NewsRecord`](crate::models::NewsRecord)s |
//! | [`resolver`] | Follow a wrapper link to the publisher URL, best effort |
//!
//! Both share one HTTP client that looks like a desktop browser; Google
//! degrades or blocks requests that do not. Timeouts are set per request so
//! the feed and the resolver can use different budgets.

pub mod google_news;
pub mod resolver;

use once_cell::sync::Lazy;
use reqwest::Client;

pub(crate) static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) ",
            "AppleWebKit/537.36 (KHTML, like Gecko) ",
            "Chrome/121.0.0.0 Safari/537.36"
        ))
        .default_headers({
            use reqwest::header::{
                ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA,
            };
            let mut h = HeaderMap::new();
            h.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"));
            h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"));
            h.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            h.insert(PRAGMA, HeaderValue::from_static("no-cache"));
            h
        })
        .pool_idle_timeout(std::time::Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("failed to build reqwest client")
});

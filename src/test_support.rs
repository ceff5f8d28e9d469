//! Helpers for tests that need a live upstream.

use axum::Router;
use std::net::SocketAddr;

use crate::config::Config;

/// Serve `app` on an ephemeral local port.
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A config whose feed and wrapper host point at a local server, with UTC
/// display times.
pub fn config_for(addr: SocketAddr) -> Config {
    Config {
        feed_endpoint: format!("http://{addr}/rss/search"),
        wrapper_host: addr.ip().to_string(),
        display_utc_offset: "+00:00".to_string(),
        ..Config::default()
    }
}

/// Render an RSS body from `(title, link, pubDate, source)` tuples.
pub fn rss(items: &[(&str, &str, &str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(title, link, pub_date, source)| {
            format!(
                "<item><title>{title}</title><link>{link}</link>\
                 <pubDate>{pub_date}</pubDate><source url=\"https://x\">{source}</source></item>"
            )
        })
        .collect();
    format!("<?xml version=\"1.0\"?><rss version=\"2.0\"><channel>{body}</channel></rss>")
}

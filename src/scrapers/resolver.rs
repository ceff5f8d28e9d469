//! Follow Google News wrapper links to the publisher's article URL.
//!
//! Feed links point at `news.google.com/rss/articles/...`, which redirects to
//! the real article. Resolution is enrichment only: every failure path hands
//! back the link we started with.

use futures::stream::{self, StreamExt};
use std::net::IpAddr;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::CLIENT;
use crate::config::Config;
use crate::models::NewsItem;

/// True when `url` is hosted on the wrapper domain.
pub fn is_wrapper(url: &Url, wrapper_host: &str) -> bool {
    url.host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(wrapper_host))
}

/// True when `url` lands on the wrapper's own site rather than a publisher:
/// the wrapper host itself or any host under its registrable domain
/// (`consent.google.com` for `news.google.com`). IP wrappers match exactly.
pub fn is_intermediary(url: &Url, wrapper_host: &str) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let wrapper_host = wrapper_host.to_ascii_lowercase();
    if host == wrapper_host {
        return true;
    }
    if wrapper_host.parse::<IpAddr>().is_ok() {
        return false;
    }

    let labels: Vec<&str> = wrapper_host.split('.').collect();
    let domain = labels[labels.len().saturating_sub(2)..].join(".");
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Resolve one link, returning the original on any failure.
///
/// Non-HTTP links and links that are not on the wrapper host are returned
/// untouched without a request. A redirect chain that ends back on the
/// wrapper's site (consent pages, bot checks) counts as a failure.
#[instrument(level = "debug", skip(config), fields(%link))]
pub async fn resolve_link(config: &Config, link: &str) -> String {
    let Ok(parsed) = Url::parse(link) else {
        return link.to_string();
    };
    if !matches!(parsed.scheme(), "http" | "https") || !is_wrapper(&parsed, &config.wrapper_host)
    {
        return link.to_string();
    }

    match CLIENT
        .get(parsed)
        .timeout(config.resolve_timeout())
        .send()
        .await
    {
        Ok(res) => {
            let landed = res.url();
            if is_intermediary(landed, &config.wrapper_host) {
                debug!(%landed, "Redirects ended on the wrapper's site; keeping original");
                link.to_string()
            } else {
                landed.to_string()
            }
        }
        Err(e) => {
            warn!(error = %e, timeout = e.is_timeout(), "Could not resolve link; keeping original");
            link.to_string()
        }
    }
}

/// Resolve every item's link concurrently, at most
/// `config.resolve_concurrency` at a time. Output order matches input order.
///
/// Completions are taken as they finish, so one slow link never holds back
/// the start of the next ones.
#[instrument(level = "info", skip_all, fields(count = items.len()))]
pub async fn resolve_links(config: &Config, items: Vec<NewsItem>) -> Vec<NewsItem> {
    let t0 = Instant::now();

    let mut indexed: Vec<(usize, NewsItem)> = stream::iter(items.into_iter().enumerate())
        .map(|(i, mut item)| async move {
            item.link = resolve_link(config, &item.link).await;
            (i, item)
        })
        .buffer_unordered(config.resolve_concurrency)
        .collect()
        .await;
    indexed.sort_unstable_by_key(|(i, _)| *i);
    let resolved: Vec<NewsItem> = indexed.into_iter().map(|(_, item)| item).collect();

    let landed = resolved
        .iter()
        .filter_map(|item| Url::parse(&item.link).ok())
        .filter(|url| !is_intermediary(url, &config.wrapper_host))
        .count();
    info!(
        total = resolved.len(),
        publisher_links = landed,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Resolved article links"
    );
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{config_for, spawn};
    use axum::{
        Router,
        extract::Path,
        response::Redirect,
        routing::get,
    };
    use std::net::SocketAddr;
    use std::time::Duration;

    fn item(link: &str) -> NewsItem {
        NewsItem {
            title: "t".to_string(),
            link: link.to_string(),
            pub_date: "p".to_string(),
            source: "s".to_string(),
        }
    }

    // Wrapper links live on 127.0.0.1; "publisher" pages on localhost, so the
    // two count as different hosts.
    async fn redirect_server() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let port = addr.port();

        let app = Router::new()
            .route(
                "/rss/articles/ok",
                get(move || async move {
                    Redirect::temporary(&format!("http://localhost:{port}/story"))
                }),
            )
            .route(
                "/rss/articles/loop",
                get(|| async { Redirect::temporary("/rss/articles/consent") }),
            )
            .route("/rss/articles/consent", get(|| async { "consent" }))
            .route(
                "/rss/articles/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .route("/story", get(|| async { "article" }));

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_resolves_redirect_to_publisher() {
        let addr = redirect_server().await;
        let config = config_for(addr);

        let link = format!("http://{addr}/rss/articles/ok");
        let resolved = resolve_link(&config, &link).await;
        assert_eq!(resolved, format!("http://localhost:{}/story", addr.port()));
    }

    #[tokio::test]
    async fn test_landing_on_wrapper_host_keeps_original() {
        let addr = redirect_server().await;
        let config = config_for(addr);

        let link = format!("http://{addr}/rss/articles/loop");
        assert_eq!(resolve_link(&config, &link).await, link);
    }

    #[tokio::test]
    async fn test_timeout_keeps_original() {
        let addr = redirect_server().await;
        let config = Config {
            resolve_timeout_secs: 1,
            ..config_for(addr)
        };

        let link = format!("http://{addr}/rss/articles/slow");
        assert_eq!(resolve_link(&config, &link).await, link);
    }

    #[tokio::test]
    async fn test_non_wrapper_and_placeholder_links_are_untouched() {
        let config = config_for(spawn(Router::new()).await);

        assert_eq!(resolve_link(&config, "#").await, "#");
        assert_eq!(
            resolve_link(&config, "https://example.com/a").await,
            "https://example.com/a"
        );
        assert_eq!(resolve_link(&config, "ftp://127.0.0.1/a").await, "ftp://127.0.0.1/a");
    }

    #[tokio::test]
    async fn test_resolve_links_preserves_order() {
        let addr = redirect_server().await;
        let config = config_for(addr);

        let items = vec![
            item(&format!("http://{addr}/rss/articles/ok")),
            item("#"),
            item(&format!("http://{addr}/rss/articles/loop")),
        ];
        let resolved = resolve_links(&config, items).await;

        assert_eq!(resolved.len(), 3);
        assert_eq!(
            resolved[0].link,
            format!("http://localhost:{}/story", addr.port())
        );
        assert_eq!(resolved[1].link, "#");
        assert_eq!(
            resolved[2].link,
            format!("http://{addr}/rss/articles/loop")
        );
    }

    #[test]
    fn test_intermediary_covers_the_wrapper_domain() {
        let url = |s: &str| Url::parse(s).unwrap();
        let wrapper = "news.google.com";

        assert!(is_intermediary(&url("https://news.google.com/rss/articles/x"), wrapper));
        assert!(is_intermediary(&url("https://consent.google.com/ml?continue=x"), wrapper));
        assert!(is_intermediary(&url("https://www.GOOGLE.com/sorry/index"), wrapper));
        assert!(is_intermediary(&url("https://google.com/"), wrapper));
        assert!(!is_intermediary(&url("https://notgoogle.com/story"), wrapper));
        assert!(!is_intermediary(&url("https://www.reuters.com/world/x"), wrapper));

        assert!(is_intermediary(&url("http://127.0.0.1:8080/x"), "127.0.0.1"));
        assert!(!is_intermediary(&url("http://localhost:8080/x"), "127.0.0.1"));
    }

    #[tokio::test]
    async fn test_slow_links_do_not_hold_back_the_batch() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let port = addr.port();

        let app = Router::new()
            .route(
                "/rss/articles/fast/{id}",
                get(move |Path(id): Path<usize>| async move {
                    Redirect::temporary(&format!("http://localhost:{port}/story/{id}"))
                }),
            )
            .route(
                "/rss/articles/slow/{id}",
                get(move |Path(id): Path<usize>| async move {
                    tokio::time::sleep(Duration::from_millis(1500)).await;
                    Redirect::temporary(&format!("http://localhost:{port}/story/{id}"))
                }),
            )
            .route("/story/{id}", get(|| async { "article" }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = Config {
            resolve_timeout_secs: 3,
            resolve_concurrency: 24,
            ..config_for(addr)
        };
        // One slow link at the head of every group of 24.
        let items: Vec<NewsItem> = (0..96)
            .map(|i| {
                let kind = if i % 24 == 0 { "slow" } else { "fast" };
                item(&format!("http://{addr}/rss/articles/{kind}/{i}"))
            })
            .collect();

        let t0 = Instant::now();
        let resolved = resolve_links(&config, items).await;
        let elapsed = t0.elapsed();

        assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
        assert_eq!(resolved.len(), 96);
        for (i, item) in resolved.iter().enumerate() {
            assert_eq!(item.link, format!("http://localhost:{port}/story/{i}"));
        }
    }
}

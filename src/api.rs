//! Headline summarization through a generative model, with retry.
//!
//! # Architecture
//!
//! - [`Summarizer`]: one async operation, `summarize(topic, news)`
//! - [`GeminiSummarizer`]: calls the Gemini `generateContent` REST endpoint
//! - [`RetrySummarizer`]: decorator adding exponential backoff to any
//!   [`Summarizer`]
//!
//! # Retry Strategy
//!
//! - `max_retries` extra attempts (2 by default)
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay
//! - A missing API key is never retried

use async_trait::async_trait;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::config::SummaryConfig;
use crate::error::NewsError;
use crate::models::NewsItem;
use crate::utils::truncate_for_log;

const SYSTEM_INSTRUCTION: &str = "You are a senior news data analyst. You extract the core \
information from fragmented, timestamped headlines and explain how coverage of a topic \
evolves over time. Answer in a professional, insightful and concise way, in the language \
of the headlines.";

/// Something that can turn a list of headlines into free-text analysis.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, topic: &str, news: &[NewsItem]) -> Result<String, NewsError>;
}

/// Build the user prompt: the topic, then one timestamped line per headline.
pub fn build_prompt(topic: &str, news: &[NewsItem], max_items: usize) -> String {
    let lines = news
        .iter()
        .take(max_items)
        .map(|n| format!("[published: {}] title: {}", n.pub_date, n.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze the latest search results about \"{topic}\".\n\n\
         Here are the headlines with their publish times:\n\
         {lines}\n\n\
         In no more than 350 words:\n\
         1. Core summary: the main developments on this topic right now.\n\
         2. Timeline: using the publish times, describe how the focus of coverage has shifted \
         (from early concerns to the latest developments).\n\
         3. Key trend: the single trend or likely direction most worth watching."
    )
}

// --- Gemini wire types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiSummarizer {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_items: usize,
}

impl GeminiSummarizer {
    pub fn new(config: &SummaryConfig, max_items: usize) -> Result<Self, NewsError> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_items,
        })
    }
}

impl fmt::Debug for GeminiSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiSummarizer")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    #[instrument(level = "info", skip_all, fields(items = news.len()))]
    async fn summarize(&self, topic: &str, news: &[NewsItem]) -> Result<String, NewsError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(NewsError::SummaryUnavailable);
        };

        let prompt = build_prompt(topic, news, self.max_items);
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &prompt }],
            }],
        };

        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let t0 = Instant::now();
        let res = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                body = %truncate_for_log(&text, 300),
                "Model API returned an error"
            );
            return Err(NewsError::Summary(format!("model API returned HTTP {status}")));
        }

        let parsed: GenerateResponse = res.json().await?;
        parsed
            .text()
            .ok_or_else(|| NewsError::Summary("model returned no text".to_string()))
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Summarizer`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetrySummarizer<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetrySummarizer<T>
where
    T: Summarizer,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetrySummarizer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySummarizer")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

#[async_trait]
impl<T> Summarizer for RetrySummarizer<T>
where
    T: Summarizer,
{
    #[instrument(level = "info", skip_all)]
    async fn summarize(&self, topic: &str, news: &[NewsItem]) -> Result<String, NewsError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.summarize(topic, news).await {
                Ok(text) => {
                    info!(
                        attempts = attempt + 1,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        "summarize() succeeded"
                    );
                    return Ok(text);
                }
                Err(NewsError::SummaryUnavailable) => return Err(NewsError::SummaryUnavailable),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "summarize() exhausted retries"
                        );
                        return Err(e);
                    }

                    let mut delay = self
                        .base_delay
                        .saturating_mul(1 << (attempt - 1).min(16) as u32);
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "summarize() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn;
    use axum::{
        Json, Router,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::post,
    };
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn news(n: usize) -> Vec<NewsItem> {
        (0..n)
            .map(|i| NewsItem {
                title: format!("Headline {i}"),
                link: format!("https://p/{i}"),
                pub_date: format!("2024/06/{:02} 10:00", 10 - i.min(9)),
                source: "Wire".to_string(),
            })
            .collect()
    }

    fn summary_config(endpoint: String, api_key: Option<&str>) -> SummaryConfig {
        SummaryConfig {
            endpoint,
            api_key: api_key.map(str::to_string),
            ..SummaryConfig::default()
        }
    }

    struct Flaky {
        calls: Arc<AtomicUsize>,
        fail_first: usize,
    }

    #[async_trait]
    impl Summarizer for Flaky {
        async fn summarize(&self, _topic: &str, _news: &[NewsItem]) -> Result<String, NewsError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(NewsError::Summary(format!("transient {n}")))
            } else {
                Ok("fine".to_string())
            }
        }
    }

    #[test]
    fn test_prompt_lists_timestamped_headlines() {
        let prompt = build_prompt("rust", &news(3), 2);
        assert!(prompt.contains("\"rust\""));
        assert!(prompt.contains("[published: 2024/06/10 10:00] title: Headline 0"));
        assert!(prompt.contains("title: Headline 1"));
        assert!(!prompt.contains("Headline 2"));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let flaky = Flaky {
            calls: calls.clone(),
            fail_first: 2,
        };
        let retry = RetrySummarizer::new(flaky, 2, StdDuration::from_millis(1));

        assert_eq!(retry.summarize("rust", &news(1)).await.unwrap(), "fine");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let flaky = Flaky {
            calls: calls.clone(),
            fail_first: usize::MAX,
        };
        let retry = RetrySummarizer::new(flaky, 1, StdDuration::from_millis(1));

        let err = retry.summarize("rust", &news(1)).await.unwrap_err();
        assert!(matches!(err, NewsError::Summary(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_not_retried() {
        let gemini =
            GeminiSummarizer::new(&summary_config("http://127.0.0.1:9".to_string(), None), 10)
                .unwrap();
        let retry = RetrySummarizer::new(gemini, 3, StdDuration::from_millis(1));

        let err = retry.summarize("rust", &news(1)).await.unwrap_err();
        assert!(matches!(err, NewsError::SummaryUnavailable));
    }

    #[tokio::test]
    async fn test_gemini_request_and_reply() {
        let app = Router::new().route(
            "/v1beta/models/{action}",
            post(
                |headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("k") {
                        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({}))).into_response();
                    }
                    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or("");
                    let has_system = body["systemInstruction"]["parts"][0]["text"].is_string();
                    let text = if prompt.contains("Headline 0") && has_system {
                        "Coverage shifted"
                    } else {
                        ""
                    };
                    Json(serde_json::json!({
                        "candidates": [{"content": {"parts": [{"text": text}, {"text": " over time."}]}}]
                    }))
                    .into_response()
                },
            ),
        );
        let addr = spawn(app).await;
        let endpoint = format!("http://{addr}/v1beta");

        let gemini = GeminiSummarizer::new(&summary_config(endpoint.clone(), Some("k")), 10).unwrap();
        let text = gemini.summarize("rust", &news(2)).await.unwrap();
        assert_eq!(text, "Coverage shifted over time.");

        let wrong_key = GeminiSummarizer::new(&summary_config(endpoint, Some("nope")), 10).unwrap();
        let err = wrong_key.summarize("rust", &news(2)).await.unwrap_err();
        assert!(matches!(err, NewsError::Summary(_)));
    }

    #[test]
    fn test_empty_candidates_have_no_text() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(parsed.text(), None);
    }
}

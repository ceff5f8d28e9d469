//! HTTP surface for the browser front end.
//!
//! | Route | Method | Returns |
//! |-------|--------|---------|
//! | `/` | GET | `ok` |
//! | `/api/news?q=&range=&resolve=` | GET | `NewsItem[]` |
//! | `/api/summary` | POST `{news, topic}` | `{text}` |
//!
//! Errors are `{error}` bodies with a non-2xx status (see [`NewsError`]).

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::{GeminiSummarizer, RetrySummarizer, Summarizer};
use crate::config::Config;
use crate::error::NewsError;
use crate::models::{SummaryRequest, SummaryResponse};
use crate::partition::TimeRange;
use crate::search::{SearchQuery, search};

pub struct AppState {
    pub config: Config,
    pub summarizer: Arc<dyn Summarizer>,
    cache_control: HeaderValue,
}

impl AppState {
    pub fn new(config: Config, summarizer: Arc<dyn Summarizer>) -> Result<Self, NewsError> {
        let cache_control = HeaderValue::from_str(&config.cache_control)
            .map_err(|e| NewsError::Config(format!("cache_control: {e}")))?;
        Ok(Self {
            config,
            summarizer,
            cache_control,
        })
    }

    /// State backed by the Gemini summarizer with retry.
    pub fn from_config(config: Config) -> Result<Self, NewsError> {
        let gemini = GeminiSummarizer::new(&config.summary, config.summary_max_items())?;
        let summarizer = RetrySummarizer::new(
            gemini,
            config.summary.max_retries,
            Duration::from_secs(1),
        );
        Self::new(config, Arc::new(summarizer))
    }
}

#[derive(Debug, Deserialize)]
pub struct NewsParams {
    q: Option<String>,
    range: Option<String>,
    resolve: Option<bool>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/api/news",
            get(api_news).fallback(|| async { NewsError::MethodNotAllowed("GET") }),
        )
        .route(
            "/api/summary",
            post(api_summary).fallback(|| async { NewsError::MethodNotAllowed("POST") }),
        )
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

async fn api_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsParams>,
) -> Result<Response, NewsError> {
    let topic = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or(NewsError::MissingParameter("q"))?;

    let query = SearchQuery {
        topic: topic.to_string(),
        range: params
            .range
            .as_deref()
            .map(TimeRange::from_token_or_minimal)
            .unwrap_or_default(),
        resolve_links: params.resolve.unwrap_or(true),
    };

    let items = search(&state.config, &query, Utc::now()).await?;
    Ok((
        [(header::CACHE_CONTROL, state.cache_control.clone())],
        Json(items),
    )
        .into_response())
}

async fn api_summary(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Response, NewsError> {
    let Json(req) = body.map_err(|e| NewsError::InvalidRequest(e.body_text()))?;

    let topic = req
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(NewsError::MissingParameter("topic"))?;
    let mut news = req
        .news
        .filter(|n| !n.is_empty())
        .ok_or(NewsError::MissingParameter("news"))?;
    news.truncate(state.config.summary_max_items());

    let text = state
        .summarizer
        .summarize(topic, &news)
        .await
        .inspect_err(|e| warn!(error = %e, "Summary request failed"))?;

    info!(items = news.len(), chars = text.chars().count(), "Summary generated");
    Ok((
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(SummaryResponse { text }),
    )
        .into_response())
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(config: Config, addr: &str) -> Result<(), NewsError> {
    let state = Arc::new(AppState::from_config(config)?);
    if state.config.summary.api_key.is_none() {
        warn!("No summary API key configured; /api/summary will return 500");
    }
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "news_window listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

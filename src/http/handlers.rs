//! HTTP request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::processor::{Job, JobResult};
use crate::quick::QuickResult;
use crate::state::AppState;
use crate::subtitle::ConversionTarget;

const DEFAULT_LANGUAGE: &str = "en";

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::NotFound(path) => {
                (StatusCode::NOT_FOUND, format!("Resource not found: {}", path))
            }
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "status": "error", "message": message }))).into_response()
    }
}

impl From<ServiceError> for HttpError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::UnsupportedTarget(_) | ServiceError::MalformedInput(_) => {
                HttpError::BadRequest(err.to_string())
            }
            _ => HttpError::InternalError(err.to_string()),
        }
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::BadRequest(rejection.body_text())
    }
}

/// `urls` may be a single string or a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UrlList {
    One(String),
    Many(Vec<String>),
}

impl UrlList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            UrlList::One(url) => vec![url],
            UrlList::Many(urls) => urls,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub urls: Option<UrlList>,
    pub lang: Option<String>,
    pub convert: Option<String>,
}

impl BatchRequest {
    /// Normalize into jobs, rejecting a missing `urls` or unknown `convert`.
    pub fn into_jobs(self) -> Result<Vec<Job>, HttpError> {
        let urls = self
            .urls
            .ok_or_else(|| HttpError::BadRequest("Missing required parameter: urls".into()))?
            .into_vec();
        let lang = self.lang.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let conversion = match self.convert.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(target) => Some(target.parse::<ConversionTarget>()?),
        };

        Ok(urls
            .into_iter()
            .map(|url| Job::new(url, lang.clone(), conversion))
            .collect())
    }
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub status: &'static str,
    pub results: Vec<JobResult>,
}

#[derive(Debug, Deserialize)]
pub struct QuickRequest {
    pub url: Option<String>,
    pub lang: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "message": "Service is running",
    }))
}

/// Version endpoint
pub async fn version_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at_utc.to_rfc3339(),
        "uptime_secs": state.uptime_secs(),
    }))
}

/// Results with caption bodies replaced by their length
fn redacted(results: &[JobResult]) -> Vec<serde_json::Value> {
    results
        .iter()
        .map(|result| {
            let mut value = serde_json::to_value(result).unwrap_or_default();
            if let Some(map) = value.as_object_mut() {
                for field in ["content", "converted_content"] {
                    if let Some(text) = map.get(field).and_then(|v| v.as_str()) {
                        let summary = format!("<{} chars>", text.chars().count());
                        map.insert(field.to_string(), summary.into());
                    }
                }
            }
            value
        })
        .collect()
}

/// Batch endpoint
/// POST /batch_subs
pub async fn batch_subs(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, HttpError> {
    let Json(request) = payload?;
    tracing::info!(
        urls = ?request.urls,
        lang = ?request.lang,
        convert = ?request.convert,
        "Batch request received"
    );

    let jobs = request.into_jobs()?;
    let results = state.processor.process_batch(jobs).await;

    tracing::info!(results = ?redacted(&results), "Batch request completed");

    Ok(Json(BatchResponse {
        status: "success",
        results,
    }))
}

/// Quick endpoint usage
/// GET /quick
pub async fn quick_info() -> Json<serde_json::Value> {
    Json(json!({
        "status": "info",
        "message": "Quick caption text API. POST a JSON body like the example below.",
        "example": {
            "url": "https://www.youtube.com/watch?v=xxxxx",
            "lang": DEFAULT_LANGUAGE,
        },
        "response_format": {
            "status": "success/error",
            "text": "caption text",
            "thumbnail": "video thumbnail URL",
            "title": "video title",
            "type": "normal/auto",
        },
    }))
}

/// Quick endpoint
/// POST /quick
pub async fn quick(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QuickRequest>, JsonRejection>,
) -> Result<Json<QuickResult>, HttpError> {
    let Json(request) = payload?;
    let url = request
        .url
        .ok_or_else(|| HttpError::BadRequest("Missing required parameter: url".into()))?;
    let lang = request.lang.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    tracing::info!(%url, %lang, "Quick request received");
    Ok(Json(state.quick.process(&url, &lang).await))
}

/// Debug endpoint - result cache statistics
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = state.cache_stats();
    let lookups = stats.hits + stats.misses;

    Json(json!({
        "entry_count": stats.entry_count,
        "ttl_secs": stats.ttl_secs,
        "hits": stats.hits,
        "misses": stats.misses,
        "oldest_entry_age_secs": stats.oldest_entry_age_secs,
        "hit_ratio": if lookups > 0 {
            format!("{:.1}%", stats.hits as f64 * 100.0 / lookups as f64)
        } else {
            "n/a".to_string()
        },
    }))
}

/// Debug endpoint - error counters
pub async fn error_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.error_stats();
    Json(json!({
        "total": snapshot.total(),
        "counters": snapshot,
    }))
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> HttpError {
    HttpError::NotFound(uri.path().to_string())
}

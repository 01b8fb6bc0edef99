//! End-to-end integration tests
//!
//! The full router bound to a real listener, driven over HTTP with
//! `reqwest`, backed by the scripted caption source.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::http::create_router;
use crate::integration::fixtures::{FakeSource, Outcome, SAMPLE_TTML, VIDEO_ID};
use crate::source::SourceError;
use crate::state::AppState;
use crate::subtitle::Dialect;

/// Serve the router on an ephemeral port. Returns the base URL.
pub async fn spawn_server(source: Arc<FakeSource>, config: ServerConfig) -> (String, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, source));
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr: SocketAddr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://{}", addr), state)
}

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.retry.base_delay_secs = 0;
    config.retry.max_delay_secs = 0;
    config.batch.max_concurrent = Some(3);
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::processor::JobResult;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_batch_over_http() {
        let other = "aaaaaaaaaaa";
        let missing = "bbbbbbbbbbb";
        let source = Arc::new(
            FakeSource::new()
                .with(other, false, Outcome::captions(Dialect::Ttml, SAMPLE_TTML))
                .with(
                    missing,
                    false,
                    Outcome::Fail(SourceError::NotFound("no subtitles".into())),
                ),
        );
        let (base, state) = spawn_server(source.clone(), test_config()).await;

        let urls = vec![
            format!("https://www.youtube.com/watch?v={}", VIDEO_ID),
            format!("https://youtu.be/{}", other),
            format!("https://m.youtube.com/watch?v={}", missing),
            "ftp://example.com/video".to_string(),
            format!("https://www.youtube.com/watch?v={}", VIDEO_ID),
        ];

        let client = reqwest::Client::new();
        let body: Value = client
            .post(format!("{}/batch_subs", base))
            .json(&json!({ "urls": urls, "lang": "en", "convert": "srt" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["status"], "success");
        let results: Vec<JobResult> = serde_json::from_value(body["results"].clone()).unwrap();
        assert_eq!(results.len(), urls.len());

        for url in &urls {
            assert!(results.iter().any(|r| r.url() == url), "missing result for {}", url);
        }

        let codes: Vec<_> = results.iter().filter_map(|r| r.code()).collect();
        assert!(codes.contains(&ErrorCode::SubNotFound));
        assert!(codes.contains(&ErrorCode::ValidationError));
        assert_eq!(results.iter().filter(|r| r.is_success()).count(), 3);

        for result in &results {
            if let JobResult::Success(fetched) = result {
                let srt = fetched.converted_content.as_deref().unwrap();
                assert!(srt.starts_with("1\n00:00:01,000 --> "));
            }
        }

        // The repeated URL may or may not have raced the first; the
        // follow-up request is served from the cache either way.
        let calls = source.calls();
        let again: Value = client
            .post(format!("{}/batch_subs", base))
            .json(&json!({ "urls": urls[0], "convert": "srt" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(again["results"][0]["status"], "success");
        assert_eq!(source.calls(), calls);
        assert!(state.cache_stats().hits >= 1);
    }

    #[tokio::test]
    async fn test_health_and_errors_over_http() {
        let (base, _state) = spawn_server(Arc::new(FakeSource::new()), test_config()).await;
        let client = reqwest::Client::new();

        let health = client.get(format!("{}/health", base)).send().await.unwrap();
        assert_eq!(health.status(), 200);

        let missing = client
            .post(format!("{}/batch_subs", base))
            .json(&json!({ "lang": "en" }))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 400);
        let body: Value = missing.json().await.unwrap();
        assert_eq!(body["status"], "error");

        let unknown = client.get(format!("{}/nothing/here", base)).send().await.unwrap();
        assert_eq!(unknown.status(), 404);
    }

    #[tokio::test]
    async fn test_quick_fallback_over_http() {
        let source = Arc::new(
            FakeSource::new()
                .with(VIDEO_ID, false, Outcome::Fail(SourceError::Transport("reset".into())))
                .with(VIDEO_ID, true, Outcome::captions(Dialect::Ttml, SAMPLE_TTML)),
        );
        let (base, _state) = spawn_server(source, test_config()).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/quick", base))
            .json(&json!({ "url": format!("https://youtu.be/{}", VIDEO_ID) }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["status"], "success");
        assert_eq!(body["type"], "auto");
        assert_eq!(body["title"], format!("Fixture video {}", VIDEO_ID));
    }
}

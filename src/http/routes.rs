//! Axum router configuration

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{
    batch_subs, cache_stats, error_stats, health_check, not_found, quick, quick_info,
    version_check,
};

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        // Health and version endpoints
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        // Caption endpoints
        .route("/batch_subs", post(batch_subs))
        .route("/quick", get(quick_info).post(quick))
        // Debug endpoints
        .route("/debug/cache", get(cache_stats))
        .route("/debug/stats", get(error_stats))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http());

    let router = if state.config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::PUT, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
        router.layer(cors)
    } else {
        router
    };

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::integration::fixtures::FakeSource;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn app() -> Router {
        let state = Arc::new(AppState::new(
            ServerConfig::default(),
            Arc::new(FakeSource::new()),
        ));
        create_router(state)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_version() {
        let response = app()
            .oneshot(Request::get("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["name"], "subtitle-service");
        let started_at = body["started_at"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(started_at).is_ok());
    }

    #[tokio::test]
    async fn test_cors_options() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/batch_subs")
            .header(header::ORIGIN, "http://localhost:8080")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
        let methods = response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(methods.contains("POST"));
        assert!(methods.contains("DELETE"));
    }

    #[tokio::test]
    async fn test_batch_scenario() {
        let response = app()
            .oneshot(post_json(
                "/batch_subs",
                json!({
                    "urls": ["bad-url", "https://youtu.be/dQw4w9WgXcQ"],
                    "lang": "en",
                    "convert": "json",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);

        let bad = results.iter().find(|r| r["url"] == "bad-url").unwrap();
        assert_eq!(bad["status"], "error");
        assert_eq!(bad["code"], "VALIDATION_ERROR");

        let good = results
            .iter()
            .find(|r| r["url"] == "https://youtu.be/dQw4w9WgXcQ")
            .unwrap();
        assert_eq!(good["status"], "success");
        let cues: Value = serde_json::from_str(good["converted_content"].as_str().unwrap()).unwrap();
        assert!(cues.as_array().unwrap().iter().all(|c| c["index"].is_u64()));
    }

    #[tokio::test]
    async fn test_batch_bad_requests() {
        for body in [
            json!({ "lang": "en" }),
            json!({ "urls": "https://youtu.be/dQw4w9WgXcQ", "convert": "pdf" }),
            json!({ "urls": 7 }),
        ] {
            let response = app().oneshot(post_json("/batch_subs", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["status"], "error");
        }

        let response = app()
            .oneshot(
                Request::post("/batch_subs")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_quick_routes() {
        let response = app()
            .oneshot(Request::get("/quick").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["status"], "info");

        let response = app()
            .oneshot(post_json("/quick", json!({ "lang": "en" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app()
            .oneshot(post_json("/quick", json!({ "url": "https://youtu.be/dQw4w9WgXcQ" })))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["type"], "normal");
        assert!(body["text"].as_str().unwrap().contains("Never gonna"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = app()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("/nope"));
    }

    #[tokio::test]
    async fn test_debug_endpoints() {
        let state = Arc::new(AppState::new(
            ServerConfig::default(),
            Arc::new(FakeSource::new()),
        ));
        let app = create_router(state.clone());

        app.clone()
            .oneshot(post_json("/batch_subs", json!({ "urls": ["x", "y"] })))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(Request::get("/debug/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["counters"]["validation_errors"], 2);

        let response = app
            .oneshot(Request::get("/debug/cache").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["entry_count"], 0);
        assert_eq!(body["ttl_secs"], 1800);
    }
}

// src/web/mod.rs
// Web server layer: chat relay and syntax check endpoints

pub mod api;
pub mod error;
pub mod state;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::web::state::AppState;

pub use api::CHAT_ERROR_MESSAGE;

/// Create the web server router. Only `allowed_origin` may make
/// credentialed cross-origin requests.
pub fn create_router(state: AppState, allowed_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(allowed_origin))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    let api_router = Router::new()
        .route("/chat", post(api::chat))
        .route("/syntax", post(api::syntax))
        .route("/health", get(api::health));

    Router::new()
        .route("/health", get(api::health))
        .nest("/api", api_router)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{TextGenerator, UpstreamError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    const ORIGIN: &str = "http://localhost:3000";

    /// Echoes the prompt back, or fails when it says "fail"
    struct EchoGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if prompt == "fail" {
                Err(UpstreamError::Status {
                    status: 500,
                    body: "boom".to_string(),
                })
            } else {
                Ok(format!("echo: {}", prompt))
            }
        }

        fn name(&self) -> String {
            "echo".to_string()
        }
    }

    fn echo_router() -> (Router, Arc<EchoGenerator>) {
        let generator = Arc::new(EchoGenerator {
            calls: AtomicUsize::new(0),
        });
        let state = AppState::with_generator(generator.clone());
        (create_router(state, HeaderValue::from_static(ORIGIN)), generator)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    // ============================================================================
    // Chat
    // ============================================================================

    #[tokio::test]
    async fn test_chat_relays_reply() {
        let (app, generator) = echo_router();
        let response = app
            .oneshot(post_json("/api/chat", json!({"message": "こんにちは"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"response": "echo: こんにちは"}));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chat_upstream_failure_is_200() {
        let (app, _) = echo_router();
        let response = app
            .oneshot(post_json("/api/chat", json!({"message": "fail"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"response": CHAT_ERROR_MESSAGE}));
    }

    #[tokio::test]
    async fn test_chat_unconfigured() {
        let app = create_router(AppState::unconfigured(), HeaderValue::from_static(ORIGIN));
        let response = app
            .oneshot(post_json("/api/chat", json!({"message": "hi"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["response"], CHAT_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_chat_rejects_wrong_shape() {
        let (app, generator) = echo_router();
        let response = app
            .oneshot(post_json("/api/chat", json!({"text": "hi"})))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    // ============================================================================
    // Syntax
    // ============================================================================

    #[tokio::test]
    async fn test_syntax_endpoint() {
        for (code, expected) in [
            ("x = 1", "complete"),
            ("if x:", "incomplete"),
            ("x = = 1", "invalid"),
        ] {
            let (app, _) = echo_router();
            let response = app
                .oneshot(post_json("/api/syntax", json!({"code": code})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json(response).await, json!({"status": expected}));
        }
    }

    #[tokio::test]
    async fn test_syntax_too_complex() {
        let (app, _) = echo_router();
        let code = format!("x = {}1", "~".repeat(crate::syntax::MAX_DEPTH * 2));
        let response = app
            .oneshot(post_json("/api/syntax", json!({"code": code})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["error_code"], "TOO_COMPLEX");
    }

    // ============================================================================
    // Health and CORS
    // ============================================================================

    #[tokio::test]
    async fn test_health() {
        let (app, _) = echo_router();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["upstream"], true);
    }

    #[tokio::test]
    async fn test_cors_preflight_allowed_origin() {
        let (app, _) = echo_router();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/chat")
            .header(header::ORIGIN, ORIGIN)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "content-type");
    }

    #[tokio::test]
    async fn test_cors_other_origin_not_allowed() {
        let (app, _) = echo_router();
        let mut request = post_json("/api/chat", json!({"message": "hi"}));
        request
            .headers_mut()
            .insert(header::ORIGIN, HeaderValue::from_static("http://evil.example"));
        let response = app.oneshot(request).await.unwrap();

        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}

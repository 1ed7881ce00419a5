// src/llm/gemini/client.rs
// Google Gemini generateContent client (single turn, non-streaming)
// Retries once through a fallback endpoint when the caller's region is rejected

use crate::llm::gemini::extraction::extract_reply;
use crate::llm::gemini::types::{GeminiRequest, GeminiResponse};
use crate::llm::provider::{Provider, TextGenerator, UpstreamError};
use async_trait::async_trait;
use std::time::Instant;
use tracing::{Span, debug, info, instrument, warn};
use uuid::Uuid;

/// Public Gemini API root
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Marker in the upstream error when the request region is not served
const LOCATION_UNSUPPORTED: &str = "User location is not supported";

/// Google Gemini API client
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    /// Alternate API root used when the primary rejects the caller's location
    fallback_base_url: Option<String>,
    http: reqwest::Client,
}

impl GeminiClient {
    /// Create a Gemini client on a shared HTTP client
    pub fn with_http_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            model,
            base_url: GEMINI_API_BASE.to_string(),
            fallback_base_url: None,
            http: client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_fallback_base_url(mut self, fallback: Option<String>) -> Self {
        self.fallback_base_url = fallback;
        self
    }

    fn endpoint(&self, base: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            base.trim_end_matches('/'),
            self.model
        )
    }

    /// One POST against `base`. The key travels as a query parameter and is
    /// stripped from transport errors before they can reach a log line.
    async fn send(
        &self,
        request_id: &str,
        base: &str,
        request: &GeminiRequest,
    ) -> Result<String, UpstreamError> {
        let url = self.endpoint(base);
        debug!(request_id = %request_id, url = %url, "Sending Gemini request");

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| UpstreamError::Http(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Http(e.without_url()))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: GeminiResponse = serde_json::from_str(&body)?;
        extract_reply(data)
    }
}

fn is_location_error(err: &UpstreamError) -> bool {
    err.upstream_message()
        .is_some_and(|message| message.contains(LOCATION_UNSUPPORTED))
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[instrument(skip(self, prompt), fields(request_id, model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let request_id = Uuid::new_v4().to_string();
        let start_time = Instant::now();

        Span::current().record("request_id", &request_id);

        info!(
            request_id = %request_id,
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "Starting Gemini generateContent request"
        );

        let request = GeminiRequest::user_prompt(prompt);

        let result = match self.send(&request_id, &self.base_url, &request).await {
            Err(err) if is_location_error(&err) => match &self.fallback_base_url {
                Some(fallback) => {
                    warn!(
                        request_id = %request_id,
                        "User location rejected, retrying through fallback endpoint"
                    );
                    self.send(&request_id, fallback, &request).await
                }
                None => Err(err),
            },
            other => other,
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        match &result {
            Ok(text) => info!(
                request_id = %request_id,
                duration_ms,
                response_chars = text.chars().count(),
                "Gemini request complete"
            ),
            Err(err) => warn!(
                request_id = %request_id,
                duration_ms,
                error = %err,
                "Gemini request failed"
            ),
        }

        result
    }

    fn name(&self) -> String {
        format!("{}:{}", Provider::Gemini, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::create_shared_client;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "gemini-2.5-flash";
    const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

    fn test_client(api_key: &str) -> GeminiClient {
        let http = create_shared_client(Duration::from_secs(5));
        GeminiClient::with_http_client(api_key.to_string(), MODEL.to_string(), http)
    }

    fn client_for(server: &MockServer) -> GeminiClient {
        test_client("test-key").with_base_url(server.uri())
    }

    fn reply(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        })
    }

    fn location_error() -> serde_json::Value {
        json!({
            "error": {
                "code": 400,
                "message": "User location is not supported for the API use.",
                "status": "FAILED_PRECONDITION"
            }
        })
    }

    // ============================================================================
    // Construction
    // ============================================================================

    #[test]
    fn test_endpoint_format() {
        let client = test_client("k").with_base_url("http://host/v1beta/");
        assert_eq!(
            client.endpoint("http://host/v1beta/"),
            "http://host/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(client.name(), "gemini:gemini-2.5-flash");
    }

    #[test]
    fn test_is_location_error() {
        let err = UpstreamError::Status {
            status: 400,
            body: location_error().to_string(),
        };
        assert!(is_location_error(&err));
        assert!(!is_location_error(&UpstreamError::EmptyResponse));
    }

    // ============================================================================
    // Requests against a mock upstream
    // ============================================================================

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(query_param("key", "test-key"))
            .and(body_json(json!({
                "contents": [{"role": "user", "parts": [{"text": "Pythonとは?"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("プログラミング言語です")))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).generate("Pythonとは?").await.unwrap();
        assert_eq!(text, "プログラミング言語です");
    }

    #[tokio::test]
    async fn test_generate_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        match client_for(&server).generate("hi").await {
            Err(UpstreamError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected Status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = client_for(&server).generate("hi").await;
        assert!(matches!(result, Err(UpstreamError::Decode(_))));
    }

    #[tokio::test]
    async fn test_generate_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let result = client_for(&server).generate("hi").await;
        assert!(matches!(result, Err(UpstreamError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_location_error_uses_fallback() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(location_error()))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("via proxy")))
            .expect(1)
            .mount(&fallback)
            .await;

        let client = client_for(&primary).with_fallback_base_url(Some(fallback.uri()));
        assert_eq!(client.generate("hi").await.unwrap(), "via proxy");
    }

    #[tokio::test]
    async fn test_location_error_without_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(location_error()))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).generate("hi").await;
        assert!(matches!(result, Err(UpstreamError::Status { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_other_errors_skip_fallback() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("unused")))
            .expect(0)
            .mount(&fallback)
            .await;

        let client = client_for(&primary).with_fallback_base_url(Some(fallback.uri()));
        assert!(client.generate("hi").await.is_err());
    }

    #[tokio::test]
    async fn test_transport_error_hides_key() {
        let client = test_client("secret-key").with_base_url("http://127.0.0.1:1");

        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Http(_)));
        assert!(!err.to_string().contains("secret-key"));
    }
}

// src/llm/gemini/extraction.rs
// Response extraction helpers for Gemini API responses

use crate::llm::gemini::types::{GeminiContent, GeminiPart, GeminiResponse};
use crate::llm::provider::UpstreamError;

/// Extract text content from Gemini response (non-thought parts only)
pub fn extract_content(content: &GeminiContent) -> Option<String> {
    let text_parts: Vec<&str> = content
        .parts
        .iter()
        .filter_map(|part| match part {
            GeminiPart::Text { text, thought } if !thought => Some(text.as_str()),
            _ => None,
        })
        .collect();

    if text_parts.is_empty() {
        None
    } else {
        Some(text_parts.join(""))
    }
}

/// Reply text of the first candidate, or why there is none
pub fn extract_reply(response: GeminiResponse) -> Result<String, UpstreamError> {
    if let Some(error) = response.error {
        return Err(UpstreamError::Api(error.message));
    }

    let block_reason = response.prompt_feedback.and_then(|f| f.block_reason);

    let text = response
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(extract_content);

    match (text, block_reason) {
        (Some(text), _) if !text.is_empty() => Ok(text),
        (_, Some(reason)) => Err(UpstreamError::Blocked(reason)),
        _ => Err(UpstreamError::EmptyResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(text: &str, thought: bool) -> GeminiPart {
        GeminiPart::Text {
            text: text.to_string(),
            thought,
        }
    }

    fn response(raw: &str) -> GeminiResponse {
        serde_json::from_str(raw).unwrap()
    }

    // ============================================================================
    // extract_content tests
    // ============================================================================

    #[test]
    fn test_extract_content_joins_text() {
        let content = GeminiContent {
            role: "model".to_string(),
            parts: vec![text("Hello ", false), text("world", false)],
        };
        assert_eq!(extract_content(&content), Some("Hello world".to_string()));
    }

    #[test]
    fn test_extract_content_skips_thoughts() {
        let content = GeminiContent {
            role: "model".to_string(),
            parts: vec![text("planning", true), text("answer", false)],
        };
        assert_eq!(extract_content(&content), Some("answer".to_string()));
    }

    #[test]
    fn test_extract_content_empty() {
        let content = GeminiContent {
            role: "model".to_string(),
            parts: vec![text("only thinking", true)],
        };
        assert_eq!(extract_content(&content), None);
    }

    // ============================================================================
    // extract_reply tests
    // ============================================================================

    #[test]
    fn test_extract_reply_first_candidate() {
        let data = response(
            r#"{"candidates": [
                {"content": {"parts": [{"text": "first"}]}},
                {"content": {"parts": [{"text": "second"}]}}
            ]}"#,
        );
        assert_eq!(extract_reply(data).unwrap(), "first");
    }

    #[test]
    fn test_extract_reply_no_candidates() {
        let data = response(r#"{"candidates": []}"#);
        assert!(matches!(extract_reply(data), Err(UpstreamError::EmptyResponse)));
    }

    #[test]
    fn test_extract_reply_blocked() {
        let data = response(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#);
        match extract_reply(data) {
            Err(UpstreamError::Blocked(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_reply_error_body() {
        let data = response(r#"{"error": {"code": 400, "message": "bad key"}}"#);
        match extract_reply(data) {
            Err(UpstreamError::Api(message)) => assert_eq!(message, "bad key"),
            other => panic!("expected Api error, got {:?}", other),
        }
    }
}

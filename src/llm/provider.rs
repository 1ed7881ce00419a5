// src/llm/provider.rs
// Upstream provider abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Supported upstream providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
}

impl Provider {
    /// Default model for this provider
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

/// Failures talking to the upstream provider
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream API error: {0}")]
    Api(String),

    #[error("failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upstream returned no text")]
    EmptyResponse,

    #[error("prompt blocked by upstream: {0}")]
    Blocked(String),
}

impl UpstreamError {
    /// Message text reported by the upstream, if any
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            Self::Api(message) => Some(message),
            _ => None,
        }
    }
}

/// Anything that turns a prompt into generated text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a single reply for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError>;

    /// Short name for logs
    fn name(&self) -> String;
}

// src/web/state.rs
// Web server state management

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::http::create_shared_client;
use crate::llm::{GeminiClient, TextGenerator};

/// The upstream behind the chat route
#[derive(Clone)]
pub enum Upstream {
    /// No API key; every chat request gets the fallback message
    Unconfigured,
    Ready(Arc<dyn TextGenerator>),
}

/// Shared application state. Built once at startup, read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Upstream,
}

impl AppState {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub fn with_generator(generator: Arc<dyn TextGenerator>) -> Self {
        Self::new(Upstream::Ready(generator))
    }

    pub fn unconfigured() -> Self {
        Self::new(Upstream::Unconfigured)
    }

    /// Build the Gemini client described by `config`, if a key is present
    pub fn from_config(config: &RelayConfig) -> Self {
        let Some(api_key) = config.api_keys.gemini.clone() else {
            warn!("Chat relay running without an upstream");
            return Self::unconfigured();
        };

        let http = create_shared_client(config.upstream_timeout);
        let client = GeminiClient::with_http_client(api_key, config.model.clone(), http)
            .with_base_url(config.base_url.clone())
            .with_fallback_base_url(config.fallback_base_url.clone());

        info!(
            model = %config.model,
            fallback = config.fallback_base_url.is_some(),
            timeout_secs = config.upstream_timeout.as_secs(),
            "Chat relay upstream configured"
        );
        Self::with_generator(Arc::new(client))
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.upstream, Upstream::Ready(_))
    }
}

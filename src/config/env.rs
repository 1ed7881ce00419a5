// src/config/env.rs
// Environment-based configuration for the relay server

use axum::http::HeaderValue;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::llm::Provider;
use crate::llm::gemini::GEMINI_API_BASE;

/// Environment variables checked for the upstream key, in order
pub const API_KEY_VARS: [&str; 3] = ["API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

/// API keys loaded from environment variables
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// Gemini key (API_KEY, GEMINI_API_KEY or GOOGLE_API_KEY)
    pub gemini: Option<String>,
}

impl ApiKeys {
    /// Load API keys from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load API keys through `lookup`, filtering empty values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini = API_KEY_VARS.iter().find_map(|name| {
            lookup(name)
                .filter(|k| !k.trim().is_empty())
                .inspect(|_| debug!(source = *name, "Gemini API key found"))
        });

        let keys = Self { gemini };
        if !keys.has_llm_provider() {
            warn!("No API key configured - chat replies will be the fallback message");
        }
        keys
    }

    pub fn has_llm_provider(&self) -> bool {
        self.gemini.is_some()
    }
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("gemini", &self.gemini.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Validation results
#[derive(Debug, Default)]
pub struct ConfigValidation {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Format as a human-readable report
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        if !self.errors.is_empty() {
            lines.push("Errors:".to_string());
            for err in &self.errors {
                lines.push(format!("  - {}", err));
            }
        }

        if !self.warnings.is_empty() {
            lines.push("Warnings:".to_string());
            for warn in &self.warnings {
                lines.push(format!("  - {}", warn));
            }
        }

        if lines.is_empty() {
            "Configuration OK".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// Everything `serve` needs, resolved from flags and environment
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// The single browser origin allowed by CORS
    pub allowed_origin: String,
    pub model: String,
    pub base_url: String,
    pub fallback_base_url: Option<String>,
    pub upstream_timeout: Duration,
    pub api_keys: ApiKeys,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            model: Provider::Gemini.default_model().to_string(),
            base_url: GEMINI_API_BASE.to_string(),
            fallback_base_url: None,
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            api_keys: ApiKeys::default(),
        }
    }
}

impl RelayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The allowed origin as a header value for the CORS layer
    pub fn origin_header(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.allowed_origin).ok()
    }

    /// Check the configuration and return any issues
    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::new();

        if !self.api_keys.has_llm_provider() {
            validation.add_warning(format!(
                "No API key configured. Set one of {}.",
                API_KEY_VARS.join(", ")
            ));
        }

        if self.origin_header().is_none() {
            validation.add_error(format!(
                "Allowed origin '{}' is not a valid header value",
                self.allowed_origin
            ));
        } else if !is_bare_origin(&self.allowed_origin) {
            validation.add_error(format!(
                "Allowed origin '{}' must look like http(s)://host[:port]",
                self.allowed_origin
            ));
        }

        if !is_http_url(&self.base_url) {
            validation.add_error(format!("Base URL '{}' is not an http(s) URL", self.base_url));
        }

        if let Some(fallback) = &self.fallback_base_url
            && !is_http_url(fallback)
        {
            validation.add_warning(format!(
                "Fallback base URL '{}' is not an http(s) URL; it will fail when used",
                fallback
            ));
        }

        if self.upstream_timeout.is_zero() {
            validation.add_error("Upstream timeout must be greater than zero");
        }

        if self.model.trim().is_empty() {
            validation.add_error("Model name must not be empty");
        }

        validation
    }
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Origins are compared byte-for-byte by browsers, so only the serialized
/// form `scheme://host[:port]` is accepted.
fn is_bare_origin(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            url.origin().ascii_serialization() == raw
        }
        _ => false,
    }
}

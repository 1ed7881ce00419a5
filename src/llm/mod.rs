// src/llm/mod.rs
// Upstream text generation

pub mod gemini;
pub mod provider;

pub use gemini::GeminiClient;
pub use provider::{Provider, TextGenerator, UpstreamError};

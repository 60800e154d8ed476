//! OpenAI-compatible providers
//!
//! OpenRouter, Groq and Cerebras all expose `POST {base}/chat/completions`
//! with bearer auth. Their differences (attribution headers, per-model
//! parameters, where the reasoning trace lives) are carried as data in
//! [`OpenAiCompatConfig`] and the request, not as code paths.

/// Client implementation
pub mod client;
/// Wire types and configuration
pub mod types;


pub use client::OpenAiCompatClient;
pub use types::OpenAiCompatConfig;

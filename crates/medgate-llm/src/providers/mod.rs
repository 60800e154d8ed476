//! Provider clients
//!
//! Every backend is reached through [`ProviderClient`]. Adapters convert
//! transport and HTTP failures into [`Error`](crate::Error) variants before
//! returning, so the router only ever sees classified errors.

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::Result;

/// OpenAI-compatible chat completions adapter
pub mod openai_compat;

pub use openai_compat::{OpenAiCompatClient, OpenAiCompatConfig};

/// Uniform call interface for an LLM provider
#[async_trait::async_trait]
pub trait ProviderClient: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Run one chat completion against `request.model`
    async fn call(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Model identifiers the provider currently advertises
    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

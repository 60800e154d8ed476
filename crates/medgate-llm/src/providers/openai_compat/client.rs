use super::types::{ChatRequest, ChatResponse, ErrorBody, ModelsResponse, OpenAiCompatConfig};
use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::providers::ProviderClient;
use crate::util::sanitize_api_error;
use reqwest::Client;
use tracing::{debug, instrument};

// ============================================================================
// Error classification
// ============================================================================

/// Map a non-success HTTP response onto an [`Error`] variant.
///
/// The provider message is sanitized before it is stored. Status codes win
/// over body hints; body hints only refine otherwise unclassified statuses.
pub(crate) fn classify_http_error(status: u16, body: &str, api_key: Option<&str>) -> Error {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let (message, codes) = match &parsed {
        Some(b) if !b.error.message.is_empty() => (b.error.message.clone(), b.error.codes()),
        Some(b) => (body.to_string(), b.error.codes()),
        None => (body.to_string(), String::new()),
    };
    let message = sanitize_api_error(&message, api_key);
    let hints = format!("{} {}", codes, message.to_lowercase());

    match status {
        429 | 402 => Error::RateLimit(message),
        401 | 403 => Error::Authentication(message),
        404 => Error::ModelNotFound(message),
        _ if hints.contains("model_not_found") => Error::ModelNotFound(message),
        _ if hints.contains("rate_limit") || hints.contains("rate limit") => {
            Error::RateLimit(message)
        }
        _ => Error::Api { status, message },
    }
}

fn transport_error(err: &reqwest::Error, timeout_ms: u64) -> Error {
    if err.is_timeout() {
        Error::Timeout(timeout_ms)
    } else {
        Error::Network(err.to_string())
    }
}

// ============================================================================
// Client
// ============================================================================

/// Chat completions client for any OpenAI-compatible endpoint
pub struct OpenAiCompatClient {
    client: Client,
    config: OpenAiCompatConfig,
}

impl OpenAiCompatClient {
    /// Create a new client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiCompatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Client configuration
    #[must_use]
    pub fn config(&self) -> &OpenAiCompatConfig {
        &self.config
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut builder = builder.header("Authorization", format!("Bearer {}", self.config.api_key));
        for (name, value) in &self.config.extra_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    /// Send a request and decode the JSON body of a successful response
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout_ms()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(&e, self.timeout_ms()))?;

        if !status.is_success() {
            return Err(classify_http_error(
                status.as_u16(),
                &text,
                Some(&self.config.api_key),
            ));
        }

        serde_json::from_str(&text).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ProviderClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    #[instrument(skip(self, request), fields(provider = %self.config.name, model = %request.model))]
    async fn call(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
        };

        let url = self.config.endpoint("chat/completions");
        let response: ChatResponse = self.send(self.client.post(&url).json(&body)).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidResponse("No choices in response".to_string()))?;

        let reasoning = choice.reasoning_trace();
        let content = choice.message.content.unwrap_or_default();
        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total(),
        });

        debug!(
            tokens = usage.map(|u| u.total_tokens),
            has_reasoning = reasoning.is_some(),
            "Completion received"
        );

        Ok(CompletionResponse {
            content,
            reasoning,
            usage,
            finish_reason: choice.finish_reason,
            model: response.model.unwrap_or(request.model),
        })
    }

    #[instrument(skip(self), fields(provider = %self.config.name))]
    async fn list_models(&self) -> Result<Vec<String>> {
        let url = self.config.endpoint("models");
        let response: ModelsResponse = self.send(self.client.get(&url)).await?;
        Ok(response.data.into_iter().map(|m| m.id).collect())
    }
}

use crate::message::Message;
use crate::registry::ProviderSpec;
use crate::util::mask_api_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

// ============================================================================
// Configuration
// ============================================================================

/// OpenAI-compatible provider configuration
#[derive(Clone)]
pub struct OpenAiCompatConfig {
    /// Provider name, used in logs and errors
    pub name: String,
    /// API key
    pub api_key: String,
    /// Base URL (without `/chat/completions`)
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Headers added to every request
    pub extra_headers: BTreeMap<String, String>,
}

// SECURITY: Custom Debug implementation to mask API key
impl fmt::Debug for OpenAiCompatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatConfig")
            .field("name", &self.name)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("extra_headers", &self.extra_headers)
            .finish()
    }
}

impl OpenAiCompatConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout: crate::registry::DEFAULT_TIMEOUT,
            extra_headers: BTreeMap::new(),
        }
    }

    /// Build from a provider description, `None` when it has no credential
    #[must_use]
    pub fn from_spec(spec: &ProviderSpec) -> Option<Self> {
        if !spec.has_credential() {
            return None;
        }
        let api_key = spec.api_key.clone()?;
        Some(Self {
            name: spec.name.clone(),
            api_key,
            base_url: spec.base_url.clone(),
            timeout: spec.timeout,
            extra_headers: spec.extra_headers.clone(),
        })
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a header sent with every request
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    /// `base_url` joined with `path`
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub(crate) model: &'a str,
    pub(crate) messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub(crate) choices: Vec<ChatChoice>,
    pub(crate) usage: Option<ChatUsage>,
    pub(crate) model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub(crate) message: ChatResponseMessage,
    pub(crate) finish_reason: Option<String>,
    /// Some providers put the trace on the choice itself
    #[serde(default)]
    pub(crate) thinking: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseMessage {
    pub(crate) content: Option<String>,
    #[serde(default)]
    pub(crate) reasoning: Option<String>,
    #[serde(default)]
    pub(crate) reasoning_content: Option<String>,
    #[serde(default)]
    pub(crate) thinking: Option<String>,
}

impl ChatChoice {
    /// First non-empty reasoning trace the provider returned
    pub(crate) fn reasoning_trace(&self) -> Option<String> {
        [
            &self.message.reasoning,
            &self.message.reasoning_content,
            &self.message.thinking,
            &self.thinking,
        ]
        .into_iter()
        .flatten()
        .find(|t| !t.trim().is_empty())
        .cloned()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatUsage {
    #[serde(default)]
    pub(crate) prompt_tokens: u32,
    #[serde(default)]
    pub(crate) completion_tokens: u32,
    #[serde(default)]
    pub(crate) total_tokens: Option<u32>,
}

impl ChatUsage {
    /// Reported total, or prompt + completion when the total is omitted
    pub(crate) fn total(&self) -> u32 {
        self.total_tokens
            .unwrap_or_else(|| self.prompt_tokens.saturating_add(self.completion_tokens))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) code: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    pub(crate) kind: Option<String>,
}

impl ErrorDetail {
    /// `code` and `type` flattened into one lowercase string
    pub(crate) fn codes(&self) -> String {
        let code = match &self.code {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        format!("{} {}", code, self.kind.as_deref().unwrap_or_default()).to_lowercase()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelsResponse {
    #[serde(default)]
    pub(crate) data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelEntry {
    pub(crate) id: String,
}

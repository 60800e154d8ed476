//! Scripted provider client for testing
//!
//! Replays queued results in order and records every request it receives.
//! When the queue is empty it answers with a fixed completion.

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::Result;
use crate::providers::ProviderClient;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Tokens reported by the default reply
pub const DEFAULT_REPLY_TOKENS: u32 = 10;

/// A provider client that returns queued results
pub struct ScriptedClient {
    name: String,
    script: Mutex<VecDeque<Result<CompletionResponse>>>,
    calls: Mutex<Vec<CompletionRequest>>,
    models: Vec<String>,
    delay: Option<Duration>,
}

impl ScriptedClient {
    /// Create a client with an empty script
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            models: Vec::new(),
            delay: None,
        }
    }

    /// Sleep before answering each call
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Models returned by `list_models`
    #[must_use]
    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|m| (*m).to_string()).collect();
        self
    }

    /// Queue a successful response
    pub fn push_ok(&self, response: CompletionResponse) {
        self.push(Ok(response));
    }

    /// Queue a failure
    pub fn push_err(&self, error: crate::Error) {
        self.push(Err(error));
    }

    fn push(&self, result: Result<CompletionResponse>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(result);
    }

    /// Requests received so far
    #[must_use]
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of requests received so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait::async_trait]
impl ProviderClient for ScriptedClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request.model.clone();
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        next.unwrap_or_else(|| {
            Ok(CompletionResponse::text(&model, format!("reply from {}", self.name))
                .with_total_tokens(DEFAULT_REPLY_TOKENS))
        })
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(self.models.clone())
    }
}

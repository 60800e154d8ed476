//! Failover router implementation
//!
//! `dispatch` walks the selector's candidate list once. Each candidate passes
//! the admission gate or is skipped, is called at most once, and on failure
//! is classified before moving on. The first success ends the walk.

use super::config::RouterConfig;
use super::outcome::{
    AttemptOutcome, AttemptRecord, CallOutcome, Completion, DispatchFailure, DispatchRequest,
    ModelAvailability, ProviderStatus, TokenUsageRow,
};
use crate::clock::{Clock, SystemClock};
use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::{Error, Result};
use crate::message::{with_system_prompt, Message};
use crate::providers::ProviderClient;
use crate::registry::{Capability, ModelRegistry, ProviderEntry};
use crate::selector::CandidateSelector;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Routes requests across providers with budget and breaker checks
pub struct FailoverRouter {
    registry: Arc<ModelRegistry>,
    clock: Arc<dyn Clock>,
    config: RouterConfig,
}

impl FailoverRouter {
    /// Create a router on the wall clock with default messages
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemClock),
            config: RouterConfig::default(),
        }
    }

    /// Use another time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the router configuration
    #[must_use]
    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// The registry
    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// The time source used for breaker expiry
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// The router configuration
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Route a conversation to the first candidate that answers.
    ///
    /// Never fails: when every candidate is skipped or fails the outcome is a
    /// [`CallOutcome::Failure`] carrying the capability's exhaustion message.
    #[instrument(
        skip(self, request),
        fields(capability = %request.capability, preferred = ?request.preferred_model)
    )]
    pub async fn dispatch(&self, request: DispatchRequest) -> CallOutcome {
        let DispatchRequest {
            messages,
            capability,
            preferred_model,
            system_prompt,
        } = request;
        let messages = with_system_prompt(messages, system_prompt.as_deref());

        let Some(candidates) =
            CandidateSelector::select(&self.registry, capability, preferred_model.as_deref())
        else {
            return self.exhausted(capability, Vec::new(), None);
        };

        let mut attempts = Vec::with_capacity(candidates.len());
        let mut last_error = None;

        for candidate in candidates {
            let provider = &candidate.provider;
            let model = candidate.model.name.as_str();
            let started_at = self.clock.now();

            let client = match provider.admit(started_at).await {
                Ok(client) => client,
                Err(reason) => {
                    debug!(provider = %provider.name(), model, reason = %reason, "Skipping candidate");
                    attempts.push(AttemptRecord {
                        provider: provider.name().to_string(),
                        model: model.to_string(),
                        started_at,
                        outcome: AttemptOutcome::Skipped { reason },
                    });
                    continue;
                }
            };

            let call = self.completion_request(provider, model, &messages);
            match self.call(provider, client.as_ref(), call).await {
                Ok(response) => {
                    let tokens = response.total_tokens();
                    let used_today = provider.record_success(tokens).await;
                    info!(
                        provider = %provider.name(),
                        model,
                        tokens,
                        used_today,
                        daily_limit = provider.spec().daily_limit,
                        "Completion succeeded"
                    );
                    attempts.push(AttemptRecord {
                        provider: provider.name().to_string(),
                        model: model.to_string(),
                        started_at,
                        outcome: AttemptOutcome::Succeeded { tokens },
                    });
                    return CallOutcome::Success(Completion {
                        text: response.content,
                        provider: provider.name().to_string(),
                        model: model.to_string(),
                        capability,
                        reasoning: response.reasoning,
                        tokens_used: response.usage.map(|_| tokens),
                        attempts,
                    });
                }
                Err(err) => {
                    let class = err.class();
                    let message = err.to_string();
                    warn!(
                        provider = %provider.name(),
                        model,
                        class = %class,
                        error = %message,
                        "Candidate failed"
                    );
                    provider
                        .record_failure(self.clock.now(), class, &message)
                        .await;
                    attempts.push(AttemptRecord {
                        provider: provider.name().to_string(),
                        model: model.to_string(),
                        started_at,
                        outcome: AttemptOutcome::Failed {
                            class,
                            error: message.clone(),
                        },
                    });
                    last_error = Some(message);
                }
            }
        }

        self.exhausted(capability, attempts, last_error)
    }

    fn completion_request(
        &self,
        provider: &ProviderEntry,
        model: &str,
        messages: &[Message],
    ) -> CompletionRequest {
        let params = provider.spec().call_params(model);
        CompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
        }
    }

    fn timeout_for(&self, provider: &ProviderEntry) -> Duration {
        self.config.call_timeout.unwrap_or(provider.spec().timeout)
    }

    /// One provider call bounded by the provider timeout
    async fn call(
        &self,
        provider: &ProviderEntry,
        client: &dyn ProviderClient,
        request: CompletionRequest,
    ) -> Result<CompletionResponse> {
        let timeout = self.timeout_for(provider);
        tokio::time::timeout(timeout, client.call(request))
            .await
            .map_err(|_| Error::Timeout(millis(timeout)))?
    }

    fn exhausted(
        &self,
        capability: Capability,
        tried: Vec<AttemptRecord>,
        last_error: Option<String>,
    ) -> CallOutcome {
        error!(
            capability = %capability,
            candidates = tried.len(),
            called = tried.iter().filter(|a| a.was_called()).count(),
            last_error = last_error.as_deref().unwrap_or("none"),
            "All candidates exhausted"
        );
        CallOutcome::Failure(DispatchFailure {
            message: self.config.messages.for_capability(capability).to_string(),
            capability,
            tried,
            last_error,
        })
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Every model with whether the admission gate would let it through now
    pub async fn list_models_with_availability(&self) -> Vec<ModelAvailability> {
        let now = self.clock.now();
        let mut rows = Vec::new();
        for provider in self.registry.providers() {
            let skip_reason = provider.admit(now).await.err();
            for model in provider.models() {
                rows.push(ModelAvailability {
                    provider: provider.name().to_string(),
                    model: model.name.clone(),
                    priority: model.priority,
                    capability: model.capability,
                    available: skip_reason.is_none(),
                    skip_reason,
                });
            }
        }
        rows
    }

    /// Zero every provider's daily usage and counters.
    ///
    /// Returns the total tokens that were cleared.
    pub async fn reset_token_usage(&self) -> u64 {
        let mut cleared = 0u64;
        for provider in self.registry.providers() {
            let previous = provider.reset_daily_usage().await;
            debug!(provider = %provider.name(), previous, "Reset daily usage");
            cleared = cleared.saturating_add(previous);
        }
        info!(cleared, providers = self.registry.len(), "Daily token usage reset");
        cleared
    }

    /// Block a provider until the end of the day
    ///
    /// # Errors
    /// Returns [`Error::UnknownProvider`] if no provider has this name.
    pub async fn trip_provider(&self, name: &str, reason: &str) -> Result<bool> {
        let provider = self.registry.require(name)?;
        let tripped = provider.trip(self.clock.now(), reason).await;
        warn!(provider = %name, reason, newly_blocked = tripped, "Provider blocked manually");
        Ok(tripped)
    }

    /// Close every provider's breaker
    pub async fn reset_provider_blocks(&self) {
        for provider in self.registry.providers() {
            provider.reset_breaker().await;
        }
        info!("All provider blocks cleared");
    }

    /// Close one provider's breaker
    ///
    /// # Errors
    /// Returns [`Error::UnknownProvider`] if no provider has this name.
    pub async fn reset_provider_block(&self, name: &str) -> Result<()> {
        self.registry.require(name)?.reset_breaker().await;
        info!(provider = %name, "Provider block cleared");
        Ok(())
    }

    /// `(provider, used_today, daily_limit)` for every provider
    pub async fn token_usage(&self) -> Vec<TokenUsageRow> {
        let mut rows = Vec::with_capacity(self.registry.len());
        for provider in self.registry.providers() {
            let budget = provider.snapshot().await.budget;
            rows.push(TokenUsageRow {
                provider: provider.name().to_string(),
                used_today: budget.used_today,
                daily_limit: budget.daily_limit,
            });
        }
        rows
    }

    /// Budget, breaker and counters of every provider
    pub async fn provider_status(&self) -> Vec<ProviderStatus> {
        let now = self.clock.now();
        let mut rows = Vec::with_capacity(self.registry.len());
        for provider in self.registry.providers() {
            let state = provider.snapshot().await;
            let blocked = state.breaker.is_blocked(now);
            rows.push(ProviderStatus {
                name: provider.name().to_string(),
                has_credential: provider.spec().has_credential(),
                daily_limit: state.budget.daily_limit,
                used_today: state.budget.used_today,
                remaining: state.budget.remaining(),
                blocked_until: state.breaker.blocked_until.filter(|_| blocked),
                block_reason: state.breaker.reason.filter(|_| blocked),
                successes_today: state.successes_today,
                failures_today: state.failures_today,
            });
        }
        rows
    }

    /// Ask a provider for its remote model catalogue
    ///
    /// # Errors
    /// Returns an error if the provider is unknown, has no credential, or the
    /// request fails.
    pub async fn probe_provider(&self, name: &str) -> Result<Vec<String>> {
        let provider = self.registry.require(name)?;
        let client = provider
            .client()
            .ok_or_else(|| Error::NotConfigured(name.to_string()))?;
        let timeout = self.timeout_for(provider);
        tokio::time::timeout(timeout, client.list_models())
            .await
            .map_err(|_| Error::Timeout(millis(timeout)))?
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

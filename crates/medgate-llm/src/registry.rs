//! Model registry
//!
//! The registry is built once at start-up and owns every provider and model.
//! Provider and model descriptions are immutable after load; each provider's
//! mutable daily state ([`TokenBudget`], [`CircuitBreakerState`], attempt
//! counters) sits behind a per-provider lock so concurrent dispatches never
//! lose updates.

use crate::breaker::CircuitBreakerState;
use crate::budget::TokenBudget;
use crate::error::{Error, ErrorClass, Result, SkipReason};
use crate::providers::{OpenAiCompatClient, OpenAiCompatConfig, ProviderClient};
use crate::util::mask_api_key;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================================
// Capability
// ============================================================================

/// Coarse requirement tag used to filter eligible models
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Text-only conversation
    #[default]
    Text,
    /// Image understanding
    Vision,
}

impl Capability {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Vision => "vision",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "vision" => Ok(Self::Vision),
            other => Err(Error::Config(format!("unknown capability '{other}'"))),
        }
    }
}

// ============================================================================
// Static descriptions
// ============================================================================

/// A model offered by one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Provider-specific model identifier
    pub name: String,
    /// Lower is tried first
    pub priority: i32,
    /// Capability tag
    #[serde(default)]
    pub capability: Capability,
}

impl ModelSpec {
    /// Create a model description
    #[must_use]
    pub fn new(name: impl Into<String>, priority: i32, capability: Capability) -> Self {
        Self {
            name: name.into(),
            priority,
            capability,
        }
    }
}

/// Provider-specific request parameters for one model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOverride {
    /// Model the parameters apply to
    pub model: String,
    /// Max output tokens
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Nucleus sampling
    #[serde(default)]
    pub top_p: Option<f32>,
}

/// Request parameters resolved for a (provider, model) pair
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CallParams {
    /// Max output tokens
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Nucleus sampling
    pub top_p: Option<f32>,
}

/// Static description of a provider backend
#[derive(Clone)]
pub struct ProviderSpec {
    /// Provider name (e.g. "openrouter")
    pub name: String,
    /// API base URL (OpenAI-compatible, without `/chat/completions`)
    pub base_url: String,
    /// Credential, `None` disables the provider
    pub api_key: Option<String>,
    /// Models in declaration order
    pub models: Vec<ModelSpec>,
    /// Daily token limit, 0 = unlimited
    pub daily_limit: u64,
    /// Headers added to every request
    pub extra_headers: BTreeMap<String, String>,
    /// Per-model request parameters
    pub overrides: Vec<ModelOverride>,
    /// Per-call timeout
    pub timeout: Duration,
}

// SECURITY: Custom Debug implementation to mask API key
impl fmt::Debug for ProviderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSpec")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("models", &self.models)
            .field("daily_limit", &self.daily_limit)
            .field("extra_headers", &self.extra_headers)
            .field("overrides", &self.overrides)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderSpec {
    /// Create a provider description without credential or models
    #[must_use]
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: None,
            models: Vec::new(),
            daily_limit: 0,
            extra_headers: BTreeMap::new(),
            overrides: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the credential
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Append a model
    #[must_use]
    pub fn with_model(mut self, name: impl Into<String>, priority: i32, capability: Capability) -> Self {
        self.models.push(ModelSpec::new(name, priority, capability));
        self
    }

    /// Set the daily token limit
    #[must_use]
    pub fn with_daily_limit(mut self, daily_limit: u64) -> Self {
        self.daily_limit = daily_limit;
        self
    }

    /// Add a header sent with every request
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    /// Add per-model request parameters
    #[must_use]
    pub fn with_override(mut self, model_override: ModelOverride) -> Self {
        self.overrides.push(model_override);
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a non-empty credential is configured
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Parameters for `model`, empty when no override matches
    #[must_use]
    pub fn call_params(&self, model: &str) -> CallParams {
        self.overrides
            .iter()
            .find(|o| o.model == model)
            .map(|o| CallParams {
                max_tokens: o.max_tokens,
                temperature: o.temperature,
                top_p: o.top_p,
            })
            .unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("provider name must not be empty".to_string()));
        }
        let mut seen = HashSet::new();
        for model in &self.models {
            if model.name.trim().is_empty() {
                return Err(Error::Config(format!(
                    "provider '{}' declares a model with an empty name",
                    self.name
                )));
            }
            if !seen.insert(model.name.as_str()) {
                return Err(Error::Config(format!(
                    "provider '{}' declares model '{}' twice",
                    self.name, model.name
                )));
            }
        }
        for o in &self.overrides {
            if !seen.contains(o.model.as_str()) {
                return Err(Error::Config(format!(
                    "provider '{}' has parameters for undeclared model '{}'",
                    self.name, o.model
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Mutable per-provider state
// ============================================================================

/// Daily mutable state of one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderState {
    /// Token budget
    pub budget: TokenBudget,
    /// Circuit breaker
    pub breaker: CircuitBreakerState,
    /// Successful calls since the last daily reset
    pub successes_today: u64,
    /// Failed calls since the last daily reset
    pub failures_today: u64,
}

/// A registered provider: static description, client and guarded state
pub struct ProviderEntry {
    spec: ProviderSpec,
    client: Option<Arc<dyn ProviderClient>>,
    state: Mutex<ProviderState>,
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("spec", &self.spec)
            .field("has_client", &self.client.is_some())
            .finish_non_exhaustive()
    }
}

impl ProviderEntry {
    fn new(spec: ProviderSpec, client: Option<Arc<dyn ProviderClient>>) -> Self {
        let state = ProviderState {
            budget: TokenBudget::new(spec.daily_limit),
            ..Default::default()
        };
        Self {
            spec,
            client,
            state: Mutex::new(state),
        }
    }

    /// Provider name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Static description
    #[must_use]
    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    /// Models in declaration order
    #[must_use]
    pub fn models(&self) -> &[ModelSpec] {
        &self.spec.models
    }

    /// Client used for calls, `None` when the provider has no credential
    #[must_use]
    pub fn client(&self) -> Option<Arc<dyn ProviderClient>> {
        if self.spec.has_credential() {
            self.client.clone()
        } else {
            None
        }
    }

    /// Admission gate: the client to call at `now`, or why the provider
    /// must be skipped.
    pub async fn admit(
        &self,
        now: DateTime<Local>,
    ) -> std::result::Result<Arc<dyn ProviderClient>, SkipReason> {
        let client = self.client().ok_or(SkipReason::NoCredential)?;
        let state = self.state.lock().await;
        if state.breaker.is_blocked(now) {
            return Err(SkipReason::CircuitOpen);
        }
        if state.budget.is_exhausted() {
            return Err(SkipReason::BudgetExhausted);
        }
        Ok(client)
    }

    /// Record a successful call, returning tokens used today afterwards
    pub async fn record_success(&self, tokens: u64) -> u64 {
        let mut state = self.state.lock().await;
        state.budget.add(tokens);
        state.successes_today += 1;
        state.budget.used_today
    }

    /// Record a failed call, tripping the breaker when the class requires it.
    ///
    /// Returns `true` if this failure opened the breaker.
    pub async fn record_failure(&self, now: DateTime<Local>, class: ErrorClass, reason: &str) -> bool {
        let mut state = self.state.lock().await;
        state.failures_today += 1;
        if !class.trips_breaker() {
            return false;
        }
        let tripped = state.breaker.trip_until_end_of_day(now, format!("{class}: {reason}"));
        if tripped {
            warn!(
                provider = %self.spec.name,
                class = %class,
                until = ?state.breaker.blocked_until,
                "Provider blocked for the rest of the day"
            );
        }
        tripped
    }

    /// Manually open the breaker
    pub async fn trip(&self, now: DateTime<Local>, reason: &str) -> bool {
        let mut state = self.state.lock().await;
        state.breaker.trip_until_end_of_day(now, reason)
    }

    /// Close the breaker
    pub async fn reset_breaker(&self) {
        self.state.lock().await.breaker.reset();
    }

    /// Zero daily counters, returning the previous token usage
    pub async fn reset_daily_usage(&self) -> u64 {
        let mut state = self.state.lock().await;
        state.successes_today = 0;
        state.failures_today = 0;
        state.budget.reset()
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> ProviderState {
        self.state.lock().await.clone()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Catalogue of providers and their models
#[derive(Debug, Default)]
pub struct ModelRegistry {
    providers: Vec<Arc<ProviderEntry>>,
}

impl ModelRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with an OpenAI-compatible client for every provider
    /// that has a credential.
    ///
    /// # Errors
    /// Returns an error if a description is invalid or a client cannot be built.
    pub fn from_specs(specs: Vec<ProviderSpec>) -> Result<Self> {
        let mut registry = Self::new();
        for spec in specs {
            let client: Option<Arc<dyn ProviderClient>> =
                match OpenAiCompatConfig::from_spec(&spec) {
                    Some(config) => Some(Arc::new(OpenAiCompatClient::new(config)?)),
                    None => {
                        info!(provider = %spec.name, "No credential configured, provider disabled");
                        None
                    }
                };
            registry.insert(spec, client)?;
        }
        Ok(registry)
    }

    /// Register a provider with an explicit client
    ///
    /// # Errors
    /// Returns an error if the description is invalid or the name is taken.
    pub fn register(&mut self, spec: ProviderSpec, client: Arc<dyn ProviderClient>) -> Result<()> {
        self.insert(spec, Some(client))
    }

    /// Register a provider that has no client (never admitted)
    ///
    /// # Errors
    /// Returns an error if the description is invalid or the name is taken.
    pub fn register_disabled(&mut self, spec: ProviderSpec) -> Result<()> {
        self.insert(spec, None)
    }

    fn insert(&mut self, spec: ProviderSpec, client: Option<Arc<dyn ProviderClient>>) -> Result<()> {
        spec.validate()?;
        if self.get(&spec.name).is_some() {
            return Err(Error::Config(format!(
                "provider '{}' is declared twice",
                spec.name
            )));
        }
        debug!(
            provider = %spec.name,
            models = spec.models.len(),
            daily_limit = spec.daily_limit,
            "Registering LLM provider"
        );
        self.providers.push(Arc::new(ProviderEntry::new(spec, client)));
        Ok(())
    }

    /// Providers in declaration order
    #[must_use]
    pub fn providers(&self) -> &[Arc<ProviderEntry>] {
        &self.providers
    }

    /// Get a provider by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<ProviderEntry>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Get a provider by name or fail with [`Error::UnknownProvider`]
    ///
    /// # Errors
    /// Returns an error if no provider has this name.
    pub fn require(&self, name: &str) -> Result<&Arc<ProviderEntry>> {
        self.get(name)
            .ok_or_else(|| Error::UnknownProvider(name.to_string()))
    }

    /// Number of registered providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::ScriptedClient;
    use chrono::TimeZone;

    fn spec(name: &str) -> ProviderSpec {
        ProviderSpec::new(name, "http://localhost:1")
            .with_api_key("test-key-123456")
            .with_model("m1", 1, Capability::Text)
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_capability_parse() {
        assert_eq!("vision".parse::<Capability>().unwrap(), Capability::Vision);
        assert_eq!(" Text ".parse::<Capability>().unwrap(), Capability::Text);
        assert!("audio".parse::<Capability>().is_err());
        assert_eq!(Capability::default(), Capability::Text);
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let mut registry = ModelRegistry::new();
        tokio_test::assert_ok!(registry.register(spec("groq"), Arc::new(ScriptedClient::new("groq"))));
        let err = tokio_test::assert_err!(
            registry.register(spec("groq"), Arc::new(ScriptedClient::new("groq")))
        );
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_override_for_undeclared_model_rejected() {
        let bad = spec("cerebras").with_override(ModelOverride {
            model: "nope".into(),
            max_tokens: Some(1),
            ..Default::default()
        });
        let mut registry = ModelRegistry::new();
        assert!(registry.register_disabled(bad).is_err());
    }

    #[test]
    fn test_call_params_lookup() {
        let s = spec("cerebras").with_model("thinking", 2, Capability::Text).with_override(
            ModelOverride {
                model: "thinking".into(),
                max_tokens: Some(64_000),
                temperature: Some(0.7),
                top_p: Some(0.9),
            },
        );
        assert_eq!(s.call_params("thinking").max_tokens, Some(64_000));
        assert_eq!(s.call_params("m1"), CallParams::default());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let s = ProviderSpec::new("groq", "http://x").with_api_key("gsk_1234567890abcdefghijklmnop");
        let debug_str = format!("{:?}", s);
        assert!(!debug_str.contains("1234567890abcdefghijkl"));
    }

    #[tokio::test]
    async fn test_admission_without_credential() {
        let mut registry = ModelRegistry::new();
        let no_key = ProviderSpec::new("groq", "http://x").with_model("m", 1, Capability::Text);
        registry
            .register(no_key, Arc::new(ScriptedClient::new("groq")))
            .unwrap();
        let entry = registry.require("groq").unwrap();
        assert_eq!(entry.admit(now()).await.err(), Some(SkipReason::NoCredential));
    }

    #[tokio::test]
    async fn test_admission_budget_and_breaker() {
        let mut registry = ModelRegistry::new();
        registry
            .register(spec("groq").with_daily_limit(100), Arc::new(ScriptedClient::new("groq")))
            .unwrap();
        let entry = registry.require("groq").unwrap();
        assert!(entry.admit(now()).await.is_ok());

        assert_eq!(entry.record_success(100).await, 100);
        assert_eq!(entry.admit(now()).await.err(), Some(SkipReason::BudgetExhausted));

        entry.reset_daily_usage().await;
        assert!(entry.record_failure(now(), ErrorClass::RateLimited, "429").await);
        assert_eq!(entry.admit(now()).await.err(), Some(SkipReason::CircuitOpen));

        entry.reset_breaker().await;
        assert!(entry.admit(now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_transient_failure_does_not_trip() {
        let mut registry = ModelRegistry::new();
        registry
            .register(spec("groq"), Arc::new(ScriptedClient::new("groq")))
            .unwrap();
        let entry = registry.require("groq").unwrap();
        assert!(!entry.record_failure(now(), ErrorClass::Transient, "503").await);
        assert!(!entry.record_failure(now(), ErrorClass::ModelNotFound, "404").await);
        let state = entry.snapshot().await;
        assert_eq!(state.failures_today, 2);
        assert!(!state.breaker.is_blocked(now()));
    }

    #[test]
    fn test_snapshot_starts_with_configured_limit() {
        let mut registry = ModelRegistry::new();
        registry
            .register(spec("openrouter").with_daily_limit(100_000), Arc::new(ScriptedClient::new("openrouter")))
            .unwrap();
        let state = tokio_test::block_on(registry.require("openrouter").unwrap().snapshot());
        assert_eq!(state.budget, TokenBudget::new(100_000));
        assert_eq!(state.successes_today, 0);
        assert!(state.breaker.blocked_until.is_none());
    }

    #[test]
    fn test_unknown_provider() {
        let registry = ModelRegistry::new();
        assert!(matches!(
            registry.require("nope"),
            Err(Error::UnknownProvider(_))
        ));
        assert!(registry.is_empty());
    }
}

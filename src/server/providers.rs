//! LLM provider resolution
//!
//! Turns configured providers plus their environment variables into a
//! [`FailoverRouter`].

use super::config::{LlmConfig, ProviderConfig};
use anyhow::{Context, Result};
use medgate_llm::{FailoverRouter, ModelRegistry, ProviderSpec, RouterConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Build a provider description, reading credentials through `env`
pub fn resolve_provider_spec(
    provider: &ProviderConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ProviderSpec> {
    let mut spec = ProviderSpec::new(&provider.name, &provider.base_url)
        .with_daily_limit(provider.daily_limit);

    let key_var = provider.api_key_var();
    match env(&key_var).filter(|k| !k.trim().is_empty()) {
        Some(key) => spec = spec.with_api_key(key.trim()),
        None => warn!(provider = %provider.name, var = %key_var, "Credential not set, provider disabled"),
    }

    let limit_var = provider.daily_limit_var();
    if let Some(raw) = env(&limit_var).filter(|v| !v.trim().is_empty()) {
        let limit: u64 = raw
            .trim()
            .parse()
            .with_context(|| format!("{limit_var} must be a non-negative integer, got '{raw}'"))?;
        spec = spec.with_daily_limit(limit);
    }

    if let Some(secs) = provider.timeout_secs {
        spec = spec.with_timeout(Duration::from_secs(secs));
    }
    for (name, value) in &provider.headers {
        spec = spec.with_header(name, value);
    }
    spec.models = provider.models.clone();
    spec.overrides = provider.overrides.clone();
    Ok(spec)
}

/// Build the router from configuration, reading credentials through `env`
pub fn build_router_with_env(
    llm_config: &LlmConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<FailoverRouter> {
    let specs = llm_config
        .providers
        .iter()
        .map(|p| resolve_provider_spec(p, &env))
        .collect::<Result<Vec<_>>>()?;

    let enabled = specs.iter().filter(|s| s.has_credential()).count();
    let registry = ModelRegistry::from_specs(specs).context("Failed to build model registry")?;
    if enabled == 0 {
        warn!("No LLM provider has a credential; every request will be exhausted");
    }
    info!(
        providers = registry.len(),
        enabled,
        "LLM providers resolved"
    );

    let mut router_config = RouterConfig::default().with_messages(llm_config.messages.clone());
    if let Some(secs) = llm_config.call_timeout_secs {
        router_config = router_config.with_call_timeout(Duration::from_secs(secs));
    }
    Ok(FailoverRouter::new(Arc::new(registry)).with_config(router_config))
}

/// Build the router from configuration and the process environment
pub fn build_router(llm_config: &LlmConfig) -> Result<Arc<FailoverRouter>> {
    build_router_with_env(llm_config, |var| std::env::var(var).ok()).map(Arc::new)
}

//! Startup configuration validation

use super::config::AppConfig;
use anyhow::{bail, Result};
use std::collections::HashSet;
use tracing::warn;

/// Reject configuration the registry could not be built from
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut names = HashSet::new();
    for provider in &config.llm.providers {
        if provider.name.trim().is_empty() {
            bail!("llm.providers: provider name must not be empty");
        }
        if !names.insert(provider.name.as_str()) {
            bail!("llm.providers: provider '{}' is declared twice", provider.name);
        }
        if !provider.base_url.starts_with("http://") && !provider.base_url.starts_with("https://") {
            bail!(
                "llm.providers.{}: base_url must be an http(s) URL, got '{}'",
                provider.name,
                provider.base_url
            );
        }

        let mut models = HashSet::new();
        for model in &provider.models {
            if model.name.trim().is_empty() {
                bail!("llm.providers.{}: model name must not be empty", provider.name);
            }
            if !models.insert(model.name.as_str()) {
                bail!(
                    "llm.providers.{}: model '{}' is declared twice",
                    provider.name,
                    model.name
                );
            }
        }
        for o in &provider.overrides {
            if !models.contains(o.model.as_str()) {
                bail!(
                    "llm.providers.{}: override targets unknown model '{}'",
                    provider.name,
                    o.model
                );
            }
        }
        if provider.models.is_empty() {
            warn!(provider = %provider.name, "Provider declares no models");
        }
    }

    if config.llm.call_timeout_secs == Some(0) {
        bail!("llm.call_timeout_secs must be greater than 0");
    }

    let is_production = std::env::var("MEDGATE_ENV")
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false);
    if is_production && config.server.host == "0.0.0.0" {
        warn!(
            "SECURITY WARNING: ops API is binding to all interfaces (0.0.0.0) in production. \
             It has no authentication; bind to 127.0.0.1 behind a reverse proxy."
        );
    }

    Ok(())
}

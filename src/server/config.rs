//! Server configuration types
//!
//! Contains the configuration structures loaded by [`super::load_config`].

use medgate_llm::{ExhaustionMessages, ModelOverride, ModelSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Ops HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8790,
        }
    }
}

/// LLM routing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Providers in declaration order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Exhaustion texts returned to end users
    #[serde(default)]
    pub messages: ExhaustionMessages,
    /// Overrides every provider's timeout when set
    #[serde(default)]
    pub call_timeout_secs: Option<u64>,
}

/// One provider as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    /// Variable holding the credential, `{NAME}_API_KEY` when absent
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Variable overriding `daily_limit`, `{NAME}_DAILY_LIMIT` when absent
    #[serde(default)]
    pub daily_limit_env: Option<String>,
    /// Daily token limit, 0 = unlimited
    #[serde(default)]
    pub daily_limit: u64,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub models: Vec<ModelSpec>,
    /// Per-model request parameters
    #[serde(default)]
    pub overrides: Vec<ModelOverride>,
}

impl ProviderConfig {
    /// Environment variable holding the credential
    pub fn api_key_var(&self) -> String {
        self.api_key_env
            .clone()
            .unwrap_or_else(|| format!("{}_API_KEY", env_prefix(&self.name)))
    }

    /// Environment variable overriding the daily limit
    pub fn daily_limit_var(&self) -> String {
        self.daily_limit_env
            .clone()
            .unwrap_or_else(|| format!("{}_DAILY_LIMIT", env_prefix(&self.name)))
    }
}

fn env_prefix(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(name: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            base_url: "http://localhost".to_string(),
            api_key_env: None,
            daily_limit_env: None,
            daily_limit: 0,
            timeout_secs: None,
            headers: BTreeMap::new(),
            models: Vec::new(),
            overrides: Vec::new(),
        }
    }

    #[test]
    fn test_default_env_var_names() {
        let p = provider("groq");
        assert_eq!(p.api_key_var(), "GROQ_API_KEY");
        assert_eq!(p.daily_limit_var(), "GROQ_DAILY_LIMIT");
        assert_eq!(provider("open-router").api_key_var(), "OPEN_ROUTER_API_KEY");
    }

    #[test]
    fn test_explicit_env_var_names() {
        let mut p = provider("openrouter");
        p.api_key_env = Some("OR_KEY".to_string());
        assert_eq!(p.api_key_var(), "OR_KEY");
    }
}

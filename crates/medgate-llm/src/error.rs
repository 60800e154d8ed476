//! Error types for medgate-llm
//!
//! Provider failures are converted into [`Error`] at the adapter boundary and
//! then collapsed into the closed [`ErrorClass`] taxonomy the router acts on.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// LLM error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured (no credential)
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Rate limit or quota exceeded
    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    /// Credential rejected
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Model unknown to the provider
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Any other non-success HTTP status
    #[error("api error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Sanitized provider message
        message: String,
    },

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid registry or provider configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation named a provider that is not in the registry
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

impl Error {
    /// Classify a provider call failure for the failover policy.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::RateLimit(_) => ErrorClass::RateLimited,
            Self::Authentication(_) | Self::NotConfigured(_) => ErrorClass::Authentication,
            Self::ModelNotFound(_) => ErrorClass::ModelNotFound,
            Self::Network(_)
            | Self::Timeout(_)
            | Self::Api { .. }
            | Self::InvalidResponse(_)
            | Self::Config(_)
            | Self::UnknownProvider(_) => ErrorClass::Transient,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Classified provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// HTTP 429, quota or credit exhaustion
    RateLimited,
    /// Credential rejected (401/403)
    Authentication,
    /// The provider does not serve this model
    ModelNotFound,
    /// Network, timeout, 5xx or malformed response
    Transient,
}

impl ErrorClass {
    /// Whether a failure of this class blocks the provider for the rest of the day
    #[must_use]
    pub fn trips_breaker(self) -> bool {
        matches!(self, Self::RateLimited | Self::Authentication)
    }

    /// Returns the string representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Authentication => "authentication",
            Self::ModelNotFound => "model_not_found",
            Self::Transient => "transient",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the admission gate passed over a candidate without calling it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Provider has no credential configured
    NoCredential,
    /// Provider circuit breaker is open
    CircuitOpen,
    /// Provider daily token budget is used up
    BudgetExhausted,
}

impl SkipReason {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoCredential => "no_credential",
            Self::CircuitOpen => "circuit_open",
            Self::BudgetExhausted => "budget_exhausted",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_tripping_classes() {
        assert!(Error::RateLimit("429".into()).class().trips_breaker());
        assert!(Error::Authentication("bad key".into()).class().trips_breaker());
        assert!(!Error::ModelNotFound("x".into()).class().trips_breaker());
        assert!(!Error::Timeout(1000).class().trips_breaker());
        assert!(!Error::Api {
            status: 503,
            message: "unavailable".into()
        }
        .class()
        .trips_breaker());
    }

    #[test]
    fn test_transient_classes() {
        assert_eq!(Error::Network("reset".into()).class(), ErrorClass::Transient);
        assert_eq!(
            Error::InvalidResponse("no choices".into()).class(),
            ErrorClass::Transient
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorClass::RateLimited.to_string(), "rate_limited");
        assert_eq!(SkipReason::CircuitOpen.to_string(), "circuit_open");
    }
}

//! Dispatch inputs, outcomes and status reports

use crate::error::{ErrorClass, SkipReason};
use crate::message::Message;
use crate::registry::Capability;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request
// ============================================================================

/// One dispatch: the conversation plus routing hints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Ordered conversation
    pub messages: Vec<Message>,
    /// Required capability, text when absent
    #[serde(default)]
    pub capability: Capability,
    /// Model to try first when it is a candidate
    #[serde(default)]
    pub preferred_model: Option<String>,
    /// Prepended unless the conversation already has a system message
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl DispatchRequest {
    /// Create a text request
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            capability: Capability::Text,
            preferred_model: None,
            system_prompt: None,
        }
    }

    /// Set the required capability
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    /// Set the preferred model
    #[must_use]
    pub fn with_preferred_model(mut self, model: impl Into<String>) -> Self {
        self.preferred_model = Some(model.into());
        self
    }

    /// Set the system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

// ============================================================================
// Attempts
// ============================================================================

/// What happened to one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Not called: the admission gate rejected it
    Skipped {
        /// Gate rejection
        reason: SkipReason,
    },
    /// Called and failed
    Failed {
        /// Failure class
        class: ErrorClass,
        /// Sanitized error text, for logs and operators only
        error: String,
    },
    /// Called and succeeded
    Succeeded {
        /// Tokens reported by the provider (0 if not reported)
        tokens: u64,
    },
}

/// Record of one candidate considered during a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// Provider name
    pub provider: String,
    /// Model name
    pub model: String,
    /// When the candidate was considered
    pub started_at: DateTime<Local>,
    /// Result
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    /// Whether the provider was actually called
    #[must_use]
    pub fn was_called(&self) -> bool {
        !matches!(self.outcome, AttemptOutcome::Skipped { .. })
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// A successful completion with attribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    /// Completion text
    pub text: String,
    /// Provider that answered
    pub provider: String,
    /// Model that answered
    pub model: String,
    /// Capability the request asked for
    pub capability: Capability,
    /// Reasoning trace, when the model exposes one
    pub reasoning: Option<String>,
    /// Tokens reported by the provider
    pub tokens_used: Option<u64>,
    /// Candidates considered before and including the winner
    pub attempts: Vec<AttemptRecord>,
}

/// Every candidate was skipped or failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchFailure {
    /// User-safe message, depends only on the capability
    pub message: String,
    /// Capability the request asked for
    pub capability: Capability,
    /// Candidates considered, in order
    pub tried: Vec<AttemptRecord>,
    /// Last classified call error, if any candidate was called
    pub last_error: Option<String>,
}

/// Result of a dispatch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    /// A candidate answered
    Success(Completion),
    /// All candidates exhausted
    Failure(DispatchFailure),
}

impl CallOutcome {
    /// Whether the dispatch succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The completion, if successful
    #[must_use]
    pub fn completion(&self) -> Option<&Completion> {
        match self {
            Self::Success(c) => Some(c),
            Self::Failure(_) => None,
        }
    }

    /// The failure, if exhausted
    #[must_use]
    pub fn failure(&self) -> Option<&DispatchFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(f) => Some(f),
        }
    }

    /// Text to show the end user: the completion or the exhaustion message
    #[must_use]
    pub fn user_text(&self) -> &str {
        match self {
            Self::Success(c) => &c.text,
            Self::Failure(f) => &f.message,
        }
    }
}

// ============================================================================
// Status reports
// ============================================================================

/// One row of the availability listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelAvailability {
    /// Provider name
    pub provider: String,
    /// Model name
    pub model: String,
    /// Priority (lower first)
    pub priority: i32,
    /// Capability tag
    pub capability: Capability,
    /// Whether the admission gate would let the model through now
    pub available: bool,
    /// Gate rejection when unavailable
    pub skip_reason: Option<SkipReason>,
}

/// Daily usage of one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenUsageRow {
    /// Provider name
    pub provider: String,
    /// Tokens used since the last reset
    pub used_today: u64,
    /// Daily limit, 0 = unlimited
    pub daily_limit: u64,
}

/// Full state of one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    /// Provider name
    pub name: String,
    /// Whether a credential is configured
    pub has_credential: bool,
    /// Daily limit, 0 = unlimited
    pub daily_limit: u64,
    /// Tokens used since the last reset
    pub used_today: u64,
    /// Tokens left today, `None` when unlimited
    pub remaining: Option<u64>,
    /// Breaker expiry if currently blocked
    pub blocked_until: Option<DateTime<Local>>,
    /// Why the breaker opened
    pub block_reason: Option<String>,
    /// Successful calls today
    pub successes_today: u64,
    /// Failed calls today
    pub failures_today: u64,
}

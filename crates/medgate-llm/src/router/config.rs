//! Configuration types for the failover router

use crate::registry::Capability;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default exhaustion message for text requests
pub const DEFAULT_TEXT_EXHAUSTED: &str = "Sorry, something went wrong while generating the answer. \
All models are temporarily unavailable. Please try again later.";

/// Default exhaustion message for vision requests
pub const DEFAULT_VISION_EXHAUSTED: &str = "Sorry, all vision models are temporarily unavailable \
(every provider has used up today's limits). Please try again tomorrow.";

/// User-facing texts returned when every candidate was skipped or failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExhaustionMessages {
    /// Returned for text requests
    #[serde(default = "default_text")]
    pub text: String,
    /// Returned for vision requests
    #[serde(default = "default_vision")]
    pub vision: String,
}

fn default_text() -> String {
    DEFAULT_TEXT_EXHAUSTED.to_string()
}

fn default_vision() -> String {
    DEFAULT_VISION_EXHAUSTED.to_string()
}

impl Default for ExhaustionMessages {
    fn default() -> Self {
        Self {
            text: default_text(),
            vision: default_vision(),
        }
    }
}

impl ExhaustionMessages {
    /// Message for an exhausted request of `capability`
    #[must_use]
    pub fn for_capability(&self, capability: Capability) -> &str {
        match capability {
            Capability::Text => &self.text,
            Capability::Vision => &self.vision,
        }
    }
}

/// Router configuration
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// Exhaustion texts
    pub messages: ExhaustionMessages,
    /// Replaces every provider's own timeout when set
    pub call_timeout: Option<Duration>,
}

impl RouterConfig {
    /// Set the exhaustion texts
    #[must_use]
    pub fn with_messages(mut self, messages: ExhaustionMessages) -> Self {
        self.messages = messages;
        self
    }

    /// Set a timeout applied to every provider call
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

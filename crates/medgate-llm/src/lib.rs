//! Medgate LLM - multi-provider failover for chat completions
//!
//! This crate routes chat requests across interchangeable LLM providers:
//! - Registry: providers, their models, priorities and capability tags
//! - Selector: ordered candidate list per request (capability, priority, preference)
//! - Budget: per-provider daily token limits
//! - Breaker: per-provider block until local midnight on rate-limit or auth errors
//! - Providers: OpenAI-compatible HTTP client (OpenRouter, Groq, Cerebras)
//! - Router: the attempt loop, error classification and outcome normalization

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod breaker;
pub mod budget;
pub mod clock;
pub mod completion;
pub mod error;
pub mod message;
pub mod providers;
pub mod registry;
pub mod router;
pub mod selector;
pub mod util;

pub use breaker::CircuitBreakerState;
pub use budget::TokenBudget;
pub use clock::{end_of_day, Clock, ManualClock, SystemClock};
pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, ErrorClass, Result, SkipReason};
pub use message::{ContentPart, ImageUrl, Message, MessageContent, MessageRole};
pub use providers::{OpenAiCompatClient, OpenAiCompatConfig, ProviderClient};
pub use registry::{
    CallParams, Capability, ModelOverride, ModelRegistry, ModelSpec, ProviderEntry,
    ProviderSpec, ProviderState, DEFAULT_TIMEOUT,
};
pub use router::{
    AttemptOutcome, AttemptRecord, CallOutcome, Completion, DispatchFailure, DispatchRequest,
    ExhaustionMessages, FailoverRouter, ModelAvailability, ProviderStatus, RouterConfig,
    ScriptedClient, TokenUsageRow,
};
pub use selector::{Candidate, CandidateSelector};

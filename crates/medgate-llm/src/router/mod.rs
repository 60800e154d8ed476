//! Router - failover across providers and models
//!
//! # Module Structure
//!
//! - `config`: exhaustion messages and call timeout
//! - `outcome`: dispatch request, outcome and status report types
//! - `mock`: scripted provider client for testing
//! - `router_impl`: `FailoverRouter` implementation

mod config;
mod mock;
mod outcome;
mod router_impl;

#[cfg(test)]
mod tests;

pub use config::{
    ExhaustionMessages, RouterConfig, DEFAULT_TEXT_EXHAUSTED, DEFAULT_VISION_EXHAUSTED,
};
pub use mock::{ScriptedClient, DEFAULT_REPLY_TOKENS};
pub use outcome::{
    AttemptOutcome, AttemptRecord, CallOutcome, Completion, DispatchFailure, DispatchRequest,
    ModelAvailability, ProviderStatus, TokenUsageRow,
};
pub use router_impl::FailoverRouter;

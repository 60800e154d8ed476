//! Candidate selection
//!
//! Builds the ordered list of (provider, model) pairs a dispatch will try.
//! Admission (credential, breaker, budget) is not checked here; the router
//! does that per attempt so that state changes during a request are honoured.

use crate::registry::{Capability, ModelRegistry, ModelSpec, ProviderEntry};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A (provider, model) pair considered for one attempt
#[derive(Clone)]
pub struct Candidate {
    /// Provider serving the model
    pub provider: Arc<ProviderEntry>,
    /// Model description
    pub model: ModelSpec,
}

impl Candidate {
    /// Provider name
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} (p{}, {})",
            self.provider.name(),
            self.model.name,
            self.model.priority,
            self.model.capability
        )
    }
}

/// Orders registry models for a request
pub struct CandidateSelector;

impl CandidateSelector {
    /// Candidates for `capability`, preferred model first.
    ///
    /// Returns `None` when nothing can serve the request. Vision requests
    /// never fall back to text-only models; text requests fall back to the
    /// whole catalogue when no text-tagged model exists.
    #[must_use]
    pub fn select(
        registry: &ModelRegistry,
        capability: Capability,
        preferred_model: Option<&str>,
    ) -> Option<Vec<Candidate>> {
        let all: Vec<Candidate> = registry
            .providers()
            .iter()
            .flat_map(|provider| {
                provider.models().iter().map(move |model| Candidate {
                    provider: Arc::clone(provider),
                    model: model.clone(),
                })
            })
            .collect();
        let total = all.len();

        let filtered: Vec<Candidate> = all
            .iter()
            .filter(|c| c.model.capability == capability)
            .cloned()
            .collect();

        let mut candidates = if !filtered.is_empty() {
            filtered
        } else if capability == Capability::Vision {
            debug!("No vision-capable models registered");
            return None;
        } else {
            debug!(
                capability = %capability,
                "No models tagged for capability, using full catalogue"
            );
            all
        };

        // Vec::sort_by_key is stable: ties keep declaration order.
        candidates.sort_by_key(|c| c.model.priority);

        if let Some(preferred) = preferred_model {
            let (mut front, rest): (Vec<_>, Vec<_>) = candidates
                .into_iter()
                .partition(|c| c.model.name == preferred);
            if front.is_empty() {
                debug!(preferred = %preferred, "Preferred model not among candidates");
            }
            front.extend(rest);
            candidates = front;
        }

        debug!(
            capability = %capability,
            total,
            selected = candidates.len(),
            "Built candidate list"
        );

        if candidates.is_empty() {
            None
        } else {
            Some(candidates)
        }
    }
}

//! Daily token budget
//!
//! Each provider carries a [`TokenBudget`] owned by its
//! [`ProviderEntry`](crate::registry::ProviderEntry). The budget is only
//! touched under that entry's state lock.

use serde::Serialize;

/// Per-provider daily token consumption against a limit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenBudget {
    /// Daily limit, 0 = unlimited
    pub daily_limit: u64,
    /// Tokens reported since the last reset
    pub used_today: u64,
}

impl TokenBudget {
    /// Create a budget with the given daily limit
    #[must_use]
    pub fn new(daily_limit: u64) -> Self {
        Self {
            daily_limit,
            used_today: 0,
        }
    }

    /// Budget that never blocks admission
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Whether the limit is enforced
    #[must_use]
    pub fn is_limited(&self) -> bool {
        self.daily_limit > 0
    }

    /// Whether new calls must be refused
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.is_limited() && self.used_today >= self.daily_limit
    }

    /// Tokens left today, `None` when unlimited
    #[must_use]
    pub fn remaining(&self) -> Option<u64> {
        self.is_limited()
            .then(|| self.daily_limit.saturating_sub(self.used_today))
    }

    /// Record consumption reported by a completed call
    pub fn add(&mut self, amount: u64) {
        self.used_today = self.used_today.saturating_add(amount);
    }

    /// Zero the daily counter, returning the previous value
    pub fn reset(&mut self) -> u64 {
        std::mem::take(&mut self.used_today)
    }
}

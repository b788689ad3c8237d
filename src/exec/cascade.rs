//! Short-circuit fallback bookkeeping
//!
//! The executor tries tiers strictly in order, each fully awaited before
//! the next, and stops at the first usable success. The diary records
//! every tier's failure so the terminal message can name what actually
//! went wrong instead of a generic error.

use serde_json::Value;

/// Result of one fallback tier
#[derive(Debug)]
pub enum TierOutcome {
    /// Transport-level OK and application-level success, rows extracted
    Success(Vec<Value>),
    /// Anything else, with the reason retained
    Failure(String),
}

/// One recorded tier failure
#[derive(Debug, Clone)]
pub struct TierFailure {
    pub tier: &'static str,
    pub reason: String,
}

/// Ordered diary of tier failures for a single action
#[derive(Debug, Default)]
pub struct CascadeDiary {
    failures: Vec<TierFailure>,
}

impl CascadeDiary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tier: &'static str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(tier, reason, "tier failed, trying next");
        self.failures.push(TierFailure { tier, reason });
    }

    pub fn failures(&self) -> &[TierFailure] {
        &self.failures
    }

    /// The final tier's failure reason (what the user sees when every
    /// tier failed)
    pub fn last_reason(&self) -> String {
        self.failures
            .last()
            .map(|f| f.reason.clone())
            .unwrap_or_else(|| "no attempts were made".to_string())
    }

    /// All failure reasons, joined (used when the caller must report more
    /// than one tier, e.g. the assistant fallback chain)
    pub fn combined_reasons(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("{}: {}", f.tier, f.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

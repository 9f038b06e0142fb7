//! Core strategy traits and types.

use super::StrategyContext;
use crate::error::Result;
use crate::state::Label;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Confidence returned when a strategy lacks enough history to judge.
pub const FALLBACK_CONFIDENCE: f64 = 50.0;

/// Core trait that all prediction rules must implement.
///
/// A strategy is a pure function of the history it is handed. It must not
/// depend on wall-clock time, randomness, or any state outside `ctx`, so the
/// same history always yields the same vote.
pub trait Strategy: Send + Sync + Debug {
    /// Returns the unique name/identifier of this strategy.
    fn name(&self) -> &str;

    /// Returns metadata about this strategy.
    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: self.name().to_string(),
            description: String::new(),
            min_history: self.min_history(),
            tags: vec![],
        }
    }

    /// Minimum number of rounds needed before the rule is consulted.
    ///
    /// Below this the registry substitutes [`Vote::fallback`].
    fn min_history(&self) -> usize {
        1
    }

    /// Cast a vote for the next round.
    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote>;
}

/// Metadata about a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyMetadata {
    /// Strategy name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Minimum history length.
    pub min_history: usize,
    /// Tags for categorization.
    pub tags: Vec<String>,
}

/// A single strategy's output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub label: Label,
    /// Always within `0.0..=100.0`.
    pub confidence: f64,
}

impl Vote {
    /// Create a vote, clamping the confidence into `[0, 100]`.
    pub fn new(label: Label, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 100.0)
        };
        Self { label, confidence }
    }

    /// Fixed low-confidence vote for strategies without enough history.
    pub fn fallback() -> Self {
        Self::new(Label::High, FALLBACK_CONFIDENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_clamps_confidence() {
        assert_eq!(Vote::new(Label::High, 140.0).confidence, 100.0);
        assert_eq!(Vote::new(Label::Low, -3.0).confidence, 0.0);
        assert_eq!(Vote::new(Label::Low, f64::NAN).confidence, 0.0);
        assert_eq!(Vote::new(Label::Low, 72.5).confidence, 72.5);
    }
}

//! Streak-based strategies.
//!
//! Both rules look at runs of identical labels: one bets on long runs
//! breaking, the other on the balance of continuations versus flips.

use crate::error::{Error, Result};
use crate::strategy::{Strategy, StrategyContext, StrategyMetadata, Vote};

/// Bets against long runs of the same label.
///
/// Short runs are followed with low confidence; once the run reaches the
/// threshold the strategy votes for the opposite label with high confidence
/// that grows with the run length.
#[derive(Debug, Clone)]
pub struct StreakReversalStrategy {
    /// Run length at which the vote flips.
    threshold: usize,
    /// Confidence at exactly `threshold`.
    base_confidence: f64,
    /// Extra confidence per round beyond the threshold.
    step: f64,
    /// Confidence ceiling.
    max_confidence: f64,
}

impl StreakReversalStrategy {
    /// Create a new streak reversal strategy with default parameters.
    pub fn new() -> Self {
        Self {
            threshold: 5,
            base_confidence: 90.0,
            step: 2.0,
            max_confidence: 98.0,
        }
    }

    /// Set the run length at which the vote reverses.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold.max(1);
        self
    }
}

impl Default for StreakReversalStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for StreakReversalStrategy {
    fn name(&self) -> &str {
        "streak_reversal"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: self.name().to_string(),
            description: format!(
                "Votes against any run of {} or more identical labels",
                self.threshold
            ),
            min_history: self.min_history(),
            tags: vec!["streak".to_string(), "reversal".to_string()],
        }
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let (label, len) = ctx
            .streak()
            .ok_or_else(|| Error::strategy(self.name(), "empty history"))?;

        let vote = if len >= self.threshold {
            let extra = (len - self.threshold) as f64 * self.step;
            Vote::new(
                label.opposite(),
                (self.base_confidence + extra).min(self.max_confidence),
            )
        } else if len >= 3 {
            Vote::new(label, 60.0)
        } else {
            Vote::new(label, 52.0)
        };
        Ok(vote)
    }
}

/// Compares how often the history continued versus flipped.
///
/// A history dominated by continuations is followed; one dominated by flips
/// is reversed. Confidence scales with how lopsided the balance is.
#[derive(Debug, Clone, Default)]
pub struct MomentumStrategy;

impl Strategy for MomentumStrategy {
    fn name(&self) -> &str {
        "momentum"
    }

    fn min_history(&self) -> usize {
        2
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let labels = ctx.labels();
        let last = ctx
            .last_label()
            .ok_or_else(|| Error::strategy(self.name(), "empty history"))?;

        let pairs = labels.len().saturating_sub(1).max(1);
        let flips = StrategyContext::flips(labels);
        let score = (pairs - flips) as f64 - flips as f64;
        let confidence = 50.0 + 40.0 * score.abs() / pairs as f64;

        if score > 0.0 {
            Ok(Vote::new(last, confidence))
        } else {
            Ok(Vote::new(last.opposite(), confidence))
        }
    }
}

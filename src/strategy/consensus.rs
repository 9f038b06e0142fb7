//! Consensus aggregation of strategy votes.

use super::{StrategyContext, StrategyRegistry, Vote};
use crate::state::Label;
use serde::Serialize;
use tracing::warn;

/// Label returned when no strategy produced a vote.
pub const DEFAULT_LABEL: Label = Label::High;

/// Confidence returned when no strategy produced a vote.
pub const DEFAULT_CONFIDENCE: f64 = 60.0;

/// The ensemble prediction for the next round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Winning label.
    pub label: Label,
    /// Winning share of the summed confidence, `0..=100`.
    pub confidence: f64,
    /// Summed confidence of HIGH votes.
    pub high_score: f64,
    /// Summed confidence of LOW votes.
    pub low_score: f64,
    /// Number of strategies that voted.
    pub votes_cast: usize,
    /// Strategies excluded from this round because they failed.
    pub failed: Vec<String>,
}

impl Prediction {
    /// The prediction used when no vote is available.
    pub fn fallback() -> Self {
        Self {
            label: DEFAULT_LABEL,
            confidence: DEFAULT_CONFIDENCE,
            high_score: 0.0,
            low_score: 0.0,
            votes_cast: 0,
            failed: Vec::new(),
        }
    }
}

/// Combines every registered strategy's vote into one prediction.
#[derive(Debug)]
pub struct ConsensusAggregator {
    registry: StrategyRegistry,
}

impl ConsensusAggregator {
    pub fn new(registry: StrategyRegistry) -> Self {
        Self { registry }
    }

    /// The registry being aggregated.
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Predict the next label from the given history.
    ///
    /// Deterministic: the same context always produces the same prediction.
    pub fn predict(&self, ctx: &StrategyContext) -> Prediction {
        let mut votes = Vec::with_capacity(self.registry.len());
        let mut failed = Vec::new();

        for outcome in self.registry.evaluate(ctx) {
            match outcome.result {
                Ok(vote) => votes.push(vote),
                Err(e) => {
                    warn!(strategy = %outcome.name, error = %e, "strategy excluded from consensus");
                    failed.push(outcome.name);
                }
            }
        }

        let mut prediction = tally(&votes);
        prediction.failed = failed;
        prediction
    }
}

/// Confidence-weighted tally of a set of votes.
///
/// Ties go to HIGH.
pub fn tally(votes: &[Vote]) -> Prediction {
    let (high_score, low_score) =
        votes
            .iter()
            .fold((0.0, 0.0), |(high, low), vote| match vote.label {
                Label::High => (high + vote.confidence, low),
                Label::Low => (high, low + vote.confidence),
            });

    let sum = high_score + low_score;
    if votes.is_empty() || sum <= 0.0 {
        return Prediction {
            votes_cast: votes.len(),
            ..Prediction::fallback()
        };
    }

    let (label, winning) = if high_score >= low_score {
        (Label::High, high_score)
    } else {
        (Label::Low, low_score)
    };

    Prediction {
        label,
        confidence: (winning / sum * 100.0).clamp(0.0, 100.0),
        high_score,
        low_score,
        votes_cast: votes.len(),
        failed: Vec::new(),
    }
}

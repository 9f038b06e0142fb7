//! Parity strategies over totals and positions.

use crate::error::{Error, Result};
use crate::state::Label;
use crate::strategy::{Strategy, StrategyContext, Vote};

/// Compares HIGH rounds at even positions against LOW rounds at odd positions.
#[derive(Debug, Clone, Default)]
pub struct ParityIndexStrategy;

impl Strategy for ParityIndexStrategy {
    fn name(&self) -> &str {
        "parity_index"
    }

    fn min_history(&self) -> usize {
        4
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let (high_even, low_odd) =
            ctx.labels()
                .iter()
                .enumerate()
                .fold((0usize, 0usize), |(t, x), (i, label)| match label {
                    Label::High if i % 2 == 0 => (t + 1, x),
                    Label::Low if i % 2 == 1 => (t, x + 1),
                    _ => (t, x),
                });

        let counted = high_even + low_odd;
        let confidence = if counted == 0 {
            50.0
        } else {
            50.0 + 40.0 * high_even.abs_diff(low_odd) as f64 / counted as f64
        };

        if high_even >= low_odd {
            Ok(Vote::new(Label::High, confidence))
        } else {
            Ok(Vote::new(Label::Low, confidence))
        }
    }
}

/// Matches the even/odd pattern of the latest totals against earlier history
/// and votes for whatever followed the most recent earlier occurrence.
#[derive(Debug, Clone)]
pub struct ParitySequenceStrategy {
    pattern_len: usize,
}

impl ParitySequenceStrategy {
    pub fn new() -> Self {
        Self { pattern_len: 3 }
    }

    fn parity(total: u8) -> bool {
        total % 2 == 0
    }
}

impl Default for ParitySequenceStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for ParitySequenceStrategy {
    fn name(&self) -> &str {
        "parity_sequence"
    }

    fn min_history(&self) -> usize {
        self.pattern_len + 1
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let totals = ctx.totals();
        let last = ctx
            .last_label()
            .ok_or_else(|| Error::strategy(self.name(), "empty history"))?;

        let n = self.pattern_len;
        let key: Vec<bool> = ctx
            .recent_totals(n)
            .iter()
            .map(|&t| Self::parity(t))
            .collect();

        // `end` is the index just past a candidate window; the window's
        // follower is totals[end], so the live tail itself is never matched.
        for end in (n..totals.len()).rev() {
            let candidate = &totals[end - n..end];
            if candidate
                .iter()
                .map(|&t| Self::parity(t))
                .eq(key.iter().copied())
            {
                return Ok(Vote::new(Label::from_total(totals[end]), 62.0));
            }
        }

        Ok(Vote::new(last, 50.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_index() {
        // idx: 0 H, 1 L, 2 H, 3 H -> high_even 2, low_odd 1
        let ctx = StrategyContext::from_totals(vec![12, 5, 14, 11]);
        let vote = ParityIndexStrategy.evaluate(&ctx).unwrap();
        assert_eq!(vote.label, Label::High);
        assert!((vote.confidence - (50.0 + 40.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_parity_sequence_replays_follower() {
        // E O E was followed by 13 at the start; the tail is E O E again
        let ctx = StrategyContext::from_totals(vec![4, 7, 10, 13, 5, 9, 8, 3, 12]);
        let vote = ParitySequenceStrategy::new().evaluate(&ctx).unwrap();
        assert_eq!(vote.label, Label::High);
        assert_eq!(vote.confidence, 62.0);
    }

    #[test]
    fn test_parity_sequence_without_match_holds() {
        let ctx = StrategyContext::from_totals(vec![3, 5, 7, 4]);
        let vote = ParitySequenceStrategy::new().evaluate(&ctx).unwrap();
        assert_eq!(vote.label, Label::Low);
        assert_eq!(vote.confidence, 50.0);
    }
}

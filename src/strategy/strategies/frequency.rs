//! Frequency-based strategies.
//!
//! These count labels (or label changes) over a trailing window and vote
//! either with the majority or against an imbalance.

use crate::error::{Error, Result};
use crate::state::Label;
use crate::strategy::{Strategy, StrategyContext, StrategyMetadata, Vote};

/// Label frequency where recent rounds weigh more than older ones.
#[derive(Debug, Clone, Default)]
pub struct WeightedRecentStrategy;

impl Strategy for WeightedRecentStrategy {
    fn name(&self) -> &str {
        "weighted_recent"
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let (high, low) = ctx
            .labels()
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(high, low), (i, label)| {
                let weight = (i + 1) as f64;
                match label {
                    Label::High => (high + weight, low),
                    Label::Low => (high, low + weight),
                }
            });

        let total = high + low;
        if total <= 0.0 {
            return Err(Error::strategy(self.name(), "empty history"));
        }

        if high >= low {
            Ok(Vote::new(Label::High, high / total * 100.0))
        } else {
            Ok(Vote::new(Label::Low, low / total * 100.0))
        }
    }
}

/// Plain majority over the last few rounds. Ties go to HIGH.
#[derive(Debug, Clone)]
pub struct WindowMajorityStrategy {
    window: usize,
}

impl WindowMajorityStrategy {
    pub fn new() -> Self {
        Self { window: 6 }
    }
}

impl Default for WindowMajorityStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for WindowMajorityStrategy {
    fn name(&self) -> &str {
        "window_majority"
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let window = ctx.recent_labels(self.window).len();
        if window == 0 {
            return Err(Error::strategy(self.name(), "empty history"));
        }

        let high = ctx.count(Label::High, self.window);
        let low = window - high;
        let share = |n: usize| n as f64 / window as f64 * 100.0;

        if high >= low {
            Ok(Vote::new(Label::High, share(high)))
        } else {
            Ok(Vote::new(Label::Low, share(low)))
        }
    }
}

/// Reverses the last label when the history is too balanced to read;
/// otherwise sides with the overall majority.
#[derive(Debug, Clone, Default)]
pub struct EntropyStrategy;

impl Strategy for EntropyStrategy {
    fn name(&self) -> &str {
        "entropy"
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let last = ctx
            .last_label()
            .ok_or_else(|| Error::strategy(self.name(), "empty history"))?;

        let len = ctx.len();
        let high = ctx.count(Label::High, len);
        let low = len - high;
        let diff = high.abs_diff(low);

        if diff <= len / 5 {
            return Ok(Vote::new(last.opposite(), 55.0));
        }

        let confidence = 50.0 + 50.0 * diff as f64 / len as f64;
        if high > low {
            Ok(Vote::new(Label::High, confidence))
        } else {
            Ok(Vote::new(Label::Low, confidence))
        }
    }
}

/// Reverses the last label when the history flips unusually often.
#[derive(Debug, Clone)]
pub struct VolatilityStrategy {
    /// Flip ratio above which the history counts as choppy.
    flip_ratio: f64,
}

impl VolatilityStrategy {
    pub fn new() -> Self {
        Self { flip_ratio: 0.55 }
    }
}

impl Default for VolatilityStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for VolatilityStrategy {
    fn name(&self) -> &str {
        "volatility"
    }

    fn min_history(&self) -> usize {
        5
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let last = ctx
            .last_label()
            .ok_or_else(|| Error::strategy(self.name(), "empty history"))?;

        let ratio = StrategyContext::flips(ctx.labels()) as f64 / ctx.len() as f64;
        if ratio > self.flip_ratio {
            Ok(Vote::new(last.opposite(), 62.0))
        } else {
            Ok(Vote::new(last, 55.0))
        }
    }
}

/// Votes for the under-represented label once a trailing window becomes
/// lopsided, expecting the counts to even out.
#[derive(Debug, Clone)]
pub struct FrequencyImbalanceStrategy {
    window: usize,
    /// Minority share at or below which the window counts as imbalanced.
    max_minority_share: f64,
}

impl FrequencyImbalanceStrategy {
    pub fn new() -> Self {
        Self {
            window: 20,
            max_minority_share: 0.35,
        }
    }
}

impl Default for FrequencyImbalanceStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for FrequencyImbalanceStrategy {
    fn name(&self) -> &str {
        "frequency_imbalance"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: self.name().to_string(),
            description: format!(
                "Backs the minority label when it holds at most {:.0}% of the last {} rounds",
                self.max_minority_share * 100.0,
                self.window
            ),
            min_history: self.min_history(),
            tags: vec!["frequency".to_string(), "mean-reversion".to_string()],
        }
    }

    fn min_history(&self) -> usize {
        self.window / 2
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let last = ctx
            .last_label()
            .ok_or_else(|| Error::strategy(self.name(), "empty history"))?;

        let window = ctx.recent_labels(self.window).len();
        let high = ctx.count(Label::High, self.window);
        let low = window - high;
        let (minority, count) = if high < low {
            (Label::High, high)
        } else {
            (Label::Low, low)
        };

        let share = count as f64 / window as f64;
        if share <= self.max_minority_share {
            Ok(Vote::new(minority, 50.0 + 100.0 * (0.5 - share)))
        } else {
            Ok(Vote::new(last, 50.0))
        }
    }
}

//! Strategies that read the numeric totals rather than the labels.
//!
//! All three expect totals to drift back toward the three-dice midpoint and
//! hold the current label when nothing unusual has happened.

use crate::error::{Error, Result};
use crate::state::{Label, MIDPOINT};
use crate::strategy::{Strategy, StrategyContext, StrategyMetadata, Vote};

/// Rolling mean of recent totals compared with the 10.5 midpoint.
#[derive(Debug, Clone)]
pub struct MidpointDeviationStrategy {
    /// Totals averaged.
    window: usize,
    /// Minimum absolute deviation from the midpoint that triggers a vote.
    threshold: f64,
}

impl MidpointDeviationStrategy {
    pub fn new() -> Self {
        Self {
            window: 5,
            threshold: 1.5,
        }
    }
}

impl Default for MidpointDeviationStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MidpointDeviationStrategy {
    fn name(&self) -> &str {
        "midpoint_deviation"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: self.name().to_string(),
            description: format!(
                "Expects the mean of the last {} totals to revert when it strays {} from {}",
                self.window, self.threshold, MIDPOINT
            ),
            min_history: self.min_history(),
            tags: vec!["totals".to_string(), "mean-reversion".to_string()],
        }
    }

    fn min_history(&self) -> usize {
        3
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let last = ctx
            .last_label()
            .ok_or_else(|| Error::strategy(self.name(), "empty history"))?;
        let mean = ctx
            .mean_total(self.window)
            .ok_or_else(|| Error::strategy(self.name(), "no totals"))?;

        let deviation = mean - MIDPOINT;
        if deviation.abs() < self.threshold {
            return Ok(Vote::new(last, 50.0));
        }

        let label = if deviation > 0.0 {
            Label::Low
        } else {
            Label::High
        };
        Ok(Vote::new(label, (55.0 + 10.0 * deviation.abs()).min(85.0)))
    }
}

/// Bets on a rebound after an extreme total.
#[derive(Debug, Clone)]
pub struct ExtremeReboundStrategy {
    low_extreme: u8,
    high_extreme: u8,
}

impl ExtremeReboundStrategy {
    pub fn new() -> Self {
        Self {
            low_extreme: 5,
            high_extreme: 16,
        }
    }
}

impl Default for ExtremeReboundStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for ExtremeReboundStrategy {
    fn name(&self) -> &str {
        "extreme_rebound"
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let total = ctx
            .last_total()
            .ok_or_else(|| Error::strategy(self.name(), "empty history"))?;
        let label = Label::from_total(total);

        if total <= self.low_extreme || total >= self.high_extreme {
            Ok(Vote::new(label.opposite(), 72.0))
        } else {
            Ok(Vote::new(label, 45.0))
        }
    }
}

/// Reacts to a sudden swing between the last two totals.
#[derive(Debug, Clone)]
pub struct TotalJumpStrategy {
    min_jump: u8,
}

impl TotalJumpStrategy {
    pub fn new() -> Self {
        Self { min_jump: 7 }
    }
}

impl Default for TotalJumpStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for TotalJumpStrategy {
    fn name(&self) -> &str {
        "total_jump"
    }

    fn min_history(&self) -> usize {
        2
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let [previous, current] = ctx.recent_totals(2) else {
            return Err(Error::strategy(self.name(), "need two totals"));
        };

        if current.abs_diff(*previous) >= self.min_jump {
            let label = if f64::from(*current) > MIDPOINT {
                Label::Low
            } else {
                Label::High
            };
            Ok(Vote::new(label, 66.0))
        } else {
            Ok(Vote::new(Label::from_total(*current), 48.0))
        }
    }
}

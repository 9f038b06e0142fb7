//! Shape-matching strategies: alternation, mirrors and repeated blocks.

use crate::error::{Error, Result};
use crate::state::Label;
use crate::strategy::{Strategy, StrategyContext, Vote};

/// Detects a clean zig-zag (H L H L ...) and expects it to continue.
#[derive(Debug, Clone)]
pub struct AlternationStrategy {
    /// Labels inspected; every adjacent pair must differ.
    window: usize,
}

impl AlternationStrategy {
    pub fn new() -> Self {
        Self { window: 4 }
    }
}

impl Default for AlternationStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for AlternationStrategy {
    fn name(&self) -> &str {
        "alternation"
    }

    fn min_history(&self) -> usize {
        self.window
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let recent = ctx.recent_labels(self.window);
        let last = ctx
            .last_label()
            .ok_or_else(|| Error::strategy(self.name(), "empty history"))?;

        if StrategyContext::flips(recent) == recent.len() - 1 {
            Ok(Vote::new(last.opposite(), 75.0))
        } else {
            Ok(Vote::new(last, 52.0))
        }
    }
}

/// Treats a palindromic tail as a bouncing pattern and plays the reflection.
///
/// An even palindrome (`a b c c b a`) doubles at each turn, so the edge label
/// repeats. An odd palindrome (`a b c b a`) turns on a single label, so the
/// next slot mirrors the second-to-last one.
#[derive(Debug, Clone, Default)]
pub struct MirrorStrategy;

impl MirrorStrategy {
    fn is_palindrome(labels: &[Label]) -> bool {
        labels.iter().eq(labels.iter().rev())
    }
}

impl Strategy for MirrorStrategy {
    fn name(&self) -> &str {
        "mirror"
    }

    fn min_history(&self) -> usize {
        5
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let last = ctx
            .last_label()
            .ok_or_else(|| Error::strategy(self.name(), "empty history"))?;

        if ctx.len() >= 6 && Self::is_palindrome(ctx.recent_labels(6)) {
            return Ok(Vote::new(last, 68.0));
        }

        let tail = ctx.recent_labels(5);
        if tail.len() == 5 && Self::is_palindrome(tail) {
            return Ok(Vote::new(tail[3], 64.0));
        }

        Ok(Vote::new(last, 50.0))
    }
}

/// Looks for a block of labels repeated back-to-back at the tail and
/// continues it; otherwise falls back to a short majority.
#[derive(Debug, Clone)]
pub struct PatternRepeatStrategy {
    min_block: usize,
    max_block: usize,
    fallback_window: usize,
}

impl PatternRepeatStrategy {
    pub fn new() -> Self {
        Self {
            min_block: 2,
            max_block: 6,
            fallback_window: 5,
        }
    }
}

impl Default for PatternRepeatStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for PatternRepeatStrategy {
    fn name(&self) -> &str {
        "pattern_repeat"
    }

    fn min_history(&self) -> usize {
        self.min_block * 3
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<Vote> {
        let labels = ctx.labels();
        let len = labels.len();

        for block in self.min_block..=self.max_block.min(len / 2) {
            let current = &labels[len - block..];
            let previous = &labels[len - 2 * block..len - block];
            if current == previous {
                return Ok(Vote::new(current[0], 70.0));
            }
        }

        let high = ctx.count(Label::High, self.fallback_window);
        let window = ctx.recent_labels(self.fallback_window).len();
        let label = if high * 2 >= window {
            Label::High
        } else {
            Label::Low
        };
        Ok(Vote::new(label, 55.0))
    }
}

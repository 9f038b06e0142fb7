//! Built-in prediction rules.

mod alternation;
mod deviation;
mod frequency;
mod parity;
mod streak;

pub use alternation::{AlternationStrategy, MirrorStrategy, PatternRepeatStrategy};
pub use deviation::{ExtremeReboundStrategy, MidpointDeviationStrategy, TotalJumpStrategy};
pub use frequency::{
    EntropyStrategy, FrequencyImbalanceStrategy, VolatilityStrategy, WeightedRecentStrategy,
    WindowMajorityStrategy,
};
pub use parity::{ParityIndexStrategy, ParitySequenceStrategy};
pub use streak::{MomentumStrategy, StreakReversalStrategy};

use super::Strategy;

/// Every built-in strategy, in default evaluation order.
pub fn builtin() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(StreakReversalStrategy::new()),
        Box::new(WeightedRecentStrategy),
        Box::new(AlternationStrategy::new()),
        Box::new(MirrorStrategy),
        Box::new(PatternRepeatStrategy::new()),
        Box::new(WindowMajorityStrategy::new()),
        Box::new(MomentumStrategy),
        Box::new(VolatilityStrategy::new()),
        Box::new(EntropyStrategy),
        Box::new(ParityIndexStrategy),
        Box::new(ParitySequenceStrategy::new()),
        Box::new(MidpointDeviationStrategy::new()),
        Box::new(ExtremeReboundStrategy::new()),
        Box::new(TotalJumpStrategy::new()),
        Box::new(FrequencyImbalanceStrategy::new()),
    ]
}

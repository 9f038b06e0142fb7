//! Prediction strategies and their consensus.
//!
//! Each [`Strategy`] is a pure rule over a [`StrategyContext`]. The
//! [`StrategyRegistry`] runs them in isolation and the
//! [`ConsensusAggregator`] folds their votes into one [`Prediction`].

mod consensus;
mod context;
mod registry;
pub mod strategies;
mod traits;

pub use consensus::{
    ConsensusAggregator, DEFAULT_CONFIDENCE, DEFAULT_LABEL, Prediction, tally,
};
pub use context::StrategyContext;
pub use registry::{StrategyOutcome, StrategyRegistry};
pub use traits::{FALLBACK_CONFIDENCE, Strategy, StrategyMetadata, Vote};

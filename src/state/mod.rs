//! State management for dicecast.
//!
//! Decoded rounds, the bounded history that owns them, and the snapshot
//! published to readers after each accepted round.

mod outcome;
mod snapshot;
mod store;

pub use outcome::{HIGH_THRESHOLD, Label, MIDPOINT, OutcomeEvent};
pub use snapshot::{HistoryWindow, Snapshot};
pub use store::OutcomeStore;

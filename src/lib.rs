//! # Dicecast - live dice-round prediction service
//!
//! Subscribes to a SignalR result feed for a three-dice HIGH/LOW game, keeps a
//! bounded history of resolved rounds, and after every round runs an ensemble
//! of independent heuristics whose confidence-weighted votes become the
//! published prediction for the next round.
//!
//! ## Architecture
//!
//! - **Feed**: negotiate, connect, keepalive, decode and reconnect
//! - **Pipeline**: the single writer from decoded rounds into the store
//! - **State**: outcome events, the bounded store and published snapshots
//! - **Strategy**: heuristic voters, their registry and the consensus tally
//! - **Server**: read-only HTTP access to the latest snapshot
//! - **Config**: layered TOML and environment configuration

pub mod config;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod server;
pub mod state;
pub mod strategy;

pub use config::Config;
pub use error::{Error, Result};
pub use feed::{FeedClient, FeedState, SignalRConnector};
pub use pipeline::{IngestStatus, Pipeline};
pub use server::{QueryResult, QueryService};
pub use state::{Label, OutcomeEvent, OutcomeStore, Snapshot};
pub use strategy::{ConsensusAggregator, Prediction, Strategy, StrategyContext, StrategyRegistry, Vote};

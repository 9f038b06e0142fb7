//! Ingest pipeline - the single writer into the outcome store.
//!
//! Each accepted round triggers a fresh consensus over a copied history
//! window, and the result is published as the new snapshot.

use crate::config::StoreConfig;
use crate::state::{OutcomeEvent, OutcomeStore, Snapshot};
use crate::strategy::{ConsensusAggregator, StrategyContext};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of handing one round to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    /// The round was appended and a new snapshot published.
    Accepted,
    /// The round's session id was not newer than the last stored one.
    Duplicate,
}

/// Appends rounds and republishes the prediction.
#[derive(Debug)]
pub struct Pipeline {
    store: Arc<OutcomeStore>,
    aggregator: ConsensusAggregator,
    window_size: usize,
}

impl Pipeline {
    pub fn new(store: Arc<OutcomeStore>, aggregator: ConsensusAggregator, window_size: usize) -> Self {
        Self {
            store,
            aggregator,
            window_size: window_size.max(1),
        }
    }

    pub fn from_config(
        store: Arc<OutcomeStore>,
        aggregator: ConsensusAggregator,
        config: &StoreConfig,
    ) -> Self {
        Self::new(store, aggregator, config.window_size)
    }

    /// The store this pipeline writes to.
    pub fn store(&self) -> &Arc<OutcomeStore> {
        &self.store
    }

    /// Append `event` and, if it was new, publish a fresh snapshot.
    pub async fn ingest(&self, event: OutcomeEvent) -> IngestStatus {
        if !self.store.append(event).await {
            debug!(session_id = event.session_id(), "duplicate round ignored");
            return IngestStatus::Duplicate;
        }

        // Strategies see the full retained history; readers get the trailing window.
        let history = self.store.window(self.store.capacity()).await;
        let prediction = self.aggregator.predict(&StrategyContext::from(&history));

        info!(
            session_id = event.session_id(),
            dice = ?event.dice(),
            total = event.total(),
            label = %event.label(),
            next = %prediction.label,
            confidence = prediction.confidence,
            "round accepted"
        );

        let snapshot = Snapshot {
            outcome: event,
            prediction,
            window: history.tail(self.window_size),
            observed_at: Utc::now(),
        };
        self.store.set_latest(snapshot).await;

        IngestStatus::Accepted
    }
}

//! Published state visible to readers.

use super::OutcomeEvent;
use crate::strategy::Prediction;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A copied run of the most recent outcomes, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryWindow {
    events: Vec<OutcomeEvent>,
    totals: Vec<u8>,
}

impl HistoryWindow {
    pub fn new(events: Vec<OutcomeEvent>) -> Self {
        let totals = events.iter().map(|e| e.total()).collect();
        Self { events, totals }
    }

    pub fn events(&self) -> &[OutcomeEvent] {
        &self.events
    }

    pub fn totals(&self) -> &[u8] {
        &self.totals
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The last `k` entries of this window.
    pub fn tail(&self, k: usize) -> Self {
        let start = self.events.len().saturating_sub(k);
        Self {
            events: self.events[start..].to_vec(),
            totals: self.totals[start..].to_vec(),
        }
    }
}

/// The latest round together with the prediction for the next one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Most recently accepted round.
    pub outcome: OutcomeEvent,
    /// Ensemble prediction computed after that round.
    pub prediction: Prediction,
    /// Trailing rounds, ending with `outcome`.
    pub window: HistoryWindow,
    /// When the round was accepted.
    pub observed_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn session_id(&self) -> u64 {
        self.outcome.session_id()
    }
}

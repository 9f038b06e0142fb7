//! Bounded, ordered outcome history.

use super::{HistoryWindow, OutcomeEvent, Snapshot};
use crate::config::StoreConfig;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Owner of the outcome history and the published snapshot.
///
/// Exactly one writer (the ingest pipeline) appends and publishes; any
/// number of readers copy windows or clone the current snapshot `Arc`.
/// Every critical section is a short copy or swap, never computation or I/O.
#[derive(Debug)]
pub struct OutcomeStore {
    capacity: usize,
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    history: VecDeque<OutcomeEvent>,
    last_session_id: Option<u64>,
    latest: Option<Arc<Snapshot>>,
}

impl OutcomeStore {
    /// Create a store retaining at most `capacity` rounds.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(StoreInner::default()),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a round if it is newer than everything stored.
    ///
    /// Returns `false` (and changes nothing) for a duplicate or stale session
    /// id. On overflow the oldest round is evicted.
    #[allow(clippy::collapsible_if)] // Intentionally avoiding let-chains for stable Rust
    pub async fn append(&self, event: OutcomeEvent) -> bool {
        let mut inner = self.inner.write().await;

        if let Some(last) = inner.last_session_id {
            if event.session_id() <= last {
                debug!(
                    session_id = event.session_id(),
                    last_session_id = last,
                    "rejecting stale or duplicate round"
                );
                return false;
            }
        }

        inner.history.push_back(event);
        while inner.history.len() > self.capacity {
            inner.history.pop_front();
        }
        inner.last_session_id = Some(event.session_id());
        true
    }

    /// Copy of the last `k` rounds and their totals.
    pub async fn window(&self, k: usize) -> HistoryWindow {
        let events: Vec<OutcomeEvent> = {
            let inner = self.inner.read().await;
            let start = inner.history.len().saturating_sub(k);
            inner.history.range(start..).copied().collect()
        };
        HistoryWindow::new(events)
    }

    /// Publish a new snapshot.
    ///
    /// Returns `false` if a snapshot for a later round is already published.
    #[allow(clippy::collapsible_if)] // Intentionally avoiding let-chains for stable Rust
    pub async fn set_latest(&self, snapshot: Snapshot) -> bool {
        let snapshot = Arc::new(snapshot);
        let mut inner = self.inner.write().await;

        if let Some(current) = &inner.latest {
            if current.session_id() > snapshot.session_id() {
                return false;
            }
        }

        inner.latest = Some(snapshot);
        true
    }

    /// The published snapshot, if any round has been accepted yet.
    pub async fn latest(&self) -> Option<Arc<Snapshot>> {
        self.inner.read().await.latest.clone()
    }

    pub async fn last_session_id(&self) -> Option<u64> {
        self.inner.read().await.last_session_id
    }

    /// Number of rounds currently retained.
    pub async fn len(&self) -> usize {
        self.inner.read().await.history.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.history.is_empty()
    }
}

//! Read-only query surface over the published snapshot.

use crate::error::Result;
use crate::feed::FeedState;
use crate::state::{Label, OutcomeStore, Snapshot};
use crate::strategy::StrategyMetadata;
use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// What a reader sees right now.
#[derive(Debug, Clone)]
pub enum QueryResult {
    Ready(Arc<Snapshot>),
    /// No round has been accepted yet.
    Initializing,
}

/// Hands out the latest snapshot without ever blocking the writer for long.
#[derive(Debug, Clone)]
pub struct QueryService {
    store: Arc<OutcomeStore>,
}

impl QueryService {
    pub fn new(store: Arc<OutcomeStore>) -> Self {
        Self { store }
    }

    pub async fn current(&self) -> QueryResult {
        match self.store.latest().await {
            Some(snapshot) => QueryResult::Ready(snapshot),
            None => QueryResult::Initializing,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub session_id: u64,
    pub dice: [u8; 3],
    pub total: u8,
    pub label: Label,
    pub next_label: Label,
    pub confidence: f64,
    pub high_score: f64,
    pub low_score: f64,
    pub votes_cast: usize,
    pub failed_strategies: Vec<String>,
    pub recent_labels: Vec<Label>,
    pub recent_totals: Vec<u8>,
    pub observed_at: DateTime<Utc>,
}

impl From<&Snapshot> for SnapshotResponse {
    fn from(snapshot: &Snapshot) -> Self {
        let outcome = &snapshot.outcome;
        let prediction = &snapshot.prediction;
        Self {
            session_id: outcome.session_id(),
            dice: outcome.dice(),
            total: outcome.total(),
            label: outcome.label(),
            next_label: prediction.label,
            confidence: (prediction.confidence * 100.0).round() / 100.0,
            high_score: prediction.high_score,
            low_score: prediction.low_score,
            votes_cast: prediction.votes_cast,
            failed_strategies: prediction.failed.clone(),
            recent_labels: snapshot.window.events().iter().map(|e| e.label()).collect(),
            recent_totals: snapshot.window.totals().to_vec(),
            observed_at: snapshot.observed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SnapshotReply {
    Ready(SnapshotResponse),
    Waiting { status: &'static str, message: &'static str },
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub feed_state: FeedState,
    pub last_session_id: Option<u64>,
    pub history_len: usize,
    pub strategies: Vec<StrategyMetadata>,
}

#[derive(Clone)]
struct AppState {
    query: QueryService,
    feed_state: watch::Receiver<FeedState>,
    strategies: Arc<Vec<StrategyMetadata>>,
}

/// GET /api/snapshot
async fn snapshot_handler(State(state): State<AppState>) -> Json<SnapshotReply> {
    let reply = match state.query.current().await {
        QueryResult::Ready(snapshot) => SnapshotReply::Ready(SnapshotResponse::from(snapshot.as_ref())),
        QueryResult::Initializing => SnapshotReply::Waiting {
            status: "waiting",
            message: "No round has been observed yet.",
        },
    };
    Json(reply)
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let feed_state = *state.feed_state.borrow();
    Json(HealthResponse {
        status: "ok",
        feed_state,
        last_session_id: state.query.store.last_session_id().await,
        history_len: state.query.store.len().await,
        strategies: state.strategies.as_ref().clone(),
    })
}

pub fn router(
    query: QueryService,
    feed_state: watch::Receiver<FeedState>,
    strategies: Vec<StrategyMetadata>,
) -> Router {
    Router::new()
        .route("/api/snapshot", get(snapshot_handler))
        .route("/health", get(health_handler))
        .with_state(AppState {
            query,
            feed_state,
            strategies: Arc::new(strategies),
        })
}

/// Serve `app` on `listener` until `cancel` fires.
pub async fn serve(listener: TcpListener, app: Router, cancel: CancellationToken) -> Result<()> {
    info!(addr = %listener.local_addr()?, "query server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    info!("query server stopped");
    Ok(())
}

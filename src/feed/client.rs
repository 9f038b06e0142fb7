//! Long-running feed client: connect, keep alive, decode, reconnect.

use super::backoff::Backoff;
use super::codec::{self, FeedEvent};
use super::transport::{FeedConnection, FeedConnector};
use crate::config::FeedConfig;
use crate::error::Result;
use crate::pipeline::{IngestStatus, Pipeline};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection lifecycle, as observed by the rest of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    Disconnected,
    Negotiating,
    Connected,
    Backoff,
    Stopped,
}

impl std::fmt::Display for FeedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeedState::Disconnected => "disconnected",
            FeedState::Negotiating => "negotiating",
            FeedState::Connected => "connected",
            FeedState::Backoff => "backoff",
            FeedState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

enum SessionEnd {
    Closed,
    Cancelled,
}

/// Drives one upstream subscription for the lifetime of the service.
///
/// Every resolved round is handed to the [`Pipeline`]; everything else is
/// logged and dropped. Transport failures never escape [`FeedClient::run`]:
/// they end the current session and schedule a fresh negotiation.
pub struct FeedClient<C> {
    connector: C,
    pipeline: Arc<Pipeline>,
    hub_name: String,
    keepalive: Duration,
    backoff: Backoff,
    state_tx: watch::Sender<FeedState>,
}

impl<C: FeedConnector> FeedClient<C> {
    pub fn new(connector: C, pipeline: Arc<Pipeline>, config: &FeedConfig) -> Self {
        let (state_tx, _) = watch::channel(FeedState::Disconnected);
        Self {
            connector,
            pipeline,
            hub_name: config.hub_name.clone(),
            keepalive: config.keepalive(),
            backoff: Backoff::new(&config.backoff),
            state_tx,
        }
    }

    /// Receiver for lifecycle changes.
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> FeedState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: FeedState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "feed state changed");
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(hub = %self.hub_name, "feed client starting");

        loop {
            match self.run_session(&cancel).await {
                Ok(SessionEnd::Cancelled) => break,
                Ok(SessionEnd::Closed) => warn!("feed connection closed by peer"),
                Err(e) => error!(error = %e, recoverable = e.is_recoverable(), "feed session failed"),
            }
            if cancel.is_cancelled() {
                break;
            }

            let delay = self.backoff.next_delay();
            self.set_state(FeedState::Backoff);
            warn!(
                attempt = self.backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "reconnecting after delay"
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(FeedState::Stopped);
        info!("feed client stopped");
    }

    async fn run_session(&mut self, cancel: &CancellationToken) -> Result<SessionEnd> {
        self.set_state(FeedState::Negotiating);
        let token = tokio::select! {
            _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            token = self.connector.negotiate() => token?,
        };
        info!(
            token_prefix = %token.chars().take(10).collect::<String>(),
            "negotiated connection token"
        );

        let mut connection = tokio::select! {
            _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            connection = self.connector.connect(&token) => connection?,
        };
        self.set_state(FeedState::Connected);
        info!("feed connected");

        let end = self.pump(connection.as_mut(), cancel).await;
        connection.close().await;
        self.set_state(FeedState::Disconnected);
        end
    }

    async fn pump(
        &mut self,
        connection: &mut dyn FeedConnection,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd> {
        let mut keepalive = tokio::time::interval_at(Instant::now() + self.keepalive, self.keepalive);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
                _ = keepalive.tick() => {
                    connection.send_text(codec::keepalive_frame(&self.hub_name)).await?;
                    debug!("keepalive sent");
                }
                message = connection.next_message() => match message {
                    None => return Ok(SessionEnd::Closed),
                    Some(Err(e)) => return Err(e),
                    Some(Ok(raw)) => {
                        // Reset only once this session has delivered a round.
                        if self.handle_message(&raw).await > 0 && self.backoff.attempt() > 0 {
                            debug!(attempt = self.backoff.attempt(), "round accepted, backoff reset");
                            self.backoff.reset();
                        }
                    }
                },
            }
        }
    }

    /// Decode one frame and ingest any resolved rounds.
    ///
    /// Returns the number of rounds the pipeline accepted.
    pub async fn handle_message(&self, raw: &str) -> usize {
        let events = match codec::decode_message(raw, &self.hub_name) {
            Ok(events) => events,
            Err(e) => {
                warn!(
                    error = %e,
                    raw = %raw.chars().take(120).collect::<String>(),
                    "dropping undecodable message"
                );
                return 0;
            }
        };

        let mut accepted = 0;
        for event in events {
            match event {
                FeedEvent::Pending { session_id } => {
                    debug!(session_id, "round not resolved yet");
                }
                FeedEvent::Outcome(outcome) => {
                    if self.pipeline.ingest(outcome).await == IngestStatus::Accepted {
                        accepted += 1;
                    }
                }
            }
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackoffConfig;
    use crate::error::Error;
    use crate::feed::transport::MockFeedConnector;
    use crate::state::OutcomeStore;
    use crate::strategy::{ConsensusAggregator, StrategyRegistry};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HUB: &str = "luckydice1Hub";

    fn round(session: u64, dice: [i64; 3]) -> String {
        serde_json::json!({
            "M": [{
                "H": HUB,
                "M": codec::RESULT_METHOD,
                "A": [{
                    "Result": { "Dice1": dice[0], "Dice2": dice[1], "Dice3": dice[2] },
                    "SessionID": session,
                }]
            }]
        })
        .to_string()
    }

    fn fast_config() -> FeedConfig {
        FeedConfig {
            keepalive_secs: 30,
            backoff: BackoffConfig {
                initial_ms: 5,
                max_ms: 20,
                multiplier: 2.0,
                jitter: true,
            },
            ..FeedConfig::default()
        }
    }

    fn pipeline(store: &Arc<OutcomeStore>) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(
            Arc::clone(store),
            ConsensusAggregator::new(StrategyRegistry::with_defaults()),
            10,
        ))
    }

    enum Frame {
        Text(String),
        Error,
    }

    enum Step {
        RefuseNegotiation,
        Session { frames: Vec<Frame>, hold_open: bool },
    }

    /// Replays a fixed sequence of negotiations and sessions.
    struct ScriptedConnector {
        steps: Mutex<VecDeque<Step>>,
        negotiations: Arc<AtomicUsize>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedConnector {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                negotiations: Arc::new(AtomicUsize::new(0)),
                sent: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl FeedConnector for ScriptedConnector {
        async fn negotiate(&self) -> Result<String> {
            let n = self.negotiations.fetch_add(1, Ordering::SeqCst);
            let refuse = {
                let mut steps = self.steps.lock().unwrap();
                match steps.front() {
                    None => None,
                    Some(Step::RefuseNegotiation) => {
                        steps.pop_front();
                        Some(true)
                    }
                    Some(Step::Session { .. }) => Some(false),
                }
            };
            match refuse {
                None => std::future::pending().await,
                Some(true) => Err(Error::network("negotiate refused")),
                Some(false) => Ok(format!("token-{n}")),
            }
        }

        async fn connect(&self, _token: &str) -> Result<Box<dyn FeedConnection>> {
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Session { frames, hold_open }) => Ok(Box::new(ScriptedConnection {
                    frames: frames.into(),
                    hold_open,
                    sent: Arc::clone(&self.sent),
                })),
                _ => Err(Error::network("no session scripted")),
            }
        }
    }

    struct ScriptedConnection {
        frames: VecDeque<Frame>,
        hold_open: bool,
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl FeedConnection for ScriptedConnection {
        async fn next_message(&mut self) -> Option<Result<String>> {
            match self.frames.pop_front() {
                Some(Frame::Text(text)) => Some(Ok(text)),
                Some(Frame::Error) => Some(Err(Error::network("connection reset"))),
                None if self.hold_open => std::future::pending().await,
                None => None,
            }
        }

        async fn send_text(&mut self, text: String) -> Result<()> {
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn close(&mut self) {}
    }

    async fn wait_for_session(store: &OutcomeStore, session_id: u64) {
        tokio::time::timeout(Duration::from_secs(60), async {
            while store.last_session_id().await != Some(session_id) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("session never arrived");
    }

    #[tokio::test]
    async fn test_pending_round_is_not_ingested() {
        let store = Arc::new(OutcomeStore::new(100));
        let client = FeedClient::new(
            ScriptedConnector::new(Vec::new()),
            pipeline(&store),
            &fast_config(),
        );

        assert_eq!(client.handle_message(&round(10, [-1, -1, -1])).await, 0);
        assert!(store.is_empty().await);
        assert_eq!(store.last_session_id().await, None);
        assert!(store.latest().await.is_none());
    }

    #[tokio::test]
    async fn test_pending_round_after_accepted_one_changes_nothing() {
        let store = Arc::new(OutcomeStore::new(100));
        let client = FeedClient::new(
            ScriptedConnector::new(Vec::new()),
            pipeline(&store),
            &fast_config(),
        );

        assert_eq!(client.handle_message(&round(20, [3, 4, 5])).await, 1);
        let before = store.latest().await.unwrap();

        assert_eq!(client.handle_message(&round(21, [-1, -1, -1])).await, 0);
        assert_eq!(store.last_session_id().await, Some(20));
        assert_eq!(store.len().await, 1);
        assert!(Arc::ptr_eq(&before, &store.latest().await.unwrap()));

        // Once resolved, the same session is still new.
        assert_eq!(client.handle_message(&round(21, [1, 1, 2])).await, 1);
        assert_eq!(store.last_session_id().await, Some(21));
    }

    #[tokio::test]
    async fn test_replayed_session_is_ignored() {
        let store = Arc::new(OutcomeStore::new(100));
        let client = FeedClient::new(
            ScriptedConnector::new(Vec::new()),
            pipeline(&store),
            &fast_config(),
        );

        assert_eq!(client.handle_message(&round(500, [2, 2, 2])).await, 1);
        let before = store.latest().await.unwrap();

        assert_eq!(client.handle_message(&round(500, [6, 6, 6])).await, 0);
        assert_eq!(store.len().await, 1);
        assert!(Arc::ptr_eq(&before, &store.latest().await.unwrap()));
    }

    #[tokio::test]
    async fn test_garbage_is_dropped() {
        let store = Arc::new(OutcomeStore::new(100));
        let client = FeedClient::new(
            ScriptedConnector::new(Vec::new()),
            pipeline(&store),
            &fast_config(),
        );

        assert_eq!(client.handle_message("{\"M\": [").await, 0);
        assert_eq!(client.handle_message(&round(1, [0, 3, 3])).await, 0);
        assert_eq!(client.handle_message("{}").await, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_drop_and_resumes() {
        let store = Arc::new(OutcomeStore::new(100));
        let connector = ScriptedConnector::new(vec![
            Step::Session {
                frames: vec![
                    Frame::Text(round(1, [1, 2, 3])),
                    Frame::Text(round(2, [4, 5, 6])),
                    Frame::Error,
                ],
                hold_open: false,
            },
            Step::RefuseNegotiation,
            Step::Session {
                frames: vec![
                    Frame::Text(round(2, [4, 5, 6])),
                    Frame::Text(round(3, [6, 6, 6])),
                ],
                hold_open: true,
            },
        ]);
        let negotiations = Arc::clone(&connector.negotiations);

        let client = FeedClient::new(connector, pipeline(&store), &fast_config());
        let state = client.subscribe();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(client.run(cancel.clone()));

        wait_for_session(&store, 3).await;
        assert_eq!(negotiations.load(Ordering::SeqCst), 3);
        assert_eq!(*state.borrow(), FeedState::Connected);

        let ids: Vec<u64> = store
            .window(10)
            .await
            .events()
            .iter()
            .map(|e| e.session_id())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(*state.borrow(), FeedState::Stopped);
    }

    /// Accepts every connection, sends the hub init frame, then hangs up.
    struct FlappingConnector {
        negotiated_at: Arc<Mutex<Vec<Instant>>>,
    }

    #[async_trait]
    impl FeedConnector for FlappingConnector {
        async fn negotiate(&self) -> Result<String> {
            self.negotiated_at.lock().unwrap().push(Instant::now());
            Ok("token".to_string())
        }

        async fn connect(&self, _token: &str) -> Result<Box<dyn FeedConnection>> {
            let init = r#"{"C":"d-9A1B,0|E,0|F,1","S":1,"M":[]}"#.to_string();
            Ok(Box::new(ScriptedConnection {
                frames: VecDeque::from([Frame::Text(init)]),
                hold_open: false,
                sent: Arc::new(Mutex::new(Vec::new())),
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_when_server_drops_after_init() {
        let config = FeedConfig {
            backoff: BackoffConfig {
                initial_ms: 1_000,
                max_ms: 60_000,
                multiplier: 2.0,
                jitter: false,
            },
            ..fast_config()
        };
        let negotiated_at = Arc::new(Mutex::new(Vec::new()));
        let connector = FlappingConnector {
            negotiated_at: Arc::clone(&negotiated_at),
        };

        let store = Arc::new(OutcomeStore::new(100));
        let client = FeedClient::new(connector, pipeline(&store), &config);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(client.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(20)).await;
        cancel.cancel();
        handle.await.unwrap();

        let stamps = negotiated_at.lock().unwrap().clone();
        let gaps: Vec<u128> = stamps
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).as_millis())
            .collect();
        assert_eq!(gaps.len(), 4, "{gaps:?}");
        for (gap, expected) in gaps.iter().zip([1_000u128, 2_000, 4_000, 8_000]) {
            assert!((expected..expected + 5).contains(gap), "{gaps:?}");
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_sent_on_interval() {
        let store = Arc::new(OutcomeStore::new(100));
        let connector = ScriptedConnector::new(vec![Step::Session {
            frames: Vec::new(),
            hold_open: true,
        }]);
        let sent = Arc::clone(&connector.sent);

        let client = FeedClient::new(connector, pipeline(&store), &fast_config());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(client.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(65)).await;
        cancel.cancel();
        handle.await.unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|frame| frame.contains(codec::KEEPALIVE_METHOD)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_negotiation_failures_keep_retrying() {
        let mut connector = MockFeedConnector::new();
        connector
            .expect_negotiate()
            .times(3..)
            .returning(|| Err(Error::network("negotiate refused")));
        connector.expect_connect().never();

        let store = Arc::new(OutcomeStore::new(100));
        let client = FeedClient::new(connector, pipeline(&store), &fast_config());
        let mut state = client.subscribe();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(client.run(cancel.clone()));

        state
            .wait_for(|s| *s == FeedState::Backoff)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        cancel.cancel();
        handle.await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_cancel_before_connect_stops_cleanly() {
        let store = Arc::new(OutcomeStore::new(100));
        let client = FeedClient::new(
            ScriptedConnector::new(Vec::new()),
            pipeline(&store),
            &fast_config(),
        );
        assert_eq!(client.state(), FeedState::Disconnected);
        let state = client.subscribe();

        let cancel = CancellationToken::new();
        cancel.cancel();
        client.run(cancel).await;
        assert_eq!(*state.borrow(), FeedState::Stopped);
    }
}

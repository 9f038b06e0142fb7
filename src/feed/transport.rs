//! SignalR negotiate/connect transport.

use crate::config::FeedConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

/// Opens connections to the result feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedConnector: Send + Sync {
    /// Obtain a fresh connection token.
    async fn negotiate(&self) -> Result<String>;

    /// Open a connection authorised by `token`.
    async fn connect(&self, token: &str) -> Result<Box<dyn FeedConnection>>;
}

/// An open, bidirectional text connection.
#[async_trait]
pub trait FeedConnection: Send {
    /// Next text frame, or `None` once the peer has closed the connection.
    async fn next_message(&mut self) -> Option<Result<String>>;

    async fn send_text(&mut self, text: String) -> Result<()>;

    async fn close(&mut self);
}

#[derive(Debug, Deserialize)]
struct NegotiateResponse {
    #[serde(rename = "ConnectionToken")]
    connection_token: String,
}

/// Connector for a SignalR 1.x hub over WebSockets.
#[derive(Debug, Clone)]
pub struct SignalRConnector {
    http: reqwest::Client,
    config: FeedConfig,
}

impl SignalRConnector {
    pub fn new(config: FeedConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { http, config })
    }

    pub fn negotiate_url(&self) -> Result<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        Ok(Url::parse_with_params(
            &format!("{base}/negotiate"),
            &[("clientProtocol", self.config.client_protocol.as_str())],
        )?)
    }

    /// WebSocket URL for `token`; every query value is percent-encoded.
    pub fn connect_url(&self, token: &str) -> Result<Url> {
        let base = self.config.websocket_base();
        let connection_data = serde_json::json!([{ "name": self.config.hub_name }]).to_string();
        let tid = self.config.tid.to_string();

        Ok(Url::parse_with_params(
            &format!("{}/connect", base.trim_end_matches('/')),
            &[
                ("transport", self.config.transport.as_str()),
                ("clientProtocol", self.config.client_protocol.as_str()),
                ("connectionToken", token),
                ("connectionData", connection_data.as_str()),
                ("tid", tid.as_str()),
            ],
        )?)
    }
}

#[async_trait]
impl FeedConnector for SignalRConnector {
    async fn negotiate(&self) -> Result<String> {
        let url = self.negotiate_url()?;
        debug!(%url, "negotiating connection token");

        let response: NegotiateResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.connection_token.is_empty() {
            return Err(Error::network("negotiate returned an empty connection token"));
        }
        Ok(response.connection_token)
    }

    async fn connect(&self, token: &str) -> Result<Box<dyn FeedConnection>> {
        let url = self.connect_url(token)?;
        let (stream, response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        debug!(status = %response.status(), "websocket handshake complete");
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedConnection for WsConnection {
    async fn next_message(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => {
                    return Some(
                        String::from_utf8(bytes)
                            .map_err(|_| Error::decode("binary frame is not valid UTF-8")),
                    );
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "peer sent close frame");
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "error while closing websocket");
        }
    }
}

//! Feed collaborators: WebSocket consumer and initial REST snapshot.
//!
//! Transport policy (reconnection, keepalive, subscribe intents) lives here,
//! outside the engine. Parsed events are handed to the UI task over a channel;
//! anything unparseable is logged and dropped.

use smol_str::SmolStr;
use std::time::Duration;
use tickerlens_engine::{FeedError, FeedEvent, Position};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

/// Feed configuration, overridable via environment variables.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket event stream URL (`TICKERLENS_WS_URL`).
    pub ws_url: String,
    /// REST endpoint returning the initial `Position[]` snapshot
    /// (`TICKERLENS_REST_URL`).
    pub rest_url: String,
    /// Ping interval to keep the connection alive.
    pub ping_interval: Duration,
    /// Reconnection delay after disconnect.
    pub reconnect_delay: Duration,
    /// Event channel buffer size.
    pub channel_buffer_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://127.0.0.1:9001".to_string(),
            rest_url: "http://127.0.0.1:9002/positions".to_string(),
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(2),
            channel_buffer_size: 1000,
        }
    }
}

impl FeedConfig {
    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("TICKERLENS_WS_URL") {
            config.ws_url = url;
        }
        if let Ok(url) = std::env::var("TICKERLENS_REST_URL") {
            config.rest_url = url;
        }
        config
    }

    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// Connection status updates surfaced to the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting,
}

/// Handles returned by [`start`]: parsed events, connection status, and a
/// sender for subscribe-intent pass-through when the viewed symbol changes.
pub struct FeedHandles {
    pub events: mpsc::Receiver<FeedEvent>,
    pub status: mpsc::Receiver<ConnectionStatus>,
    pub subscribe: mpsc::Sender<SmolStr>,
}

/// Spawn the WebSocket consumer task.
pub fn start(config: FeedConfig) -> FeedHandles {
    let (event_tx, event_rx) = mpsc::channel(config.channel_buffer_size);
    let (status_tx, status_rx) = mpsc::channel(10);
    let (subscribe_tx, subscribe_rx) = mpsc::channel(10);

    tokio::spawn(async move {
        run_feed_loop(config, event_tx, status_tx, subscribe_rx).await;
    });

    FeedHandles {
        events: event_rx,
        status: status_rx,
        subscribe: subscribe_tx,
    }
}

/// Main connection loop with auto-reconnect.
async fn run_feed_loop(
    config: FeedConfig,
    event_tx: mpsc::Sender<FeedEvent>,
    status_tx: mpsc::Sender<ConnectionStatus>,
    mut subscribe_rx: mpsc::Receiver<SmolStr>,
) {
    info!("starting feed client for {}", config.ws_url);

    loop {
        let _ = status_tx.send(ConnectionStatus::Reconnecting).await;

        match connect_async(&config.ws_url).await {
            Ok((ws_stream, _)) => {
                info!("connected to feed at {}", config.ws_url);
                let _ = status_tx.send(ConnectionStatus::Connected).await;

                let (mut write, mut read) = ws_stream.split();
                let mut ping = tokio::time::interval(config.ping_interval);
                ping.tick().await; // first tick completes immediately

                loop {
                    tokio::select! {
                        _ = ping.tick() => {
                            if write.send(Message::Ping(vec![].into())).await.is_err() {
                                debug!("failed to send ping, connection likely dead");
                                break;
                            }
                        }
                        intent = subscribe_rx.recv() => {
                            let Some(symbol) = intent else {
                                warn!("subscribe channel closed, stopping feed client");
                                return;
                            };
                            let frame = serde_json::json!({"subscribe": symbol}).to_string();
                            if write.send(Message::Text(frame.into())).await.is_err() {
                                break;
                            }
                        }
                        msg = read.next() => {
                            let Some(msg) = msg else {
                                break;
                            };
                            match msg {
                                Ok(Message::Text(text)) => {
                                    match serde_json::from_str::<FeedEvent>(&text) {
                                        Ok(event) => {
                                            if event_tx.send(event).await.is_err() {
                                                warn!("event receiver dropped, stopping feed client");
                                                return;
                                            }
                                        }
                                        Err(e) => {
                                            error!("{}", FeedError::from(e));
                                            debug!("raw frame: {}", text);
                                        }
                                    }
                                }
                                Ok(Message::Close(_)) => {
                                    info!("server closed connection");
                                    break;
                                }
                                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                                    // heartbeat, tungstenite replies automatically
                                }
                                Err(e) => {
                                    let error = FeedError::Socket(e.to_string());
                                    error!("{error}");
                                    if error.is_terminal() {
                                        break;
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                }

                let _ = status_tx.send(ConnectionStatus::Disconnected).await;
            }
            Err(e) => {
                error!("failed to connect to {}: {}", config.ws_url, e);
                let _ = status_tx.send(ConnectionStatus::Disconnected).await;
            }
        }

        debug!("waiting {:?} before reconnecting", config.reconnect_delay);
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

/// One-shot fetch of the initial position snapshot, applied before the
/// stream's first snapshot arrives. Failure is non-fatal: the engine simply
/// starts with an empty book.
pub async fn fetch_initial_positions(config: &FeedConfig) -> Result<Vec<Position>, FeedError> {
    let client = reqwest::Client::new();
    let response = client
        .get(&config.rest_url)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| FeedError::Snapshot(e.to_string()))?;

    if !response.status().is_success() {
        return Err(FeedError::Snapshot(format!("HTTP {}", response.status())));
    }

    response
        .json::<Vec<Position>>()
        .await
        .map_err(|e| FeedError::Snapshot(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = FeedConfig::default()
            .with_ws_url("ws://localhost:8080")
            .with_reconnect_delay(Duration::from_secs(5));

        assert_eq!(config.ws_url, "ws://localhost:8080");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.rest_url, "http://127.0.0.1:9002/positions");
    }

    #[test]
    fn test_default_config() {
        let config = FeedConfig::default();
        assert_eq!(config.ws_url, "ws://127.0.0.1:9001");
        assert_eq!(config.ping_interval, Duration::from_secs(30));
        assert_eq!(config.channel_buffer_size, 1000);
    }
}

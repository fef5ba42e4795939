//! # Custom Connector Example
//!
//! Shows how to implement the [`Connector`] and [`EventStream`] traits with
//! an in-process channel instead of a WebSocket. Useful for driving the
//! client from a test harness or from a bridge that already receives the
//! player's events some other way.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example custom_connector
//! ```

use std::sync::Mutex;

use async_trait::async_trait;
use remote_player_client::transport::{Connector, EventStream};
use remote_player_client::{
    ClientServices, ConnectionState, RemotePlayerClient, RemotePlayerConfig, RemotePlayerError,
};
use serde_json::json;
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Step 1: A channel-backed event stream
// ─────────────────────────────────────────────────────────────────────

/// Receives event JSON from a [`mpsc`] channel.
///
/// `recv` is cancel-safe because `mpsc::UnboundedReceiver::recv` is.
struct ChannelStream {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl EventStream for ChannelStream {
    async fn recv(&mut self) -> Option<Result<String, RemotePlayerError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), RemotePlayerError> {
        self.rx.close();
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: A connector that hands out the stream once
// ─────────────────────────────────────────────────────────────────────

/// Yields its stream on the first connect and refuses every later attempt.
struct ChannelConnector {
    stream: Mutex<Option<ChannelStream>>,
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn EventStream>, RemotePlayerError> {
        tracing::info!("Connector asked for {url}");
        let stream = self
            .stream
            .lock()
            .map_err(|_| RemotePlayerError::TransportClosed)?
            .take()
            .ok_or(RemotePlayerError::TransportClosed)?;
        Ok(Box::new(stream))
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 3: Feed events and watch the mirrored state
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (tx, rx) = mpsc::unbounded_channel();
    let connector = std::sync::Arc::new(ChannelConnector {
        stream: Mutex::new(Some(ChannelStream { rx })),
    });

    let client = RemotePlayerClient::start(
        RemotePlayerConfig::new("custom-connector-demo"),
        ClientServices::new(connector),
    )?;

    let mut connection = client.subscribe_connection();
    while !matches!(*connection.borrow_and_update(), ConnectionState::Connected) {
        connection.changed().await?;
    }

    // ── Pretend to be the player ────────────────────────────────────
    let events = [
        json!({
            "type": "PLAYER_INFO",
            "song": {
                "title": "Windowlicker",
                "artist": "Aphex Twin",
                "songDuration": 367,
                "videoId": "demo",
                "mediaType": "AUDIO",
            },
            "isPlaying": true,
            "muted": false,
            "position": 12,
            "volume": 70,
            "repeat": "NONE",
            "shuffle": false,
        }),
        json!({ "type": "POSITION_CHANGED", "position": 13 }),
        json!({ "type": "VOLUME_CHANGED", "volume": 35, "muted": false }),
        json!({ "type": "PLAYER_STATE_CHANGED", "isPlaying": false, "position": 14 }),
    ];

    let mut state = client.subscribe();
    for event in events {
        tx.send(event.to_string())?;
        state.changed().await?;
        let snapshot = state.borrow_and_update().clone();
        tracing::info!(
            "playing={} position={} volume={}",
            snapshot.is_playing,
            snapshot.position_seconds,
            snapshot.volume_percent
        );
    }

    // ── Clean shutdown ──────────────────────────────────────────────
    client.shutdown().await;
    tracing::info!("Done. Custom connector works!");
    Ok(())
}

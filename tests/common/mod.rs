#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for remote player client integration tests.
//!
//! Provides a scripted [`MockConnector`], a channel-backed [`MockStream`], a
//! recording notifier and helpers that build the JSON the remote player
//! sends.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use remote_player_client::transport::{Connector, EventStream};
use remote_player_client::{
    ClientServices, MemoryCredentialStore, Notifier, RemotePlayerConfig, RemotePlayerError,
    Severity,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

// ── MockStream ──────────────────────────────────────────────────────

/// An event stream fed by a [`StreamHandle`].
///
/// `recv` yields whatever the handle pushes and returns `None` once the
/// handle is dropped or [`StreamHandle::close`] is called.
pub struct MockStream {
    rx: mpsc::UnboundedReceiver<Result<String, RemotePlayerError>>,
}

#[async_trait]
impl EventStream for MockStream {
    async fn recv(&mut self) -> Option<Result<String, RemotePlayerError>> {
        self.rx.recv().await
    }

    async fn close(&mut self) -> Result<(), RemotePlayerError> {
        self.rx.close();
        Ok(())
    }
}

/// Test-side end of a [`MockStream`].
pub struct StreamHandle {
    tx: mpsc::UnboundedSender<Result<String, RemotePlayerError>>,
}

impl StreamHandle {
    pub fn send(&self, message: Value) {
        let _ = self.tx.send(Ok(message.to_string()));
    }

    pub fn send_raw(&self, text: &str) {
        let _ = self.tx.send(Ok(text.to_owned()));
    }

    pub fn fail(&self, reason: &str) {
        let _ = self
            .tx
            .send(Err(RemotePlayerError::TransportReceive(reason.to_owned())));
    }

    /// End the stream as if the remote player closed the connection.
    pub fn close(self) {}
}

// ── MockConnector ───────────────────────────────────────────────────

enum Outcome {
    Refuse,
    Open(MockStream),
}

/// A connector that plays back a script of connection outcomes.
///
/// Each `connect` call consumes the next outcome. Once the script runs out
/// every attempt is refused. The (paused) time of every attempt is recorded.
#[derive(Default)]
pub struct MockConnector {
    script: StdMutex<VecDeque<Outcome>>,
    pub attempts: StdMutex<Vec<Instant>>,
    pub urls: StdMutex<Vec<String>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script a refused connection attempt.
    pub fn refuse(&self) {
        self.script.lock().unwrap().push_back(Outcome::Refuse);
    }

    /// Script a successful connection and return the handle that feeds it.
    pub fn accept(&self) -> StreamHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script
            .lock()
            .unwrap()
            .push_back(Outcome::Open(MockStream { rx }));
        StreamHandle { tx }
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Milliseconds between the first attempt and each attempt.
    pub fn attempt_offsets_ms(&self) -> Vec<u128> {
        let attempts = self.attempts.lock().unwrap();
        let Some(first) = attempts.first().copied() else {
            return Vec::new();
        };
        attempts
            .iter()
            .map(|at| at.duration_since(first).as_millis())
            .collect()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn EventStream>, RemotePlayerError> {
        self.attempts.lock().unwrap().push(Instant::now());
        self.urls.lock().unwrap().push(url.to_owned());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Outcome::Open(stream)) => Ok(Box::new(stream)),
            Some(Outcome::Refuse) | None => Err(RemotePlayerError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
        }
    }
}

// ── RecordingNotifier ───────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    pub seen: StdMutex<Vec<(String, String, Severity)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str, severity: Severity) {
        self.seen
            .lock()
            .unwrap()
            .push((title.to_owned(), body.to_owned(), severity));
    }
}

// ── Setup helpers ───────────────────────────────────────────────────

/// Configuration pointing at an address nothing listens on. Push-mode tests
/// use it together with a [`MockConnector`].
pub fn offline_config() -> RemotePlayerConfig {
    RemotePlayerConfig::new("test-client")
        .with_host("127.0.0.1")
        .with_port(9)
}

/// Configuration pointing at a wiremock server.
pub fn config_for(server: &wiremock::MockServer) -> RemotePlayerConfig {
    let address = server.address();
    RemotePlayerConfig::new("test-client")
        .with_host(address.ip().to_string())
        .with_port(address.port())
}

pub fn services(connector: Arc<MockConnector>) -> ClientServices {
    ClientServices::new(connector).with_credentials(Arc::new(MemoryCredentialStore::new()))
}

/// Wait until `rx` holds a value matching `predicate`, or panic after a
/// minute (of paused time, in tests that pause the clock).
pub async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, mut predicate: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    let found = tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            {
                let value = rx.borrow_and_update();
                if predicate(&value) {
                    return value.clone();
                }
            }
            rx.changed().await.expect("watch sender dropped");
        }
    })
    .await;
    found.expect("timed out waiting for watch value")
}

// ── JSON fixtures ───────────────────────────────────────────────────

pub fn song_json(title: &str, duration: f64, elapsed: f64, paused: bool) -> Value {
    json!({
        "title": title,
        "artist": "Test Artist",
        "album": "Test Album",
        "songDuration": duration,
        "imageSrc": "https://img.example/cover.jpg",
        "url": "https://music.example/watch?v=abc",
        "mediaType": "AUDIO",
        "videoId": "abc",
        "playlistId": "PL1",
        "tags": ["test"],
        "views": 42,
        "isPaused": paused,
        "elapsedSeconds": elapsed,
    })
}

pub fn player_info_json(song: Option<Value>, is_playing: bool, position: f64) -> Value {
    json!({
        "type": "PLAYER_INFO",
        "song": song,
        "isPlaying": is_playing,
        "muted": false,
        "position": position,
        "volume": 80,
        "repeat": "ALL",
        "shuffle": true,
    })
}

pub fn position_changed_json(position: f64) -> Value {
    json!({ "type": "POSITION_CHANGED", "position": position })
}

pub fn player_state_changed_json(is_playing: bool, position: f64) -> Value {
    json!({ "type": "PLAYER_STATE_CHANGED", "isPlaying": is_playing, "position": position })
}

pub fn volume_changed_json(volume: f64, muted: bool) -> Value {
    json!({ "type": "VOLUME_CHANGED", "volume": volume, "muted": muted })
}

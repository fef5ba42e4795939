//! WebSocket event stream using `tokio-tungstenite`.
//!
//! Both `ws://` and `wss://` URLs are supported; TLS is handled through
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! This module is only available when the `transport-websocket` feature is
//! enabled (it is enabled by default).

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::RemotePlayerError;
use crate::transport::{Connector, EventStream};

/// The underlying `tokio-tungstenite` stream.
///
/// Public so callers can wrap a stream they opened themselves via
/// [`WebSocketStream::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// An [`EventStream`] backed by a WebSocket connection.
///
/// Text frames are returned as messages. Ping, pong and binary frames are
/// skipped; a close frame ends the stream.
///
/// # Cancel Safety
///
/// [`recv`](EventStream::recv) is cancel-safe.
#[derive(Debug)]
pub struct WebSocketStream {
    stream: WsStream,
    closed: bool,
}

impl WebSocketStream {
    /// Open a WebSocket connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`RemotePlayerError::Io`] if the URL is invalid or the
    /// connection cannot be established. The [`ErrorKind`](std::io::ErrorKind)
    /// of an underlying I/O error is preserved.
    pub async fn connect(url: &str) -> Result<Self, RemotePlayerError> {
        tracing::debug!(url = %url, "connecting to event stream");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            RemotePlayerError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "event stream connected");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl EventStream for WebSocketStream {
    async fn recv(&mut self) -> Option<Result<String, RemotePlayerError>> {
        if self.closed {
            return None;
        }
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(RemotePlayerError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                // tungstenite queues the pong reply itself.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("received raw WebSocket frame, skipping");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), RemotePlayerError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| RemotePlayerError::TransportReceive(e.to_string()))
    }
}

/// [`Connector`] that opens a [`WebSocketStream`] per connection attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn EventStream>, RemotePlayerError> {
        let stream = WebSocketStream::connect(url).await?;
        Ok(Box::new(stream))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    use futures_util::SinkExt;
    use tokio::net::TcpListener;

    #[test]
    fn websocket_stream_is_send_and_debug() {
        fn assert_send<T: Send + std::fmt::Debug>() {}
        assert_send::<WebSocketStream>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketStream::connect("not-a-valid-url").await.unwrap_err();
        assert!(matches!(err, RemotePlayerError::Io(_)));
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketConnector::new()
            .connect("ws://127.0.0.1:1/api/v1/ws")
            .await
            .err().unwrap();
        assert!(matches!(err, RemotePlayerError::Io(_)));
    }

    // ── Mock server ──────────────────────────────────────────────────────

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and returns the URL to connect to.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}/api/v1/ws")
    }

    #[tokio::test]
    async fn recv_yields_player_events_in_order() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"POSITION_CHANGED","position":3}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"SHUFFLE_CHANGED","shuffle":true}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut stream = WebSocketConnector::new().connect(&url).await.unwrap();
        let first = stream.recv().await.unwrap().unwrap();
        assert!(first.contains("POSITION_CHANGED"));
        let second = stream.recv().await.unwrap().unwrap();
        assert!(second.contains("SHUFFLE_CHANGED"));
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_skips_binary_and_ping_frames() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Ping(vec![1].into())).await.unwrap();
            ws.send(Message::Text("after".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut stream = WebSocketStream::connect(&url).await.unwrap();
        assert_eq!(stream.recv().await.unwrap().unwrap(), "after");
    }

    #[tokio::test]
    async fn close_is_idempotent_and_ends_the_stream() {
        let url =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut stream = WebSocketStream::connect(&url).await.unwrap();
        stream.close().await.unwrap();
        stream.close().await.unwrap();
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn from_stream_wraps_existing_connection() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text("wrapped".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let (raw, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        let mut stream = WebSocketStream::from_stream(raw);
        assert_eq!(stream.recv().await.unwrap().unwrap(), "wrapped");
    }
}

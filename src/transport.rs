//! Event-stream abstraction for push mode.
//!
//! In push mode the remote player sends one JSON text message per state
//! change over a long-lived connection. The client only ever reads from that
//! connection, so an [`EventStream`] is receive-only. Opening streams is the
//! job of a [`Connector`], which the connection loop calls again after every
//! disconnect.
//!
//! # Implementing a Custom Connector
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use remote_player_client::error::RemotePlayerError;
//! use remote_player_client::transport::{Connector, EventStream};
//!
//! struct MyStream { /* ... */ }
//!
//! #[async_trait]
//! impl EventStream for MyStream {
//!     async fn recv(&mut self) -> Option<Result<String, RemotePlayerError>> {
//!         // Return the next JSON text message, or None once closed
//!         None
//!     }
//!
//!     async fn close(&mut self) -> Result<(), RemotePlayerError> {
//!         Ok(())
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     async fn connect(&self, _url: &str) -> Result<Box<dyn EventStream>, RemotePlayerError> {
//!         Ok(Box::new(MyStream {}))
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::RemotePlayerError;

/// A receive-only stream of JSON text messages from the remote player.
///
/// # Cancel Safety
///
/// [`recv`](EventStream::recv) **MUST** be cancel-safe: the connection loop
/// races it against the shutdown signal inside `tokio::select!`. Cancelling
/// it must not lose a message.
#[async_trait]
pub trait EventStream: Send + 'static {
    /// Receive the next message.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(e))`: the connection failed (e.g. [`RemotePlayerError::TransportReceive`])
    /// - `None`: the remote side closed the connection
    async fn recv(&mut self) -> Option<Result<String, RemotePlayerError>>;

    /// Close the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations should
    /// still release their resources.
    async fn close(&mut self) -> Result<(), RemotePlayerError>;
}

/// Opens [`EventStream`]s.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a new stream to `url`.
    ///
    /// # Errors
    ///
    /// Any error is treated as a failed connection attempt and retried with
    /// backoff.
    async fn connect(&self, url: &str) -> Result<Box<dyn EventStream>, RemotePlayerError>;
}

//! Event-stream implementations.
//!
//! | Feature                | Connector              | Stream              |
//! |------------------------|------------------------|---------------------|
//! | `transport-websocket`  | [`WebSocketConnector`] | [`WebSocketStream`] |
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), remote_player_client::RemotePlayerError> {
//! use remote_player_client::transport::EventStream;
//! use remote_player_client::WebSocketStream;
//!
//! let mut stream = WebSocketStream::connect("ws://localhost:26538/api/v1/ws").await?;
//! if let Some(Ok(msg)) = stream.recv().await {
//!     println!("remote player said: {msg}");
//! }
//! stream.close().await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnector, WebSocketStream};

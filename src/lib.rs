//! # Remote Player Client
//!
//! Async Rust client for remote-controlling a media player that exposes an
//! HTTP control API and a WebSocket event stream.
//!
//! The client keeps a local mirror of the player's state (current track,
//! playback, position, volume, repeat and shuffle) in sync with the remote
//! player and relays playback commands to it.
//!
//! ## Features
//!
//! - **Push or poll**: follow the remote player's event stream, or poll its
//!   query endpoints with optimistic local updates for commands
//! - **Consent-based auth**: obtains a bearer token through the player's
//!   approval prompt on demand and persists it through a [`CredentialStore`]
//! - **Self-healing**: lost connections clear the mirror and reconnect with
//!   bounded exponential backoff
//! - **Observable**: state and connection changes are published on
//!   [`tokio::sync::watch`] channels
//! - **WebSocket built-in**: the default `transport-websocket` feature provides
//!   [`WebSocketConnector`]; implement [`Connector`] for anything else
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn example() -> remote_player_client::Result<()> {
//! use remote_player_client::{ClientServices, RemotePlayerClient, RemotePlayerConfig};
//!
//! let client = RemotePlayerClient::start(
//!     RemotePlayerConfig::new("my-widget"),
//!     ClientServices::default(),
//! )?;
//! client.toggle_playback().await?;
//! println!("{:?}", client.snapshot());
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod api;
mod auth;
pub mod backoff;
pub mod client;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod notify;
mod poll;
pub mod protocol;
pub mod state;
pub mod store;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use client::{ClientServices, RemotePlayerClient};
pub use config::{RemotePlayerConfig, SyncMode};
pub use connection::ConnectionState;
pub use credentials::{
    CredentialStore, CredentialStoreError, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore,
};
pub use error::{RemotePlayerError, Result};
pub use notify::{Notifier, Severity, TracingNotifier};
pub use protocol::{MediaType, PlayerEvent, RepeatMode, SongInfo, Track};
pub use state::PlayerState;
pub use transport::{Connector, EventStream};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketStream};

//! Error types for the remote player client.

use thiserror::Error;

/// Errors that can occur when talking to the remote player.
#[derive(Debug, Error)]
pub enum RemotePlayerError {
    /// The HTTP request could not be completed (connection refused, timeout, ...).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The remote player rejected our credential, or the consent flow failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The remote API answered with a non-2xx status.
    #[error("remote API error ({status}): {body}")]
    RemoteApi {
        /// HTTP status code of the final response.
        status: u16,
        /// Response body text, as returned by the remote player.
        body: String,
    },

    /// A payload from the remote player could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Failed to serialize or deserialize a JSON payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A state transition that should be unreachable was requested.
    #[error("state invariant violated: {0}")]
    StateInvariant(String),

    /// Failed to receive a message from the event stream.
    #[error("event stream receive error: {0}")]
    TransportReceive(String),

    /// The event stream was closed.
    #[error("event stream closed")]
    TransportClosed,

    /// A command argument was rejected before reaching the remote player.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The client has been shut down.
    #[error("client is not running")]
    NotRunning,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemotePlayerError {
    /// Returns `true` for errors caused by losing the connection to the remote
    /// player, as opposed to the remote player refusing a request.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::TransportReceive(_)
                | Self::TransportClosed
                | Self::Timeout
                | Self::Io(_)
        )
    }
}

/// A specialized [`Result`] type for remote player client operations.
pub type Result<T> = std::result::Result<T, RemotePlayerError>;

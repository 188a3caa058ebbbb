//! Client error taxonomy.
//!
//! Two layers mirror the crate structure: [`ConnectionError`] covers the
//! websocket transport, [`ExecutionError`] covers one execute-and-collect
//! cycle. Nothing is retried internally; every failure surfaces to the
//! caller.

use tokio_tungstenite::tungstenite;

/// Transport-level failure on the kernel's websocket channel.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The websocket handshake was rejected or never completed (bad
    /// token, unreachable host, unknown kernel id).
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),

    /// The auth token cannot be carried in an HTTP header.
    #[error("authorization token contains characters not permitted in a header")]
    InvalidToken,

    /// A send or receive was attempted while the channel is not open.
    #[error("websocket channel is not open")]
    NotConnected,

    /// Writing a frame to the channel failed.
    #[error("websocket send failed: {0}")]
    Send(#[source] tungstenite::Error),

    /// The transport reported an error while waiting for the next frame.
    #[error("websocket receive failed: {0}")]
    Transport(#[source] tungstenite::Error),

    /// The peer closed the channel.
    #[error("websocket channel closed by peer")]
    Closed,

    /// A wire message could not be serialized or deserialized.
    #[error("malformed wire message: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Failure of one execute-and-collect cycle.
///
/// Whatever was accumulated before the failure is discarded; `execute` is
/// all-or-nothing from the caller's perspective.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The channel failed mid-exchange.
    #[error("connection failed during execution: {0}")]
    Connection(#[from] ConnectionError),

    /// A correlated reply carried content that does not decode as its
    /// message type promises.
    #[error("malformed {msg_type:?} content: {source}")]
    MalformedContent {
        /// `msg_type` tag of the offending message.
        msg_type: String,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}

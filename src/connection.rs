//! WebSocket connection to one kernel's channels endpoint.
//!
//! Transport only: opens the channel, writes wire messages, reads the next
//! wire message. No message-type-specific logic lives here; classification
//! and folding belong to the execution coordinator.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::config::KernelEndpoint;
use crate::error::ConnectionError;
use crate::wire::WireMessage;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A single websocket session to one kernel endpoint.
///
/// Owned exclusively by one client instance. Lazily established on first
/// use and reused across executions until closed.
#[derive(Debug)]
pub struct KernelConnection {
    endpoint: KernelEndpoint,
    session_id: String,
    stream: Option<WsStream>,
}

impl KernelConnection {
    /// Creates a connection for `endpoint`. The channel stays closed until
    /// [`connect`](Self::connect) is called.
    #[must_use]
    pub fn new(endpoint: KernelEndpoint, session_id: String) -> Self {
        Self {
            endpoint,
            session_id,
            stream: None,
        }
    }

    /// The endpoint this connection targets.
    #[must_use]
    pub fn endpoint(&self) -> &KernelEndpoint {
        &self.endpoint
    }

    /// Returns `true` while the channel is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Opens the channel if it is not open already.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidToken`] when the token cannot be
    /// carried in an `Authorization` header, and
    /// [`ConnectionError::Handshake`] when the server rejects the upgrade
    /// (bad token, unknown kernel id) or is unreachable. Handshake
    /// failures are never retried here.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let url = self.endpoint.channels_url(&self.session_id);
        let mut request = url
            .into_client_request()
            .map_err(ConnectionError::Handshake)?;
        let token = HeaderValue::from_str(&format!("token {}", self.endpoint.token))
            .map_err(|_| ConnectionError::InvalidToken)?;
        request.headers_mut().insert(AUTHORIZATION, token);

        let (stream, response) = connect_async(request)
            .await
            .map_err(ConnectionError::Handshake)?;
        tracing::debug!(
            kernel_id = %self.endpoint.kernel_id,
            status = %response.status(),
            "kernel channel open"
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Serializes `message` and writes it as one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::NotConnected`] when no channel is open,
    /// [`ConnectionError::Codec`] when the message does not serialize, and
    /// [`ConnectionError::Send`] when the write fails.
    pub async fn send(&mut self, message: &WireMessage) -> Result<(), ConnectionError> {
        let stream = self.stream.as_mut().ok_or(ConnectionError::NotConnected)?;
        let json = serde_json::to_string(message)?;
        stream
            .send(Message::text(json))
            .await
            .map_err(ConnectionError::Send)
    }

    /// Waits for the next inbound wire message.
    ///
    /// Non-text frames are skipped; they are not part of the JSON
    /// protocol this client speaks.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::NotConnected`] when no channel is open,
    /// [`ConnectionError::Closed`] when the peer closes the channel,
    /// [`ConnectionError::Transport`] on a transport failure, and
    /// [`ConnectionError::Codec`] when a text frame does not decode as a
    /// wire message. Closure and transport failures tear down the stored
    /// stream so later calls fail fast.
    pub async fn recv(&mut self) -> Result<WireMessage, ConnectionError> {
        loop {
            let stream = self.stream.as_mut().ok_or(ConnectionError::NotConnected)?;
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(text.as_str())?),
                Some(Ok(Message::Close(_))) | None => {
                    self.stream = None;
                    return Err(ConnectionError::Closed);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(ConnectionError::Transport(e));
                }
            }
        }
    }

    /// Closes the channel if it is open. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Send`] when the close frame cannot be
    /// written; a channel that is already closed is not an error.
    pub async fn close(&mut self) -> Result<(), ConnectionError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        match stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                tracing::debug!(kernel_id = %self.endpoint.kernel_id, "kernel channel closed");
                Ok(())
            }
            Err(e) => Err(ConnectionError::Send(e)),
        }
    }
}

//! Wire envelope for notebook-server websocket messages.
//!
//! The notebook server multiplexes all kernel channels over one websocket;
//! every frame is a JSON object of this shape, tagged with the channel it
//! travels on and correlated to its originating request through
//! `parent_header.msg_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::kind::MessageKind;

/// Wire protocol version stamped on outbound headers.
pub const PROTOCOL_VERSION: &str = "5.2";

/// Multiplexed channel a message travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Request/reply channel for execution and introspection.
    Shell,
    /// Broadcast channel carrying outputs and state changes.
    Iopub,
    /// Channel for stdin requests raised by the kernel.
    Stdin,
    /// Kernel control channel.
    Control,
    /// Heartbeat channel.
    Heartbeat,
    /// Channel tag this client does not recognize.
    #[serde(other)]
    Unknown,
}

impl Default for Channel {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Envelope header.
///
/// Only `msg_id` and `msg_type` are required on inbound messages; the
/// remaining fields are tolerated as absent so envelopes from older
/// servers still decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Unique message identifier (uuid v4 on outbound messages).
    pub msg_id: String,
    /// Message type tag; classified via [`MessageKind::of`].
    pub msg_type: String,
    /// Session the message belongs to.
    #[serde(default)]
    pub session: String,
    /// Author of the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Wire protocol version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Header of the request a message replies to.
///
/// Serializes as `{}` for unsolicited messages, which is how the wire
/// format spells "no parent".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParentHeader {
    /// `msg_id` of the originating request, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
}

/// One message as serialized over the notebook server's websocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// Channel the message travels on.
    #[serde(default)]
    pub channel: Channel,
    /// Envelope header.
    pub header: MessageHeader,
    /// Header of the originating request (`{}` when unsolicited).
    #[serde(default)]
    pub parent_header: ParentHeader,
    /// Transport metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Type-specific payload.
    #[serde(default)]
    pub content: Value,
    /// Binary buffer references. Unused by this client, kept so envelopes
    /// round-trip unchanged.
    #[serde(default)]
    pub buffers: Vec<Value>,
}

impl WireMessage {
    /// Builds an `execute_request` for `code` on the shell channel.
    ///
    /// `user_expressions`, `allow_stdin` and `stop_on_error` are fixed to
    /// the values an interactive frontend sends.
    #[must_use]
    pub fn execute_request(session: &str, code: &str, silent: bool, store_history: bool) -> Self {
        Self::request(
            session,
            "execute_request",
            serde_json::json!({
                "code": code,
                "silent": silent,
                "store_history": store_history,
                "user_expressions": {},
                "allow_stdin": true,
                "stop_on_error": true,
            }),
        )
    }

    /// Builds a `kernel_info_request` probe on the shell channel.
    #[must_use]
    pub fn kernel_info_request(session: &str) -> Self {
        Self::request(session, "kernel_info_request", serde_json::json!({}))
    }

    /// Builds a shell-channel request with a fresh message id.
    fn request(session: &str, msg_type: &str, content: Value) -> Self {
        Self {
            channel: Channel::Shell,
            header: MessageHeader {
                msg_id: uuid::Uuid::new_v4().to_string(),
                msg_type: msg_type.to_string(),
                session: session.to_string(),
                username: None,
                date: Some(Utc::now()),
                version: Some(PROTOCOL_VERSION.to_string()),
            },
            parent_header: ParentHeader::default(),
            metadata: Map::new(),
            content,
            buffers: Vec::new(),
        }
    }

    /// `msg_id` of the originating request, when the message has one.
    #[must_use]
    pub fn parent_msg_id(&self) -> Option<&str> {
        self.parent_header.msg_id.as_deref()
    }

    /// Classifies the message by its `msg_type` tag.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        MessageKind::of(&self.header.msg_type)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn execute_request_shape() {
        let message = WireMessage::execute_request("sess", "1 + 1", false, true);
        assert_eq!(message.channel, Channel::Shell);
        assert_eq!(message.header.msg_type, "execute_request");
        assert_eq!(message.header.session, "sess");
        assert_eq!(message.header.version.as_deref(), Some(PROTOCOL_VERSION));
        assert_eq!(message.content["code"], "1 + 1");
        assert_eq!(message.content["silent"], false);
        assert_eq!(message.content["store_history"], true);
        assert_eq!(message.content["allow_stdin"], true);
        assert_eq!(message.content["stop_on_error"], true);
    }

    #[test]
    fn requests_get_fresh_message_ids() {
        let a = WireMessage::execute_request("s", "x", false, true);
        let b = WireMessage::execute_request("s", "x", false, true);
        assert_ne!(a.header.msg_id, b.header.msg_id);
    }

    #[test]
    fn empty_parent_header_serializes_as_empty_object() {
        let message = WireMessage::kernel_info_request("s");
        let value = serde_json::to_value(&message).ok();
        let Some(value) = value else {
            panic!("serialization failed");
        };
        assert_eq!(value["parent_header"], serde_json::json!({}));
    }

    #[test]
    fn inbound_message_decodes_with_extra_fields() {
        let raw = serde_json::json!({
            "channel": "iopub",
            "header": {
                "msg_id": "k-1",
                "msg_type": "stream",
                "session": "kernel-sess",
                "username": "kernel",
                "date": "2025-03-01T12:00:00.123456Z",
                "version": "5.3"
            },
            "parent_header": {
                "msg_id": "req-1",
                "msg_type": "execute_request",
                "session": "client-sess"
            },
            "metadata": {},
            "content": {"name": "stdout", "text": "hi\n"},
            "buffers": []
        });
        let Ok(message) = serde_json::from_value::<WireMessage>(raw) else {
            panic!("deserialization failed");
        };
        assert_eq!(message.channel, Channel::Iopub);
        assert_eq!(message.parent_msg_id(), Some("req-1"));
        assert_eq!(message.kind(), MessageKind::Stream);
    }

    #[test]
    fn unknown_channel_and_missing_parent_tolerated() {
        let raw = serde_json::json!({
            "channel": "telemetry",
            "header": {"msg_id": "k-2", "msg_type": "status"},
            "content": {"execution_state": "idle"}
        });
        let Ok(message) = serde_json::from_value::<WireMessage>(raw) else {
            panic!("deserialization failed");
        };
        assert_eq!(message.channel, Channel::Unknown);
        assert_eq!(message.parent_msg_id(), None);
    }
}

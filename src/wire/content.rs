//! Typed content payloads for the message types the client inspects.
//!
//! Envelope `content` arrives as raw JSON and is decoded into one of these
//! shapes only after a message has matched the request's correlation id
//! and been classified by [`MessageKind`](super::MessageKind).

use serde::Deserialize;
use serde_json::{Map, Value};

use super::output::StreamName;

/// `stream` content: one chunk of stdout/stderr text.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamContent {
    /// Stream the text was written to.
    pub name: StreamName,
    /// Text written.
    pub text: String,
}

/// `display_data` content: rich payload keyed by mime type.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayDataContent {
    /// Mime-type → payload mapping.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Mime-type → rendering metadata mapping.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// `execute_result` content: the value of the final expression.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteResultContent {
    /// Mime-type → payload mapping.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Mime-type → rendering metadata mapping.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Counter of the execution that produced the value.
    #[serde(default)]
    pub execution_count: Option<i64>,
}

/// `error` content: exception name, value and rendered traceback.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorContent {
    /// Exception class name.
    pub ename: String,
    /// Exception message.
    pub evalue: String,
    /// Rendered traceback, one line per entry.
    #[serde(default)]
    pub traceback: Vec<String>,
}

/// `execute_reply` content, reduced to the fields the client uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteReplyContent {
    /// Counter assigned to the execution, when the reply carries one.
    #[serde(default)]
    pub execution_count: Option<i64>,
}

/// `status` content: a kernel execution-state transition.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusContent {
    /// The state the kernel moved to.
    pub execution_state: ExecutionState,
}

/// Kernel execution states announced on the iopub channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    /// Kernel is processing a request.
    Busy,
    /// Kernel finished the current request and is ready for the next one.
    Idle,
    /// Kernel is starting up.
    Starting,
    /// State this client does not recognize.
    #[serde(other)]
    Other,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn stream_content_decodes() {
        let raw = serde_json::json!({"name": "stderr", "text": "warning\n"});
        let Ok(content) = serde_json::from_value::<StreamContent>(raw) else {
            panic!("decode failed");
        };
        assert_eq!(content.name, StreamName::Stderr);
        assert_eq!(content.text, "warning\n");
    }

    #[test]
    fn stream_content_requires_text() {
        let raw = serde_json::json!({"name": "stdout"});
        assert!(serde_json::from_value::<StreamContent>(raw).is_err());
    }

    #[test]
    fn status_content_decodes_states() {
        let raw = serde_json::json!({"execution_state": "idle"});
        let Ok(content) = serde_json::from_value::<StatusContent>(raw) else {
            panic!("decode failed");
        };
        assert_eq!(content.execution_state, ExecutionState::Idle);

        let raw = serde_json::json!({"execution_state": "restarting"});
        let Ok(content) = serde_json::from_value::<StatusContent>(raw) else {
            panic!("decode failed");
        };
        assert_eq!(content.execution_state, ExecutionState::Other);
    }

    #[test]
    fn execute_reply_count_is_optional() {
        let raw = serde_json::json!({"status": "ok"});
        let Ok(content) = serde_json::from_value::<ExecuteReplyContent>(raw) else {
            panic!("decode failed");
        };
        assert_eq!(content.execution_count, None);
    }

    #[test]
    fn error_content_tolerates_missing_traceback() {
        let raw = serde_json::json!({"ename": "ValueError", "evalue": "bad input"});
        let Ok(content) = serde_json::from_value::<ErrorContent>(raw) else {
            panic!("decode failed");
        };
        assert!(content.traceback.is_empty());
    }
}

//! Execution coordinator.
//!
//! [`KernelClient`] drives one execute-and-collect cycle at a time over a
//! shared connection: send the request, fold the correlated replies into
//! an [`ExecutionResult`], stop on the matching idle status. Replies for
//! other requests on the same channel are observed and discarded.

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::KernelEndpoint;
use crate::connection::KernelConnection;
use crate::error::{ConnectionError, ExecutionError};
use crate::events::{EventBus, ExecutionEvent};
use crate::wire::content::{
    DisplayDataContent, ErrorContent, ExecuteReplyContent, ExecuteResultContent, ExecutionState,
    StatusContent, StreamContent,
};
use crate::wire::{ExecutionResult, MessageKind, WireMessage};

/// Capacity of the progress-event ring buffer.
const EVENT_BUS_CAPACITY: usize = 256;

/// Per-request execution flags.
#[derive(Debug, Clone, Copy)]
pub struct ExecuteConfig {
    /// Suppress side effects: no counter increment, no history entry.
    pub silent: bool,
    /// Record the code in the kernel's input history.
    pub store_history: bool,
    /// Probe the kernel and wait for an idle status before sending the
    /// execute request. Useful against a kernel that is still starting.
    pub wait_for_idle: bool,
}

impl Default for ExecuteConfig {
    fn default() -> Self {
        Self {
            silent: false,
            store_history: true,
            wait_for_idle: false,
        }
    }
}

/// Client for executing code on one running kernel.
///
/// One instance owns one websocket channel, established lazily on first
/// use and reused across executions. Execute calls take `&mut self`, so
/// one client can only run one exchange at a time; run concurrent
/// executions against the same kernel from separate client instances,
/// each with its own connection.
#[derive(Debug)]
pub struct KernelClient {
    session_id: String,
    connection: KernelConnection,
    events: EventBus,
}

impl KernelClient {
    /// Creates a client for `endpoint` with a fresh session id.
    ///
    /// The channel is opened by the first [`execute`](Self::execute) (or
    /// an explicit [`connect`](Self::connect)).
    #[must_use]
    pub fn new(endpoint: KernelEndpoint) -> Self {
        let session_id = Uuid::new_v4().to_string();
        let connection = KernelConnection::new(endpoint, session_id.clone());
        Self {
            session_id,
            connection,
            events: EventBus::new(EVENT_BUS_CAPACITY),
        }
    }

    /// Session id this client stamps on every request.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &KernelEndpoint {
        self.connection.endpoint()
    }

    /// Returns `true` while the underlying channel is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Subscribes to progress events for subsequent executions.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.events.subscribe()
    }

    /// Opens the underlying channel if it is not open already.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] when the handshake fails.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        self.connection.connect().await
    }

    /// Closes the underlying channel. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] when the close frame cannot be
    /// written.
    pub async fn close(&mut self) -> Result<(), ConnectionError> {
        self.connection.close().await
    }

    /// Executes `code` with default flags and collects its outputs.
    ///
    /// # Errors
    ///
    /// See [`execute_with`](Self::execute_with).
    pub async fn execute(&mut self, code: &str) -> Result<ExecutionResult, ExecutionError> {
        self.execute_with(code, ExecuteConfig::default()).await
    }

    /// Executes `code` with explicit flags and collects its outputs.
    ///
    /// Returns only after the kernel's idle status for this request has
    /// been observed, regardless of how many outputs were produced
    /// (including zero). The idle status is the terminal signal because
    /// the kernel emits exactly one per request, after all outputs;
    /// outputs may still arrive after the execute reply itself.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Connection`] when the channel fails at
    /// any point in the exchange (partial outputs are discarded) and
    /// [`ExecutionError::MalformedContent`] when a correlated reply does
    /// not decode.
    pub async fn execute_with(
        &mut self,
        code: &str,
        config: ExecuteConfig,
    ) -> Result<ExecutionResult, ExecutionError> {
        self.connection.connect().await?;
        if config.wait_for_idle {
            self.wait_for_idle().await?;
        }

        let request =
            WireMessage::execute_request(&self.session_id, code, config.silent, config.store_history);
        let request_id = request.header.msg_id.clone();
        self.connection.send(&request).await?;
        tracing::debug!(%request_id, "execute request sent");

        self.collect(&request_id).await
    }

    /// Probes the kernel with a `kernel_info_request` and waits for the
    /// matching idle status, discarding unrelated traffic.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Connection`] when the channel fails
    /// before the idle status arrives.
    pub async fn wait_for_idle(&mut self) -> Result<(), ExecutionError> {
        self.connection.connect().await?;
        let probe = WireMessage::kernel_info_request(&self.session_id);
        let probe_id = probe.header.msg_id.clone();
        self.connection.send(&probe).await?;
        tracing::debug!(%probe_id, "idle probe sent");

        let mut scratch = ExecutionResult::default();
        loop {
            let message = self.connection.recv().await?;
            if message.parent_msg_id() != Some(probe_id.as_str()) {
                tracing::trace!(msg_type = %message.header.msg_type, "discarding unrelated message");
                continue;
            }
            if matches!(fold_message(&mut scratch, &message)?, Fold::Idle) {
                return Ok(());
            }
        }
    }

    /// Receive loop for one request: folds correlated messages until the
    /// matching idle status arrives.
    async fn collect(&mut self, request_id: &str) -> Result<ExecutionResult, ExecutionError> {
        let mut result = ExecutionResult::default();
        loop {
            let message = self.connection.recv().await?;
            if message.parent_msg_id() != Some(request_id) {
                tracing::trace!(
                    msg_type = %message.header.msg_type,
                    "discarding message for another request"
                );
                continue;
            }

            match fold_message(&mut result, &message)? {
                Fold::Appended => {
                    if let Some(output) = result.outputs.last() {
                        self.events.publish(ExecutionEvent::Output {
                            output: output.clone(),
                        });
                    }
                }
                Fold::Counted => {
                    if let Some(execution_count) = result.execution_count {
                        self.events
                            .publish(ExecutionEvent::ExecutionCount { execution_count });
                    }
                }
                Fold::Skipped => {}
                Fold::Idle => {
                    self.events.publish(ExecutionEvent::Idle);
                    tracing::debug!(
                        request_id,
                        outputs = result.outputs.len(),
                        execution_count = result.execution_count,
                        "execution complete"
                    );
                    return Ok(result);
                }
            }
        }
    }
}

/// What folding one correlated message contributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fold {
    /// An output entry was appended.
    Appended,
    /// Only the execution counter changed.
    Counted,
    /// Nothing relevant to the accumulator.
    Skipped,
    /// Terminal idle status.
    Idle,
}

/// Folds one correlated message into the accumulator.
///
/// Total over [`MessageKind`]: every kind has an arm and unknown types
/// fall through to [`Fold::Skipped`]. Deterministic for a fixed message
/// sequence.
fn fold_message(result: &mut ExecutionResult, message: &WireMessage) -> Result<Fold, ExecutionError> {
    match message.kind() {
        MessageKind::Stream => {
            let content: StreamContent = decode(message)?;
            result.outputs.push(content.into());
            Ok(Fold::Appended)
        }
        MessageKind::DisplayData => {
            let content: DisplayDataContent = decode(message)?;
            result.outputs.push(content.into());
            Ok(Fold::Appended)
        }
        MessageKind::ExecuteResult => {
            let content: ExecuteResultContent = decode(message)?;
            if let Some(count) = content.execution_count {
                result.execution_count = Some(count);
            }
            result.outputs.push(content.into());
            Ok(Fold::Appended)
        }
        MessageKind::Error => {
            let content: ErrorContent = decode(message)?;
            result.outputs.push(content.into());
            Ok(Fold::Appended)
        }
        MessageKind::ExecuteReply => {
            let content: ExecuteReplyContent = decode(message)?;
            match content.execution_count {
                Some(count) => {
                    result.execution_count = Some(count);
                    Ok(Fold::Counted)
                }
                None => Ok(Fold::Skipped),
            }
        }
        MessageKind::Status => {
            let content: StatusContent = decode(message)?;
            if content.execution_state == ExecutionState::Idle {
                Ok(Fold::Idle)
            } else {
                Ok(Fold::Skipped)
            }
        }
        MessageKind::Other => Ok(Fold::Skipped),
    }
}

/// Decodes a message's content as `T`, attributing failures to the
/// message's type tag.
fn decode<T: DeserializeOwned>(message: &WireMessage) -> Result<T, ExecutionError> {
    serde_json::from_value(message.content.clone()).map_err(|source| {
        ExecutionError::MalformedContent {
            msg_type: message.header.msg_type.clone(),
            source,
        }
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::wire::{Channel, MessageHeader, Output, ParentHeader, StreamName};

    fn reply(parent: &str, msg_type: &str, content: Value) -> WireMessage {
        WireMessage {
            channel: Channel::Iopub,
            header: MessageHeader {
                msg_id: "k-reply".to_string(),
                msg_type: msg_type.to_string(),
                session: "kernel".to_string(),
                username: None,
                date: None,
                version: None,
            },
            parent_header: ParentHeader {
                msg_id: Some(parent.to_string()),
            },
            metadata: serde_json::Map::new(),
            content,
            buffers: Vec::new(),
        }
    }

    fn fold_all(messages: &[WireMessage]) -> Result<ExecutionResult, ExecutionError> {
        let mut result = ExecutionResult::default();
        for message in messages {
            fold_message(&mut result, message)?;
        }
        Ok(result)
    }

    #[test]
    fn default_config_matches_interactive_frontend() {
        let config = ExecuteConfig::default();
        assert!(!config.silent);
        assert!(config.store_history);
        assert!(!config.wait_for_idle);
    }

    #[test]
    fn stream_messages_append_in_order() {
        let messages = [
            reply("r", "stream", json!({"name": "stdout", "text": "a"})),
            reply("r", "stream", json!({"name": "stderr", "text": "b"})),
        ];
        let Ok(result) = fold_all(&messages) else {
            panic!("fold failed");
        };
        assert_eq!(
            result.outputs,
            vec![
                Output::Stream {
                    name: StreamName::Stdout,
                    text: "a".to_string()
                },
                Output::Stream {
                    name: StreamName::Stderr,
                    text: "b".to_string()
                },
            ]
        );
        assert_eq!(result.execution_count, None);
    }

    #[test]
    fn last_seen_execution_count_wins() {
        let messages = [
            reply("r", "execute_reply", json!({"status": "ok", "execution_count": 7})),
            reply(
                "r",
                "execute_result",
                json!({"data": {"text/plain": "8"}, "metadata": {}, "execution_count": 8}),
            ),
        ];
        let Ok(result) = fold_all(&messages) else {
            panic!("fold failed");
        };
        assert_eq!(result.execution_count, Some(8));
        assert_eq!(result.outputs.len(), 1);
    }

    #[test]
    fn error_message_becomes_error_output() {
        let message = reply(
            "r",
            "error",
            json!({
                "ename": "ZeroDivisionError",
                "evalue": "division by zero",
                "traceback": ["line 1"]
            }),
        );
        let mut result = ExecutionResult::default();
        let Ok(Fold::Appended) = fold_message(&mut result, &message) else {
            panic!("expected an appended output");
        };
        assert!(matches!(
            result.outputs.first(),
            Some(Output::Error { ename, .. }) if ename == "ZeroDivisionError"
        ));
    }

    #[test]
    fn busy_status_and_unknown_types_are_skipped() {
        let mut result = ExecutionResult::default();
        let busy = reply("r", "status", json!({"execution_state": "busy"}));
        let input = reply("r", "execute_input", json!({"code": "x", "execution_count": 5}));
        assert!(matches!(fold_message(&mut result, &busy), Ok(Fold::Skipped)));
        assert!(matches!(fold_message(&mut result, &input), Ok(Fold::Skipped)));
        assert_eq!(result, ExecutionResult::default());
    }

    #[test]
    fn idle_status_terminates() {
        let mut result = ExecutionResult::default();
        let idle = reply("r", "status", json!({"execution_state": "idle"}));
        assert!(matches!(fold_message(&mut result, &idle), Ok(Fold::Idle)));
    }

    #[test]
    fn reply_without_count_changes_nothing() {
        let mut result = ExecutionResult::default();
        let message = reply("r", "execute_reply", json!({"status": "ok"}));
        assert!(matches!(fold_message(&mut result, &message), Ok(Fold::Skipped)));
        assert_eq!(result.execution_count, None);
    }

    #[test]
    fn malformed_correlated_content_fails() {
        let mut result = ExecutionResult::default();
        let message = reply("r", "stream", json!({"name": "stdout"}));
        let Err(ExecutionError::MalformedContent { msg_type, .. }) =
            fold_message(&mut result, &message)
        else {
            panic!("expected a malformed-content error");
        };
        assert_eq!(msg_type, "stream");
    }

    #[test]
    fn fold_is_deterministic() {
        let messages = [
            reply("r", "stream", json!({"name": "stdout", "text": "x"})),
            reply(
                "r",
                "display_data",
                json!({"data": {"text/plain": "y"}, "metadata": {}}),
            ),
            reply("r", "execute_reply", json!({"execution_count": 2})),
        ];
        let Ok(first) = fold_all(&messages) else {
            panic!("fold failed");
        };
        let Ok(second) = fold_all(&messages) else {
            panic!("fold failed");
        };
        assert_eq!(first, second);
    }

    #[test]
    fn clients_get_distinct_session_ids() {
        let a = KernelClient::new(KernelEndpoint::new("localhost", 8888, "k", "t"));
        let b = KernelClient::new(KernelEndpoint::new("localhost", 8888, "k", "t"));
        assert_ne!(a.session_id(), b.session_id());
        assert!(!a.is_connected());
    }
}

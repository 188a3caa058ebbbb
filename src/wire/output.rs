//! Normalized execution outputs returned to callers.
//!
//! Entry shapes mirror notebook-format outputs (`output_type` tag plus
//! kind-specific fields) so collected results can be dropped into notebook
//! documents unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::content::{DisplayDataContent, ErrorContent, ExecuteResultContent, StreamContent};

/// Name of a standard output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// One output entry produced while executing a request.
///
/// Tagged by `output_type` when serialized, matching the notebook format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    /// Text written to stdout or stderr.
    Stream {
        /// Stream the text was written to.
        name: StreamName,
        /// Text written.
        text: String,
    },
    /// Rich display payload keyed by mime type.
    DisplayData {
        /// Mime-type → payload mapping.
        data: Map<String, Value>,
        /// Mime-type → rendering metadata mapping.
        metadata: Map<String, Value>,
    },
    /// Value of the final expression of the execution.
    ExecuteResult {
        /// Mime-type → payload mapping.
        data: Map<String, Value>,
        /// Mime-type → rendering metadata mapping.
        metadata: Map<String, Value>,
        /// Counter of the execution that produced the value.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution_count: Option<i64>,
    },
    /// Exception raised by the executed code.
    Error {
        /// Exception class name.
        ename: String,
        /// Exception message.
        evalue: String,
        /// Rendered traceback, one line per entry.
        traceback: Vec<String>,
    },
}

impl From<StreamContent> for Output {
    fn from(content: StreamContent) -> Self {
        Self::Stream {
            name: content.name,
            text: content.text,
        }
    }
}

impl From<DisplayDataContent> for Output {
    fn from(content: DisplayDataContent) -> Self {
        Self::DisplayData {
            data: content.data,
            metadata: content.metadata,
        }
    }
}

impl From<ExecuteResultContent> for Output {
    fn from(content: ExecuteResultContent) -> Self {
        Self::ExecuteResult {
            data: content.data,
            metadata: content.metadata,
            execution_count: content.execution_count,
        }
    }
}

impl From<ErrorContent> for Output {
    fn from(content: ErrorContent) -> Self {
        Self::Error {
            ename: content.ename,
            evalue: content.evalue,
            traceback: content.traceback,
        }
    }
}

/// Accumulated result of one execute request.
///
/// Built incrementally by the coordinator while it folds the reply stream;
/// never mutated after being returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Output entries in arrival order.
    pub outputs: Vec<Output>,
    /// Execution counter reported by the kernel, when any correlated
    /// reply carried one.
    pub execution_count: Option<i64>,
}

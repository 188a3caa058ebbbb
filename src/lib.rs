//! # jupyter-kernel-client
//!
//! WebSocket client for executing code on a running Jupyter kernel through
//! a notebook server and collecting the normalized results.
//!
//! The notebook server multiplexes every kernel channel over one websocket
//! endpoint. This crate speaks that protocol for a single purpose: submit
//! code, watch the multiplexed reply stream for the messages that answer
//! the request (correlated by parent message id), fold them into an
//! ordered list of outputs, and stop once the kernel announces it has gone
//! idle again.
//!
//! ## Architecture
//!
//! ```text
//! KernelClient (client)
//!     │  execute → fold correlated replies → ExecutionResult
//!     ├── KernelConnection (connection)   one websocket, transport only
//!     ├── WireMessage (wire)              envelope + typed contents
//!     └── EventBus (events)               progress broadcast
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use jupyter_kernel_client::{KernelClient, KernelEndpoint};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = KernelEndpoint::new("localhost", 8888, "kernel-uuid", "token");
//! let mut client = KernelClient::new(endpoint);
//!
//! let result = client.execute("print('hello world')").await?;
//! assert_eq!(result.execution_count, Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! Kernel lifecycle (creation and deletion through the server's REST API)
//! is a caller responsibility; this crate attaches to an already-running
//! kernel identified by its id.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod wire;

pub use client::{ExecuteConfig, KernelClient};
pub use config::KernelEndpoint;
pub use connection::KernelConnection;
pub use error::{ConnectionError, ExecutionError};
pub use events::{EventBus, ExecutionEvent};
pub use wire::{ExecutionResult, Output, StreamName, WireMessage};

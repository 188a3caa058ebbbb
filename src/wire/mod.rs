//! Wire layer: message envelope, typed contents, classification, outputs.
//!
//! [`WireMessage`] is the JSON envelope every frame on the channel carries;
//! [`MessageKind`] classifies envelopes into the closed set the coordinator
//! folds over; [`Output`] and [`ExecutionResult`] are the normalized shapes
//! handed back to callers.

pub mod content;
pub mod envelope;
pub mod kind;
pub mod output;

pub use envelope::{Channel, MessageHeader, ParentHeader, PROTOCOL_VERSION, WireMessage};
pub use kind::MessageKind;
pub use output::{ExecutionResult, Output, StreamName};

//! Broadcast channel for execution progress events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The execution
//! coordinator publishes an [`ExecutionEvent`] for every reply it folds, so
//! observers can watch an execution as it happens instead of waiting for
//! the final result.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::wire::Output;

/// Progress event published while an execute exchange is being folded.
///
/// Events are observational only; the [`ExecutionResult`] returned by the
/// coordinator is authoritative.
///
/// [`ExecutionResult`]: crate::wire::ExecutionResult
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// An output entry was appended to the accumulator.
    Output {
        /// The appended entry.
        output: Output,
    },
    /// The kernel reported an execution counter.
    ExecutionCount {
        /// Reported counter value.
        execution_count: i64,
    },
    /// The kernel returned to idle; the exchange is complete.
    Idle,
}

/// Broadcast bus for [`ExecutionEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a fixed capacity. When the
/// ring buffer is full, the oldest events are dropped for lagging
/// receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event. If there
    /// are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: ExecutionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

//! Event types for the Vellum event system
//!
//! Provides shared event definitions and the EventBus used by the
//! fulfillment service to broadcast order changes and pipeline progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::Tier;

/// Vellum event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// All pipeline and store activity flows through this central enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VellumEvent {
    /// An order row changed in the store
    ///
    /// Emitted after every successful mutation (create, status/progress
    /// update, draft save, artifact save). Carries no payload beyond the
    /// id: consumers re-fetch the order rather than trust event data, so
    /// duplicates and reordering are harmless.
    OrderChanged {
        order_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A new order was created from a sale webhook
    OrderCreated {
        order_id: String,
        tier: Tier,
        niche: String,
        timestamp: DateTime<Utc>,
    },

    /// The fulfillment pipeline started generating an ebook
    GenerationStarted {
        order_id: String,
        chapter_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A chapter began generating
    ChapterStarted {
        order_id: String,
        /// Zero-based position in the chapter plan
        index: usize,
        title: String,
        timestamp: DateTime<Utc>,
    },

    /// A chapter finished generating and was persisted
    ChapterCompleted {
        order_id: String,
        index: usize,
        title: String,
        /// Order progress written after this chapter (0-100)
        progress: u8,
        timestamp: DateTime<Utc>,
    },

    /// A generation step failed and the run stopped
    GenerationFailed {
        order_id: String,
        /// Phase that failed: a chapter title, "bonuses" or "finalize"
        stage: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// The ebook was finalized and delivered
    OrderCompleted {
        order_id: String,
        chapter_count: usize,
        bonus_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl VellumEvent {
    /// Event name used for SSE event types and logging
    pub fn event_type(&self) -> &'static str {
        match self {
            VellumEvent::OrderChanged { .. } => "OrderChanged",
            VellumEvent::OrderCreated { .. } => "OrderCreated",
            VellumEvent::GenerationStarted { .. } => "GenerationStarted",
            VellumEvent::ChapterStarted { .. } => "ChapterStarted",
            VellumEvent::ChapterCompleted { .. } => "ChapterCompleted",
            VellumEvent::GenerationFailed { .. } => "GenerationFailed",
            VellumEvent::OrderCompleted { .. } => "OrderCompleted",
        }
    }

    /// Order id the event concerns
    pub fn order_id(&self) -> &str {
        match self {
            VellumEvent::OrderChanged { order_id, .. }
            | VellumEvent::OrderCreated { order_id, .. }
            | VellumEvent::GenerationStarted { order_id, .. }
            | VellumEvent::ChapterStarted { order_id, .. }
            | VellumEvent::ChapterCompleted { order_id, .. }
            | VellumEvent::GenerationFailed { order_id, .. }
            | VellumEvent::OrderCompleted { order_id, .. } => order_id,
        }
    }
}

/// Broadcast bus connecting the store and pipeline to SSE subscribers
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<VellumEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use vellum_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<VellumEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` when no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: VellumEvent,
    ) -> Result<usize, broadcast::error::SendError<VellumEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Used for notifications the pipeline must never block or fail on.
    pub fn emit_lossy(&self, event: VellumEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// src/domain/message.rs

//! Broker message abstractions.
//!
//! A [`BrokerMessage`] is what callers publish and what subscriptions yield:
//! a header map plus an opaque payload. The payload encoding (JSON or
//! anything else) belongs to the caller; this crate never looks inside it.
//!
//! Messages received through a subscription arrive as
//! [`AcknowledgeableBrokerMessage`], which pairs the message with the
//! acknowledgement capability for that single delivery.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

/// Header mapping carried by every message: unique string keys, raw byte values.
pub type Headers = HashMap<String, Bytes>;

/// A message as seen by callers of the controller.
///
/// # Example
///
/// ```
/// use amqp_broker::BrokerMessage;
///
/// let msg = BrokerMessage::new("ping")
///     .with_header("correlation", "42");
///
/// assert_eq!(msg.payload.as_ref(), b"ping");
/// assert_eq!(msg.headers["correlation"].as_ref(), b"42");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BrokerMessage {
    // ---
    /// Message headers.
    pub headers: Headers,

    /// Opaque payload bytes.
    pub payload: Bytes,
}

impl BrokerMessage {
    // ---
    /// Create a message with the given payload and no headers.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            headers: Headers::new(),
            payload: payload.into(),
        }
    }

    /// Add (or replace) a header, builder style.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Acknowledgement capability bound to exactly one delivery.
///
/// Both operations are fire-and-forget: a failure to reach the broker is
/// logged by the implementation and never reported to the caller. Each
/// delivery expects exactly one decision; implementations do not guard
/// against a second one beyond what the broker itself enforces.
#[async_trait::async_trait]
pub trait BrokerAcknowledgment: Send + Sync {
    // ---
    /// Signal successful processing. The message is removed from the queue.
    async fn ack_message(&self);

    /// Signal rejection. The message is discarded, not requeued.
    async fn nak_message(&self);
}

/// A delivered message together with its acknowledgement handler.
///
/// [`ack`](Self::ack) and [`nak`](Self::nak) consume the value, so a given
/// delivery can only be decided once through this type. Dropping it without
/// a decision leaves the delivery unacknowledged; the broker hands it out
/// again once the owning subscription is cancelled.
pub struct AcknowledgeableBrokerMessage {
    // ---
    message: BrokerMessage,
    acknowledgement: Box<dyn BrokerAcknowledgment>,
}

impl AcknowledgeableBrokerMessage {
    // ---
    /// Pair a message with the handler for its delivery.
    pub fn new(message: BrokerMessage, acknowledgement: Box<dyn BrokerAcknowledgment>) -> Self {
        Self {
            message,
            acknowledgement,
        }
    }

    /// The delivered message.
    pub fn message(&self) -> &BrokerMessage {
        &self.message
    }

    /// Shortcut for `message().headers`.
    pub fn headers(&self) -> &Headers {
        &self.message.headers
    }

    /// Shortcut for `message().payload`.
    pub fn payload(&self) -> &Bytes {
        &self.message.payload
    }

    /// Acknowledge the delivery.
    pub async fn ack(self) {
        self.acknowledgement.ack_message().await;
    }

    /// Reject the delivery without requeue.
    pub async fn nak(self) {
        self.acknowledgement.nak_message().await;
    }

    /// Split into the message and its handler, e.g. to decide asynchronously
    /// after the message has been handed to another task.
    pub fn into_parts(self) -> (BrokerMessage, Box<dyn BrokerAcknowledgment>) {
        (self.message, self.acknowledgement)
    }
}

impl fmt::Debug for AcknowledgeableBrokerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcknowledgeableBrokerMessage")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

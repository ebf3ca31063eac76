// src/domain/controller.rs

//! Broker controller abstraction.
//!
//! A [`BrokerController`] owns one broker connection and exposes the three
//! operations generated client/server code relies on: publish to a named
//! destination, subscribe to a named destination, and close. Destinations
//! are flat queue names; there is no exchange or routing-key indirection at
//! this level.
//!
//! Concrete implementations live under `src/transport/`.

use std::sync::Arc;

use crate::{
    // ---
    BrokerMessage,
    ControllerConfig,
    LoggerPtr,
    Result,
    Subscription,
};

/// Shared base state for all controller implementations.
///
/// Each concrete controller embeds this as a field named `base` so the
/// default trait methods can delegate to it.
#[derive(Clone)]
pub struct ControllerBase {
    /// Queue group identifier, informational only.
    pub queue_group: String,
    /// Logger capability for caller-visible events.
    pub logger: LoggerPtr,
    /// Capacity of each subscription's delivery buffer.
    pub buffer_size: usize,
}

impl From<&ControllerConfig> for ControllerBase {
    fn from(config: &ControllerConfig) -> Self {
        // ---
        Self {
            queue_group: config.queue_group.clone(),
            logger: Arc::clone(&config.logger),
            buffer_size: config.buffer_size,
        }
    }
}

/// Broker controller.
///
/// Implementations must ensure that:
/// - every `publish()` and every `subscribe()` runs on its own broker
///   channel; channels are never shared between calls,
/// - destinations are declared idempotently (non-durable, non-exclusive,
///   not auto-delete) before use,
/// - `close()` is idempotent and does not cancel open subscriptions.
///
/// # Example
///
/// ```
/// # use amqp_broker::{BrokerMessage, ControllerBuilder};
/// # async fn example() -> amqp_broker::Result<()> {
/// let controller = ControllerBuilder::new()
///     .uri("memory://")
///     .queue_group("ping-apps")
///     .build()
///     .await?;
///
/// let mut sub = controller.subscribe("ping").await?;
/// controller.publish("ping", BrokerMessage::new("hello")).await?;
///
/// if let Some(delivery) = sub.recv().await {
///     assert_eq!(delivery.payload().as_ref(), b"hello");
///     delivery.ack().await;
/// }
///
/// sub.cancel().await;
/// controller.close().await;
/// # Ok(())
/// # }
/// ```
#[async_trait::async_trait]
pub trait BrokerController: Send + Sync {
    // ---
    /// Returns a reference to the shared base state.
    fn base(&self) -> &ControllerBase;

    /// Returns the configured queue group.
    fn queue_group(&self) -> &str {
        &self.base().queue_group
    }

    /// Returns the logger capability.
    fn logger(&self) -> &LoggerPtr {
        &self.base().logger
    }

    /// Publish `message` to `destination`, creating the destination if absent.
    ///
    /// Returns once the broker has accepted the message.
    async fn publish(&self, destination: &str, message: BrokerMessage) -> Result<()>;

    /// Start consuming from `destination`, creating it if absent.
    ///
    /// The returned [`Subscription`] yields deliveries in broker order until
    /// it is cancelled.
    async fn subscribe(&self, destination: &str) -> Result<Subscription>;

    /// Close the connection. Calling it again is a no-op.
    async fn close(&self);
}

/// Shared controller pointer.
///
/// This is an `Arc<dyn BrokerController>`: clones share the same connection.
pub type ControllerPtr = Arc<dyn BrokerController>;

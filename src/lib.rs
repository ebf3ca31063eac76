//! Publish/subscribe broker controller with explicit per-message
//! acknowledgement.
//!
//! This library gives generated client/server code one small surface over a
//! message broker: publish a message to a named destination, subscribe to a
//! destination and receive acknowledgeable messages in order, and close.
//! It handles connection ownership, per-operation channels, the background
//! delivery task behind each subscription, cooperative cancellation and
//! exactly-once teardown.
//!
//! Two implementations are provided:
//!
//! - an AMQP 0-9-1 controller on `lapin` (feature `transport_lapin`, on by
//!   default), for RabbitMQ,
//! - an in-memory controller on a shared [`MemoryHub`], with the same queue
//!   and acknowledgement semantics, for tests and single-process use.
//!
//! Payload encoding is left to the caller; headers are raw bytes.
//!

// Import all sub modules once...
mod config;
mod controller_builder;
mod domain;
mod error;
mod lock;
mod macros;
mod subscription;
mod transport;

pub(crate) use macros::{log_debug, log_error, log_info, log_warn};

// Re-export main types
pub use config::{
    //
    ControllerConfig,
    BROKER_MESSAGES_QUEUE_SIZE,
    DEFAULT_QUEUE_GROUP,
    PUBLISH_CONTENT_TYPE,
};
pub use controller_builder::ControllerBuilder;
pub use error::{BrokerError, Result};
pub use subscription::{DeliverySource, Subscription, SubscriptionCanceller};

pub use transport::{
    //
    create_amqp_controller,
    create_memory_controller,
    create_memory_controller_with_hub,
    MemoryHub,
    QueueFlags,
};

#[cfg(feature = "transport_lapin")]
pub use transport::{
    //
    decode_headers,
    encode_headers,
    AmqpController,
};

// --- public re-exports
pub use domain::{
    //
    AcknowledgeableBrokerMessage,
    BrokerAcknowledgment,
    BrokerController,
    BrokerMessage,
    ControllerBase,
    ControllerPtr,
    Headers,
    Logger,
    LoggerPtr,
    NoopLogger,
    TracingLogger,
};

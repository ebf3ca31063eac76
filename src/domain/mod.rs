//! Domain layer public interface.
//!
//! This module defines the broker-facing abstractions shared by every
//! controller implementation: messages, acknowledgement, the logger
//! capability and the controller trait itself. Nothing in here refers to a
//! concrete broker client library.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod controller;
mod logger;
mod message;

// --- Controller domain re-exports ---

pub use controller::{
    //
    BrokerController,
    ControllerBase,
    ControllerPtr,
};

pub use logger::{
    //
    Logger,
    LoggerPtr,
    NoopLogger,
    TracingLogger,
};

pub use message::{
    //
    AcknowledgeableBrokerMessage,
    BrokerAcknowledgment,
    BrokerMessage,
    Headers,
};

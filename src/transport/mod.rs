//! Controller implementations.
//!
//! This module provides concrete implementations of the domain-level
//! `BrokerController` trait. Broker-backed controllers are hidden behind
//! feature flags and exposed only through constructor functions.
//!
//! Domain code must not depend on transport-specific types.

mod memory;

#[cfg(feature = "transport_lapin")]
mod amqp;

pub use memory::{
    //
    create_memory_controller,
    create_memory_controller_with_hub,
    MemoryHub,
    QueueFlags,
};

#[cfg(feature = "transport_lapin")]
pub use amqp::{
    //
    create_controller as create_amqp_controller,
    decode_headers,
    encode_headers,
    AmqpController,
};

/// Null Object stub used when the `transport_lapin` feature is disabled.
#[cfg(not(feature = "transport_lapin"))]
pub async fn create_amqp_controller(
    _config: crate::ControllerConfig,
) -> crate::Result<crate::ControllerPtr> {
    Err(crate::BrokerError::Config(
        "AMQP controller requires the transport_lapin feature".into(),
    ))
}

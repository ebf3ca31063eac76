// src/error.rs

//! Error taxonomy for broker controllers.
//!
//! Every fallible controller operation returns [`BrokerError`]. Variants are
//! split by the step that failed so callers can tell a dial failure from a
//! queue declaration failure without parsing messages. The payload string
//! carries the transport's own description.

use thiserror::Error;

/// Errors returned by broker controllers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Dialing the broker failed while constructing a controller.
    #[error("could not connect to broker: {0}")]
    Connection(String),

    /// A required configuration value was not provided.
    #[error("missing required configuration: {0}")]
    MissingConfig(String),

    /// A configuration value is present but unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Opening a per-operation channel failed (including on a closed connection).
    #[error("channel error: {0}")]
    Channel(String),

    /// Declaring the destination queue failed.
    #[error("failed to declare queue: {0}")]
    Declare(String),

    /// The broker refused to start a consumer on the destination.
    #[error("failed to start consuming from queue: {0}")]
    ConsumeStart(String),

    /// Sending a message failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// An ack or nack could not be delivered to the broker.
    ///
    /// Never returned from the public API; acknowledgement is
    /// fire-and-forget and these are only logged.
    #[error("acknowledgement failed: {0}")]
    Acknowledgement(String),
}

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

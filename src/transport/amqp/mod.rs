//! AMQP protocol controllers.
//!
//! This module contains the controller implementation for AMQP 0-9-1
//! brokers (RabbitMQ), built on `lapin`, and the header codec translating
//! between domain headers and AMQP field tables.

mod controller;
mod headers;

pub use controller::{create_controller, AmqpController};
pub use headers::{decode_headers, encode_headers};

// src/transport/memory/mod.rs

//! In-memory controller implementation.
//!
//! This module provides a pure in-process implementation of the domain-level
//! `BrokerController` trait. It is intended for testing, local execution,
//! and as a reference for controller semantics.
//!
//! ## Reference Semantics
//!
//! The in-memory controller follows AMQP queue behavior as far as this crate
//! relies on it:
//!
//! - Messages published before any subscriber attaches wait in the queue
//!   and are delivered in publish order.
//! - Competing subscribers on one queue each receive a different message.
//! - An acknowledged or negatively acknowledged delivery is gone for good.
//! - Deliveries left undecided when a subscription is cancelled go back to
//!   the head of the queue.
//! - Redeclaring a queue with different flags fails.
//!
//! ## Non-Goals
//!
//! This controller does not attempt to emulate persistence, network
//! failures, or any AMQP feature the crate does not use (exchanges,
//! bindings, TTLs, prefetch).

mod controller;
mod hub;

pub use controller::{create_memory_controller, create_memory_controller_with_hub};
pub use hub::{MemoryHub, QueueFlags};

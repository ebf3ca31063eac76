// src/domain/logger.rs

//! Logger capability consumed by controllers.
//!
//! Controllers report the events a caller may act on (consumer cancellation
//! failures, dropped acknowledgements) through a [`Logger`] supplied at
//! construction. The default, [`TracingLogger`], forwards to `tracing` when
//! the `logging` feature is on.

use std::sync::Arc;

use crate::{log_error, log_info, log_warn};

/// Sink for controller events.
pub trait Logger: Send + Sync {
    // ---
    /// Informational event.
    fn info(&self, msg: &str);

    /// Something unexpected that did not stop the operation.
    fn warning(&self, msg: &str);

    /// A failure that was swallowed (for example an ack that never reached
    /// the broker).
    fn error(&self, msg: &str);
}

/// Shared logger pointer, cheap to clone into tasks and handlers.
pub type LoggerPtr = Arc<dyn Logger>;

/// Logger forwarding to the crate's `tracing` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, msg: &str) {
        log_info!("{msg}");
    }

    fn warning(&self, msg: &str) {
        log_warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        log_error!("{msg}");
    }
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn info(&self, _msg: &str) {}

    fn warning(&self, _msg: &str) {}

    fn error(&self, _msg: &str) {}
}

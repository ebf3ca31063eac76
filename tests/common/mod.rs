// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use tokio::time::{timeout, Duration};

use amqp_broker::{
    // ---
    AcknowledgeableBrokerMessage,
    Logger,
    Subscription,
};

static INIT: Once = Once::new();

/// Route crate logging to the test output. `RUST_LOG` controls the level.
pub fn init_logging() {
    // ---
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Receive one message or panic after `ms` milliseconds.
pub async fn recv_within(sub: &mut Subscription, ms: u64) -> AcknowledgeableBrokerMessage {
    // ---
    timeout(Duration::from_millis(ms), sub.recv())
        .await
        .expect("timed out waiting for message")
        .expect("subscription ended unexpectedly")
}

/// Assert that nothing arrives for `ms` milliseconds.
pub async fn assert_quiet(sub: &mut Subscription, ms: u64) {
    // ---
    if let Ok(Some(msg)) = timeout(Duration::from_millis(ms), sub.recv()).await {
        panic!("unexpected delivery: {:?}", msg.payload());
    }
}

/// Logger that keeps every event for later inspection.
#[derive(Default)]
pub struct RecordingLogger {
    errors: Mutex<Vec<String>>,
    infos: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Logger for RecordingLogger {
    fn info(&self, msg: &str) {
        self.infos.lock().unwrap().push(msg.to_string());
    }

    fn warning(&self, msg: &str) {
        self.infos.lock().unwrap().push(msg.to_string());
    }

    fn error(&self, msg: &str) {
        self.errors.lock().unwrap().push(msg.to_string());
    }
}

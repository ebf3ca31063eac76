// src/transport/memory/hub.rs

//! Shared in-process broker state.
//!
//! A [`MemoryHub`] plays the role of the broker: it owns named queues, each
//! holding ready messages in FIFO order and a count of deliveries handed
//! out but not yet acknowledged. Controllers sharing a hub see each other's
//! messages, exactly as applications connected to the same broker would.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::lock::lock_ignore_poison;
use crate::{
    // ---
    log_debug,
    BrokerError,
    BrokerMessage,
    Result,
};

/// Queue declaration flags, compared on every redeclaration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFlags {
    // ---
    /// Survive broker restarts.
    pub durable: bool,
    /// Restricted to the declaring connection.
    pub exclusive: bool,
    /// Deleted when the last consumer goes away.
    pub auto_delete: bool,
}

impl QueueFlags {
    /// Flags used by controllers for every destination.
    pub const TRANSIENT: QueueFlags = QueueFlags {
        durable: false,
        exclusive: false,
        auto_delete: false,
    };
}

/// In-process message broker.
///
/// # ⚠️  Testing Only - Subject to Change
///
/// The inspection helpers ([`ready_count`](Self::ready_count),
/// [`unacked_count`](Self::unacked_count)) exist for this crate's own
/// tests and for applications asserting on delivery in theirs.
///
/// # Usage in Integration Tests
///
/// For tests that need isolation from each other, construct a hub
/// explicitly and pass it to
/// [`create_memory_controller_with_hub`](crate::create_memory_controller_with_hub):
///
/// ```
/// # use amqp_broker::{ControllerConfig, MemoryHub};
/// # async fn example() -> amqp_broker::Result<()> {
/// let hub = MemoryHub::new();
///
/// let publisher =
///     amqp_broker::create_memory_controller_with_hub(ControllerConfig::memory(), hub.clone())
///         .await?;
/// let consumer =
///     amqp_broker::create_memory_controller_with_hub(ControllerConfig::memory(), hub.clone())
///         .await?;
/// # Ok(())
/// # }
/// ```
pub struct MemoryHub {
    // ---
    queues: Mutex<HashMap<String, Arc<MemoryQueue>>>,
}

impl MemoryHub {
    /// Create a new, empty hub.
    pub fn new() -> Arc<Self> {
        // ---
        Arc::new(Self::default())
    }

    /// Declare `name` with `flags`, creating it if absent.
    ///
    /// Redeclaring with identical flags is a no-op; different flags fail
    /// with [`BrokerError::Declare`], like a broker's `PRECONDITION_FAILED`.
    pub fn declare_queue(&self, name: &str, flags: QueueFlags) -> Result<()> {
        self.declare(name, flags).map(|_| ())
    }

    pub(crate) fn declare(&self, name: &str, flags: QueueFlags) -> Result<Arc<MemoryQueue>> {
        // ---
        let mut queues = lock_ignore_poison(&self.queues);

        if let Some(queue) = queues.get(name) {
            if queue.flags != flags {
                return Err(BrokerError::Declare(format!(
                    "memory: queue {name} exists with {:?}, requested {flags:?}",
                    queue.flags
                )));
            }
            return Ok(Arc::clone(queue));
        }

        log_debug!("memory: declared queue {name}");

        let queue = Arc::new(MemoryQueue::new(name, flags));
        queues.insert(name.to_string(), Arc::clone(&queue));
        Ok(queue)
    }

    /// Messages waiting in `name` that have not been delivered yet.
    pub fn ready_count(&self, name: &str) -> usize {
        self.queue(name).map_or(0, |q| q.ready_len())
    }

    /// Deliveries from `name` that are still awaiting ack or nack.
    pub fn unacked_count(&self, name: &str) -> usize {
        self.queue(name)
            .map_or(0, |q| q.unacked.load(Ordering::SeqCst))
    }

    fn queue(&self, name: &str) -> Option<Arc<MemoryQueue>> {
        lock_ignore_poison(&self.queues).get(name).cloned()
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        // ---
        Self {
            queues: Mutex::new(HashMap::new()),
        }
    }
}

/// One named queue on the hub.
pub(crate) struct MemoryQueue {
    // ---
    name: String,
    flags: QueueFlags,
    ready: Mutex<VecDeque<BrokerMessage>>,
    unacked: AtomicUsize,
    available: Notify,
}

impl MemoryQueue {
    fn new(name: &str, flags: QueueFlags) -> Self {
        // ---
        Self {
            name: name.to_string(),
            flags,
            ready: Mutex::new(VecDeque::new()),
            unacked: AtomicUsize::new(0),
            available: Notify::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Append a newly published message.
    pub(crate) fn push(&self, message: BrokerMessage) {
        lock_ignore_poison(&self.ready).push_back(message);
        self.available.notify_one();
    }

    /// Take the oldest ready message and count it as unacknowledged.
    pub(crate) fn take(&self) -> Option<BrokerMessage> {
        // ---
        let message = lock_ignore_poison(&self.ready).pop_front()?;
        self.unacked.fetch_add(1, Ordering::SeqCst);
        Some(message)
    }

    /// Settle an outstanding delivery (ack, or nack without requeue).
    pub(crate) fn settle(&self) {
        self.unacked.fetch_sub(1, Ordering::SeqCst);
    }

    /// Put unsettled deliveries back at the head of the queue, keeping
    /// their delivery order.
    pub(crate) fn requeue(&self, messages: Vec<BrokerMessage>) {
        // ---
        if messages.is_empty() {
            return;
        }

        let count = messages.len();
        {
            let mut ready = lock_ignore_poison(&self.ready);
            for message in messages.into_iter().rev() {
                ready.push_front(message);
            }
        }
        self.unacked.fetch_sub(count, Ordering::SeqCst);

        log_debug!("memory: requeued {count} message(s) on {}", self.name);

        for _ in 0..count {
            self.available.notify_one();
        }
    }

    /// Resolves when a message may be available.
    pub(crate) async fn available(&self) {
        self.available.notified().await;
    }

    fn ready_len(&self) -> usize {
        lock_ignore_poison(&self.ready).len()
    }
}

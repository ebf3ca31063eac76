// src/transport/memory/controller.rs

//! In-memory controller implementation.
//!
//! Mirrors the AMQP controller's channel model on top of a [`MemoryHub`]:
//!
//! - every `publish()` and `subscribe()` opens its own channel, which fails
//!   once the controller is closed,
//! - destinations are declared with [`QueueFlags::TRANSIENT`] on every call,
//! - each subscription's channel tracks the deliveries it handed out; ack and
//!   nack settle them, and cancelling the subscription puts the unsettled
//!   ones back at the head of the queue,
//! - closing the controller ends the delivery sequence of its open
//!   subscriptions (their channels die with the connection) but does not
//!   cancel them; callers still call `cancel()`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::watch;

use super::hub::{MemoryHub, MemoryQueue, QueueFlags};
use crate::lock::lock_ignore_poison;
use crate::{
    // ---
    log_debug,
    log_info,
    AcknowledgeableBrokerMessage,
    BrokerAcknowledgment,
    BrokerController,
    BrokerError,
    BrokerMessage,
    ControllerBase,
    ControllerConfig,
    ControllerPtr,
    DeliverySource,
    LoggerPtr,
    Result,
    Subscription,
};

/// Process-global hub used by [`create_memory_controller`].
static GLOBAL_HUB: OnceLock<Arc<MemoryHub>> = OnceLock::new();

fn global_hub() -> Arc<MemoryHub> {
    GLOBAL_HUB.get_or_init(MemoryHub::new).clone()
}

/// In-memory controller.
struct MemoryController {
    // ---
    base: ControllerBase,
    hub: Arc<MemoryHub>,
    // `true` once closed; subscriptions watch it to end their sequence.
    closed: watch::Sender<bool>,
    next_channel_id: AtomicU64,
}

impl MemoryController {
    fn open_channel(&self) -> Result<MemoryChannel> {
        // ---
        if *self.closed.borrow() {
            return Err(BrokerError::Channel("memory: connection is closed".into()));
        }

        let id = self.next_channel_id.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryChannel {
            id,
            state: Arc::new(ChannelState::default()),
        })
    }
}

#[async_trait::async_trait]
impl BrokerController for MemoryController {
    // ---
    fn base(&self) -> &ControllerBase {
        &self.base
    }

    async fn publish(&self, destination: &str, message: BrokerMessage) -> Result<()> {
        // ---
        let channel = self.open_channel()?;
        let queue = self.hub.declare(destination, QueueFlags::TRANSIENT)?;

        queue.push(message);

        log_debug!(
            "[{}] channel {}: published to {destination}",
            self.base.queue_group,
            channel.id
        );
        Ok(())
    }

    async fn subscribe(&self, destination: &str) -> Result<Subscription> {
        // ---
        let channel = self.open_channel()?;
        let queue = self.hub.declare(destination, QueueFlags::TRANSIENT)?;

        log_info!(
            "[{}] channel {}: started consuming {destination}",
            self.base.queue_group,
            channel.id
        );

        let source = MemoryDeliverySource {
            queue,
            channel,
            connection_closed: self.closed.subscribe(),
            logger: Arc::clone(&self.base.logger),
        };

        Ok(Subscription::spawn(
            destination,
            source,
            self.base.buffer_size,
        ))
    }

    async fn close(&self) {
        // ---
        if self.closed.send_replace(true) {
            log_debug!("[{}] memory connection already closed", self.base.queue_group);
            return;
        }

        log_info!("[{}] memory connection closed", self.base.queue_group);
    }
}

/// One channel: a delivery tag counter and the deliveries it has not settled.
struct MemoryChannel {
    id: u64,
    state: Arc<ChannelState>,
}

#[derive(Default)]
struct ChannelState {
    closed: AtomicBool,
    next_tag: AtomicU64,
    unacked: Mutex<BTreeMap<u64, BrokerMessage>>,
}

impl ChannelState {
    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    fn track(&self, message: BrokerMessage) -> u64 {
        // ---
        let tag = self.next_tag.fetch_add(1, Ordering::SeqCst) + 1;
        lock_ignore_poison(&self.unacked).insert(tag, message);
        tag
    }

    fn settle(&self, tag: u64) -> Result<()> {
        // ---
        if !self.is_open() {
            return Err(BrokerError::Acknowledgement(format!(
                "memory: delivery tag {tag}: channel is closed"
            )));
        }

        match lock_ignore_poison(&self.unacked).remove(&tag) {
            Some(_) => Ok(()),
            None => Err(BrokerError::Acknowledgement(format!(
                "memory: unknown delivery tag {tag}"
            ))),
        }
    }

    /// Close the channel and hand back everything it had not settled, in
    /// delivery order.
    fn release(&self) -> Vec<BrokerMessage> {
        // ---
        self.closed.store(true, Ordering::SeqCst);
        let unacked = std::mem::take(&mut *lock_ignore_poison(&self.unacked));
        unacked.into_values().collect()
    }
}

/// Delivery feed for one subscription.
struct MemoryDeliverySource {
    // ---
    queue: Arc<MemoryQueue>,
    channel: MemoryChannel,
    connection_closed: watch::Receiver<bool>,
    logger: LoggerPtr,
}

#[async_trait::async_trait]
impl DeliverySource for MemoryDeliverySource {
    // ---
    async fn next_delivery(&mut self) -> Option<AcknowledgeableBrokerMessage> {
        // ---
        loop {
            if *self.connection_closed.borrow() {
                return None;
            }

            if let Some(message) = self.queue.take() {
                let tag = self.channel.state.track(message.clone());

                return Some(AcknowledgeableBrokerMessage::new(
                    message,
                    Box::new(MemoryAcknowledgement {
                        queue: Arc::clone(&self.queue),
                        channel: Arc::clone(&self.channel.state),
                        tag,
                        logger: Arc::clone(&self.logger),
                    }),
                ));
            }

            tokio::select! {
                _ = self.queue.available() => {}
                changed = self.connection_closed.changed() => {
                    // Sender gone means the controller was dropped.
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        // ---
        let unsettled = self.channel.state.release();
        self.queue.requeue(unsettled);

        log_debug!(
            "channel {}: consumer on {} cancelled",
            self.channel.id,
            self.queue.name()
        );
    }
}

/// Acknowledgement handler for one memory delivery.
struct MemoryAcknowledgement {
    // ---
    queue: Arc<MemoryQueue>,
    channel: Arc<ChannelState>,
    tag: u64,
    logger: LoggerPtr,
}

impl MemoryAcknowledgement {
    fn decide(&self, decision: &str) {
        // ---
        match self.channel.settle(self.tag) {
            Ok(()) => self.queue.settle(),
            Err(e) => self.logger.error(&format!("{decision}: {e}")),
        }
    }
}

#[async_trait::async_trait]
impl BrokerAcknowledgment for MemoryAcknowledgement {
    async fn ack_message(&self) {
        self.decide("ack");
    }

    // Nack never requeues, so settling is the same as for an ack.
    async fn nak_message(&self) {
        self.decide("nack");
    }
}

/// Create a new in-memory controller using the process-global hub.
///
/// All controllers created with this function share a single hub, matching
/// the semantics of applications connected to the same broker. For isolated
/// parallel testing, use [`create_memory_controller_with_hub`].
///
/// # Errors
///
/// Currently infallible; always returns `Ok`.
pub async fn create_memory_controller(config: ControllerConfig) -> Result<ControllerPtr> {
    // ---
    create_memory_controller_with_hub(config, global_hub()).await
}

/// Create a new in-memory controller using the provided hub.
///
/// # ⚠️  Testing Only - Subject to Change
///
/// Production code should go through
/// [`ControllerBuilder`](crate::ControllerBuilder).
pub async fn create_memory_controller_with_hub(
    config: ControllerConfig,
    hub: Arc<MemoryHub>,
) -> Result<ControllerPtr> {
    // ---
    let (closed, _) = watch::channel(false);

    Ok(Arc::new(MemoryController {
        base: ControllerBase::from(&config),
        hub,
        closed,
        next_channel_id: AtomicU64::new(1),
    }))
}

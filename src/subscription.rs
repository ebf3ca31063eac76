// src/subscription.rs

//! Subscription delivery pipeline.
//!
//! Every successful `subscribe()` produces a [`Subscription`]: a background
//! forwarding task that pulls raw deliveries from a [`DeliverySource`] and
//! pushes them, in order, onto a bounded buffer read by the caller.
//!
//! ## Lifecycle
//!
//! ```text
//! Active ──cancel()/drop──▶ Cancelling ──teardown──▶ Closed
//! ```
//!
//! - **Active**: the task forwards deliveries. When the buffer is full it
//!   waits for the caller instead of dropping anything.
//! - **Cancelling**: entered once, on the first `cancel()` or when every
//!   handle to the subscription has been dropped. The task stops pulling
//!   deliveries and asks the source to cancel its broker consumer.
//! - **Closed**: the source has released its channel and the task has
//!   exited. Further `cancel()` calls return immediately.
//!
//! Deliveries already sitting in the buffer are still yielded after
//! cancellation; once they are drained the sequence ends. A source that
//! ends or fails on its own also ends the sequence: that is the only way a
//! broken pipeline shows up to the caller.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures_lite::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::lock::lock_ignore_poison;
use crate::{
    // ---
    log_debug,
    log_error,
    AcknowledgeableBrokerMessage,
};

/// Raw delivery feed behind a subscription.
///
/// Implemented by each controller on top of its broker consumer.
#[async_trait::async_trait]
pub trait DeliverySource: Send + 'static {
    // ---
    /// Wait for the next delivery, already converted into an
    /// [`AcknowledgeableBrokerMessage`].
    ///
    /// Returns `None` when the underlying consumer has ended. Must be
    /// cancel-safe: the pipeline races it against the cancellation signal
    /// and drops the future when cancellation wins.
    async fn next_delivery(&mut self) -> Option<AcknowledgeableBrokerMessage>;

    /// Cancel the broker consumer and release the channel.
    ///
    /// Called exactly once, after the last `next_delivery()`.
    async fn shutdown(&mut self);
}

/// An ordered, cancellable sequence of deliveries from one destination.
///
/// Read it with [`recv`](Self::recv) or as a [`Stream`]. Dropping the
/// subscription (and every [`SubscriptionCanceller`] cloned from it) tears
/// the pipeline down in the background.
pub struct Subscription {
    // ---
    destination: String,
    inbox: mpsc::Receiver<AcknowledgeableBrokerMessage>,
    canceller: SubscriptionCanceller,
}

/// Cloneable cancellation trigger for a [`Subscription`].
///
/// Useful when the task reading the subscription is not the one deciding
/// when to stop, e.g. a deadline task.
#[derive(Clone)]
pub struct SubscriptionCanceller {
    inner: Arc<CancelState>,
}

struct CancelState {
    // Taken on first cancel; `None` afterwards.
    signal: Mutex<Option<oneshot::Sender<()>>>,
    // Taken by whichever cancel() call joins the task first.
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    // ---
    /// Start the forwarding task for `source` and return the subscription.
    ///
    /// `capacity` is the size of the delivery buffer (minimum 1).
    pub fn spawn<S>(destination: impl Into<String>, source: S, capacity: usize) -> Self
    where
        S: DeliverySource,
    {
        // ---
        let destination = destination.into();

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let task = tokio::spawn(forward(destination.clone(), source, tx, cancel_rx));

        Self {
            destination,
            inbox: rx,
            canceller: SubscriptionCanceller {
                inner: Arc::new(CancelState {
                    signal: Mutex::new(Some(cancel_tx)),
                    task: tokio::sync::Mutex::new(Some(task)),
                }),
            },
        }
    }

    /// The destination this subscription consumes from.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Wait for the next delivery.
    ///
    /// Returns `None` once the subscription has been cancelled (or its
    /// source has ended) and the buffer is drained.
    pub async fn recv(&mut self) -> Option<AcknowledgeableBrokerMessage> {
        self.inbox.recv().await
    }

    /// Cancel the subscription and wait until the broker consumer is
    /// cancelled and its channel released. Idempotent.
    pub async fn cancel(&self) {
        self.canceller.cancel().await;
    }

    /// A cancellation trigger that can be moved to another task.
    pub fn canceller(&self) -> SubscriptionCanceller {
        self.canceller.clone()
    }

    /// `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.canceller.is_cancelled()
    }
}

impl Stream for Subscription {
    type Item = AcknowledgeableBrokerMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inbox.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("destination", &self.destination)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl SubscriptionCanceller {
    // ---
    /// Signal cancellation and wait for teardown to complete. Idempotent;
    /// concurrent callers all return after teardown has finished.
    pub async fn cancel(&self) {
        // ---
        if let Some(tx) = lock_ignore_poison(&self.inner.signal).take() {
            // The task may already be gone (source ended); nothing to signal then.
            let _ = tx.send(());
        }

        let mut task = self.inner.task.lock().await;
        if let Some(handle) = task.take() {
            if let Err(e) = handle.await {
                log_error!("subscription task failed during teardown: {e}");
            }
        }
    }

    /// `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        lock_ignore_poison(&self.inner.signal).is_none()
    }
}

/// Forwarding loop run by the subscription task.
async fn forward<S>(
    destination: String,
    mut source: S,
    tx: mpsc::Sender<AcknowledgeableBrokerMessage>,
    mut cancel_rx: oneshot::Receiver<()>,
) where
    S: DeliverySource,
{
    // ---
    log_debug!("subscription task started for {destination}");

    // A dropped sender (every handle gone) counts as cancellation too, so
    // the result of `cancel_rx` is deliberately ignored.
    loop {
        let delivery = tokio::select! {
            biased;

            _ = &mut cancel_rx => {
                log_debug!("subscription on {destination} cancelled");
                break;
            }

            next = source.next_delivery() => match next {
                Some(delivery) => delivery,
                None => {
                    log_debug!("delivery stream ended for {destination}");
                    break;
                }
            },
        };

        // Backpressure: wait for buffer room, unless cancelled meanwhile. A
        // delivery dropped here was never acknowledged and goes back to the
        // broker with the channel.
        tokio::select! {
            biased;

            _ = &mut cancel_rx => {
                log_debug!("subscription on {destination} cancelled while buffer full");
                break;
            }

            sent = tx.send(delivery) => {
                if sent.is_err() {
                    log_debug!("subscription on {destination} dropped by consumer");
                    break;
                }
            }
        }
    }

    drop(tx);
    source.shutdown().await;

    log_debug!("subscription task stopped for {destination}");
}

// tests/controller_memory.rs

mod common;

use std::sync::Arc;

use bytes::Bytes;
use tokio::time::{timeout, Duration};

use amqp_broker::{
    // ---
    BrokerError,
    BrokerMessage,
    ControllerBuilder,
    ControllerConfig,
    ControllerPtr,
    MemoryHub,
    QueueFlags,
};

use common::{assert_quiet, init_logging, recv_within, RecordingLogger};

async fn controller(hub: &Arc<MemoryHub>) -> ControllerPtr {
    // ---
    init_logging();
    amqp_broker::create_memory_controller_with_hub(ControllerConfig::memory(), hub.clone())
        .await
        .expect("failed to create memory controller")
}

#[tokio::test]
async fn subscribe_publish_ack() {
    // ---
    // Arrange
    // ---
    let hub = MemoryHub::new();
    let ctrl = controller(&hub).await;

    let mut sub = ctrl.subscribe("TestQueueAck").await.expect("subscribe failed");

    // ---
    // Act
    // ---
    ctrl.publish("TestQueueAck", BrokerMessage::new("testmessage"))
        .await
        .expect("publish failed");

    let msg = recv_within(&mut sub, 500).await;
    assert_eq!(msg.payload(), &Bytes::from_static(b"testmessage"));
    assert_eq!(hub.unacked_count("TestQueueAck"), 1);

    msg.ack().await;

    // ---
    // Assert
    // ---
    assert_eq!(hub.unacked_count("TestQueueAck"), 0);
    assert_eq!(hub.ready_count("TestQueueAck"), 0);
    assert_quiet(&mut sub, 100).await;
    assert!(!sub.is_cancelled());

    sub.cancel().await;
    ctrl.close().await;
}

#[tokio::test]
async fn acked_message_is_not_redelivered() {
    // ---
    let hub = MemoryHub::new();
    let ctrl = controller(&hub).await;

    let mut first = ctrl.subscribe("acked").await.unwrap();
    ctrl.publish("acked", BrokerMessage::new("once")).await.unwrap();

    recv_within(&mut first, 500).await.ack().await;
    first.cancel().await;

    let mut second = ctrl.subscribe("acked").await.unwrap();
    assert_quiet(&mut second, 100).await;
    assert_eq!(hub.ready_count("acked"), 0);

    second.cancel().await;
    ctrl.close().await;
}

#[tokio::test]
async fn nacked_message_is_discarded() {
    // ---
    let hub = MemoryHub::new();
    let ctrl = controller(&hub).await;

    let mut first = ctrl.subscribe("nacked").await.unwrap();
    ctrl.publish("nacked", BrokerMessage::new("reject-me"))
        .await
        .unwrap();

    recv_within(&mut first, 500).await.nak().await;
    first.cancel().await;

    assert_eq!(hub.unacked_count("nacked"), 0);
    assert_eq!(hub.ready_count("nacked"), 0);

    let mut second = ctrl.subscribe("nacked").await.unwrap();
    assert_quiet(&mut second, 100).await;

    second.cancel().await;
    ctrl.close().await;
}

#[tokio::test]
async fn undecided_messages_are_redelivered_after_cancel() {
    // ---
    let hub = MemoryHub::new();
    let ctrl = controller(&hub).await;

    let mut first = ctrl.subscribe("undecided").await.unwrap();
    ctrl.publish("undecided", BrokerMessage::new("again"))
        .await
        .unwrap();

    let msg = recv_within(&mut first, 500).await;
    drop(msg);
    first.cancel().await;

    assert_eq!(hub.ready_count("undecided"), 1);
    assert_eq!(hub.unacked_count("undecided"), 0);

    let mut second = ctrl.subscribe("undecided").await.unwrap();
    let again = recv_within(&mut second, 500).await;
    assert_eq!(again.payload(), &Bytes::from_static(b"again"));
    again.ack().await;

    second.cancel().await;
    ctrl.close().await;
}

#[tokio::test]
async fn binary_payload_is_delivered_unchanged() {
    // ---
    let hub = MemoryHub::new();
    let ctrl = controller(&hub).await;

    let payload: Vec<u8> = (0..=255u8).chain([0, 0, 0xff]).collect();

    let mut sub = ctrl.subscribe("binary").await.unwrap();
    ctrl.publish("binary", BrokerMessage::new(payload.clone()))
        .await
        .unwrap();

    let msg = recv_within(&mut sub, 500).await;
    assert_eq!(msg.payload().as_ref(), payload.as_slice());
    msg.ack().await;

    sub.cancel().await;
    ctrl.close().await;
}

#[tokio::test]
async fn messages_published_before_subscribe_arrive_in_order() {
    // ---
    let hub = MemoryHub::new();
    let ctrl = controller(&hub).await;

    for p in ["M1", "M2", "M3"] {
        ctrl.publish("fifo", BrokerMessage::new(p)).await.unwrap();
    }
    assert_eq!(hub.ready_count("fifo"), 3);

    let mut sub = ctrl.subscribe("fifo").await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let msg = recv_within(&mut sub, 500).await;
        seen.push(msg.payload().clone());
        msg.ack().await;
    }

    assert_eq!(seen, ["M1", "M2", "M3"]);

    sub.cancel().await;
    ctrl.close().await;
}

#[tokio::test]
async fn headers_pass_through() {
    // ---
    let hub = MemoryHub::new();
    let ctrl = controller(&hub).await;

    let mut sub = ctrl.subscribe("headers").await.unwrap();

    let message = BrokerMessage::new("with-headers")
        .with_header("correlationId", "abc-123")
        .with_header("raw", vec![0u8, 1, 2]);
    ctrl.publish("headers", message).await.unwrap();

    let msg = recv_within(&mut sub, 500).await;
    assert_eq!(
        msg.headers().get("correlationId"),
        Some(&Bytes::from_static(b"abc-123"))
    );
    assert_eq!(msg.headers().get("raw"), Some(&Bytes::from(vec![0u8, 1, 2])));
    msg.ack().await;

    sub.cancel().await;
    ctrl.close().await;
}

#[tokio::test]
async fn cancel_and_close_are_idempotent() {
    // ---
    let hub = MemoryHub::new();
    let ctrl = controller(&hub).await;

    let sub = ctrl.subscribe("twice").await.unwrap();

    sub.cancel().await;
    sub.cancel().await;
    assert!(sub.is_cancelled());

    ctrl.close().await;
    ctrl.close().await;
}

#[tokio::test]
async fn close_ends_open_subscriptions() {
    // ---
    let hub = MemoryHub::new();
    let ctrl = controller(&hub).await;

    let mut sub = ctrl.subscribe("closing").await.unwrap();
    ctrl.close().await;

    let next = timeout(Duration::from_millis(500), sub.recv())
        .await
        .expect("sequence did not end after close");
    assert!(next.is_none());

    sub.cancel().await;
}

#[tokio::test]
async fn publish_and_subscribe_after_close_fail() {
    // ---
    let hub = MemoryHub::new();
    let ctrl = controller(&hub).await;
    ctrl.close().await;

    let err = ctrl
        .publish("late", BrokerMessage::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::Channel(_)), "got {err:?}");

    let err = ctrl.subscribe("late").await.err().expect("subscribe should fail");
    assert!(matches!(err, BrokerError::Channel(_)), "got {err:?}");
}

#[tokio::test]
async fn conflicting_declaration_fails() {
    // ---
    let hub = MemoryHub::new();
    hub.declare_queue(
        "durable-q",
        QueueFlags {
            durable: true,
            ..QueueFlags::TRANSIENT
        },
    )
    .unwrap();

    let ctrl = controller(&hub).await;

    let err = ctrl
        .publish("durable-q", BrokerMessage::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::Declare(_)), "got {err:?}");

    let err = ctrl
        .subscribe("durable-q")
        .await
        .err()
        .expect("subscribe should fail");
    assert!(matches!(err, BrokerError::Declare(_)), "got {err:?}");

    ctrl.close().await;
}

#[tokio::test]
async fn late_ack_is_reported_to_logger() {
    // ---
    init_logging();
    let hub = MemoryHub::new();
    let logger = RecordingLogger::new();

    let mut config = ControllerConfig::memory();
    config.logger = logger.clone();
    let ctrl = amqp_broker::create_memory_controller_with_hub(config, hub.clone())
        .await
        .unwrap();

    let mut sub = ctrl.subscribe("late-ack").await.unwrap();
    ctrl.publish("late-ack", BrokerMessage::new("x")).await.unwrap();

    let msg = recv_within(&mut sub, 500).await;
    sub.cancel().await;

    // Channel is gone; the decision cannot reach the queue.
    msg.ack().await;

    let errors = logger.errors();
    assert_eq!(errors.len(), 1, "errors: {errors:?}");
    assert!(errors[0].starts_with("ack:"), "got {}", errors[0]);
    assert_eq!(hub.ready_count("late-ack"), 1);

    ctrl.close().await;
}

#[tokio::test]
async fn controllers_on_one_hub_share_queues() {
    // ---
    let hub = MemoryHub::new();
    let publisher = controller(&hub).await;
    let consumer = controller(&hub).await;

    let mut sub = consumer.subscribe("shared").await.unwrap();
    publisher
        .publish("shared", BrokerMessage::new("across"))
        .await
        .unwrap();

    recv_within(&mut sub, 500).await.ack().await;

    sub.cancel().await;
    publisher.close().await;
    consumer.close().await;
}

#[tokio::test]
async fn builder_creates_memory_controller() {
    // ---
    init_logging();
    let ctrl = ControllerBuilder::new()
        .uri("memory://")
        .queue_group("ping-apps")
        .build()
        .await
        .expect("build failed");

    assert_eq!(ctrl.queue_group(), "ping-apps");

    let mut sub = ctrl.subscribe("builder-dispatch").await.unwrap();
    ctrl.publish("builder-dispatch", BrokerMessage::new("hi"))
        .await
        .unwrap();
    recv_within(&mut sub, 500).await.ack().await;

    sub.cancel().await;
    ctrl.close().await;
}

#[tokio::test]
async fn default_queue_group_is_asyncapi() {
    // ---
    let hub = MemoryHub::new();
    let ctrl = controller(&hub).await;
    assert_eq!(ctrl.queue_group(), amqp_broker::DEFAULT_QUEUE_GROUP);
    ctrl.close().await;
}

//! Durable message queue interface.
//!
//! Queues are durable and deliveries persistent: messages survive a broker
//! restart. Consumption is at-least-once; settlement is explicit.

use async_trait::async_trait;

use crate::error::Result;

/// How a consumer settles a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Processing succeeded; remove the message.
    Ack,
    /// Transient failure; return the message to the queue for redelivery.
    Requeue,
    /// Permanent failure (poison message); drop without redelivery.
    Reject,
}

/// One received message awaiting settlement.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Broker-assigned tag used to settle this delivery.
    pub tag: u64,
    /// Raw message body (JSON in this service).
    pub body: Vec<u8>,
    /// True when the message was delivered before and requeued.
    pub redelivered: bool,
}

/// Pull-based consumer bound to a single queue.
///
/// A consumer holds at most `prefetch` unsettled deliveries; `next`
/// blocks once the window is full until an earlier delivery is settled.
/// Consumers are single-owner: do not share one across workers.
#[async_trait]
pub trait QueueConsumer: Send {
    /// Receive the next delivery. `None` means the queue was closed.
    async fn next(&mut self) -> Result<Option<Delivery>>;

    /// Settle a previously received delivery.
    async fn settle(&mut self, tag: u64, disposition: Disposition) -> Result<()>;
}

/// Durable message broker handle.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Publish a persistent message to a queue, declaring it if needed.
    async fn publish(&self, queue: &str, body: &[u8]) -> Result<()>;

    /// Open a consumer with the given prefetch window.
    async fn consume(&self, queue: &str, prefetch: u16) -> Result<Box<dyn QueueConsumer>>;
}

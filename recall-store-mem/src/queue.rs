//! In-memory message queue with broker-style settlement.
//!
//! FIFO per queue, explicit ack/requeue/reject, prefetch windows, and a
//! `close` hook so consumers drain and stop in tests. Requeued messages
//! go back to the front of the queue, matching broker redelivery order.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use recall_core::error::{Error, Result};
use recall_core::stores::{Delivery, Disposition, MessageQueue, QueueConsumer};

struct PendingMessage {
    tag: u64,
    body: Vec<u8>,
    redelivered: bool,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<PendingMessage>,
    unacked: HashMap<u64, Vec<u8>>,
    closed: bool,
    acked: u64,
    rejected: u64,
    requeued: u64,
}

#[derive(Default)]
struct QueueInner {
    state: Mutex<QueueState>,
    notify: Notify,
    next_tag: AtomicU64,
}

impl QueueInner {
    fn tag(&self) -> u64 {
        self.next_tag.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// In-memory [`MessageQueue`] with per-queue counters for tests.
#[derive(Default)]
pub struct InMemoryQueue {
    queues: Mutex<HashMap<String, Arc<QueueInner>>>,
    fail_publishes: AtomicBool,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, name: &str) -> Arc<QueueInner> {
        let mut queues = self.queues.lock();
        Arc::clone(queues.entry(name.to_string()).or_default())
    }

    /// Simulate a broker outage for publishes.
    pub fn fail_publishes(&self, failing: bool) {
        self.fail_publishes.store(failing, Ordering::SeqCst);
    }

    /// Mark a queue closed: consumers drain remaining messages, then stop.
    pub fn close(&self, name: &str) {
        let inner = self.queue(name);
        inner.state.lock().closed = true;
        inner.notify.notify_waiters();
        inner.notify.notify_one();
    }

    /// Messages currently waiting for delivery.
    pub fn depth(&self, name: &str) -> usize {
        self.queue(name).state.lock().pending.len()
    }

    pub fn acked(&self, name: &str) -> u64 {
        self.queue(name).state.lock().acked
    }

    pub fn rejected(&self, name: &str) -> u64 {
        self.queue(name).state.lock().rejected
    }

    pub fn requeued(&self, name: &str) -> u64 {
        self.queue(name).state.lock().requeued
    }

    /// Pop one message body out-of-band (test helper; no settlement).
    pub fn pop(&self, name: &str) -> Option<Vec<u8>> {
        self.queue(name)
            .state
            .lock()
            .pending
            .pop_front()
            .map(|m| m.body)
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn publish(&self, queue: &str, body: &[u8]) -> Result<()> {
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(Error::Transient("message broker unavailable".to_string()));
        }

        let inner = self.queue(queue);
        let tag = inner.tag();
        inner.state.lock().pending.push_back(PendingMessage {
            tag,
            body: body.to_vec(),
            redelivered: false,
        });
        inner.notify.notify_one();
        Ok(())
    }

    async fn consume(&self, queue: &str, prefetch: u16) -> Result<Box<dyn QueueConsumer>> {
        Ok(Box::new(MemConsumer {
            inner: self.queue(queue),
            prefetch: usize::from(prefetch.max(1)),
            outstanding: 0,
        }))
    }
}

struct MemConsumer {
    inner: Arc<QueueInner>,
    prefetch: usize,
    outstanding: usize,
}

#[async_trait]
impl QueueConsumer for MemConsumer {
    async fn next(&mut self) -> Result<Option<Delivery>> {
        loop {
            let notified = self.inner.notify.notified();
            {
                let mut state = self.inner.state.lock();
                if self.outstanding < self.prefetch {
                    if let Some(message) = state.pending.pop_front() {
                        state.unacked.insert(message.tag, message.body.clone());
                        self.outstanding += 1;
                        return Ok(Some(Delivery {
                            tag: message.tag,
                            body: message.body,
                            redelivered: message.redelivered,
                        }));
                    }
                    if state.closed {
                        return Ok(None);
                    }
                }
            }
            notified.await;
        }
    }

    async fn settle(&mut self, tag: u64, disposition: Disposition) -> Result<()> {
        let mut state = self.inner.state.lock();
        let Some(body) = state.unacked.remove(&tag) else {
            return Err(Error::Validation(format!("unknown delivery tag {tag}")));
        };

        match disposition {
            Disposition::Ack => state.acked += 1,
            Disposition::Requeue => {
                state.requeued += 1;
                let tag = self.inner.tag();
                state.pending.push_front(PendingMessage {
                    tag,
                    body,
                    redelivered: true,
                });
            }
            Disposition::Reject => state.rejected += 1,
        }
        self.outstanding -= 1;
        drop(state);
        self.inner.notify.notify_one();
        Ok(())
    }
}

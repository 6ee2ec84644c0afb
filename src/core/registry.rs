use std::sync::Arc;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::core::queue::MessageQueue;
use crate::core::subscriber::Subscriber;

/// Key shared by both registry maps.
pub type QueueName = String;

/// Thread-safe store mapping queue names to their buffer and subscriber list.
///
/// The two maps are deliberately independent (no back-pointers between a
/// queue and its subscribers) and sharded by `DashMap`, so a busy queue never
/// serializes joins or publishes on other queues. Dispatch code must only
/// ever iterate a [`Registry::subscribers`] snapshot, never a live entry, so
/// no shard lock is held across network I/O.
///
/// Both maps grow monotonically: queues are created lazily on first reference
/// and never destroyed. Subscriber entries are the one exception, removed by
/// [`Registry::prune`] once their connection dies.
#[derive(Debug)]
pub struct Registry {
    queues: DashMap<QueueName, Arc<MessageQueue>>,
    subscribers: DashMap<QueueName, Vec<Arc<Subscriber>>>,
    created: flume::Sender<QueueName>,
}

impl Registry {
    /// Builds a registry plus the channel on which newly created queue names
    /// are announced to the dispatcher.
    pub fn new() -> (Self, flume::Receiver<QueueName>) {
        let (created, rx) = flume::unbounded();
        (
            Self {
                queues: DashMap::new(),
                subscribers: DashMap::new(),
                created,
            },
            rx,
        )
    }

    /// Returns the queue for `name`, creating it on first reference.
    ///
    /// Idempotent under concurrency: the entry API guarantees all callers see
    /// the same instance, with no duplicate creation.
    pub fn get_or_create_queue(&self, name: &str) -> Arc<MessageQueue> {
        match self.queues.entry(name.to_string()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                debug!(queue = name, "creating queue on first reference");
                let queue = Arc::new(MessageQueue::new());
                entry.insert(Arc::clone(&queue));
                // The dispatcher is only absent during shutdown.
                let _ = self.created.send(name.to_string());
                queue
            }
        }
    }

    pub fn queue(&self, name: &str) -> Option<Arc<MessageQueue>> {
        self.queues.get(name).map(|entry| Arc::clone(&*entry))
    }

    /// Registers a delivery target for `name`, creating the queue if absent.
    ///
    /// Duplicate joins are kept as-is: each one is a separate delivery target.
    pub fn add_subscriber(&self, name: &str, subscriber: Arc<Subscriber>) {
        let queue = self.get_or_create_queue(name);
        self.subscribers
            .entry(name.to_string())
            .or_default()
            .push(subscriber);
        // A queue that was idle for lack of subscribers can now deliver.
        queue.notify();
    }

    /// Snapshot of the current subscriber list, in join order.
    pub fn subscribers(&self, name: &str) -> Vec<Arc<Subscriber>> {
        self.subscribers
            .get(name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Enqueues a payload onto `name`, creating the queue on first reference.
    pub fn publish(&self, name: &str, payload: Bytes) {
        self.get_or_create_queue(name).enqueue(payload);
    }

    /// Drops subscribers that closed their connection or ran out of strikes.
    pub fn prune(&self, name: &str, max_strikes: u32) {
        if let Some(mut entry) = self.subscribers.get_mut(name) {
            entry.retain(|sub| {
                if sub.should_prune(max_strikes) {
                    info!(queue = name, subscriber = %sub.id(), "pruning subscriber");
                    false
                } else {
                    true
                }
            });
        }
    }

    /// Lists all queue names currently registered.
    pub fn queue_names(&self) -> Vec<QueueName> {
        self.queues.iter().map(|entry| entry.key().clone()).collect()
    }
}

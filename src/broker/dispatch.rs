//! The broker's delivery engine.
//!
//! One round loop runs per queue: dequeue at most one payload, broadcast it
//! to every subscriber in parallel, wait for all acks (each bounded by the
//! configured timeout), prune the dead, repeat. Queues get their loops as
//! soon as the registry creates them, so a stalled queue never blocks the
//! others.

use std::sync::Arc;

use tokio::task::{self, JoinSet};
use tokio::time::Duration;
use tracing::{debug, error, warn};

use crate::config::DeliveryConfig;
use crate::core::registry::{QueueName, Registry};

/// Central dispatcher: spawns a round loop for every queue name announced by
/// the registry. Runs until the registry (and its channel sender) is dropped.
pub async fn dispatch(
    registry: Arc<Registry>,
    created: flume::Receiver<QueueName>,
    config: DeliveryConfig,
) {
    while let Ok(name) = created.recv_async().await {
        debug!(queue = %name, "starting dispatch loop");
        let registry = Arc::clone(&registry);
        let config = config.clone();
        task::spawn(queue_loop(name, registry, config));
    }
}

/// One queue's round loop.
///
/// Sleeps on the queue's wake signal whenever there is nothing to do, which
/// replaces polling: enqueues and joins both fire the signal, and a signal
/// raised between the emptiness check and the wait is retained by `Notify`.
async fn queue_loop(name: QueueName, registry: Arc<Registry>, config: DeliveryConfig) {
    let Some(queue) = registry.queue(&name) else {
        error!(queue = %name, "dispatch loop started for unknown queue");
        return;
    };
    let ack_timeout = Duration::from_millis(config.ack_timeout_ms);

    loop {
        // Snapshot first, then drop entries already known dead. Messages are
        // only dequeued once someone is there to receive them.
        let subscribers: Vec<_> = registry
            .subscribers(&name)
            .into_iter()
            .filter(|sub| !sub.is_closed())
            .collect();

        if subscribers.is_empty() {
            queue.notified().await;
            continue;
        }
        let Some(payload) = queue.dequeue() else {
            queue.notified().await;
            continue;
        };

        // Parallel fan-out: one bounded delivery task per subscriber. The
        // round completes only when every task has, success or failure.
        let mut round = JoinSet::new();
        for subscriber in subscribers {
            let payload = payload.clone();
            round.spawn(async move {
                let outcome = subscriber.deliver(&payload, ack_timeout).await;
                (subscriber, outcome)
            });
        }

        while let Some(joined) = round.join_next().await {
            match joined {
                Ok((subscriber, Ok(()))) => {
                    debug!(queue = %name, subscriber = %subscriber.id(), "delivered");
                }
                Ok((subscriber, Err(e))) => {
                    warn!(queue = %name, subscriber = %subscriber.id(), error = %e, "delivery failed");
                }
                Err(e) => {
                    error!(queue = %name, error = %e, "delivery task panicked");
                }
            }
        }

        registry.prune(&name, config.max_strikes);
    }
}

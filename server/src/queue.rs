//! Bounded-producer/consumer handoff between the acceptor and the workers.
//!
//! One mutex guards the FIFO and one [`Notify`] plays the role of the
//! "non-empty" condition signal: `push` appends and wakes a waiter, `pop`
//! suspends the calling worker until an item exists. Depth is unbounded by
//! design; acceptance is never refused because the queue is busy. A
//! production hardening would cap it and push back on the acceptor.

use std::collections::VecDeque;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};

/// An authenticated connection waiting for a free worker, consumed exactly
/// once.
#[derive(Debug)]
pub struct ConnectionRequest {
    pub stream: TcpStream,
    pub username: String,
}

/// Thread-safe FIFO of pending items.
#[derive(Debug, Default)]
pub struct ConnectionQueue<T> {
    items: Mutex<VecDeque<T>>,
    ready: Notify,
}

impl<T> ConnectionQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            ready: Notify::new(),
        }
    }

    /// Appends an item and signals one waiting worker.
    pub async fn push(&self, item: T) {
        self.items.lock().await.push_back(item);
        self.ready.notify_one();
    }

    /// Removes and returns the head, suspending until an item exists.
    pub async fn pop(&self) -> T {
        loop {
            // Register interest before re-checking so a push between the
            // check and the await still wakes us.
            let ready = self.ready.notified();
            if let Some(item) = self.items.lock().await.pop_front() {
                return item;
            }
            ready.await;
        }
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn pop_returns_items_in_fifo_order() {
        let queue = ConnectionQueue::new();
        for i in 0..5u32 {
            queue.push(i).await;
        }
        for i in 0..5u32 {
            assert_eq!(queue.pop().await, i);
        }
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn pop_suspends_until_push() {
        let queue = Arc::new(ConnectionQueue::new());

        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        // Give the waiter time to block on the empty queue.
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(7u32).await;

        let value = timeout(Duration::from_secs(1), waiter)
            .await
            .expect("pop should wake after push")
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn each_item_is_delivered_to_exactly_one_worker() {
        let queue = Arc::new(ConnectionQueue::new());
        let total = 32u32;

        let mut workers = Vec::new();
        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            workers.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..8 {
                    seen.push(queue.pop().await);
                }
                seen
            }));
        }

        for i in 0..total {
            queue.push(i).await;
        }

        let mut delivered = Vec::new();
        for worker in workers {
            let seen = timeout(Duration::from_secs(5), worker)
                .await
                .expect("workers should drain the queue")
                .unwrap();
            delivered.extend(seen);
        }

        delivered.sort_unstable();
        assert_eq!(delivered, (0..total).collect::<Vec<_>>());
        assert!(queue.is_empty().await);
    }
}

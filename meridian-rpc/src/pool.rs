//! Bounded pool of request identifiers.
//!
//! Two-way calls borrow one of exactly [`REQUEST_ID_COUNT`] identifiers
//! (`1..=32`), each bound 1:1 to a response-delivery slot on the endpoint.
//! The pool is the backpressure mechanism for concurrent outstanding calls:
//! the 33rd caller waits until an identifier is released, and releasing one
//! wakes exactly one waiter.

use std::sync::Mutex;

use tokio::sync::Semaphore;

use crate::envelope::RequestId;

/// Number of request identifiers available per endpoint.
pub const REQUEST_ID_COUNT: usize = 32;

/// Pool of reusable request identifiers.
///
/// An identifier is returned to the pool only after its response (or a
/// cancellation signal) has been delivered to the caller that borrowed it.
#[derive(Debug)]
pub(crate) struct RequestIdPool {
    permits: Semaphore,
    free: Mutex<Vec<RequestId>>,
}

impl RequestIdPool {
    /// Create a pool holding identifiers `1..=32`.
    pub(crate) fn new() -> Self {
        Self {
            permits: Semaphore::new(REQUEST_ID_COUNT),
            // Reversed so identifiers are handed out starting at 1.
            free: Mutex::new((1..=REQUEST_ID_COUNT as RequestId).rev().collect()),
        }
    }

    /// Borrow an identifier, waiting until one is available.
    pub(crate) async fn acquire(&self) -> RequestId {
        let permit = self
            .permits
            .acquire()
            .await
            .expect("request-id semaphore is never closed");
        permit.forget();

        self.free
            .lock()
            .expect("request-id pool lock poisoned")
            .pop()
            .expect("semaphore permit guarantees a free request id")
    }

    /// Return an identifier to the pool, waking one waiter if any.
    pub(crate) fn release(&self, id: RequestId) {
        self.free
            .lock()
            .expect("request-id pool lock poisoned")
            .push(id);
        self.permits.add_permits(1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_acquire_all_ids() {
        let pool = RequestIdPool::new();
        let mut ids = Vec::new();
        for _ in 0..REQUEST_ID_COUNT {
            ids.push(pool.acquire().await);
        }

        ids.sort_unstable();
        let expected: Vec<RequestId> = (1..=REQUEST_ID_COUNT as RequestId).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_exhausted_pool_blocks() {
        let pool = RequestIdPool::new();
        for _ in 0..REQUEST_ID_COUNT {
            pool.acquire().await;
        }

        let waited = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(waited.is_err(), "33rd acquisition should block");
    }

    #[tokio::test]
    async fn test_release_unblocks_one_waiter() {
        let pool = std::sync::Arc::new(RequestIdPool::new());
        let mut held = Vec::new();
        for _ in 0..REQUEST_ID_COUNT {
            held.push(pool.acquire().await);
        }

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let released = held.pop().expect("held ids");
        pool.release(released);

        let reacquired = tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("waiter should be woken")
            .expect("waiter task should not panic");
        assert_eq!(reacquired, released);
    }

    #[tokio::test]
    async fn test_ids_are_reused() {
        let pool = RequestIdPool::new();
        let id = pool.acquire().await;
        pool.release(id);

        let again = pool.acquire().await;
        assert_eq!(again, id);
    }
}

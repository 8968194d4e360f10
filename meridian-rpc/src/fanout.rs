//! Concurrent broadcast fan-out to registered callbacks.
//!
//! A [`CallbackSet`] is the per-message-type registry behind the SDK's
//! subscription surface. Dispatching one inbound broadcast invokes every
//! currently registered callback concurrently and waits for all of them to
//! finish before returning control to the read loop, so broadcasts reach a
//! single callback in arrival order while no ordering holds between
//! callbacks of the same message.
//!
//! Registration returns an opaque [`CallbackToken`] used to deregister
//! exactly that callback; deregistering an unknown or already-removed token
//! is a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;

/// Opaque token identifying one registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackToken(u64);

/// Registry of callbacks for one broadcast message type.
pub struct CallbackSet<M> {
    callbacks: Mutex<HashMap<u64, Arc<dyn Fn(M) + Send + Sync>>>,
    next_token: AtomicU64,
}

impl<M> Default for CallbackSet<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> CallbackSet<M> {
    /// Create an empty callback set.
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Register a callback, returning the token that deregisters it.
    pub fn register(&self, callback: impl Fn(M) + Send + Sync + 'static) -> CallbackToken {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.callbacks
            .lock()
            .expect("callback registry lock poisoned")
            .insert(token, Arc::new(callback));
        CallbackToken(token)
    }

    /// Remove a previously registered callback. Unknown tokens are ignored.
    pub fn deregister(&self, token: CallbackToken) {
        self.callbacks
            .lock()
            .expect("callback registry lock poisoned")
            .remove(&token.0);
    }

    /// Number of currently registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks
            .lock()
            .expect("callback registry lock poisoned")
            .len()
    }

    /// Whether no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<M: Clone + Send + 'static> CallbackSet<M> {
    /// Deliver one message to every registered callback.
    ///
    /// Callbacks run concurrently on spawned tasks; this waits for all of
    /// them before returning.
    pub async fn dispatch(&self, message: M) {
        let snapshot: Vec<Arc<dyn Fn(M) + Send + Sync>> = self
            .callbacks
            .lock()
            .expect("callback registry lock poisoned")
            .values()
            .cloned()
            .collect();

        let mut tasks = JoinSet::new();
        for callback in snapshot {
            let message = message.clone();
            tasks.spawn(async move { callback(message) });
        }
        while tasks.join_next().await.is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    #[tokio::test]
    async fn test_dispatch_reaches_every_callback() {
        let set: CallbackSet<u32> = CallbackSet::new();
        let hits = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let hits = hits.clone();
            set.register(move |value| {
                hits.fetch_add(value, Ordering::SeqCst);
            });
        }

        set.dispatch(2).await;
        assert_eq!(hits.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_deregistered_callback_not_invoked() {
        let set: CallbackSet<u32> = CallbackSet::new();
        let hits = Arc::new(AtomicU32::new(0));

        let token = {
            let hits = hits.clone();
            set.register(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        set.deregister(token);

        set.dispatch(1).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_deregister_is_idempotent() {
        let set: CallbackSet<u32> = CallbackSet::new();
        let token = set.register(|_| {});

        set.deregister(token);
        set.deregister(token);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_with_no_callbacks() {
        let set: CallbackSet<String> = CallbackSet::new();
        set.dispatch("ignored".to_string()).await;
    }

    #[tokio::test]
    async fn test_same_callback_registered_twice_runs_twice() {
        let set: CallbackSet<u32> = CallbackSet::new();
        let hits = Arc::new(AtomicU32::new(0));

        let make = |hits: Arc<AtomicU32>| {
            move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        };
        let first = set.register(make(hits.clone()));
        let second = set.register(make(hits.clone()));
        assert_ne!(first, second);

        set.dispatch(0).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}

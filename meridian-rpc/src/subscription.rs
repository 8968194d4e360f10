//! Reference-counted subscriptions over subscribe/unsubscribe method pairs.
//!
//! Every subscribable Meridian service exposes a parameterless Subscribe and
//! Unsubscribe two-way method. A [`SubscriptionGroup`] converts M
//! independent local "I want these events" registrations into exactly one
//! outstanding remote subscription: the remote Subscribe is issued on the
//! 0→1 transition of open handles and Unsubscribe on the 1→0 transition,
//! regardless of how many local callbacks are registered underneath.
//!
//! Subscription state is owned by the group, not the individual caller:
//! whenever the underlying endpoint reconnects, [`SubscriptionGroup::handle_connected`]
//! re-issues the remote Subscribe so that server-side state is restored
//! without caller action. (Re-)establishment failures are logged, never
//! raised — the connection is assumed unhealthy and the next reconnect will
//! repair them.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;

use crate::endpoint::RpcError;

/// A service that can be subscribed to and unsubscribed from.
///
/// Implemented by the generated service clients whose remote service
/// exposes the default subscribe/unsubscribe contract. The group depends
/// only on the success or failure of these calls, not on their payloads.
#[async_trait]
pub trait Subscribable: Send + Sync + 'static {
    /// Full name of the remote service, for logging.
    fn service_name(&self) -> &str;

    /// Issue the remote Subscribe call.
    async fn subscribe(&self) -> Result<(), RpcError>;

    /// Issue the remote Unsubscribe call.
    async fn unsubscribe(&self) -> Result<(), RpcError>;
}

/// Reference-counted subscription to one subscribable service.
pub struct SubscriptionGroup {
    /// Bound after the service client is constructed; the group only
    /// touches it when handles are added, removed, or re-established.
    service: OnceLock<Arc<dyn Subscribable>>,
    open: Mutex<HashSet<u64>>,
    next_handle: AtomicU64,
    /// Whether the remote subscription should currently exist; consulted on
    /// reconnection to restore server-side state.
    should_subscribe: AtomicBool,
}

impl Default for SubscriptionGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionGroup {
    /// Create a group with no open handles.
    pub fn new() -> Self {
        Self {
            service: OnceLock::new(),
            open: Mutex::new(HashSet::new()),
            next_handle: AtomicU64::new(1),
            should_subscribe: AtomicBool::new(false),
        }
    }

    /// Bind the service client the group subscribes through.
    ///
    /// Must be called exactly once, before the first
    /// [`add_subscription`](Self::add_subscription).
    pub fn bind(&self, service: Arc<dyn Subscribable>) {
        if self.service.set(service).is_err() {
            panic!("subscription group is already bound to a service");
        }
    }

    /// Open a new subscription handle.
    ///
    /// If this is the first open handle, the remote Subscribe call is
    /// issued; a failure is logged rather than returned since the upcoming
    /// reconnect will re-subscribe. `cleanup` runs when the returned handle
    /// is closed.
    pub async fn add_subscription(
        self: Arc<Self>,
        cleanup: impl FnOnce() + Send + 'static,
    ) -> Subscription {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let first = {
            let mut open = self.open.lock().expect("subscription set lock poisoned");
            open.insert(handle);
            open.len() == 1
        };

        if first {
            self.should_subscribe.store(true, Ordering::Release);
            if let Some(service) = self.service.get() {
                if let Err(error) = service.subscribe().await {
                    tracing::warn!(
                        service = service.service_name(),
                        %error,
                        "failed to subscribe"
                    );
                }
            }
        }

        Subscription {
            group: Some(self),
            handle,
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// Re-issue the remote Subscribe call after a reconnection.
    ///
    /// No-op unless at least one handle is open. Runs on a spawned task so
    /// the connection callback never blocks the read loop.
    pub fn handle_connected(&self) {
        if !self.should_subscribe.load(Ordering::Acquire) {
            return;
        }
        let Some(service) = self.service.get().cloned() else {
            return;
        };

        tokio::spawn(async move {
            match service.subscribe().await {
                Ok(()) => {
                    tracing::debug!(
                        service = service.service_name(),
                        "automatically resubscribed"
                    );
                }
                Err(error) => {
                    tracing::error!(
                        service = service.service_name(),
                        %error,
                        "failed to resubscribe"
                    );
                }
            }
        });
    }

    /// Drop every open handle without issuing Unsubscribe.
    ///
    /// Used when the owning SDK shuts down: the connections are about to be
    /// closed, so remote state does not need an explicit teardown. Open
    /// [`Subscription`] handles become inert.
    pub fn clear(&self) {
        self.open
            .lock()
            .expect("subscription set lock poisoned")
            .clear();
        self.should_subscribe.store(false, Ordering::Release);
    }

    /// Number of currently open handles.
    pub fn open_count(&self) -> usize {
        self.open.lock().expect("subscription set lock poisoned").len()
    }

    async fn remove(&self, handle: u64) {
        let last = {
            let mut open = self.open.lock().expect("subscription set lock poisoned");
            open.remove(&handle) && open.is_empty()
        };
        if !last {
            return;
        }

        self.should_subscribe.store(false, Ordering::Release);
        if let Some(service) = self.service.get() {
            if let Err(error) = service.unsubscribe().await {
                tracing::warn!(
                    service = service.service_name(),
                    %error,
                    "failed to unsubscribe"
                );
            }
        }
    }
}

/// Handle to one local subscription.
///
/// Closing the handle removes it from its group and runs the caller's
/// cleanup; if it was the last open handle, the remote Unsubscribe call is
/// issued. A handle becomes inert after its first close.
pub struct Subscription {
    group: Option<Arc<SubscriptionGroup>>,
    handle: u64,
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Close the subscription. Idempotent.
    pub async fn close(&mut self) {
        let Some(group) = self.group.take() else {
            return;
        };
        group.remove(self.handle).await;
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .field("open", &self.group.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    struct CountingService {
        subscribes: AtomicU32,
        unsubscribes: AtomicU32,
        fail_subscribe: AtomicBool,
    }

    impl CountingService {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                subscribes: AtomicU32::new(0),
                unsubscribes: AtomicU32::new(0),
                fail_subscribe: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl Subscribable for CountingService {
        fn service_name(&self) -> &str {
            "meridian.TestService"
        }

        async fn subscribe(&self) -> Result<(), RpcError> {
            self.subscribes.fetch_add(1, Ordering::SeqCst);
            if self.fail_subscribe.load(Ordering::SeqCst) {
                return Err(RpcError::ConnectionClosed);
            }
            Ok(())
        }

        async fn unsubscribe(&self) -> Result<(), RpcError> {
            self.unsubscribes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn bound_group(service: &Arc<CountingService>) -> Arc<SubscriptionGroup> {
        let group = Arc::new(SubscriptionGroup::new());
        group.bind(service.clone());
        group
    }

    #[tokio::test]
    async fn test_three_handles_one_remote_subscription() {
        let service = CountingService::new();
        let group = bound_group(&service);

        let mut subs = Vec::new();
        for _ in 0..3 {
            subs.push(group.clone().add_subscription(|| {}).await);
        }
        assert_eq!(service.subscribes.load(Ordering::SeqCst), 1);
        assert_eq!(group.open_count(), 3);

        for sub in &mut subs {
            sub.close().await;
        }
        assert_eq!(service.subscribes.load(Ordering::SeqCst), 1);
        assert_eq!(service.unsubscribes.load(Ordering::SeqCst), 1);
        assert_eq!(group.open_count(), 0);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let service = CountingService::new();
        let group = bound_group(&service);

        let ran = Arc::new(AtomicU32::new(0));
        let cleanup_ran = ran.clone();
        let mut sub = group
            .clone()
            .add_subscription(move || {
                cleanup_ran.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        sub.close().await;
        sub.close().await;

        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(service.unsubscribes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interleaved_handles_keep_subscription_alive() {
        let service = CountingService::new();
        let group = bound_group(&service);

        let mut first = group.clone().add_subscription(|| {}).await;
        let mut second = group.clone().add_subscription(|| {}).await;

        first.close().await;
        assert_eq!(service.unsubscribes.load(Ordering::SeqCst), 0);

        second.close().await;
        assert_eq!(service.subscribes.load(Ordering::SeqCst), 1);
        assert_eq!(service.unsubscribes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscribe_failure_is_not_raised() {
        let service = CountingService::new();
        service.fail_subscribe.store(true, Ordering::SeqCst);
        let group = bound_group(&service);

        // The handle is open even though the remote call failed; the next
        // reconnect re-subscribes.
        let _sub = group.clone().add_subscription(|| {}).await;
        assert_eq!(group.open_count(), 1);
        assert_eq!(service.subscribes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handle_connected_resubscribes() {
        let service = CountingService::new();
        let group = bound_group(&service);

        let _sub = group.clone().add_subscription(|| {}).await;
        assert_eq!(service.subscribes.load(Ordering::SeqCst), 1);

        group.handle_connected();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(service.subscribes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_handle_connected_without_open_handles_is_noop() {
        let service = CountingService::new();
        let group = bound_group(&service);

        group.handle_connected();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(service.subscribes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cleared_group_makes_handles_inert() {
        let service = CountingService::new();
        let group = bound_group(&service);

        let mut sub = group.clone().add_subscription(|| {}).await;
        group.clear();
        sub.close().await;

        // clear() dropped the handle set, so closing must not unsubscribe.
        assert_eq!(service.unsubscribes.load(Ordering::SeqCst), 0);
    }
}

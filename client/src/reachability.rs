//! Network reachability monitor.
//!
//! Holds a single online/offline flag readable at any time and publishes a
//! [`Transition`] only when the flag actually flips. The monitor knows
//! nothing about queues or retries.

use crate::error::SyncError;
use crate::remote::RemoteClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A change in reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BecameOnline,
    BecameOffline,
}

impl Transition {
    fn to(online: bool) -> Self {
        if online {
            Transition::BecameOnline
        } else {
            Transition::BecameOffline
        }
    }
}

/// Shared reachability flag.
///
/// Clones observe and update the same flag.
#[derive(Debug, Clone)]
pub struct ReachabilityMonitor {
    state: Arc<watch::Sender<bool>>,
}

impl ReachabilityMonitor {
    /// Create a monitor starting in the given state.
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(online);
        Self {
            state: Arc::new(state),
        }
    }

    /// Current reachability.
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Report the transport's reachability.
    ///
    /// Returns the transition when the flag changed, `None` when it already
    /// held this value.
    pub fn set_online(&self, online: bool) -> Option<Transition> {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if !changed {
            return None;
        }

        tracing::info!(online, "Reachability changed");
        Some(Transition::to(online))
    }

    /// Listen for future transitions.
    pub fn subscribe(&self) -> ReachabilitySubscription {
        let mut rx = self.state.subscribe();
        let last = *rx.borrow_and_update();
        ReachabilitySubscription { rx, last }
    }
}

/// Receiver side of a [`ReachabilityMonitor`].
#[derive(Debug)]
pub struct ReachabilitySubscription {
    rx: watch::Receiver<bool>,
    last: bool,
}

impl ReachabilitySubscription {
    /// Wait for the next transition.
    ///
    /// Flips that cancel out before the subscriber wakes are not reported.
    /// Returns `None` once every monitor handle is gone.
    pub async fn next_transition(&mut self) -> Option<Transition> {
        loop {
            self.rx.changed().await.ok()?;
            let online = *self.rx.borrow_and_update();
            if online != self.last {
                self.last = online;
                return Some(Transition::to(online));
            }
        }
    }
}

/// Poll `path` every `interval` and feed the result into `monitor`.
///
/// Any HTTP answer, error statuses included, counts as reachable. Only
/// transport failures and timeouts count as offline.
pub fn spawn_probe<R>(
    monitor: ReachabilityMonitor,
    remote: R,
    path: impl Into<String>,
    interval: Duration,
) -> JoinHandle<()>
where
    R: RemoteClient + 'static,
{
    let path = path.into();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let online = match remote.check_reachable(&path).await {
                Ok(()) => true,
                Err(err) => !matches!(
                    err,
                    SyncError::NetworkUnreachable(_) | SyncError::Timeout(_)
                ),
            };
            tracing::trace!(path = %path, online, "Reachability probe");
            monitor.set_online(online);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::Value;
    use skul_sync_engine::OpMethod;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn reports_each_transition_once() {
        let monitor = ReachabilityMonitor::new(false);
        assert!(!monitor.is_online());

        assert_eq!(monitor.set_online(true), Some(Transition::BecameOnline));
        assert_eq!(monitor.set_online(true), None);
        assert!(monitor.is_online());

        assert_eq!(monitor.set_online(false), Some(Transition::BecameOffline));
        assert_eq!(monitor.set_online(false), None);
    }

    #[test]
    fn clones_share_state() {
        let monitor = ReachabilityMonitor::new(true);
        let other = monitor.clone();
        other.set_online(false);
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn subscription_sees_transitions() {
        let monitor = ReachabilityMonitor::new(false);
        let mut subscription = monitor.subscribe();

        monitor.set_online(true);
        assert_eq!(
            subscription.next_transition().await,
            Some(Transition::BecameOnline)
        );

        monitor.set_online(false);
        assert_eq!(
            subscription.next_transition().await,
            Some(Transition::BecameOffline)
        );
    }

    #[tokio::test]
    async fn subscription_ends_with_monitor() {
        let monitor = ReachabilityMonitor::new(false);
        let mut subscription = monitor.subscribe();
        drop(monitor);
        assert_eq!(subscription.next_transition().await, None);
    }

    struct Flaky {
        up: AtomicBool,
    }

    #[async_trait]
    impl RemoteClient for Flaky {
        async fn fetch(&self, _path: &str) -> Result<Value> {
            if self.up.load(Ordering::SeqCst) {
                Ok(Value::Null)
            } else {
                Err(SyncError::NetworkUnreachable("connection refused".into()))
            }
        }

        async fn submit(&self, _: OpMethod, _: &str, _: &Value, _: &str) -> Result<Value> {
            Ok(Value::Null)
        }

        fn clear_credentials(&self) {}
    }

    struct Locked;

    #[async_trait]
    impl RemoteClient for Locked {
        async fn fetch(&self, _path: &str) -> Result<Value> {
            Err(SyncError::AuthExpired)
        }

        async fn submit(&self, _: OpMethod, _: &str, _: &Value, _: &str) -> Result<Value> {
            Ok(Value::Null)
        }

        fn clear_credentials(&self) {}
    }

    #[tokio::test]
    async fn rejected_request_still_counts_as_reachable() {
        assert!(Locked.check_reachable("/health").await.is_ok());
        assert!(Flaky { up: AtomicBool::new(false) }
            .check_reachable("/health")
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn probe_follows_the_transport() {
        let remote = Arc::new(Flaky {
            up: AtomicBool::new(false),
        });
        let monitor = ReachabilityMonitor::new(true);
        let mut subscription = monitor.subscribe();

        let probe = spawn_probe(
            monitor.clone(),
            remote.clone(),
            "/health",
            Duration::from_secs(15),
        );

        assert_eq!(
            subscription.next_transition().await,
            Some(Transition::BecameOffline)
        );

        remote.up.store(true, Ordering::SeqCst);
        assert_eq!(
            subscription.next_transition().await,
            Some(Transition::BecameOnline)
        );

        probe.abort();
    }
}

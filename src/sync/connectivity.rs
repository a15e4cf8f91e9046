use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

impl Connectivity {
    pub fn from_online(online: bool) -> Self {
        if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }

    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connectivity::Online => write!(f, "online"),
            Connectivity::Offline => write!(f, "offline"),
        }
    }
}

/// Platform connectivity signal: a current value plus pushed transition
/// events.
#[derive(Debug, Clone)]
pub struct ConnectivitySignal {
    online: Arc<AtomicBool>,
    events: broadcast::Sender<Connectivity>,
}

impl ConnectivitySignal {
    pub fn new(initial: Connectivity) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            online: Arc::new(AtomicBool::new(initial.is_online())),
            events,
        }
    }

    pub fn current(&self) -> Connectivity {
        Connectivity::from_online(self.online.load(Ordering::SeqCst))
    }

    /// Record a platform transition and notify every subscriber.
    pub fn set(&self, state: Connectivity) {
        self.online.store(state.is_online(), Ordering::SeqCst);
        // No subscribers is fine.
        let _ = self.events.send(state);
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            events: self.events.subscribe(),
        }
    }
}

/// Live registration for transition events. Dropping it unsubscribes.
pub struct Subscription {
    events: broadcast::Receiver<Connectivity>,
}

impl Subscription {
    /// Wait for the next transition event. `None` once the signal is gone.
    pub async fn next(&mut self) -> Option<Connectivity> {
        loop {
            match self.events.recv().await {
                Ok(state) => return Some(state),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Connectivity events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Two-state machine tracking Online/Offline.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    signal: ConnectivitySignal,
    state: Connectivity,
}

impl ConnectivityMonitor {
    /// Seeded from the signal's current value.
    pub fn new(signal: ConnectivitySignal) -> Self {
        let state = signal.current();
        Self { signal, state }
    }

    pub fn state(&self) -> Connectivity {
        self.state
    }

    pub fn signal(&self) -> &ConnectivitySignal {
        &self.signal
    }

    /// Apply a transition event. The payload is ignored in favour of the
    /// signal's current value, which may have moved on since the event fired.
    pub fn on_event(&mut self) -> Connectivity {
        let previous = self.state;
        self.state = self.signal.current();
        tracing::info!(from = %previous, to = %self.state, "Connectivity changed");
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_seeded_from_signal() {
        let monitor = ConnectivityMonitor::new(ConnectivitySignal::new(Connectivity::Offline));
        assert_eq!(monitor.state(), Connectivity::Offline);
    }

    #[test]
    fn test_event_rereads_signal() {
        let signal = ConnectivitySignal::new(Connectivity::Online);
        let mut monitor = ConnectivityMonitor::new(signal.clone());

        signal.set(Connectivity::Offline);
        signal.set(Connectivity::Online);

        // Handling the stale "offline" event still lands on the current value.
        assert_eq!(monitor.on_event(), Connectivity::Online);
    }

    #[tokio::test]
    async fn test_subscription_sees_every_event() {
        let signal = ConnectivitySignal::new(Connectivity::Online);
        let mut sub = signal.subscribe();

        signal.set(Connectivity::Offline);
        signal.set(Connectivity::Online);
        signal.set(Connectivity::Offline);

        assert_eq!(sub.next().await, Some(Connectivity::Offline));
        assert_eq!(sub.next().await, Some(Connectivity::Online));
        assert_eq!(sub.next().await, Some(Connectivity::Offline));
    }

    #[tokio::test]
    async fn test_subscription_ends_with_signal() {
        let signal = ConnectivitySignal::new(Connectivity::Online);
        let mut sub = signal.subscribe();
        drop(signal);
        assert_eq!(sub.next().await, None);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Connectivity::Offline).unwrap(), "\"offline\"");
    }
}

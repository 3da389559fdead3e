use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::info;

const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityEvent {
    BecameReachable,
    BecameUnreachable,
}

/// Tracks whether the remote authority is reachable.
///
/// The flag is fed by whatever checks the network; this type only records it
/// and fans out transitions. Nothing here triggers a sync pass on its own.
pub struct ConnectivityObserver {
    state: watch::Sender<bool>,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl ConnectivityObserver {
    pub fn new(initially_reachable: bool) -> Self {
        let (state, _) = watch::channel(initially_reachable);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { state, events }
    }

    pub fn is_reachable(&self) -> bool {
        *self.state.borrow()
    }

    /// Records the latest connectivity check result. Returns the emitted event when the
    /// reachability actually changed.
    pub fn set_reachable(&self, reachable: bool) -> Option<ConnectivityEvent> {
        let changed = self.state.send_if_modified(|current| {
            if *current == reachable {
                false
            } else {
                *current = reachable;
                true
            }
        });

        if !changed {
            return None;
        }

        let event = if reachable {
            ConnectivityEvent::BecameReachable
        } else {
            ConnectivityEvent::BecameUnreachable
        };
        info!(?event, "Connectivity changed");
        // no subscribers is fine
        let _ = self.events.send(event);
        Some(event)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl Default for ConnectivityObserver {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emits_only_on_transitions() {
        let observer = ConnectivityObserver::new(true);
        let mut rx = observer.subscribe();

        assert_eq!(observer.set_reachable(true), None);
        assert_eq!(
            observer.set_reachable(false),
            Some(ConnectivityEvent::BecameUnreachable)
        );
        assert_eq!(observer.set_reachable(false), None);
        assert_eq!(
            observer.set_reachable(true),
            Some(ConnectivityEvent::BecameReachable)
        );

        assert_eq!(rx.recv().await.unwrap(), ConnectivityEvent::BecameUnreachable);
        assert_eq!(rx.recv().await.unwrap(), ConnectivityEvent::BecameReachable);
        assert!(rx.try_recv().is_err());
        assert!(observer.is_reachable());
    }

    #[tokio::test]
    async fn watch_reflects_current_state() {
        let observer = ConnectivityObserver::new(false);
        let mut state = observer.watch();
        assert!(!*state.borrow());

        observer.set_reachable(true);
        state.changed().await.unwrap();
        assert!(*state.borrow_and_update());
    }
}

use tokio::sync::watch;

use crate::status::StatusSnapshot;

/// The two most recent snapshots, replaced together on every update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusHistory {
    pub current: Option<StatusSnapshot>,
    pub previous: Option<StatusSnapshot>,
}

pub type StatusReceiver = watch::Receiver<StatusHistory>;

/// Holds the latest decoded drone status.
///
/// There is a single writer (the telemetry listener); readers always get a
/// copy, never a live reference, so a half-updated pair cannot be observed.
#[derive(Debug)]
pub struct StatusStore {
    tx: watch::Sender<StatusHistory>,
}

impl StatusStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusHistory::default());
        Self { tx }
    }

    pub fn update(&self, snapshot: StatusSnapshot) {
        self.tx.send_modify(|history| {
            history.previous = history.current.replace(snapshot);
        });
    }

    pub fn current(&self) -> Option<StatusSnapshot> {
        self.tx.borrow().current.clone()
    }

    pub fn previous(&self) -> Option<StatusSnapshot> {
        self.tx.borrow().previous.clone()
    }

    pub fn history(&self) -> StatusHistory {
        self.tx.borrow().clone()
    }

    /// Returns a receiver notified on every update.
    pub fn subscribe(&self) -> StatusReceiver {
        self.tx.subscribe()
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(bat: u8) -> StatusSnapshot {
        StatusSnapshot { bat, ..Default::default() }
    }

    #[test]
    fn test_starts_empty() {
        let store = StatusStore::new();
        assert_eq!(store.current(), None);
        assert_eq!(store.previous(), None);
    }

    #[test]
    fn test_update_shifts_current_to_previous() {
        let store = StatusStore::new();

        store.update(snapshot(90));
        assert_eq!(store.current(), Some(snapshot(90)));
        assert_eq!(store.previous(), None);

        store.update(snapshot(89));
        let history = store.history();
        assert_eq!(history.previous, Some(snapshot(90)));
        assert_eq!(history.current, Some(snapshot(89)));
        assert_ne!(history.previous, history.current);
    }

    #[test]
    fn test_identical_snapshots_in_a_row() {
        let store = StatusStore::new();
        store.update(snapshot(50));
        store.update(snapshot(50));
        assert_eq!(store.previous(), store.current());
    }

    #[tokio::test]
    async fn test_subscriber_sees_update() {
        let store = StatusStore::new();
        let mut rx = store.subscribe();

        store.update(snapshot(42));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().current.as_ref().map(|s| s.bat), Some(42));
    }
}

//! Snapshot fan-out: single writer, many readers, latest value wins.
//!
//! Thin wrapper over tokio's `watch` channel. A new subscriber sees the
//! current state immediately (no history replay), and every subscriber
//! eventually sees the newest published state; intermediate states a slow
//! subscriber missed are conflated away. Publishing never blocks on
//! subscribers.

use tokio::sync::watch;

use crate::model::Snapshot;

/// Published inventory state, as a consumer should render it.
#[derive(Debug, Clone)]
pub enum InventoryState {
    /// Initial enumeration has not completed yet.
    Loading,
    /// Last enumeration succeeded; the snapshot is current.
    Ready(Snapshot),
    /// Last enumeration failed as a whole; the consumer may retry `load_all`.
    LoadFailed(String),
}

impl InventoryState {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            InventoryState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Writer half, owned by the registry. Keeps the latest state alive even
/// while no subscriber exists.
#[derive(Debug)]
pub struct StateChannel {
    tx: watch::Sender<InventoryState>,
}

impl StateChannel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(InventoryState::Loading);
        Self { tx }
    }

    /// Replace the current state and wake all subscribers.
    pub fn publish(&self, state: InventoryState) {
        self.tx.send_replace(state);
    }

    /// Read-modify-write on the current state, atomic with respect to other
    /// publishers. `f` returns whether it changed anything; subscribers are
    /// only woken when it did.
    pub fn modify<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut InventoryState) -> bool,
    {
        self.tx.send_if_modified(f)
    }

    pub fn current(&self) -> InventoryState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> StateSubscription {
        StateSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for StateChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of the channel. Independent of all other
/// subscriptions; dropping it never affects the writer.
#[derive(Debug, Clone)]
pub struct StateSubscription {
    rx: watch::Receiver<InventoryState>,
}

impl StateSubscription {
    /// Latest published state, without waiting and without consuming the
    /// pending-change marker.
    pub fn current(&self) -> InventoryState {
        self.rx.borrow().clone()
    }

    /// Wait for a state newer than the last one this subscription observed.
    /// Returns `None` once the writer is gone.
    pub async fn next(&mut self) -> Option<InventoryState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until `pred` holds, checking the current state first.
    /// Returns `None` once the writer is gone.
    pub async fn wait_for<F>(&mut self, pred: F) -> Option<InventoryState>
    where
        F: FnMut(&InventoryState) -> bool,
    {
        self.rx.wait_for(pred).await.ok().map(|state| (*state).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppRecord, Snapshot};
    use std::time::Duration;

    fn ready(ids: &[&str]) -> InventoryState {
        InventoryState::Ready(Snapshot::from_records(ids.iter().map(|id| AppRecord {
            package_id: (*id).to_owned(),
            display_name: (*id).to_owned(),
            version_name: "1.0".to_owned(),
            checksum: None,
        })))
    }

    fn ids_of(state: &InventoryState) -> Vec<String> {
        let mut ids: Vec<String> = state
            .snapshot()
            .map(|s| s.iter().map(|r| r.package_id.clone()).collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn new_subscriber_sees_latest_state_only() {
        let channel = StateChannel::new();
        channel.publish(ready(&["a"]));
        channel.publish(ready(&["a", "b"]));

        let sub = channel.subscribe();
        assert_eq!(ids_of(&sub.current()), ["a", "b"]);
    }

    #[tokio::test]
    async fn slow_subscriber_conflates_to_newest() {
        let channel = StateChannel::new();
        let mut sub = channel.subscribe();

        channel.publish(ready(&["a"]));
        channel.publish(ready(&["a", "b"]));
        channel.publish(ready(&["a", "b", "c"]));

        // Only the newest state is observable; the intermediates are gone.
        let seen = sub.next().await.unwrap();
        assert_eq!(ids_of(&seen), ["a", "b", "c"]);

        let pending = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(pending.is_err(), "no further state should be pending");
    }

    #[tokio::test]
    async fn fan_out_reaches_every_subscriber() {
        let channel = StateChannel::new();
        let mut one = channel.subscribe();
        let mut two = channel.subscribe();

        channel.publish(ready(&["a"]));
        assert_eq!(ids_of(&one.next().await.unwrap()), ["a"]);
        assert_eq!(ids_of(&two.next().await.unwrap()), ["a"]);
    }

    #[tokio::test]
    async fn modify_without_change_does_not_wake_subscribers() {
        let channel = StateChannel::new();
        let mut sub = channel.subscribe();

        assert!(!channel.modify(|_| false));
        let pending = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(pending.is_err(), "unchanged state must not wake subscribers");
    }

    #[tokio::test]
    async fn wait_for_sees_current_state_first() {
        let channel = StateChannel::new();
        channel.publish(ready(&["a"]));

        let mut sub = channel.subscribe();
        let state = sub
            .wait_for(|s| s.snapshot().is_some())
            .await
            .expect("writer alive");
        assert_eq!(ids_of(&state), ["a"]);
    }
}

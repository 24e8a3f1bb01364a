//! Per-user fan-out of notification payloads to open sockets.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;

pub fn group_name(user_id: u64) -> String { format!("notifications.user.{user_id}") }

/// Cloning shares the groups.
#[derive(Debug, Clone, Default)]
pub struct NotificationHub {
    groups: Arc<RwLock<HashMap<u64, broadcast::Sender<String>>>>,
}

impl NotificationHub {
    pub fn new() -> Self { Self::default() }

    pub fn subscribe(&self, user_id: u64) -> broadcast::Receiver<String> {
        let mut groups = self.groups.write();
        let tx = groups.entry(user_id).or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        debug!(target: "notify", group = %group_name(user_id), "subscribe");
        tx.subscribe()
    }

    /// Subscription that prunes the group when dropped, whether or not a socket ever used it.
    pub fn open(&self, user_id: u64) -> Subscription {
        Subscription { rx: Some(self.subscribe(user_id)), hub: self.clone(), user_id }
    }

    /// Push one JSON payload to every socket of the user. False for user 0 or when nobody listens.
    pub fn broadcast_user_notification(&self, user_id: u64, payload: &serde_json::Value) -> bool {
        if user_id == 0 { return false; }
        let groups = self.groups.read();
        let Some(tx) = groups.get(&user_id) else { return false; };
        match tx.send(payload.to_string()) {
            Ok(n) => {
                debug!(target: "notify", group = %group_name(user_id), receivers = n, "broadcast");
                true
            }
            Err(_) => false,
        }
    }

    pub fn subscriber_count(&self, user_id: u64) -> usize {
        self.groups.read().get(&user_id).map(|tx| tx.receiver_count()).unwrap_or(0)
    }

    /// Drop the group once its last socket is gone.
    pub fn prune(&self, user_id: u64) {
        let mut groups = self.groups.write();
        if groups.get(&user_id).is_some_and(|tx| tx.receiver_count() == 0) {
            groups.remove(&user_id);
        }
    }
}

pub struct Subscription {
    rx: Option<broadcast::Receiver<String>>,
    hub: NotificationHub,
    user_id: u64,
}

impl Subscription {
    pub fn user_id(&self) -> u64 { self.user_id }

    pub async fn recv(&mut self) -> Result<String, broadcast::error::RecvError> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => Err(broadcast::error::RecvError::Closed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // the receiver must be gone before prune counts receivers
        drop(self.rx.take());
        self.hub.prune(self.user_id);
    }
}

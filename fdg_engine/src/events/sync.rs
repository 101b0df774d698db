//! Real-time synchronisation of order state to viewers.
//!
//! A viewer subscribes with a [`SyncScope`] and receives a [`ChangeNotification`] for every committed change that falls
//! inside that scope. Notifications carry no payload beyond the affected order id: the subscriber re-fetches the
//! authoritative record.
//!
//! Delivery guarantees:
//! * Notifications for a single order arrive in commit order. Writers publish while still holding the order's lock.
//! * Duplicates are possible (e.g. a status change followed by a rider-code write both produce `update`), so consumers
//!   must treat a notification as "something may have changed".
//! * There is no ordering between different orders.
//!
//! Each subscription has its own lifecycle. A consumer may hold any number of them. Dropping a [`Subscription`] (or
//! calling [`Subscription::unsubscribe`]) removes it from the hub.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, Weak},
};

use log::*;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::db_types::{Order, OrderId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncScope {
    Order(OrderId),
    Customer(String),
    AllOrders,
}

impl SyncScope {
    pub fn matches(&self, note: &ChangeNotification) -> bool {
        match self {
            SyncScope::Order(id) => *id == note.order_id,
            SyncScope::Customer(cid) => *cid == note.customer_id,
            SyncScope::AllOrders => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub kind: ChangeKind,
    pub order_id: OrderId,
    /// Used for routing only. Not sent to clients.
    #[serde(skip)]
    pub customer_id: String,
}

impl ChangeNotification {
    pub fn new(kind: ChangeKind, order: &Order) -> Self {
        Self { kind, order_id: order.order_id.clone(), customer_id: order.customer_id.clone() }
    }
}

struct Subscriber {
    scope: SyncScope,
    sender: UnboundedSender<ChangeNotification>,
}

#[derive(Default)]
struct HubState {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber>,
}

#[derive(Clone, Default)]
pub struct SyncHub {
    state: Arc<Mutex<HubState>>,
}

impl SyncHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, scope: SyncScope) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let id = state.next_id;
        state.next_id += 1;
        debug!("📬️ New subscription #{id} for {scope:?}");
        state.subscribers.insert(id, Subscriber { scope, sender });
        Subscription { receiver, handle: Unsubscribe { id, hub: Arc::downgrade(&self.state) } }
    }

    /// Fans the notification out to every subscriber whose scope matches. Subscribers whose receiving end has gone away
    /// are pruned.
    pub fn publish(&self, note: ChangeNotification) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut closed = Vec::new();
        let mut delivered = 0usize;
        for (id, sub) in state.subscribers.iter().filter(|(_, s)| s.scope.matches(&note)) {
            if sub.sender.send(note.clone()).is_err() {
                closed.push(*id);
            } else {
                delivered += 1;
            }
        }
        for id in closed {
            trace!("📬️ Pruning closed subscription #{id}");
            state.subscribers.remove(&id);
        }
        trace!("📬️ {:?} notification for {} delivered to {delivered} subscribers", note.kind, note.order_id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).subscribers.len()
    }
}

/// A live subscription. Notifications are received with [`Subscription::recv`].
pub struct Subscription {
    receiver: UnboundedReceiver<ChangeNotification>,
    handle: Unsubscribe,
}

impl Subscription {
    /// Waits for the next notification. Returns `None` once the hub has gone away.
    pub async fn recv(&mut self) -> Option<ChangeNotification> {
        self.receiver.recv().await
    }

    /// Returns a notification if one is waiting, without blocking.
    pub fn try_recv(&mut self) -> Option<ChangeNotification> {
        self.receiver.try_recv().ok()
    }

    /// Splits the subscription into its channel and the handle that ends it.
    pub fn into_parts(self) -> (UnboundedReceiver<ChangeNotification>, Unsubscribe) {
        (self.receiver, self.handle)
    }

    pub fn unsubscribe(self) {
        self.handle.unsubscribe();
    }
}

/// Ends a subscription when called, or when dropped.
pub struct Unsubscribe {
    id: u64,
    hub: Weak<Mutex<HubState>>,
}

impl Unsubscribe {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        if let Some(state) = self.hub.upgrade() {
            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
            if state.subscribers.remove(&self.id).is_some() {
                debug!("📬️ Subscription #{} ended", self.id);
            }
        }
    }
}

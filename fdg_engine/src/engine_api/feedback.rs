//! Post-delivery feedback.
//!
//! A [`FeedbackTrigger`] belongs to one viewing session. It remembers the last status it saw and fires once, the first
//! time the order is seen as `delivered` without a rating. An [`OrderViewSession`] ties a trigger to a live
//! subscription on one order.
use std::{collections::VecDeque, sync::Arc};

use log::*;

use crate::{
    db_types::{Feedback, Order, OrderId, OrderStatusType},
    engine_api::{errors::OrderFlowError, order_flow_api::OrderFlowApi, order_objects::Actor},
    events::{ChangeKind, ChangeNotification, FeedbackRequestedEvent, Subscription, SyncScope},
    traits::DeliveryDatabase,
};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Default)]
pub struct FeedbackTrigger {
    last_status: Option<OrderStatusType>,
    fired: bool,
}

impl FeedbackTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an observation of `order`. Returns true if feedback should be requested now.
    pub fn observe(&mut self, order: &Order) -> bool {
        let previous = self.last_status.replace(order.status);
        if self.fired {
            return false;
        }
        let fire = order.status == OrderStatusType::Delivered &&
            previous != Some(OrderStatusType::Delivered) &&
            order.feedback_rating.is_none();
        self.fired = fire;
        fire
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

impl<B> OrderFlowApi<B>
where B: DeliveryDatabase
{
    /// Re-reads the order for a viewing session and feeds it to the session's trigger. If the trigger fires, the
    /// `on_feedback_requested` hook is called.
    ///
    /// Returns the fresh order and whether feedback was requested.
    pub async fn observe_for_feedback(
        &self,
        order_id: &OrderId,
        actor: &Actor,
        trigger: &mut FeedbackTrigger,
    ) -> Result<(Order, bool), OrderFlowError> {
        let order = self.fetch_visible_order(order_id, actor).await?;
        let fire = trigger.observe(&order);
        if fire {
            debug!("🔄️⭐️ Requesting feedback for [{order_id}]");
            for emitter in &self.producers.feedback_requested_producer {
                emitter.publish_event(FeedbackRequestedEvent::new(order.clone())).await;
            }
        }
        Ok((order, fire))
    }

    /// Records the customer's rating for a delivered order. Allowed once, and only for the customer who placed it.
    pub async fn submit_feedback(
        &self,
        order_id: &OrderId,
        actor: &Actor,
        feedback: Feedback,
    ) -> Result<Order, OrderFlowError> {
        if !(MIN_RATING..=MAX_RATING).contains(&feedback.rating) {
            return Err(OrderFlowError::FeedbackRejected(format!(
                "Ratings must be between {MIN_RATING} and {MAX_RATING}."
            )));
        }
        let Actor::Customer(_) = actor else {
            return Err(OrderFlowError::FeedbackRejected("Only the customer can leave feedback.".into()));
        };
        let _guard = self.locks.lock(order_id).await;
        let order = self.fetch_visible_order(order_id, actor).await?;
        if order.status != OrderStatusType::Delivered {
            return Err(OrderFlowError::FeedbackRejected(format!("The order is {}, not delivered.", order.status)));
        }
        if order.feedback_rating.is_some() {
            return Err(OrderFlowError::FeedbackRejected("Feedback has already been submitted.".into()));
        }
        let updated = self
            .db
            .save_feedback(order_id, &feedback)
            .await?
            .ok_or_else(|| OrderFlowError::FeedbackRejected("Feedback has already been submitted.".into()))?;
        info!("🔄️⭐️ Order [{order_id}] rated {}/{MAX_RATING}", feedback.rating);
        self.notify(ChangeKind::Update, &updated);
        Ok(updated)
    }
}

/// Something a viewer of a single order should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderViewEvent {
    Changed(ChangeNotification),
    FeedbackRequested(OrderId),
}

/// A live view of one order: a subscription plus the session's feedback trigger.
pub struct OrderViewSession<B> {
    api: Arc<OrderFlowApi<B>>,
    order_id: OrderId,
    actor: Actor,
    subscription: Subscription,
    trigger: FeedbackTrigger,
    pending: VecDeque<OrderViewEvent>,
}

impl<B> OrderViewSession<B>
where B: DeliveryDatabase
{
    /// Opens a session. The subscription is registered before the initial read, so no change can slip between them.
    pub async fn open(api: Arc<OrderFlowApi<B>>, order_id: OrderId, actor: Actor) -> Result<Self, OrderFlowError> {
        let subscription = api.sync_hub().subscribe(SyncScope::Order(order_id.clone()));
        let mut trigger = FeedbackTrigger::new();
        let (_, fire) = api.observe_for_feedback(&order_id, &actor, &mut trigger).await?;
        let mut pending = VecDeque::new();
        if fire {
            pending.push_back(OrderViewEvent::FeedbackRequested(order_id.clone()));
        }
        Ok(Self { api, order_id, actor, subscription, trigger, pending })
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Waits for the next event. Returns `None` when the subscription ends.
    ///
    /// Each change notification is followed by a re-read of the order. A failed re-read is logged and the session carries
    /// on with its last known state.
    pub async fn next_event(&mut self) -> Option<OrderViewEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        let note = self.subscription.recv().await?;
        match self.api.observe_for_feedback(&self.order_id, &self.actor, &mut self.trigger).await {
            Ok((_, true)) => self.pending.push_back(OrderViewEvent::FeedbackRequested(self.order_id.clone())),
            Ok((_, false)) => {},
            Err(e) => warn!("🔄️⭐️ Could not refresh [{}] for its viewer. {e}", self.order_id),
        }
        Some(OrderViewEvent::Changed(note))
    }

    pub fn close(self) {
        self.subscription.unsubscribe();
    }
}

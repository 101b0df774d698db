use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: Order,
}

impl OrderPlacedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
    pub new_status: OrderStatusType,
    pub warning: Option<String>,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType, warning: Option<String>) -> Self {
        let new_status = order.status;
        Self { order, old_status, new_status, warning }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Fired the first time a viewing session sees its order become `delivered` without a rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequestedEvent {
    pub order: Order,
}

impl FeedbackRequestedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderPlaced(OrderPlacedEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
    OrderPaid(OrderPaidEvent),
    FeedbackRequested(FeedbackRequestedEvent),
}

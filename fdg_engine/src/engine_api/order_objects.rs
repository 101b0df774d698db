use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderId, OrderItem, OrderStatusType, PaymentMethod},
    engine_api::state_machine::Transition,
};

/// Who is asking. Authentication happens upstream, so the engine only distinguishes customers from operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Customer(String),
    Operator,
}

impl Actor {
    pub fn customer<S: Into<String>>(id: S) -> Self {
        Self::Customer(id.into())
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Actor::Operator)
    }

    /// Operators can see every order. Customers can only see their own.
    pub fn can_view(&self, order: &Order) -> bool {
        match self {
            Actor::Operator => true,
            Actor::Customer(id) => *id == order.customer_id,
        }
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Customer(id) => write!(f, "customer {id}"),
            Actor::Operator => write!(f, "operator"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub customer_id: Option<String>,
    /// Matches any of the given statuses. Empty means any status.
    #[serde(default)]
    pub statuses: Vec<OrderStatusType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_customer_id<S: Into<String>>(mut self, customer_id: S) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        if !self.statuses.contains(&status) {
            self.statuses.push(status);
        }
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() && self.statuses.is_empty() && self.since.is_none() && self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(cid) = &self.customer_id {
            write!(f, "customer_id: {cid}. ")?;
        }
        if !self.statuses.is_empty() {
            let statuses = self.statuses.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(",");
            write!(f, "statuses: {statuses}. ")?;
        }
        if let Some(since) = self.since {
            write!(f, "since: {since}. ")?;
        }
        if let Some(until) = self.until {
            write!(f, "until: {until}. ")?;
        }
        Ok(())
    }
}

/// The customer-supplied part of a new order. Pricing and delivery fields are derived by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    pub selected_branch_id: String,
    pub address: String,
    #[serde(default)]
    pub apartment_flat: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    /// A soft warning to show the customer, e.g. when an estimated delivery fee was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub order_id: OrderId,
    pub transition: Transition,
    pub actor: Actor,
    /// The status the client last observed, used to recognise duplicate submissions.
    pub expected_status: Option<OrderStatusType>,
}

impl TransitionRequest {
    pub fn new(order_id: OrderId, transition: Transition, actor: Actor) -> Self {
        Self { order_id, transition, actor, expected_status: None }
    }

    pub fn observed(mut self, status: OrderStatusType) -> Self {
        self.expected_status = Some(status);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub order: Order,
    /// False when the request was a duplicate of a transition that had already been applied.
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

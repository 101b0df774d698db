//! The order state machine.
//!
//! ```text
//!   pending ──► confirmed ──► preparing ──► out_for_delivery ──► delivered
//!      │            │             │
//!      └────────────┴─────────────┴──► cancelled
//! ```
//!
//! Forward moves are reserved for operators. Cancellation is open to the order's customer and to operators while the
//! order is still `pending`, `confirmed` or `preparing`, and is refused once the online payment has cleared. Leaving
//! `preparing` carries a non-blocking warning.
//!
//! [`evaluate`] is pure. It decides whether a requested transition should be written, is a duplicate of one that has
//! already been applied, or must be refused. The write itself is done by the order flow API.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderStatusType},
    engine_api::{errors::OrderFlowError, order_objects::Actor},
};

pub const PREPARING_CANCEL_WARNING: &str = "order may already be in preparation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Confirm,
    Prepare,
    Dispatch,
    Deliver,
    Cancel,
}

impl Transition {
    /// The status an order ends up in once this transition is applied.
    pub fn target(&self) -> OrderStatusType {
        match self {
            Transition::Confirm => OrderStatusType::Confirmed,
            Transition::Prepare => OrderStatusType::Preparing,
            Transition::Dispatch => OrderStatusType::OutForDelivery,
            Transition::Deliver => OrderStatusType::Delivered,
            Transition::Cancel => OrderStatusType::Cancelled,
        }
    }

    pub fn is_forward(&self) -> bool {
        !matches!(self, Transition::Cancel)
    }

    /// True if this transition may legally be applied to an order in `status`, ignoring who is asking.
    pub fn is_legal_from(&self, status: OrderStatusType) -> bool {
        match self {
            Transition::Cancel => status.is_cancellable(),
            t => status.successor() == Some(t.target()),
        }
    }
}

impl Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Transition::Confirm => "confirm",
            Transition::Prepare => "prepare",
            Transition::Dispatch => "dispatch",
            Transition::Deliver => "deliver",
            Transition::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: OrderStatusType,
    pub to: OrderStatusType,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Write `plan.to`, on condition that the status is still `plan.from`.
    Apply(TransitionPlan),
    /// The order is already in the target state and the request is a duplicate. Nothing to do.
    AlreadyApplied,
}

/// Decides what to do with a transition request against the current state of `order`.
///
/// `observed` is the status the client saw when it issued the request. A request whose target state has already been
/// reached is treated as a duplicate only if the client observed a state from which the transition was legal.
/// Visibility of the order to `actor` is assumed to have been checked already.
pub fn evaluate(
    order: &Order,
    transition: Transition,
    actor: &Actor,
    observed: Option<OrderStatusType>,
) -> Result<Evaluation, OrderFlowError> {
    let order_id = &order.order_id;
    if transition.is_forward() && !actor.is_operator() {
        return Err(OrderFlowError::TransitionNotPermitted { order_id: order_id.clone(), transition });
    }
    let target = transition.target();
    if order.status == target {
        return match observed {
            Some(seen) if seen != target && transition.is_legal_from(seen) => Ok(Evaluation::AlreadyApplied),
            _ => Err(OrderFlowError::invalid_transition(order_id, transition, format!("The order is already {target}."))),
        };
    }
    if !transition.is_legal_from(order.status) {
        let reason = format!("The order is {}.", order.status);
        return Err(OrderFlowError::invalid_transition(order_id, transition, reason));
    }
    let mut warning = None;
    if transition == Transition::Cancel {
        if order.paid {
            let reason = "The order has already been paid for online. Please contact support to arrange a refund.";
            return Err(OrderFlowError::invalid_transition(order_id, transition, reason));
        }
        if order.status == OrderStatusType::Preparing {
            warning = Some(PREPARING_CANCEL_WARNING.to_string());
        }
    }
    Ok(Evaluation::Apply(TransitionPlan { from: order.status, to: target, warning }))
}

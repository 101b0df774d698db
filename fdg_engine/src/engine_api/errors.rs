use thiserror::Error;

use crate::{db_types::OrderId, engine_api::state_machine::Transition};

/// Errors raised by the order lifecycle and delivery economics flows.
///
/// None of these errors are destructive: whenever one is returned, the persisted order is unchanged.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Could not resolve the delivery distance: {0}")]
    DistanceResolutionFailed(String),
    #[error("Delivery unavailable. {0}")]
    DeliveryUnavailable(String),
    #[error("Could not {transition} order {order_id}. {reason}")]
    InvalidTransition { order_id: OrderId, transition: Transition, reason: String },
    #[error("Only an operator may {transition} order {order_id}")]
    TransitionNotPermitted { order_id: OrderId, transition: Transition },
    #[error("Payment failed. {0}")]
    PaymentFailed(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Invalid order. {0}")]
    InvalidOrder(String),
    #[error("Feedback rejected. {0}")]
    FeedbackRejected(String),
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
}

impl OrderFlowError {
    pub fn invalid_transition<S: Into<String>>(order_id: &OrderId, transition: Transition, reason: S) -> Self {
        Self::InvalidTransition { order_id: order_id.clone(), transition, reason: reason.into() }
    }
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

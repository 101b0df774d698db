//! Online payments.
//!
//! The engine never talks to the payment gateway directly. It produces the [`PaymentRequest`] the client hands to the
//! gateway, and it consumes the gateway's asynchronous [`PaymentCallback`]. Only a successful callback for the exact
//! online amount flips `paid`.
use std::fmt::Display;

use chrono::{DateTime, Utc};
use fdg_common::Amount;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderId, OrderStatusType, PaymentSettlement},
    engine_api::{errors::OrderFlowError, order_flow_api::OrderFlowApi, order_objects::Actor},
    events::{ChangeKind, OrderPaidEvent},
    traits::DeliveryDatabase,
};

/// What the client sends to the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Amount,
    /// Always the order id
    pub reference: OrderId,
    pub payer_email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentCallbackStatus {
    Success,
    Failed,
    /// The customer closed the payment window
    Closed,
}

impl Display for PaymentCallbackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentCallbackStatus::Success => "success",
            PaymentCallbackStatus::Failed => "failed",
            PaymentCallbackStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// The payment gateway's report on a payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCallback {
    /// The order id that was passed as the payment reference
    pub reference: OrderId,
    pub status: PaymentCallbackStatus,
    pub amount: Amount,
    /// The gateway's own transaction id
    pub transaction_reference: String,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl<B> OrderFlowApi<B>
where B: DeliveryDatabase
{
    /// Builds the payment gateway invocation for the online portion of an order.
    pub async fn payment_request(
        &self,
        order_id: &OrderId,
        actor: &Actor,
        payer_email: &str,
    ) -> Result<PaymentRequest, OrderFlowError> {
        let order = self.fetch_visible_order(order_id, actor).await?;
        if order.paid {
            return Err(OrderFlowError::PaymentFailed(format!("Order {order_id} has already been paid.")));
        }
        if order.status == OrderStatusType::Cancelled {
            return Err(OrderFlowError::PaymentFailed(format!("Order {order_id} has been cancelled.")));
        }
        if !payer_email.contains('@') {
            return Err(OrderFlowError::PaymentFailed(format!("'{payer_email}' is not a valid email address.")));
        }
        Ok(PaymentRequest { amount: order.amount_paid_online, reference: order.order_id, payer_email: payer_email.into() })
    }

    /// Handles a payment gateway callback.
    ///
    /// Only a `success` callback for exactly `amount_paid_online` marks the order as paid. Anything else is a
    /// `PaymentFailed` error and leaves the order untouched, so the customer can try again. Repeated success callbacks
    /// are harmless: the already-paid order is returned.
    pub async fn process_payment_callback(&self, callback: PaymentCallback) -> Result<Order, OrderFlowError> {
        let order_id = &callback.reference;
        let _guard = self.locks.lock(order_id).await;
        let order = self.fetch_existing(order_id).await?;
        if callback.status != PaymentCallbackStatus::Success {
            info!("🔄️💰️ Payment for [{order_id}] was {}. The order remains unpaid", callback.status);
            return Err(OrderFlowError::PaymentFailed(format!("The payment was {}.", callback.status)));
        }
        if order.paid {
            if order.payment_reference.as_deref() != Some(callback.transaction_reference.as_str()) {
                warn!(
                    "🔄️💰️ Order [{order_id}] is already paid with reference {:?}, but another payment ({}) was \
                     reported. This needs a manual refund.",
                    order.payment_reference, callback.transaction_reference
                );
            }
            return Ok(order);
        }
        if callback.amount != order.amount_paid_online {
            warn!(
                "🔄️💰️ Payment for [{order_id}] was {} but {} is due online. The order remains unpaid",
                callback.amount, order.amount_paid_online
            );
            return Err(OrderFlowError::PaymentFailed(format!(
                "Expected a payment of {}, but received {}.",
                order.amount_paid_online, callback.amount
            )));
        }
        if order.status == OrderStatusType::Cancelled {
            warn!("🔄️💰️ Payment received for cancelled order [{order_id}]. This needs a manual refund.");
        }
        let settlement = PaymentSettlement {
            reference: callback.transaction_reference,
            amount: callback.amount,
            paid_at: callback.paid_at.unwrap_or_else(Utc::now),
        };
        let paid = match self.db.mark_order_paid(order_id, &settlement).await? {
            Some(paid) => paid,
            // Paid by another process in the meantime
            None => return self.fetch_existing(order_id).await,
        };
        info!("🔄️💰️ Order [{order_id}] is paid. {} received online", settlement.amount);
        self.notify(ChangeKind::Update, &paid);
        self.call_order_paid_hook(&paid).await;
        Ok(paid)
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️💰️ Notifying order paid hook subscribers");
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }
}

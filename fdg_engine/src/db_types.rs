use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use fdg_common::{Amount, AmountOverflow};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::engine_api::economics::{reconcile, PaymentSplit};

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The lifecycle status of an order.
///
/// The forward sequence is `Pending → Confirmed → Preparing → OutForDelivery → Delivered`. `Cancelled` can be reached
/// from `Pending`, `Confirmed` or `Preparing`. `Delivered` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been placed and is waiting for the restaurant to accept it.
    Pending,
    /// The restaurant has accepted the order.
    Confirmed,
    /// The kitchen is preparing the order.
    Preparing,
    /// A rider has collected the order.
    OutForDelivery,
    /// The order was handed to the customer.
    Delivered,
    /// The order was cancelled by the customer or an operator.
    Cancelled,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 6] = [
        OrderStatusType::Pending,
        OrderStatusType::Confirmed,
        OrderStatusType::Preparing,
        OrderStatusType::OutForDelivery,
        OrderStatusType::Delivered,
        OrderStatusType::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Pending => "pending",
            OrderStatusType::Confirmed => "confirmed",
            OrderStatusType::Preparing => "preparing",
            OrderStatusType::OutForDelivery => "out_for_delivery",
            OrderStatusType::Delivered => "delivered",
            OrderStatusType::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Delivered | OrderStatusType::Cancelled)
    }

    /// The next status in the forward sequence, if any.
    pub fn successor(&self) -> Option<OrderStatusType> {
        match self {
            OrderStatusType::Pending => Some(OrderStatusType::Confirmed),
            OrderStatusType::Confirmed => Some(OrderStatusType::Preparing),
            OrderStatusType::Preparing => Some(OrderStatusType::OutForDelivery),
            OrderStatusType::OutForDelivery => Some(OrderStatusType::Delivered),
            OrderStatusType::Delivered | OrderStatusType::Cancelled => None,
        }
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatusType::Pending | OrderStatusType::Confirmed | OrderStatusType::Preparing)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ConversionError(format!("Invalid order status: {s}")))
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Transfer,
    Wallet,
    /// The food is paid for online, the delivery fee is collected by the rider in cash.
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Cash => "cash",
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "transfer" => Ok(Self::Transfer),
            "wallet" => Ok(Self::Wallet),
            "cash" => Ok(Self::Cash),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------      OrderItem        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemExtra {
    pub name: String,
    pub price: Amount,
}

/// A line on an order. `price` is a snapshot of the menu price at the time the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderItem {
    pub item_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub extras: Vec<ItemExtra>,
    pub price: Amount,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

impl OrderItem {
    pub fn new<S: Into<String>>(item_id: S, quantity: u32, price: Amount) -> Self {
        Self { item_id: item_id.into(), quantity, extras: Vec::new(), price, special_instructions: None }
    }

    pub fn with_extra<S: Into<String>>(mut self, name: S, price: Amount) -> Self {
        self.extras.push(ItemExtra { name: name.into(), price });
        self
    }

    pub fn with_instructions<S: Into<String>>(mut self, instructions: S) -> Self {
        self.special_instructions = Some(instructions.into());
        self
    }

    /// `(price + Σ extras) × quantity`
    pub fn line_total(&self) -> Result<Amount, AmountOverflow> {
        let extras = Amount::checked_sum(self.extras.iter().map(|e| e.price))?;
        self.price.checked_add(extras)?.checked_mul(i64::from(self.quantity))
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
/// The canonical order record.
///
/// Monetary fields are fixed at creation. `status` is only ever written by the order state machine, `paid` only by
/// the payment gateway callback, and `rider_code` at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Order {
    /// Storage-layer identity
    pub id: i64,
    /// Client-visible identifier
    pub order_id: OrderId,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Amount,
    pub service_charge: Amount,
    pub delivery_fee: Amount,
    pub total: Amount,
    pub payment_method: PaymentMethod,
    pub paid: bool,
    pub amount_paid_online: Amount,
    pub amount_due_on_delivery: Amount,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub status: OrderStatusType,
    pub delivery_distance: String,
    pub delivery_duration: String,
    pub delivery_time: DateTime<Utc>,
    pub selected_branch_id: String,
    pub address: String,
    pub apartment_flat: Option<String>,
    pub label: Option<String>,
    pub rider_code: Option<String>,
    pub feedback_rating: Option<u8>,
    pub feedback_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Re-derives the online/on-delivery split from the persisted monetary fields. Useful for receipts, where the
    /// persisted values should not be trusted blindly.
    pub fn payment_split(&self) -> Result<PaymentSplit, AmountOverflow> {
        reconcile(self.subtotal, self.delivery_fee, self.service_charge, self.payment_method)
    }

    /// True if the persisted totals agree with a fresh reconciliation.
    pub fn is_reconciled(&self) -> bool {
        self.payment_split().is_ok_and(|split| {
            split.total == self.total &&
                split.amount_paid_online == self.amount_paid_online &&
                split.amount_due_on_delivery == self.amount_due_on_delivery
        })
    }

    pub fn has_rider_code(&self) -> bool {
        self.rider_code.as_ref().is_some_and(|c| !c.is_empty())
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// A fully priced order, ready to be persisted with `status = pending` and `paid = false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Amount,
    pub service_charge: Amount,
    pub delivery_fee: Amount,
    pub total: Amount,
    pub payment_method: PaymentMethod,
    pub amount_paid_online: Amount,
    pub amount_due_on_delivery: Amount,
    pub delivery_distance: String,
    pub delivery_duration: String,
    pub delivery_time: DateTime<Utc>,
    pub selected_branch_id: String,
    pub address: String,
    pub apartment_flat: Option<String>,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  PaymentSettlement    ---------------------------------------------------------
/// Settlement metadata recorded when the payment gateway reports a successful online payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettlement {
    /// The gateway's own transaction reference
    pub reference: String,
    pub amount: Amount,
    pub paid_at: DateTime<Utc>,
}

//--------------------------------------       Feedback        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Feedback {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in OrderStatusType::ALL {
            assert_eq!(status.as_str().parse::<OrderStatusType>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatusType>().is_err());
        let json = serde_json::to_string(&OrderStatusType::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
    }

    #[test]
    fn forward_sequence() {
        let mut status = OrderStatusType::Pending;
        let mut seen = vec![status];
        while let Some(next) = status.successor() {
            seen.push(next);
            status = next;
        }
        assert_eq!(seen, vec![
            OrderStatusType::Pending,
            OrderStatusType::Confirmed,
            OrderStatusType::Preparing,
            OrderStatusType::OutForDelivery,
            OrderStatusType::Delivered
        ]);
        assert!(OrderStatusType::Cancelled.successor().is_none());
        assert!(OrderStatusType::Delivered.is_terminal());
        assert!(OrderStatusType::Cancelled.is_terminal());
        assert!(!OrderStatusType::OutForDelivery.is_cancellable());
    }

    #[test]
    fn line_totals_include_extras() {
        let item = OrderItem::new("jollof", 2, Amount::from(1500))
            .with_extra("plantain", Amount::from(300))
            .with_extra("chicken", Amount::from(700));
        assert_eq!(item.line_total(), Ok(Amount::from(5000)));
    }

    #[test]
    fn oversized_line_totals_are_an_error() {
        let item = OrderItem::new("suya", 4, Amount::from(1i64 << 62));
        assert_eq!(item.line_total(), Err(AmountOverflow));
        let item = OrderItem::new("suya", 1, Amount::from(i64::MAX)).with_extra("pepper", Amount::from(1));
        assert_eq!(item.line_total(), Err(AmountOverflow));
    }

    #[test]
    fn unknown_item_fields_are_rejected() {
        let json = r#"{"item_id":"a","quantity":1,"price":100,"discount":50}"#;
        assert!(serde_json::from_str::<OrderItem>(json).is_err());
        let json = r#"{"item_id":"a","quantity":1,"price":100}"#;
        let item = serde_json::from_str::<OrderItem>(json).unwrap();
        assert!(item.extras.is_empty());
        assert_eq!(item.special_instructions, None);
    }

    #[test]
    fn payment_methods() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert!("crypto".parse::<PaymentMethod>().is_err());
        assert_eq!(serde_json::to_string(&PaymentMethod::Transfer).unwrap(), "\"transfer\"");
    }
}

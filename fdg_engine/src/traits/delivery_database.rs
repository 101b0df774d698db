use crate::{
    db_types::{Feedback, NewOrder, Order, OrderId, OrderStatusType, PaymentSettlement},
    engine_api::errors::OrderFlowError,
    traits::OrderManagement,
};

/// This trait defines the highest level of behaviour for backends supporting the order lifecycle.
///
/// Each write is a single atomic statement guarded by a condition on the current row. Callers learn whether their write
/// won from the return value and re-read the record when it did not.
#[allow(async_fn_in_trait)]
pub trait DeliveryDatabase: Clone + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Persists a new order with `status = pending` and `paid = false`, returning the stored record.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;

    /// Sets the order status to `new_status`, but only if it is currently `expected`.
    ///
    /// Returns the updated order if the write was applied, or `None` if the status did not match (or the order does not
    /// exist).
    async fn compare_and_set_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatusType,
        new_status: OrderStatusType,
    ) -> Result<Option<Order>, OrderFlowError>;

    /// Writes the rider code, but only if the order does not have one yet.
    ///
    /// Returns `true` if this call wrote the code.
    async fn set_rider_code_if_absent(&self, order_id: &OrderId, code: &str) -> Result<bool, OrderFlowError>;

    /// Marks the order as paid and records the settlement, but only if it is not already paid.
    ///
    /// Returns the updated order if this call flipped the flag, or `None` otherwise.
    async fn mark_order_paid(
        &self,
        order_id: &OrderId,
        settlement: &PaymentSettlement,
    ) -> Result<Option<Order>, OrderFlowError>;

    /// Stores customer feedback, but only if the order is delivered and has no rating yet.
    ///
    /// Returns the updated order if the feedback was stored, or `None` otherwise.
    async fn save_feedback(&self, order_id: &OrderId, feedback: &Feedback) -> Result<Option<Order>, OrderFlowError>;
}

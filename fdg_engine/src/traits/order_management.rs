use crate::{
    db_types::{Order, OrderId},
    engine_api::{errors::OrderFlowError, order_objects::OrderQueryFilter},
};

/// The `OrderManagement` trait defines the behaviour for querying information about orders in the database backend.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches the order with the given client-visible id, or `None` if it does not exist.
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError>;

    /// Fetches all orders matching the filter, oldest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;
}

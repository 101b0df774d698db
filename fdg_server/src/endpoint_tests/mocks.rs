use chrono::{TimeZone, Utc};
use fdg_common::Amount;
use fdg_engine::{
    db_types::{Feedback, NewOrder, Order, OrderId, OrderItem, OrderStatusType, PaymentMethod, PaymentSettlement},
    order_objects::OrderQueryFilter,
    traits::{DeliveryDatabase, OrderManagement},
    OrderFlowError,
};
use mockall::mock;

mock! {
    pub DeliveryDb {}
    impl Clone for DeliveryDb {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for DeliveryDb {
        async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;
    }
    impl DeliveryDatabase for DeliveryDb {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;
        async fn compare_and_set_status(
            &self,
            order_id: &OrderId,
            expected: OrderStatusType,
            new_status: OrderStatusType,
        ) -> Result<Option<Order>, OrderFlowError>;
        async fn set_rider_code_if_absent(&self, order_id: &OrderId, code: &str) -> Result<bool, OrderFlowError>;
        async fn mark_order_paid(
            &self,
            order_id: &OrderId,
            settlement: &PaymentSettlement,
        ) -> Result<Option<Order>, OrderFlowError>;
        async fn save_feedback(&self, order_id: &OrderId, feedback: &Feedback) -> Result<Option<Order>, OrderFlowError>;
    }
}

/// A pending card order for 2 × 1500, with a 500 delivery fee and 200 service charge.
pub fn sample_order(order_id: &str, customer_id: &str) -> Order {
    let placed = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Order {
        id: 1,
        order_id: OrderId::from(order_id),
        customer_id: customer_id.to_string(),
        items: vec![OrderItem::new("jollof", 2, Amount::from(1500))],
        subtotal: Amount::from(3000),
        service_charge: Amount::from(200),
        delivery_fee: Amount::from(500),
        total: Amount::from(3700),
        payment_method: PaymentMethod::Card,
        paid: false,
        amount_paid_online: Amount::from(3700),
        amount_due_on_delivery: Amount::from(0),
        payment_reference: None,
        paid_at: None,
        status: OrderStatusType::Pending,
        delivery_distance: "4.2 km".to_string(),
        delivery_duration: "15 mins".to_string(),
        delivery_time: placed + chrono::Duration::minutes(45),
        selected_branch_id: "ikeja".to_string(),
        address: "12 Allen Avenue".to_string(),
        apartment_flat: None,
        label: None,
        rider_code: Some("4821".to_string()),
        feedback_rating: None,
        feedback_comment: None,
        created_at: placed,
        updated_at: placed,
    }
}

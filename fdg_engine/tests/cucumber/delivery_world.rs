use std::fmt::Debug;

use cucumber::World;
use fdg_engine::{
    db_types::{Order, PaymentMethod},
    engine_api::{economics::FeeSchedule, feedback::FeedbackTrigger},
    order_objects::{Actor, TransitionOutcome},
    OrderFlowApi,
    OrderFlowError,
    SqliteDatabase,
};
use log::*;

use crate::support::{order_request, prepare_test_db, quote_api, ScriptedResolver};

#[derive(Default, Debug, World)]
pub struct DeliveryWorld {
    pub system: Option<DeliverySystem>,
}

pub struct DeliverySystem {
    pub api: OrderFlowApi<SqliteDatabase>,
    pub resolver: ScriptedResolver,
    pub schedule: FeeSchedule,
    pub order: Option<Order>,
    pub last_error: Option<OrderFlowError>,
    pub last_outcome: Option<TransitionOutcome>,
    pub trigger: FeedbackTrigger,
    pub feedback_prompts: usize,
}

impl Debug for DeliverySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliverySystem")
            .field("api", &self.api)
            .field("order", &self.order.as_ref().map(|o| &o.order_id))
            .field("last_error", &self.last_error)
            .field("feedback_prompts", &self.feedback_prompts)
            .finish()
    }
}

impl DeliveryWorld {
    pub fn system(&mut self) -> &mut DeliverySystem {
        self.system.as_mut().expect("Delivery system not initialised")
    }
}

impl DeliverySystem {
    pub async fn new() -> Self {
        let db = prepare_test_db().await;
        Self {
            api: OrderFlowApi::new(db, Default::default()),
            resolver: ScriptedResolver::reporting(4_200, "4.2 km", "15 mins"),
            schedule: FeeSchedule::default(),
            order: None,
            last_error: None,
            last_outcome: None,
            trigger: FeedbackTrigger::new(),
            feedback_prompts: 0,
        }
    }

    pub fn order(&self) -> &Order {
        self.order.as_ref().expect("No order has been placed")
    }

    pub fn customer(&self) -> Actor {
        Actor::customer(self.order().customer_id.clone())
    }

    pub async fn place(&mut self, customer_id: &str, method: PaymentMethod, quantity: u32, price: i64) {
        let items = vec![fdg_engine::db_types::OrderItem::new("jollof-rice", quantity, price.into())];
        let request = order_request(method, items);
        let quotes = quote_api(self.resolver.clone(), self.schedule.clone());
        let result = match quotes.quote(&request.selected_branch_id, Some(&request.address)).await {
            Ok(quote) => self.api.place_order(customer_id, request, &quote).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(placed) => {
                debug!("🚀️ Placed order {}", placed.order.order_id);
                self.order = Some(placed.order);
                self.last_error = None;
            },
            Err(e) => {
                debug!("🚀️ Placement failed. {e}");
                self.last_error = Some(e);
            },
        }
    }

    /// Re-reads the current order from the database.
    pub async fn refresh(&mut self) {
        let order = self.api.fetch_order(&self.order().order_id, &Actor::Operator).await.expect("Error fetching order");
        self.order = Some(order);
    }

    pub fn record<T>(&mut self, result: Result<T, OrderFlowError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                self.last_error = Some(e);
                None
            },
        }
    }
}

/// The variant name of an error, as used in feature files.
pub fn error_kind(err: &OrderFlowError) -> &'static str {
    match err {
        OrderFlowError::DistanceResolutionFailed(_) => "DistanceResolutionFailed",
        OrderFlowError::DeliveryUnavailable(_) => "DeliveryUnavailable",
        OrderFlowError::InvalidTransition { .. } => "InvalidTransition",
        OrderFlowError::TransitionNotPermitted { .. } => "TransitionNotPermitted",
        OrderFlowError::PaymentFailed(_) => "PaymentFailed",
        OrderFlowError::OrderNotFound(_) => "OrderNotFound",
        OrderFlowError::InvalidOrder(_) => "InvalidOrder",
        OrderFlowError::FeedbackRejected(_) => "FeedbackRejected",
        OrderFlowError::DatabaseError(_) => "DatabaseError",
    }
}

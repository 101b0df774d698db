//! Shared set-up for the engine integration tests.
#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use fdg_common::Amount;
use fdg_engine::{
    db_types::{NewOrder, Order, OrderItem, PaymentMethod},
    helpers::generate_order_id,
    engine_api::{
        branches::BranchDirectory,
        economics::FeeSchedule,
        payments::{PaymentCallback, PaymentCallbackStatus},
        state_machine::Transition,
    },
    events::EventProducers,
    order_objects::{Actor, PlaceOrderRequest, TransitionRequest},
    traits::{DeliveryDatabase, DistanceInfo, DistanceResolver},
    DeliveryQuoteApi,
    OrderFlowApi,
    OrderFlowError,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub const BRANCHES: &str = "ikeja=12 Allen Avenue, Ikeja;lekki=3 Admiralty Way, Lekki";

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/fdg_test_{}.db", dir.display(), rand::random::<u64>())
}

/// Creates a fresh, migrated database under the temp dir.
pub async fn prepare_test_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_path();
    if Sqlite::database_exists(&url).await.unwrap_or(false) {
        Sqlite::drop_database(&url).await.expect("Error dropping stale database");
    }
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    debug!("🚀️ Created test database {url}");
    db
}

pub async fn tear_down(db: &SqliteDatabase) {
    db.close().await;
    let url = db.url().to_string();
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Could not remove test database {url}: {e}");
    }
}

/// A distance service stand-in whose answer can be changed during a test. `None` makes every lookup fail.
#[derive(Clone, Default)]
pub struct ScriptedResolver {
    answer: Arc<Mutex<Option<DistanceInfo>>>,
}

impl ScriptedResolver {
    pub fn reporting(meters: u64, distance_text: &str, duration_text: &str) -> Self {
        let resolver = Self::default();
        resolver.set(meters, distance_text, duration_text);
        resolver
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set(&self, meters: u64, distance_text: &str, duration_text: &str) {
        let info = DistanceInfo {
            distance_meters: meters,
            distance_text: distance_text.to_string(),
            duration_text: duration_text.to_string(),
        };
        *self.answer.lock().unwrap() = Some(info);
    }

    pub fn fail(&self) {
        *self.answer.lock().unwrap() = None;
    }
}

impl DistanceResolver for ScriptedResolver {
    async fn resolve_distance(&self, _origin: &str, _destination: &str) -> Result<DistanceInfo, OrderFlowError> {
        let answer = self.answer.lock().unwrap().clone();
        answer.ok_or_else(|| OrderFlowError::DistanceResolutionFailed("NOT_FOUND".into()))
    }
}

pub fn quote_api(resolver: ScriptedResolver, schedule: FeeSchedule) -> DeliveryQuoteApi<ScriptedResolver> {
    let branches = BranchDirectory::parse(BRANCHES).unwrap().pause(&["lekki"]);
    DeliveryQuoteApi::new(resolver, branches, schedule, Duration::from_millis(200))
}

pub fn order_request(method: PaymentMethod, items: Vec<OrderItem>) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items,
        payment_method: method,
        selected_branch_id: "ikeja".into(),
        address: "1 Marina Road, Lagos Island".into(),
        apartment_flat: Some("Flat 3".into()),
        label: Some("Work".into()),
    }
}

/// Two items at 1500 each.
pub fn standard_items() -> Vec<OrderItem> {
    vec![OrderItem::new("jollof-rice", 2, Amount::from(1500))]
}

pub struct TestSystem {
    pub api: OrderFlowApi<SqliteDatabase>,
    pub quotes: DeliveryQuoteApi<ScriptedResolver>,
    pub resolver: ScriptedResolver,
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let db = prepare_test_db().await;
        let resolver = ScriptedResolver::reporting(4_200, "4.2 km", "15 mins");
        let quotes = quote_api(resolver.clone(), FeeSchedule::default());
        let api = OrderFlowApi::new(db, producers);
        Self { api, quotes, resolver }
    }

    pub async fn place(&self, customer_id: &str, method: PaymentMethod) -> Result<Order, OrderFlowError> {
        let request = order_request(method, standard_items());
        let quote = self.quotes.quote(&request.selected_branch_id, Some(&request.address)).await?;
        let placed = self.api.place_order(customer_id, request, &quote).await?;
        Ok(placed.order)
    }

    pub async fn tear_down(self) {
        tear_down(self.api.db()).await;
    }
}

/// A successful gateway callback for the online portion of `order`.
pub fn paid_callback(order: &Order, transaction_reference: &str) -> PaymentCallback {
    PaymentCallback {
        reference: order.order_id.clone(),
        status: PaymentCallbackStatus::Success,
        amount: order.amount_paid_online,
        transaction_reference: transaction_reference.to_string(),
        paid_at: None,
    }
}

/// Applies each transition in turn as the operator, and returns the order as it stands afterwards.
pub async fn advance(api: &OrderFlowApi<SqliteDatabase>, order: &Order, transitions: &[Transition]) -> Order {
    let mut current = order.clone();
    for t in transitions {
        let request = TransitionRequest::new(current.order_id.clone(), *t, Actor::Operator);
        current = api.transition(request).await.expect("Operator transition failed").order;
    }
    current
}

/// A priced card order for 2 × 1500, built without going through placement. It has no rider code.
pub fn new_order(customer_id: &str) -> NewOrder {
    let now = chrono::Utc::now();
    NewOrder {
        order_id: generate_order_id(),
        customer_id: customer_id.to_string(),
        items: standard_items(),
        subtotal: Amount::from(3000),
        service_charge: Amount::from(200),
        delivery_fee: Amount::from(500),
        total: Amount::from(3700),
        payment_method: PaymentMethod::Card,
        amount_paid_online: Amount::from(3700),
        amount_due_on_delivery: Amount::zero(),
        delivery_distance: "4.2 km".into(),
        delivery_duration: "15 mins".into(),
        delivery_time: now + chrono::Duration::minutes(45),
        selected_branch_id: "ikeja".into(),
        address: "1 Marina Road, Lagos Island".into(),
        apartment_flat: None,
        label: None,
        created_at: now,
    }
}

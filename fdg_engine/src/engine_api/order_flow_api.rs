use std::fmt::Debug;

use chrono::{Duration, Utc};
use fdg_common::Amount;
use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    engine_api::{
        economics::{exceeds_hard_cap, reconcile, FeeBasis, DEFAULT_HARD_CAP_KM, DEFAULT_SERVICE_CHARGE},
        errors::OrderFlowError,
        order_locks::OrderLocks,
        order_objects::{Actor, OrderQueryFilter, PlaceOrderRequest, PlacedOrder, TransitionOutcome, TransitionRequest},
        quote_api::DeliveryQuote,
        rider_code::{derive_rider_code, rider_code_matches},
        state_machine::{evaluate, Evaluation, Transition},
    },
    events::{ChangeKind, ChangeNotification, EventProducers, OrderPlacedEvent, OrderStatusChangedEvent, SyncHub},
    helpers::{generate_order_id, parse_duration_minutes},
    traits::DeliveryDatabase,
};

pub const DEFAULT_PREP_TIME_MINUTES: i64 = 30;
const MAX_TRAVEL_MINUTES: i64 = 24 * 60;

/// Tunables for order placement.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSettings {
    pub service_charge: Amount,
    /// Orders whose distance text parses to more than this are refused, regardless of the fee calculator.
    pub hard_cap_km: f64,
    /// Added to the travel time when computing the delivery target.
    pub prep_time: Duration,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            service_charge: DEFAULT_SERVICE_CHARGE,
            hard_cap_km: DEFAULT_HARD_CAP_KM,
            prep_time: Duration::minutes(DEFAULT_PREP_TIME_MINUTES),
        }
    }
}

/// `OrderFlowApi` is the primary API for the order lifecycle: placement, status transitions, rider codes, payment
/// callbacks and feedback.
///
/// Every mutation of an order happens under that order's lock and is a single conditional write in the backend. Once a
/// write commits, a change notification is published on the [`SyncHub`] (still under the lock, so per-order commit order
/// is preserved) and the relevant hook is called.
pub struct OrderFlowApi<B> {
    pub(crate) db: B,
    pub(crate) producers: EventProducers,
    pub(crate) hub: SyncHub,
    pub(crate) locks: OrderLocks,
    settings: OrderSettings,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.settings)
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, hub: SyncHub::new(), locks: OrderLocks::new(), settings: OrderSettings::default() }
    }

    pub fn with_settings(mut self, settings: OrderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_sync_hub(mut self, hub: SyncHub) -> Self {
        self.hub = hub;
        self
    }

    pub fn settings(&self) -> &OrderSettings {
        &self.settings
    }

    pub fn sync_hub(&self) -> &SyncHub {
        &self.hub
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub(crate) fn notify(&self, kind: ChangeKind, order: &Order) {
        self.hub.publish(ChangeNotification::new(kind, order));
    }
}

impl<B> OrderFlowApi<B>
where B: DeliveryDatabase
{
    /// Places a new order for `customer_id`.
    ///
    /// `quote` must be the delivery quote for the request's branch and address. The order is refused if the quote is
    /// only a placeholder, if the address is not deliverable, or if the distance exceeds the hard cap. A fallback quote
    /// is accepted, and its warning is passed back to the caller.
    ///
    /// The stored order has `pending` status, is unpaid, and has its monetary fields fixed. A rider code is issued
    /// straight away.
    pub async fn place_order(
        &self,
        customer_id: &str,
        request: PlaceOrderRequest,
        quote: &DeliveryQuote,
    ) -> Result<PlacedOrder, OrderFlowError> {
        let subtotal = validate_request(customer_id, &request)?;
        if quote.fee.basis == FeeBasis::Placeholder {
            return Err(OrderFlowError::InvalidOrder("The delivery address has not been priced yet.".into()));
        }
        if !quote.fee.deliverable {
            return Err(OrderFlowError::DeliveryUnavailable("The address is outside our delivery area.".into()));
        }
        if exceeds_hard_cap(&quote.distance_text, self.settings.hard_cap_km) {
            let reason = format!(
                "The address is {} away. We only deliver up to {} km.",
                quote.distance_text, self.settings.hard_cap_km
            );
            return Err(OrderFlowError::DeliveryUnavailable(reason));
        }
        let split = reconcile(subtotal, quote.fee.fee, self.settings.service_charge, request.payment_method)
            .map_err(|e| OrderFlowError::InvalidOrder(format!("The order total cannot be computed. {e}")))?;
        let created_at = Utc::now();
        let travel = Duration::minutes(parse_duration_minutes(&quote.duration_text).clamp(0, MAX_TRAVEL_MINUTES));
        let new_order = NewOrder {
            order_id: generate_order_id(),
            customer_id: customer_id.to_string(),
            items: request.items,
            subtotal,
            service_charge: self.settings.service_charge,
            delivery_fee: quote.fee.fee,
            total: split.total,
            payment_method: request.payment_method,
            amount_paid_online: split.amount_paid_online,
            amount_due_on_delivery: split.amount_due_on_delivery,
            delivery_distance: quote.distance_text.clone(),
            delivery_duration: quote.duration_text.clone(),
            delivery_time: created_at + self.settings.prep_time + travel,
            selected_branch_id: request.selected_branch_id,
            address: request.address,
            apartment_flat: request.apartment_flat,
            label: request.label,
            created_at,
        };
        let order = {
            let _guard = self.locks.lock(&new_order.order_id).await;
            let order = self.db.insert_order(new_order).await?;
            self.notify(ChangeKind::Create, &order);
            order
        };
        info!(
            "🔄️📦️ Order [{}] placed by {customer_id}. Total {} ({} online, {} on delivery)",
            order.order_id, order.total, order.amount_paid_online, order.amount_due_on_delivery
        );
        self.call_order_placed_hook(&order).await;
        let order = match self.issue_rider_code(&order.order_id).await {
            Ok(order) => order,
            Err(e) => {
                // Not fatal. The code will be issued the next time anyone views the order.
                warn!("🔄️📦️ Could not issue rider code for [{}] at placement. {e}", order.order_id);
                order
            },
        };
        Ok(PlacedOrder { order, warning: quote.warning.clone() })
    }

    /// Fetches an order on behalf of `actor`. Customers only see their own orders; anything else is `OrderNotFound`.
    ///
    /// If the order does not have a rider code yet, one is issued.
    pub async fn fetch_order(&self, order_id: &OrderId, actor: &Actor) -> Result<Order, OrderFlowError> {
        let order = self.fetch_visible_order(order_id, actor).await?;
        if order.has_rider_code() {
            return Ok(order);
        }
        self.issue_rider_code(order_id).await
    }

    pub async fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, OrderFlowError> {
        self.db.search_orders(OrderQueryFilter::default().with_customer_id(customer_id)).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        trace!("🔄️🔍️ Searching orders. {query}");
        self.db.search_orders(query).await
    }

    /// Applies a status transition.
    ///
    /// The request is evaluated against the current record under the order's lock, and written with a compare-and-set
    /// on the status it was evaluated against. Duplicate requests (see [`evaluate`]) succeed without writing anything.
    pub async fn transition(&self, request: TransitionRequest) -> Result<TransitionOutcome, OrderFlowError> {
        let TransitionRequest { order_id, transition, actor, expected_status } = request;
        let _guard = self.locks.lock(&order_id).await;
        let order = self.fetch_visible_order(&order_id, &actor).await?;
        let plan = match evaluate(&order, transition, &actor, expected_status)? {
            Evaluation::AlreadyApplied => {
                debug!("🔄️🚦️ Duplicate '{transition}' for [{order_id}] from {actor}. Order is already {}", order.status);
                return Ok(TransitionOutcome { order, applied: false, warning: None });
            },
            Evaluation::Apply(plan) => plan,
        };
        let updated = match self.db.compare_and_set_status(&order_id, plan.from, plan.to).await? {
            Some(updated) => updated,
            None => return self.resolve_lost_race(&order_id, transition, &actor).await,
        };
        info!("🔄️🚦️ Order [{order_id}] {} → {} by {actor}", plan.from, plan.to);
        if let Some(w) = &plan.warning {
            warn!("🔄️🚦️ Order [{order_id}]: {w}");
        }
        self.notify(ChangeKind::Update, &updated);
        self.call_status_changed_hook(&updated, plan.from, plan.warning.clone()).await;
        Ok(TransitionOutcome { order: updated, applied: true, warning: plan.warning })
    }

    /// Cancels an order. Shorthand for a `cancel` transition.
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        actor: &Actor,
        observed: Option<OrderStatusType>,
    ) -> Result<TransitionOutcome, OrderFlowError> {
        let request = TransitionRequest {
            order_id: order_id.clone(),
            transition: Transition::Cancel,
            actor: actor.clone(),
            expected_status: observed,
        };
        self.transition(request).await
    }

    // Another writer changed the status between our read and our write.
    async fn resolve_lost_race(
        &self,
        order_id: &OrderId,
        transition: Transition,
        actor: &Actor,
    ) -> Result<TransitionOutcome, OrderFlowError> {
        let current = self.fetch_visible_order(order_id, actor).await?;
        if current.status == transition.target() {
            debug!("🔄️🚦️ '{transition}' for [{order_id}] was applied concurrently by another writer");
            return Ok(TransitionOutcome { order: current, applied: false, warning: None });
        }
        let reason = format!("The order changed to {} while the request was being processed.", current.status);
        Err(OrderFlowError::invalid_transition(order_id, transition, reason))
    }

    /// Makes sure the order has a rider code, and returns the order as stored afterwards.
    ///
    /// The code is written with "set only if absent" semantics, so concurrent callers (in this process or not) all end
    /// up reading the same value.
    pub async fn issue_rider_code(&self, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        let code = derive_rider_code(order_id);
        let _guard = self.locks.lock(order_id).await;
        if self.db.set_rider_code_if_absent(order_id, &code).await? {
            debug!("🔄️🔑️ Rider code issued for [{order_id}]");
            let order = self.fetch_existing(order_id).await?;
            self.notify(ChangeKind::Update, &order);
            return Ok(order);
        }
        let order = self.fetch_existing(order_id).await?;
        if !order.has_rider_code() {
            let msg = format!("Rider code for {order_id} was neither written nor found");
            error!("🔄️🔑️ {msg}");
            return Err(OrderFlowError::DatabaseError(msg));
        }
        Ok(order)
    }

    /// Checks a code quoted by the rider at drop-off.
    pub async fn verify_rider_code(&self, order_id: &OrderId, presented: &str) -> Result<bool, OrderFlowError> {
        let order = self.fetch_existing(order_id).await?;
        let stored = order.rider_code.as_deref().unwrap_or_default();
        let ok = rider_code_matches(stored, presented);
        if !ok {
            info!("🔄️🔑️ Rider code mismatch for [{order_id}]");
        }
        Ok(ok)
    }

    pub(crate) async fn fetch_existing(&self, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        self.db.fetch_order_by_order_id(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))
    }

    pub(crate) async fn fetch_visible_order(&self, order_id: &OrderId, actor: &Actor) -> Result<Order, OrderFlowError> {
        let order = self.fetch_existing(order_id).await?;
        if !actor.can_view(&order) {
            debug!("🔄️🔍️ {actor} asked for [{order_id}], which belongs to someone else");
            return Err(OrderFlowError::OrderNotFound(order_id.clone()));
        }
        Ok(order)
    }

    async fn call_order_placed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_placed_producer {
            debug!("🔄️📦️ Notifying order placed hook subscribers");
            emitter.publish_event(OrderPlacedEvent::new(order.clone())).await;
        }
    }

    async fn call_status_changed_hook(&self, order: &Order, old_status: OrderStatusType, warning: Option<String>) {
        for emitter in &self.producers.status_changed_producer {
            debug!("🔄️🚦️ Notifying status changed hook subscribers");
            let event = OrderStatusChangedEvent::new(order.clone(), old_status, warning.clone());
            emitter.publish_event(event).await;
        }
    }
}

/// Checks a placement request and returns its subtotal.
fn validate_request(customer_id: &str, request: &PlaceOrderRequest) -> Result<Amount, OrderFlowError> {
    if customer_id.trim().is_empty() {
        return Err(OrderFlowError::InvalidOrder("A customer id is required.".into()));
    }
    if request.items.is_empty() {
        return Err(OrderFlowError::InvalidOrder("An order must contain at least one item.".into()));
    }
    if request.address.trim().is_empty() {
        return Err(OrderFlowError::InvalidOrder("A delivery address is required.".into()));
    }
    for item in &request.items {
        if item.quantity == 0 {
            return Err(OrderFlowError::InvalidOrder(format!("Item {} has a zero quantity.", item.item_id)));
        }
        if item.price.is_negative() || item.extras.iter().any(|e| e.price.is_negative()) {
            return Err(OrderFlowError::InvalidOrder(format!("Item {} has a negative price.", item.item_id)));
        }
    }
    let line_totals = request
        .items
        .iter()
        .map(|item| {
            item.line_total()
                .map_err(|e| OrderFlowError::InvalidOrder(format!("Item {} cannot be priced. {e}", item.item_id)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Amount::checked_sum(line_totals)
        .map_err(|e| OrderFlowError::InvalidOrder(format!("The order subtotal cannot be computed. {e}")))
}

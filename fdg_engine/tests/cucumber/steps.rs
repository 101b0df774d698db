use std::str::FromStr;

use cucumber::{then, when};
use fdg_common::Amount;
use fdg_engine::{
    db_types::{OrderStatusType, PaymentMethod},
    engine_api::{
        payments::{PaymentCallback, PaymentCallbackStatus},
        state_machine::Transition,
    },
    order_objects::{Actor, TransitionRequest},
};

use crate::cucumber::{delivery_world::error_kind, DeliveryWorld};

fn transition_named(name: &str) -> Transition {
    match name {
        "confirm" => Transition::Confirm,
        "prepare" => Transition::Prepare,
        "dispatch" => Transition::Dispatch,
        "deliver" => Transition::Deliver,
        "cancel" => Transition::Cancel,
        _ => panic!("Unknown transition: {name}"),
    }
}

#[when(expr = "customer '{word}' orders {int} items at {int} each, paying by {word}")]
async fn place_order(world: &mut DeliveryWorld, customer_id: String, quantity: u32, price: i64, method: String) {
    let method = PaymentMethod::from_str(&method).expect("Not a valid payment method");
    world.system().place(&customer_id, method, quantity, price).await;
}

#[when(expr = "the payment gateway reports a {word} payment for the online amount")]
async fn gateway_callback(world: &mut DeliveryWorld, status: String) {
    let status = match status.as_str() {
        "successful" => PaymentCallbackStatus::Success,
        "failed" => PaymentCallbackStatus::Failed,
        "closed" => PaymentCallbackStatus::Closed,
        _ => panic!("Unknown payment status: {status}"),
    };
    let system = world.system();
    let order = system.order();
    let callback = PaymentCallback {
        reference: order.order_id.clone(),
        status,
        amount: order.amount_paid_online,
        transaction_reference: format!("TX-{}", order.id),
        paid_at: None,
    };
    let result = system.api.process_payment_callback(callback).await;
    system.record(result);
    system.refresh().await;
}

#[when(expr = "the operator applies '{word}'")]
async fn operator_transition(world: &mut DeliveryWorld, transition: String) {
    let system = world.system();
    let request = TransitionRequest::new(system.order().order_id.clone(), transition_named(&transition), Actor::Operator);
    let result = system.api.transition(request).await;
    system.last_outcome = system.record(result);
    system.refresh().await;
}

#[when("the customer cancels the order")]
async fn customer_cancels(world: &mut DeliveryWorld) {
    let system = world.system();
    let actor = system.customer();
    let result = system.api.cancel_order(&system.order().order_id, &actor, None).await;
    system.last_outcome = system.record(result);
    system.refresh().await;
}

#[when("the customer views the order")]
async fn customer_views(world: &mut DeliveryWorld) {
    let system = world.system();
    let actor = system.customer();
    let order_id = system.order().order_id.clone();
    let (order, fired) =
        system.api.observe_for_feedback(&order_id, &actor, &mut system.trigger).await.expect("Error viewing order");
    if fired {
        system.feedback_prompts += 1;
    }
    system.order = Some(order);
}

#[then("the order is placed")]
async fn order_is_placed(world: &mut DeliveryWorld) {
    let system = world.system();
    assert!(system.last_error.is_none(), "Placement failed: {:?}", system.last_error);
    assert_eq!(system.order().status, OrderStatusType::Pending);
}

#[then(expr = "no order is stored for customer '{word}'")]
async fn no_order_stored(world: &mut DeliveryWorld, customer_id: String) {
    let orders = world.system().api.orders_for_customer(&customer_id).await.expect("Error fetching orders");
    assert!(orders.is_empty(), "Found {} orders", orders.len());
}

#[then(expr = "the request fails with {word}")]
async fn request_fails_with(world: &mut DeliveryWorld, kind: String) {
    let err = world.system().last_error.as_ref().expect("The last request did not fail");
    assert_eq!(error_kind(err), kind, "Unexpected error: {err}");
}

#[then(expr = "the subtotal is {int}, the service charge is {int} and the delivery fee is {int}")]
async fn check_charges(world: &mut DeliveryWorld, subtotal: i64, service_charge: i64, fee: i64) {
    let order = world.system().order();
    assert_eq!(order.subtotal, Amount::from(subtotal), "Subtotal");
    assert_eq!(order.service_charge, Amount::from(service_charge), "Service charge");
    assert_eq!(order.delivery_fee, Amount::from(fee), "Delivery fee");
}

#[then(expr = "the total is {int}, with {int} paid online and {int} due on delivery")]
async fn check_split(world: &mut DeliveryWorld, total: i64, online: i64, on_delivery: i64) {
    let order = world.system().order();
    assert_eq!(order.total, Amount::from(total), "Total");
    assert_eq!(order.amount_paid_online, Amount::from(online), "Online");
    assert_eq!(order.amount_due_on_delivery, Amount::from(on_delivery), "On delivery");
    assert!(order.is_reconciled());
}

#[then(expr = "the order {word} paid")]
async fn check_paid(world: &mut DeliveryWorld, is: String) {
    let expected = match is.as_str() {
        "is" => true,
        "isn't" => false,
        _ => panic!("Expected 'is' or 'isn't', not '{is}'"),
    };
    assert_eq!(world.system().order().paid, expected);
}

#[then(expr = "the order status is '{word}'")]
async fn check_status(world: &mut DeliveryWorld, status: String) {
    let expected = OrderStatusType::from_str(&status).expect("Not a valid order status");
    assert_eq!(world.system().order().status, expected);
}

#[then(expr = "the request succeeds with the warning {string}")]
async fn succeeds_with_warning(world: &mut DeliveryWorld, warning: String) {
    let system = world.system();
    assert!(system.last_error.is_none(), "Request failed: {:?}", system.last_error);
    let outcome = system.last_outcome.as_ref().expect("No transition outcome");
    assert!(outcome.applied);
    assert_eq!(outcome.warning.as_deref(), Some(warning.as_str()));
}

#[then(expr = "the feedback prompt has fired {int} time(s)")]
async fn feedback_prompts(world: &mut DeliveryWorld, count: usize) {
    assert_eq!(world.system().feedback_prompts, count);
}

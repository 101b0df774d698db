use actix_web::{http::StatusCode, web, web::ServiceConfig};
use fdg_engine::{
    db_types::{Order, OrderStatusType},
    engine_api::payments::PaymentRequest,
    order_objects::TransitionOutcome,
};
use serde_json::json;

use super::{
    helpers::{get_request, orders_api, post_request, As},
    mocks::{sample_order, MockDeliveryDb},
};
use crate::{
    data_objects::RiderCodeCheck,
    routes::{
        CancelOrderRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrdersSearchRoute,
        PaymentRequestRoute,
        TransitionOrderRoute,
        VerifyRiderCodeRoute,
    },
};

fn configure(db: MockDeliveryDb) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(orders_api(db)))
            .service(MyOrdersRoute::<MockDeliveryDb>::new())
            .service(OrdersSearchRoute::<MockDeliveryDb>::new())
            .service(OrderByIdRoute::<MockDeliveryDb>::new())
            .service(CancelOrderRoute::<MockDeliveryDb>::new())
            .service(TransitionOrderRoute::<MockDeliveryDb>::new())
            .service(VerifyRiderCodeRoute::<MockDeliveryDb>::new())
            .service(PaymentRequestRoute::<MockDeliveryDb>::new());
    }
}

/// A backend that holds one order, FDG-1, belonging to alice, in the given status.
fn backend_with(status: OrderStatusType) -> MockDeliveryDb {
    let mut db = MockDeliveryDb::new();
    db.expect_fetch_order_by_order_id().returning(move |id| {
        if id.as_str() != "FDG-1" {
            return Ok(None);
        }
        let mut order = sample_order("FDG-1", "alice");
        order.status = status;
        Ok(Some(order))
    });
    db
}

#[actix_web::test]
async fn fetch_order_without_actor() {
    let _ = env_logger::try_init();
    let (status, body) = get_request(As::Nobody, "/orders/FDG-1", configure(backend_with(OrderStatusType::Pending))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("fdg_actor"), "{body}");
}

#[actix_web::test]
async fn fetch_my_order() {
    let _ = env_logger::try_init();
    let db = backend_with(OrderStatusType::Preparing);
    let (status, body) = get_request(As::Customer("alice"), "/orders/FDG-1", configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.order_id.as_str(), "FDG-1");
    assert_eq!(order.status, OrderStatusType::Preparing);
    assert_eq!(order.rider_code.as_deref(), Some("4821"));
}

#[actix_web::test]
async fn fetch_someone_elses_order() {
    let _ = env_logger::try_init();
    let db = backend_with(OrderStatusType::Pending);
    let (status, body) = get_request(As::Customer("bob"), "/orders/FDG-1", configure(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("does not exist"), "{body}");
    let db = backend_with(OrderStatusType::Pending);
    let (status, _) = get_request(As::Operator, "/orders/FDG-1", configure(db)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init();
    let mut db = MockDeliveryDb::new();
    db.expect_search_orders()
        .withf(|q| q.customer_id.as_deref() == Some("alice") && q.statuses.is_empty())
        .times(1)
        .returning(|_| Ok(vec![sample_order("FDG-1", "alice"), sample_order("FDG-2", "alice")]));
    let (status, body) = get_request(As::Customer("alice"), "/orders", configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 2);
}

#[actix_web::test]
async fn operators_have_no_orders_of_their_own() {
    let _ = env_logger::try_init();
    let (status, body) = get_request(As::Operator, "/orders", configure(MockDeliveryDb::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("operator role may not access"), "{body}");
}

#[actix_web::test]
async fn search_orders_by_status() {
    let _ = env_logger::try_init();
    let mut db = MockDeliveryDb::new();
    db.expect_search_orders()
        .withf(|q| q.customer_id.is_none() && q.statuses == [OrderStatusType::Pending, OrderStatusType::Confirmed])
        .times(1)
        .returning(|_| Ok(vec![sample_order("FDG-1", "alice")]));
    let (status, body) = get_request(As::Operator, "/search/orders?status=pending,confirmed", configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 1);
}

#[actix_web::test]
async fn search_rejects_unknown_statuses() {
    let _ = env_logger::try_init();
    let (status, body) =
        get_request(As::Operator, "/search/orders?status=pending,lost", configure(MockDeliveryDb::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("'lost' is not a valid order status"), "{body}");
}

#[actix_web::test]
async fn customers_cannot_search() {
    let _ = env_logger::try_init();
    let (status, _) = get_request(As::Customer("alice"), "/search/orders", configure(MockDeliveryDb::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn customers_cannot_confirm_orders() {
    let _ = env_logger::try_init();
    let db = backend_with(OrderStatusType::Pending);
    let (status, body) =
        post_request(As::Customer("alice"), "/orders/FDG-1/transition", json!({"transition": "confirm"}), configure(db))
            .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Only an operator may confirm order FDG-1"), "{body}");
}

#[actix_web::test]
async fn operator_confirms_order() {
    let _ = env_logger::try_init();
    let mut db = backend_with(OrderStatusType::Pending);
    db.expect_compare_and_set_status()
        .withf(|id, from, to| {
            id.as_str() == "FDG-1" && *from == OrderStatusType::Pending && *to == OrderStatusType::Confirmed
        })
        .times(1)
        .returning(|_, _, to| {
            let mut order = sample_order("FDG-1", "alice");
            order.status = to;
            Ok(Some(order))
        });
    let (status, body) =
        post_request(As::Operator, "/orders/FDG-1/transition", json!({"transition": "confirm"}), configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: TransitionOutcome = serde_json::from_str(&body).unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.order.status, OrderStatusType::Confirmed);
}

#[actix_web::test]
async fn skipping_steps_is_a_conflict() {
    let _ = env_logger::try_init();
    let db = backend_with(OrderStatusType::Pending);
    let (status, body) =
        post_request(As::Operator, "/orders/FDG-1/transition", json!({"transition": "deliver"}), configure(db)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("The order is pending"), "{body}");
}

#[actix_web::test]
async fn repeated_cancel_is_harmless() {
    let _ = env_logger::try_init();
    // No compare-and-set expectation: a duplicate must not write anything
    let db = backend_with(OrderStatusType::Cancelled);
    let (status, body) =
        post_request(As::Customer("alice"), "/orders/FDG-1/cancel", json!({"expected_status": "pending"}), configure(db))
            .await;
    assert_eq!(status, StatusCode::OK);
    let outcome: TransitionOutcome = serde_json::from_str(&body).unwrap();
    assert!(!outcome.applied);
    assert_eq!(outcome.order.status, OrderStatusType::Cancelled);
}

#[actix_web::test]
async fn cancelling_a_dispatched_order_is_refused() {
    let _ = env_logger::try_init();
    let db = backend_with(OrderStatusType::OutForDelivery);
    let (status, _) = post_request(As::Customer("alice"), "/orders/FDG-1/cancel", json!({}), configure(db)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn operators_verify_rider_codes() {
    let _ = env_logger::try_init();
    let db = backend_with(OrderStatusType::OutForDelivery);
    let (status, body) =
        post_request(As::Operator, "/orders/FDG-1/rider_code/verify", json!({"code": " 4821 "}), configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let check: RiderCodeCheck = serde_json::from_str(&body).unwrap();
    assert!(check.valid);

    let db = backend_with(OrderStatusType::OutForDelivery);
    let (status, body) =
        post_request(As::Operator, "/orders/FDG-1/rider_code/verify", json!({"code": "1111"}), configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let check: RiderCodeCheck = serde_json::from_str(&body).unwrap();
    assert!(!check.valid);

    let db = backend_with(OrderStatusType::OutForDelivery);
    let (status, _) =
        post_request(As::Customer("alice"), "/orders/FDG-1/rider_code/verify", json!({"code": "4821"}), configure(db))
            .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn payment_request_for_the_online_amount() {
    let _ = env_logger::try_init();
    let db = backend_with(OrderStatusType::Pending);
    let (status, body) = post_request(
        As::Customer("alice"),
        "/orders/FDG-1/payment",
        json!({"payer_email": "alice@example.com"}),
        configure(db),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let request: PaymentRequest = serde_json::from_str(&body).unwrap();
    assert_eq!(request.amount.value(), 3700);
    assert_eq!(request.reference.as_str(), "FDG-1");
}

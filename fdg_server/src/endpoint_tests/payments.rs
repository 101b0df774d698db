use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use fdg_common::Secret;

use super::{
    helpers::{orders_api, send},
    mocks::{sample_order, MockDeliveryDb},
};
use crate::{
    data_objects::JsonResponse,
    helpers::calculate_hmac,
    middleware::{CallbackSignatureFactory, SIGNATURE_HEADER},
    routes::PaymentCallbackRoute,
};

const SECRET: &str = "callback-secret";
const CALLBACK: &str =
    r#"{"reference":"FDG-1","status":"success","amount":3700,"transaction_reference":"PSK-77120"}"#;

fn configure(db: MockDeliveryDb, hmac_checks: bool) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let signatures = CallbackSignatureFactory::new(Secret::new(SECRET.to_string()), hmac_checks);
        cfg.app_data(web::Data::new(orders_api(db))).service(
            web::scope("/payments").wrap(signatures).service(PaymentCallbackRoute::<MockDeliveryDb>::new()),
        );
    }
}

fn unpaid_backend() -> MockDeliveryDb {
    let mut db = MockDeliveryDb::new();
    db.expect_fetch_order_by_order_id().returning(|_| Ok(Some(sample_order("FDG-1", "alice"))));
    db
}

fn paying_backend() -> MockDeliveryDb {
    let mut db = unpaid_backend();
    db.expect_mark_order_paid()
        .withf(|id, s| id.as_str() == "FDG-1" && s.reference == "PSK-77120" && s.amount.value() == 3700)
        .times(1)
        .returning(|_, s| {
            let mut order = sample_order("FDG-1", "alice");
            order.paid = true;
            order.payment_reference = Some(s.reference.clone());
            order.paid_at = Some(s.paid_at);
            Ok(Some(order))
        });
    db
}

fn callback(body: &'static str) -> TestRequest {
    TestRequest::post().uri("/payments/callback").insert_header(("content-type", "application/json")).set_payload(body)
}

#[actix_web::test]
async fn unsigned_callbacks_are_rejected() {
    let _ = env_logger::try_init();
    let (status, body) = send(callback(CALLBACK), configure(MockDeliveryDb::new(), true)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "No payment signature found.");
}

#[actix_web::test]
async fn tampered_callbacks_are_rejected() {
    let _ = env_logger::try_init();
    let signature = calculate_hmac(SECRET, CALLBACK.as_bytes()).unwrap();
    let tampered = r#"{"reference":"FDG-1","status":"success","amount":1,"transaction_reference":"PSK-77120"}"#;
    let req = callback(tampered).insert_header((SIGNATURE_HEADER, signature));
    let (status, body) = send(req, configure(MockDeliveryDb::new(), true)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Invalid payment signature.");
}

#[actix_web::test]
async fn signed_callback_marks_the_order_paid() {
    let _ = env_logger::try_init();
    let signature = calculate_hmac(SECRET, CALLBACK.as_bytes()).unwrap();
    let req = callback(CALLBACK).insert_header((SIGNATURE_HEADER, signature));
    let (status, body) = send(req, configure(paying_backend(), true)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success);
    assert_eq!(response.message, "Order FDG-1 is paid.");
}

#[actix_web::test]
async fn signature_checks_can_be_disabled() {
    let _ = env_logger::try_init();
    let (status, _) = send(callback(CALLBACK), configure(paying_backend(), false)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn failed_payments_leave_the_order_unpaid() {
    let _ = env_logger::try_init();
    let failed = r#"{"reference":"FDG-1","status":"failed","amount":3700,"transaction_reference":"PSK-77121"}"#;
    let signature = calculate_hmac(SECRET, failed.as_bytes()).unwrap();
    let req = callback(failed).insert_header((SIGNATURE_HEADER, signature));
    // No mark_order_paid expectation: the mock panics if the order is written
    let (status, body) = send(req, configure(unpaid_backend(), true)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body.contains("The payment was failed"), "{body}");
}

#[actix_web::test]
async fn prefixed_signatures_are_accepted() {
    let _ = env_logger::try_init();
    let signature = format!("sha256={}", calculate_hmac(SECRET, CALLBACK.as_bytes()).unwrap());
    let req = callback(CALLBACK).insert_header((SIGNATURE_HEADER, signature));
    let (status, body) = send(req, configure(paying_backend(), true)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[actix_web::test]
async fn signed_bodies_that_are_not_callbacks_never_reach_the_engine() {
    let _ = env_logger::try_init();
    let body = r#"{"reference":"FDG-1","status":"refunded","amount":3700,"transaction_reference":"PSK-77122"}"#;
    let signature = calculate_hmac(SECRET, body.as_bytes()).unwrap();
    let req = callback(body).insert_header((SIGNATURE_HEADER, signature));
    // No expectations on the mock: any backend call panics
    let (status, body) = send(req, configure(MockDeliveryDb::new(), true)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("The callback is not a payment notification."), "{body}");
}

#[actix_web::test]
async fn garbled_signatures_are_rejected() {
    let _ = env_logger::try_init();
    let req = callback(CALLBACK).insert_header((SIGNATURE_HEADER, "sha256=%%%"));
    let (status, body) = send(req, configure(MockDeliveryDb::new(), true)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "The payment signature is not valid base64.");
}

#[actix_web::test]
async fn unsigned_garbage_is_rejected_even_without_signature_checks() {
    let _ = env_logger::try_init();
    let (status, _) = send(callback("not json"), configure(MockDeliveryDb::new(), false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

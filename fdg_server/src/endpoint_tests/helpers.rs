use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web::{Bytes, ServiceConfig},
    App,
};
use fdg_engine::{events::EventProducers, OrderFlowApi};
use log::debug;

use super::mocks::MockDeliveryDb;
use crate::auth::{ACTOR_HEADER, CUSTOMER_ID_HEADER};

/// The identity a test request is made with.
#[derive(Debug, Clone, Copy)]
pub enum As {
    Nobody,
    Operator,
    Customer(&'static str),
}

impl As {
    fn apply(self, mut req: TestRequest) -> TestRequest {
        match self {
            As::Nobody => {},
            As::Operator => req = req.insert_header((ACTOR_HEADER, "operator")),
            As::Customer(id) => {
                req = req.insert_header((ACTOR_HEADER, "customer")).insert_header((CUSTOMER_ID_HEADER, id));
            },
        }
        req
    }
}

pub fn orders_api(db: MockDeliveryDb) -> OrderFlowApi<MockDeliveryDb> {
    OrderFlowApi::new(db, EventProducers::default())
}

pub async fn get_request<F>(who: As, path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let req = who.apply(TestRequest::get().uri(path));
    send(req, configure).await
}

pub async fn post_request<F>(who: As, path: &str, body: serde_json::Value, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let req = who.apply(TestRequest::post().uri(path).set_json(body));
    send(req, configure).await
}

pub async fn send<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        // Errors raised by middleware, before a response exists
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap_or_else(|_| Bytes::new());
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

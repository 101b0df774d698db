//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use fdg_engine::{
    db_types::{Feedback, OrderId},
    engine_api::{feedback::OrderViewSession, payments::PaymentCallback},
    events::SyncScope,
    order_objects::{Actor, OrderQueryFilter, PlaceOrderRequest, TransitionRequest},
    traits::{DeliveryDatabase, DistanceResolver},
    DeliveryQuoteApi,
    OrderFlowApi,
};
use log::*;

use crate::{
    auth::{ActorRole, RequestActor},
    data_objects::{
        CancelParams,
        JsonResponse,
        OrderSearchParams,
        PaymentRequestParams,
        QuoteParams,
        RiderCodeCheck,
        RiderCodeParams,
        TransitionParams,
    },
    errors::{AuthError, ServerError},
    sse::{order_view_stream, sse_response, subscription_stream},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Quotes  ----------------------------------------------------
route!(quote => Get "/quote" impl DistanceResolver);
/// Route handler for delivery quotes
///
/// Prices a delivery from `branch_id` to `address`. Without an address, the provisional placeholder fee is returned.
/// If the distance service is unavailable, the fallback fee is quoted along with a `warning`.
pub async fn quote<R: DistanceResolver>(
    params: web::Query<QuoteParams>,
    api: web::Data<DeliveryQuoteApi<R>>,
) -> Result<HttpResponse, ServerError> {
    let QuoteParams { branch_id, address } = params.into_inner();
    debug!("💻️ GET quote from {branch_id}");
    let quote = api.quote(&branch_id, address.as_deref()).await?;
    Ok(HttpResponse::Ok().json(quote))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(place_order => Post "/orders" impl DeliveryDatabase, DistanceResolver);
/// Route handler for placing an order
///
/// Only customers can place orders. The delivery fee is re-quoted from the branch to the submitted address. The
/// client's own copy of the fee is never trusted.
pub async fn place_order<B: DeliveryDatabase, R: DistanceResolver>(
    actor: RequestActor,
    body: web::Json<PlaceOrderRequest>,
    orders: web::Data<OrderFlowApi<B>>,
    quotes: web::Data<DeliveryQuoteApi<R>>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = actor.customer_id()?;
    let request = body.into_inner();
    debug!("💻️ POST order for {customer_id} from {}", request.selected_branch_id);
    let quote = quotes.quote(&request.selected_branch_id, Some(&request.address)).await?;
    let placed = orders.place_order(customer_id, request, &quote).await?;
    Ok(HttpResponse::Created().json(placed))
}

route!(my_orders => Get "/orders" impl DeliveryDatabase where requires [ActorRole::Customer]);
/// Route handler for the orders endpoint
///
/// Customers fetch their own orders, oldest first, with this endpoint. Operators use `/search/orders` instead.
pub async fn my_orders<B: DeliveryDatabase>(
    actor: RequestActor,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = actor.customer_id()?;
    debug!("💻️ GET my_orders for {customer_id}");
    let orders = api.orders_for_customer(customer_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl DeliveryDatabase);
/// Route handler for a single order
///
/// Customers can only see their own orders; anyone else's order id is reported as not found. Viewing an order issues
/// its rider code if it does not have one yet.
pub async fn order_by_id<B: DeliveryDatabase>(
    actor: RequestActor,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET order {order_id} for {}", *actor);
    let order = api.fetch_order(&order_id, &actor).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(orders_search => Get "/search/orders" impl DeliveryDatabase where requires [ActorRole::Operator]);
/// Route handler for the order search endpoint
///
/// Operators can filter orders by `customer_id`, `status` (comma-separated), `since` and `until`.
pub async fn orders_search<B: DeliveryDatabase>(
    params: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let filter = OrderQueryFilter::try_from(params.into_inner())?;
    debug!("💻️ GET search orders. {filter}");
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Lifecycle  ----------------------------------------------------
route!(cancel_order => Post "/orders/{order_id}/cancel" impl DeliveryDatabase);
pub async fn cancel_order<B: DeliveryDatabase>(
    actor: RequestActor,
    path: web::Path<String>,
    body: Option<web::Json<CancelParams>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let observed = body.and_then(|b| b.into_inner().expected_status);
    info!("💻️ Cancel request for [{order_id}] from {}", *actor);
    let outcome = api.cancel_order(&order_id, &actor, observed).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(transition_order => Post "/orders/{order_id}/transition" impl DeliveryDatabase);
/// Route handler for status transitions
///
/// Forward transitions (`confirm`, `prepare`, `dispatch`, `deliver`) are for operators only. Customers may use this
/// endpoint to `cancel`.
pub async fn transition_order<B: DeliveryDatabase>(
    actor: RequestActor,
    path: web::Path<String>,
    body: web::Json<TransitionParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let TransitionParams { transition, expected_status } = body.into_inner();
    info!("💻️ '{transition}' request for [{order_id}] from {}", *actor);
    let mut request = TransitionRequest::new(order_id, transition, actor.into_inner());
    if let Some(status) = expected_status {
        request = request.observed(status);
    }
    let outcome = api.transition(request).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(verify_rider_code => Post "/orders/{order_id}/rider_code/verify" impl DeliveryDatabase where requires [ActorRole::Operator]);
pub async fn verify_rider_code<B: DeliveryDatabase>(
    path: web::Path<String>,
    body: web::Json<RiderCodeParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let valid = api.verify_rider_code(&order_id, &body.code).await?;
    debug!("💻️ Rider code check for [{order_id}]: {valid}");
    Ok(HttpResponse::Ok().json(RiderCodeCheck { valid }))
}

route!(submit_feedback => Post "/orders/{order_id}/feedback" impl DeliveryDatabase where requires [ActorRole::Customer]);
pub async fn submit_feedback<B: DeliveryDatabase>(
    actor: RequestActor,
    path: web::Path<String>,
    body: web::Json<Feedback>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ Feedback for [{order_id}] from {}", *actor);
    let order = api.submit_feedback(&order_id, &actor, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(payment_request => Post "/orders/{order_id}/payment" impl DeliveryDatabase);
/// Route handler for payment requests
///
/// Returns the parameters the client needs to invoke the payment gateway for the online portion of the order. The
/// order id is the payment reference.
pub async fn payment_request<B: DeliveryDatabase>(
    actor: RequestActor,
    path: web::Path<String>,
    body: web::Json<PaymentRequestParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ Payment request for [{order_id}] from {}", *actor);
    let request = api.payment_request(&order_id, &actor, &body.payer_email).await?;
    Ok(HttpResponse::Ok().json(request))
}

route!(payment_callback => Post "/callback" impl DeliveryDatabase);
/// Route handler for payment gateway callbacks
///
/// This route is mounted under `/payments` and is protected by the HMAC middleware.
pub async fn payment_callback<B: DeliveryDatabase>(
    body: web::Json<PaymentCallback>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let callback = body.into_inner();
    info!("💻️ Payment callback for [{}]: {}", callback.reference, callback.status);
    let order = api.process_payment_callback(callback).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {} is paid.", order.order_id))))
}

//----------------------------------------------   Live updates  ----------------------------------------------------
route!(order_events => Get "/orders/{order_id}/events" impl DeliveryDatabase);
/// Route handler for the live view of a single order
///
/// Streams change notifications for the order as server-sent events, plus a single `feedback_requested` event once
/// the order is delivered and still unrated.
pub async fn order_events<B: DeliveryDatabase + 'static>(
    actor: RequestActor,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ {} is watching [{order_id}]", *actor);
    let session = OrderViewSession::open(api.into_inner(), order_id, actor.into_inner()).await?;
    Ok(sse_response(order_view_stream(session)))
}

route!(customer_events => Get "/customers/{customer_id}/events" impl DeliveryDatabase);
/// Route handler for the live list of a customer's orders
///
/// Customers may only watch their own orders. Operators may watch any customer.
pub async fn customer_events<B: DeliveryDatabase>(
    actor: RequestActor,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = path.into_inner();
    if let Actor::Customer(id) = &*actor {
        if *id != customer_id {
            let e = AuthError::InsufficientPermissions("Customers can only watch their own orders".into());
            return Err(e.into());
        }
    }
    debug!("💻️ {} is watching the orders of {customer_id}", *actor);
    let subscription = api.sync_hub().subscribe(SyncScope::Customer(customer_id));
    Ok(sse_response(subscription_stream(subscription)))
}

route!(all_events => Get "/events" impl DeliveryDatabase where requires [ActorRole::Operator]);
pub async fn all_events<B: DeliveryDatabase>(api: web::Data<OrderFlowApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ An operator is watching all orders");
    let subscription = api.sync_hub().subscribe(SyncScope::AllOrders);
    Ok(sse_response(subscription_stream(subscription)))
}

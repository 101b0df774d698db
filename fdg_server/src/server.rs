use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use fdg_engine::{
    events::{EventHandlers, EventHooks, SyncHub},
    DeliveryQuoteApi,
    OrderFlowApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::MapsDistanceResolver,
    middleware::CallbackSignatureFactory,
    routes::{
        health,
        AllEventsRoute,
        CancelOrderRoute,
        CustomerEventsRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrderEventsRoute,
        OrdersSearchRoute,
        PaymentCallbackRoute,
        PaymentRequestRoute,
        PlaceOrderRoute,
        QuoteRoute,
        SubmitFeedbackRoute,
        TransitionOrderRoute,
        VerifyRiderCodeRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, logging_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let orders_api = OrderFlowApi::new(db, producers)
        .with_settings(config.order_settings.clone())
        .with_sync_hub(SyncHub::new());
    let resolver =
        MapsDistanceResolver::new(config.maps_config.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let quote_api =
        DeliveryQuoteApi::new(resolver, config.branches.clone(), config.fee_schedule.clone(), config.distance_timeout);
    let srv = create_server_instance(config, orders_api, quote_api)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Builds the HTTP server.
///
/// The order API is shared by every worker, so that per-order locks and live-update subscriptions span the whole
/// process.
pub fn create_server_instance(
    config: ServerConfig,
    orders_api: OrderFlowApi<SqliteDatabase>,
    quote_api: DeliveryQuoteApi<MapsDistanceResolver>,
) -> Result<Server, ServerError> {
    let orders_api = web::Data::new(orders_api);
    let quote_api = web::Data::new(quote_api);
    let webhook = config.payment_webhook.clone();
    let srv = HttpServer::new(move || {
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("fdg::access_log"))
            .app_data(orders_api.clone())
            .app_data(quote_api.clone());
        let api_scope = web::scope("/api")
            .service(QuoteRoute::<MapsDistanceResolver>::new())
            .service(PlaceOrderRoute::<SqliteDatabase, MapsDistanceResolver>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrdersSearchRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(TransitionOrderRoute::<SqliteDatabase>::new())
            .service(VerifyRiderCodeRoute::<SqliteDatabase>::new())
            .service(SubmitFeedbackRoute::<SqliteDatabase>::new())
            .service(PaymentRequestRoute::<SqliteDatabase>::new())
            .service(OrderEventsRoute::<SqliteDatabase>::new())
            .service(CustomerEventsRoute::<SqliteDatabase>::new())
            .service(AllEventsRoute::<SqliteDatabase>::new());
        let signatures = CallbackSignatureFactory::new(webhook.hmac_secret.clone(), webhook.hmac_checks);
        let payments_scope =
            web::scope("/payments").wrap(signatures).service(PaymentCallbackRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(payments_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Hooks that record lifecycle events in the log.
pub fn logging_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_placed(|ev| {
            Box::pin(async move {
                info!("📬️ Order [{}] placed by {} for {}", ev.order.order_id, ev.order.customer_id, ev.order.total);
            })
        })
        .on_status_changed(|ev| {
            Box::pin(async move {
                info!("📬️ Order [{}] moved from {} to {}", ev.order.order_id, ev.old_status, ev.new_status);
                if let Some(warning) = ev.warning {
                    warn!("📬️ [{}] {warning}", ev.order.order_id);
                }
            })
        })
        .on_order_paid(|ev| {
            Box::pin(async move {
                info!("📬️ Order [{}] paid {} online", ev.order.order_id, ev.order.amount_paid_online);
            })
        })
        .on_feedback_requested(|ev| {
            Box::pin(async move {
                debug!("📬️ Feedback requested for order [{}]", ev.order.order_id);
            })
        });
    hooks
}

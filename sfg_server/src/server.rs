use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use futures::FutureExt;
use log::*;
use mercadopago_tools::MercadoPagoApi;
use sfg_engine::{
    events::{EventHandlers, EventHooks, EventProducers, OrderApprovedEvent},
    sfg_api::inventory_api::DEFAULT_LOW_STOCK_THRESHOLD,
    CheckoutApi,
    CouponApi,
    FulfillmentApi,
    InventoryApi,
    ReconcileApi,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::mercadopago::MercadoPagoGateway,
    middleware::SignatureMiddlewareFactory,
    pending_worker::start_pending_worker,
    routes::{
        health,
        webhook_status,
        AdjustStockRoute,
        CheckoutRoute,
        CouponByCodeRoute,
        CouponUsageRoute,
        CouponsRoute,
        CreateCouponRoute,
        LowStockRoute,
        OrderByIdRoute,
        PaymentReturnRoute,
        PaymentWebhookRoute,
        ProductByIdRoute,
        ReconcileOrderRoute,
        SearchOrdersRoute,
        StockMovementsRoute,
        UpdateCouponRoute,
        UpdateFulfillmentRoute,
        UpsertProductRoute,
        ValidateCouponRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let api = MercadoPagoApi::new(config.mercadopago.api.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if !api.is_configured() {
        warn!("🚀️ SFG_MP_ACCESS_TOKEN is not set. Checkout will be refused until it is configured.");
    }
    let gateway = MercadoPagoGateway::new(api);
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, order_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    if config.pending_recheck_interval > 0 {
        let interval = Duration::from_secs(config.pending_recheck_interval);
        let _handle =
            start_pending_worker(db.clone(), gateway.clone(), producers.clone(), config.reconcile_options, interval);
    } else {
        info!("🚀️ The pending payment worker is disabled");
    }
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: MercadoPagoGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let return_urls = config.return_urls();
    let options = ServerOptions::from_config(&config);
    let reconcile_options = config.reconcile_options;
    let signatures = config.mercadopago.clone();
    info!("🚀️ Buyers return to {} and notifications go to {:?}", return_urls.success, return_urls.notification);
    let srv = HttpServer::new(move || {
        let reconcile_api = ReconcileApi::new(db.clone(), gateway.clone(), producers.clone(), reconcile_options);
        let checkout_api = CheckoutApi::new(db.clone(), gateway.clone(), return_urls.clone());
        let fulfillment_api = FulfillmentApi::new(db.clone());
        let coupon_api = CouponApi::new(db.clone());
        let inventory_api = InventoryApi::new(db.clone());
        let payment_scope = web::scope("/payment")
            .wrap(SignatureMiddlewareFactory::new(signatures.webhook_secret.clone(), signatures.signature_checks))
            .service(PaymentWebhookRoute::<SqliteDatabase, MercadoPagoGateway>::new())
            .service(PaymentReturnRoute::<SqliteDatabase, MercadoPagoGateway>::new())
            .service(webhook_status);
        let api_scope = web::scope("/api")
            .service(payment_scope)
            .service(CheckoutRoute::<SqliteDatabase, MercadoPagoGateway>::new())
            .service(SearchOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateFulfillmentRoute::<SqliteDatabase>::new())
            .service(ReconcileOrderRoute::<SqliteDatabase, MercadoPagoGateway>::new())
            .service(CouponsRoute::<SqliteDatabase>::new())
            .service(CreateCouponRoute::<SqliteDatabase>::new())
            .service(CouponByCodeRoute::<SqliteDatabase>::new())
            .service(UpdateCouponRoute::<SqliteDatabase>::new())
            .service(ValidateCouponRoute::<SqliteDatabase>::new())
            .service(CouponUsageRoute::<SqliteDatabase>::new())
            .service(UpsertProductRoute::<SqliteDatabase>::new())
            .service(LowStockRoute::<SqliteDatabase>::new())
            .service(ProductByIdRoute::<SqliteDatabase>::new())
            .service(AdjustStockRoute::<SqliteDatabase>::new())
            .service(StockMovementsRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sfg::access_log"))
            .app_data(web::Data::new(reconcile_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(fulfillment_api))
            .app_data(web::Data::new(coupon_api))
            .app_data(web::Data::new(inventory_api))
            .app_data(web::Data::new(options))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// The server's own reaction to approved orders: a log line, plus a warning for stock that is running low.
fn order_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_approved(|event: OrderApprovedEvent| {
        async move {
            let order = &event.order;
            info!(
                "🪝️ Order #{} ({}) for {} was paid. {} to {}",
                order.id, order.external_reference, order.total, order.delivery, order.customer.email
            );
            for movement in event.movements.iter().filter(|m| m.stock_after <= DEFAULT_LOW_STOCK_THRESHOLD) {
                warn!("📦️ {} is running low. {} unit(s) left", movement.product_id, movement.stock_after);
            }
        }
        .boxed()
    });
    hooks
}

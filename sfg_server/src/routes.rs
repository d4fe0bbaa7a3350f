//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (database queries, calls to the
//! payment provider) must be awaited, never blocked on.
//!
//! Admin routes carry no authentication of their own. Deployments put them behind an authenticating proxy.
use std::collections::HashMap;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use serde_json::json;
use sfg_engine::{
    db_types::{CouponUpdate, NewCoupon, NewProduct, ProductId},
    order_objects::OrderQueryFilter,
    traits::{
        CheckoutDatabase,
        CouponManagement,
        InventoryManagement,
        OrderManagement,
        PaymentGateway,
        ReconciliationStore,
    },
    CheckoutApi,
    CheckoutRequest,
    CouponApi,
    FulfillmentApi,
    InventoryApi,
    ReconcileApi,
};

use crate::{
    config::ServerOptions,
    data_objects::{
        FulfillmentUpdateRequest,
        JsonResponse,
        LowStockQuery,
        MovementsQuery,
        PaymentReturnQuery,
        StockRequest,
        WebhookAck,
    },
    errors::ServerError,
    helpers::get_remote_ip,
    webhook::{NormalizedNotification, WebhookNotification},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
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
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Webhook  ----------------------------------------------------
#[get("/webhook")]
pub async fn webhook_status() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "Webhook endpoint is active" }))
}

route!(payment_webhook => Post "/webhook" impl ReconciliationStore, PaymentGateway);
/// Route handler for payment notifications from the payment provider.
///
/// The notification is only a hint that something changed for a payment. The payment's status is always looked up
/// with the provider before any order is touched.
///
/// * `400` if no payment notification could be read from the request.
/// * `200` for everything that was handled, including duplicates, unknown payments and notifications that are
///   deliberately ignored. The provider must not retry these.
/// * `500` if reconciliation failed, so that the provider delivers the notification again.
pub async fn payment_webhook<B, G>(
    req: HttpRequest,
    query: web::Query<HashMap<String, String>>,
    body: web::Bytes,
    api: web::Data<ReconcileApi<B, G>>,
    options: Option<web::Data<ServerOptions>>,
) -> Result<HttpResponse, ServerError>
where
    B: ReconciliationStore,
    G: PaymentGateway,
{
    let options = options.map(|o| *o.get_ref()).unwrap_or_default();
    let remote_ip = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    debug!("🪝️ Received payment notification from {remote_ip:?}");
    let notification = WebhookNotification::parse(&query, &body)?;
    trace!("🪝️ Notification: {notification:?}");
    match notification.normalize()? {
        NormalizedNotification::Ignored { reason } => {
            info!("🪝️ {reason}");
            Ok(HttpResponse::Ok().json(JsonResponse::success(reason)))
        },
        NormalizedNotification::Payment { payment_id } => {
            let outcome = api.process_payment_notification(&payment_id).await?;
            info!("🪝️ Notification for payment {payment_id} handled. {outcome}");
            Ok(HttpResponse::Ok().json(WebhookAck::processed(outcome)))
        },
    }
}

route!(payment_return => Get "/return" impl ReconciliationStore, PaymentGateway);
/// Called by the storefront's return pages with the query string the payment provider redirected the buyer with,
/// e.g. `/api/payment/return?payment_id=1319718851&external_reference=sale_1718900000000_004821&status=approved`.
/// The status in the query is never used.
pub async fn payment_return<B, G>(
    query: web::Query<PaymentReturnQuery>,
    api: web::Data<ReconcileApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: ReconciliationStore,
    G: PaymentGateway,
{
    let reference = query
        .external_reference()
        .ok_or_else(|| ServerError::InvalidRequestBody("external_reference is required".into()))?;
    let payment_id =
        query.payment_id().ok_or_else(|| ServerError::InvalidRequestBody("payment_id is required".into()))?;
    debug!("🔄️ Buyer returned from checkout for {reference} with payment {payment_id}");
    let result = api.record_payment_return(reference, payment_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl CheckoutDatabase, PaymentGateway);
/// Starts a checkout: validates and prices the cart, opens a hosted checkout session with the payment provider and
/// stores the pending order. The response carries the order and the URL the buyer must be sent to.
pub async fn checkout<B, G>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutDatabase,
    G: PaymentGateway,
{
    let request = body.into_inner();
    debug!("🛒️ POST checkout for {} line(s)", request.items.len());
    let result = api.start_checkout(request).await.map_err(|e| {
        warn!("🛒️ Checkout failed. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/orders/{id}" impl OrderManagement);
pub async fn order_by_id<B: OrderManagement>(
    path: web::Path<i64>,
    api: web::Data<FulfillmentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET order {id}");
    let order = api.fetch_order(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {id}")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(search_orders => Get "/orders" impl OrderManagement);
/// Searches orders by field equality, e.g. `/api/orders?payment_status=pending&customer_email=ana@example.com`.
/// Results are returned oldest first.
pub async fn search_orders<B: OrderManagement>(
    query: web::Query<OrderQueryFilter>,
    api: web::Data<FulfillmentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    debug!("💻️ GET orders matching {query:?}");
    let orders = api.search_orders(query).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(update_fulfillment => Patch "/orders/{id}/fulfillment" impl OrderManagement);
pub async fn update_fulfillment<B: OrderManagement>(
    path: web::Path<i64>,
    body: web::Json<FulfillmentUpdateRequest>,
    api: web::Data<FulfillmentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let FulfillmentUpdateRequest { status, admin_id, note } = body.into_inner();
    if admin_id.trim().is_empty() {
        return Err(ServerError::InvalidRequestBody("admin_id is required".into()));
    }
    debug!("🚚️ PATCH order {id} fulfillment to {status}");
    let order = api.update_fulfillment(id, status, &admin_id, note).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(reconcile_order => Post "/orders/{id}/reconcile" impl ReconciliationStore, PaymentGateway);
/// Runs an order that already knows its payment id through reconciliation again.
pub async fn reconcile_order<B, G>(
    path: web::Path<i64>,
    api: web::Data<ReconcileApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: ReconciliationStore,
    G: PaymentGateway,
{
    let id = path.into_inner();
    debug!("🔄️ POST reconcile order {id}");
    let outcome = api.reconcile_order(id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

//----------------------------------------------   Coupons  ----------------------------------------------------
route!(coupons => Get "/coupons" impl CouponManagement);
pub async fn coupons<B: CouponManagement>(api: web::Data<CouponApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("🎟️ GET coupons");
    let coupons = api.list_coupons().await?;
    Ok(HttpResponse::Ok().json(coupons))
}

route!(create_coupon => Post "/coupons" impl CouponManagement);
pub async fn create_coupon<B: CouponManagement>(
    body: web::Json<NewCoupon>,
    api: web::Data<CouponApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let coupon = api.create_coupon(body.into_inner()).await?;
    info!("🎟️ Coupon {} created", coupon.code);
    Ok(HttpResponse::Created().json(coupon))
}

route!(coupon_by_code => Get "/coupons/{code}" impl CouponManagement);
pub async fn coupon_by_code<B: CouponManagement>(
    path: web::Path<String>,
    api: web::Data<CouponApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let coupon = api.fetch_coupon(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(coupon))
}

route!(update_coupon => Patch "/coupons/{code}" impl CouponManagement);
pub async fn update_coupon<B: CouponManagement>(
    path: web::Path<String>,
    body: web::Json<CouponUpdate>,
    api: web::Data<CouponApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let code = path.into_inner();
    let update = body.into_inner();
    if update.is_empty() {
        return Err(ServerError::InvalidRequestBody("the update does not change anything".into()));
    }
    debug!("🎟️ PATCH coupon {code}");
    let coupon = api.update_coupon(&code, update).await?;
    Ok(HttpResponse::Ok().json(coupon))
}

route!(validate_coupon => Get "/coupons/{code}/validate" impl CouponManagement);
/// Checks whether a coupon can be used right now. Storefronts call this before showing a discounted total.
pub async fn validate_coupon<B: CouponManagement>(
    path: web::Path<String>,
    api: web::Data<CouponApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let coupon = api.validate_coupon(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(coupon))
}

route!(coupon_usage => Get "/coupons/{code}/usage" impl CouponManagement);
pub async fn coupon_usage<B: CouponManagement>(
    path: web::Path<String>,
    api: web::Data<CouponApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let usage = api.usage_history(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(usage))
}

//----------------------------------------------   Products  ----------------------------------------------------
route!(upsert_product => Post "/products" impl InventoryManagement);
pub async fn upsert_product<B: InventoryManagement>(
    body: web::Json<NewProduct>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.upsert_product(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(low_stock => Get "/products/low_stock" impl InventoryManagement);
pub async fn low_stock<B: InventoryManagement>(
    query: web::Query<LowStockQuery>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let products = api.low_stock(query.threshold).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(product_by_id => Get "/products/{id}" impl InventoryManagement);
pub async fn product_by_id<B: InventoryManagement>(
    path: web::Path<String>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = ProductId::from(path.into_inner());
    let product = api.fetch_product(&id).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(adjust_stock => Post "/products/{id}/stock" impl InventoryManagement);
/// Sets the stock of a product (`{"action": "set_to", "quantity": 10, "user_id": "admin"}`) or records an intake
/// (`{"action": "intake", ...}`).
pub async fn adjust_stock<B: InventoryManagement>(
    path: web::Path<String>,
    body: web::Json<StockRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = ProductId::from(path.into_inner());
    let request = body.into_inner();
    if request.user_id.trim().is_empty() {
        return Err(ServerError::InvalidRequestBody("user_id is required".into()));
    }
    let movement = api.adjust(&id, request.adjustment(), &request.user_id, request.note).await?;
    Ok(HttpResponse::Ok().json(movement))
}

route!(stock_movements => Get "/products/{id}/movements" impl InventoryManagement);
pub async fn stock_movements<B: InventoryManagement>(
    path: web::Path<String>,
    query: web::Query<MovementsQuery>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = ProductId::from(path.into_inner());
    let movements = api.stock_history(&id, query.limit).await?;
    Ok(HttpResponse::Ok().json(movements))
}

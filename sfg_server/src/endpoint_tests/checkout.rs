use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use sfg_engine::{
    db_types::{Coupon, FulfillmentStatus, Money, NewOrder, Order, PaymentStatus},
    traits::{CheckoutSession, GatewayError, ReturnUrls},
    CheckoutApi,
};

use super::{
    helpers::{order, product, send_request},
    mocks::{MockGateway, MockStorefront},
};
use crate::routes::CheckoutRoute;

fn configure(store: MockStorefront, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = CheckoutApi::new(store, gateway, ReturnUrls::from_base_url("https://tienda.example.com"));
        cfg.app_data(web::Data::new(api)).service(CheckoutRoute::<MockStorefront, MockGateway>::new());
    }
}

fn checkout_request(quantity: i64, coupon_code: Option<&str>) -> TestRequest {
    TestRequest::post().uri("/checkout").set_json(json!({
        "items": [{ "product_id": "yerba-1kg", "quantity": quantity }],
        "customer": {
            "name": "Ana López",
            "email": "ana@example.com",
            "phone": "+54 11 5555-1234",
            "address": "Av. Corrientes 1234, CABA"
        },
        "delivery": "home_delivery",
        "delivery_window": "tarde",
        "coupon_code": coupon_code
    }))
}

fn store_with_stock(stock: i64) -> MockStorefront {
    let mut store = MockStorefront::new();
    store.expect_fetch_product().returning(move |id| Ok(Some(product(id.as_str(), stock))));
    store
}

/// What the store hands back for a freshly inserted order.
fn stored(new_order: NewOrder) -> Order {
    let mut order = order(31, PaymentStatus::Pending, FulfillmentStatus::AwaitingShipment);
    order.external_reference = new_order.external_reference;
    order.checkout_session_id = new_order.checkout_session_id;
    order.payment_id = None;
    order.customer = new_order.customer;
    order.delivery = new_order.delivery;
    order.delivery_window = new_order.delivery_window;
    order.comments = new_order.comments;
    order.items = new_order.items;
    order.subtotal = new_order.subtotal;
    order.shipping_total = new_order.shipping_total;
    order.total = new_order.total;
    order.coupon = new_order.coupon;
    order
}

fn session() -> CheckoutSession {
    CheckoutSession {
        session_id: "123456789-6f0b2a7e".into(),
        checkout_url: "https://www.mercadopago.com.ar/checkout/v1/redirect?pref_id=123456789-6f0b2a7e".into(),
    }
}

#[actix_web::test]
async fn successful_checkout() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_stock(10);
    store
        .expect_insert_order()
        .withf(|o| {
            o.checkout_session_id.as_deref() == Some("123456789-6f0b2a7e") &&
                o.external_reference.starts_with("sale_") &&
                o.total == Money::from_pesos(10_000)
        })
        .times(1)
        .returning(|o| Ok(stored(o)));
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_checkout_session()
        .withf(|req| {
            req.items.len() == 1 &&
                req.items[0].quantity == 2 &&
                req.items[0].unit_price == Money::from_pesos(5_000) &&
                req.payer.email == "ana@example.com" &&
                req.return_urls.notification.as_deref() == Some("https://tienda.example.com/api/payment/webhook")
        })
        .times(1)
        .returning(|_| Ok(session()));
    let (status, body) = send_request(checkout_request(2, None), configure(store, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["order"]["id"], 31);
    assert_eq!(result["order"]["payment_status"], "pending");
    assert_eq!(result["order"]["total"], 1_000_000);
    assert_eq!(result["session"]["session_id"], "123456789-6f0b2a7e");
    assert!(result["session"]["checkout_url"].as_str().unwrap().contains("pref_id=123456789-6f0b2a7e"));
}

#[actix_web::test]
async fn discounted_carts_are_charged_as_one_line() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_stock(10);
    store.expect_fetch_coupon_by_code().withf(|code| code == "INVIERNO-15").times(1).returning(|code| {
        let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Ok(Some(Coupon {
            id: 4,
            code: code.to_string(),
            discount_percent: 15,
            active: true,
            usage_limit: None,
            usage_count: 0,
            description: None,
            created_at,
            updated_at: created_at,
        }))
    });
    store.expect_insert_order().times(1).returning(|o| Ok(stored(o)));
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_checkout_session()
        .withf(|req| {
            req.items.len() == 1 && req.items[0].quantity == 1 && req.items[0].unit_price == Money::from(850_000)
        })
        .times(1)
        .returning(|_| Ok(session()));
    let (status, body) = send_request(checkout_request(2, Some("invierno-15")), configure(store, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["order"]["total"], 850_000);
    assert_eq!(result["order"]["coupon"]["code"], "INVIERNO-15");
    assert_eq!(result["order"]["coupon"]["discount_amount"], 150_000);
    assert_eq!(result["order"]["coupon"]["original_total"], 1_000_000);
}

#[actix_web::test]
async fn insufficient_stock_lists_the_shortfall() {
    let _ = env_logger::try_init().ok();
    // No gateway expectations: a cart that cannot be filled never reaches the payment provider
    let store = store_with_stock(1);
    let (status, body) = send_request(checkout_request(3, None), configure(store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let err: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["error"], "Not enough stock to complete the order");
    assert_eq!(err["details"][0]["product_id"], "yerba-1kg");
    assert_eq!(err["details"][0]["requested"], 3);
    assert_eq!(err["details"][0]["available"], 1);
}

#[actix_web::test]
async fn unconfigured_gateway() {
    let _ = env_logger::try_init().ok();
    let store = store_with_stock(10);
    let mut gateway = MockGateway::new();
    gateway.expect_create_checkout_session().times(1).returning(|_| Err(GatewayError::GatewayUnconfigured));
    let (status, body) = send_request(checkout_request(2, None), configure(store, gateway)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("Checkout is unavailable"), "{body}");
}

#[actix_web::test]
async fn gateway_rejections() {
    let _ = env_logger::try_init().ok();
    let store = store_with_stock(10);
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_checkout_session()
        .returning(|_| Err(GatewayError::GatewayRejected("invalid payer email".into())));
    let (status, body) = send_request(checkout_request(2, None), configure(store, gateway)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("invalid payer email"), "{body}");
}

#[actix_web::test]
async fn empty_carts() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/checkout").set_json(json!({
        "items": [],
        "customer": { "name": "Ana López", "email": "ana@example.com", "phone": "" }
    }));
    let (status, body) = send_request(req, configure(MockStorefront::new(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("The cart is empty"), "{body}");
}

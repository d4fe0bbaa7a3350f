use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use serde_json::Value;
use sfg_common::{GatewayStatus, PaymentReport, Secret};
use sfg_engine::{
    db_types::{FulfillmentStatus, Order, PaymentStatus, WebhookRecord, WebhookRecordStatus},
    events::EventProducers,
    traits::{ApprovalResult, StoreError},
    ReconcileApi,
    ReconcileOptions,
};

use super::{
    helpers::{order, send_request},
    mocks::{MockGateway, MockReconcileStore},
};
use crate::{
    helpers::{calculate_signature, signature_manifest},
    middleware::{SignatureMiddlewareFactory, REQUEST_ID_HEADER, SIGNATURE_HEADER},
    routes::{webhook_status, PaymentReturnRoute, PaymentWebhookRoute},
};

const SECRET: &str = "b1f0c2d9e8a7";
const PAYMENT_NOTIFICATION: &str = r#"{"action":"payment.updated","type":"payment","data":{"id":"1319718807"}}"#;

fn configure(
    store: MockReconcileStore,
    gateway: MockGateway,
    signature_checks: bool,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = ReconcileApi::new(store, gateway, EventProducers::default(), ReconcileOptions::default());
        cfg.app_data(web::Data::new(api)).service(
            web::scope("/payment")
                .wrap(SignatureMiddlewareFactory::new(Secret::new(SECRET.to_string()), signature_checks))
                .service(PaymentWebhookRoute::<MockReconcileStore, MockGateway>::new())
                .service(PaymentReturnRoute::<MockReconcileStore, MockGateway>::new())
                .service(webhook_status),
        );
    }
}

fn gateway_reporting(status: GatewayStatus) -> MockGateway {
    gateway_reporting_times(status, 1)
}

fn gateway_reporting_times(status: GatewayStatus, times: usize) -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway
        .expect_payment_status()
        .times(times)
        .returning(move |_| PaymentReport::new(status).with_external_reference("sale_1718029800000_000007"));
    gateway
}

/// Order 7 before the buyer came back from the checkout.
fn unlinked_order() -> Order {
    let mut pending = order(7, PaymentStatus::Pending, FulfillmentStatus::AwaitingShipment);
    pending.payment_id = None;
    pending
}

fn record(id: i64, payment_id: &str, status: WebhookRecordStatus) -> WebhookRecord {
    let now = Utc::now();
    WebhookRecord { id, payment_id: payment_id.to_string(), status, created_at: now, updated_at: now }
}

fn notification() -> TestRequest {
    TestRequest::post()
        .uri("/payment/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(PAYMENT_NOTIFICATION)
}

#[actix_web::test]
async fn webhook_liveness() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/payment/webhook");
    let (status, body) = send_request(req, configure(MockReconcileStore::new(), MockGateway::new(), true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"message":"Webhook endpoint is active"}"#);
}

#[actix_web::test]
async fn unreadable_notification() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/payment/webhook").set_payload("{}");
    let (status, body) = send_request(req, configure(MockReconcileStore::new(), MockGateway::new(), false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid webhook data"}"#);
}

#[actix_web::test]
async fn unknown_topic() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/payment/webhook?topic=chargebacks&id=77");
    let (status, body) = send_request(req, configure(MockReconcileStore::new(), MockGateway::new(), false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid webhook data"}"#);
}

#[actix_web::test]
async fn merchant_orders_are_acknowledged_and_ignored() {
    let _ = env_logger::try_init().ok();
    // Neither mock has expectations, so any store or gateway call fails the test
    let req = TestRequest::post().uri("/payment/webhook?topic=merchant_order&id=18472943");
    let (status, body) = send_request(req, configure(MockReconcileStore::new(), MockGateway::new(), false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"merchant_order ignored"}"#);
}

#[actix_web::test]
async fn pending_payments_change_nothing() {
    let _ = env_logger::try_init().ok();
    let gateway = gateway_reporting(GatewayStatus::Pending);
    let req = TestRequest::post().uri("/payment/webhook?type=payment&data.id=1319718807");
    let (status, body) = send_request(req, configure(MockReconcileStore::new(), gateway, false)).await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["success"], true);
    assert_eq!(ack["outcome"]["outcome"], "not_approved");
    assert_eq!(ack["outcome"]["status"], "pending");
    assert_eq!(ack["message"], "Payment 1319718807 is pending. No changes made");
    assert!(ack["timestamp"].is_string());
}

#[actix_web::test]
async fn duplicate_notifications_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let gateway = gateway_reporting(GatewayStatus::Approved);
    let mut store = MockReconcileStore::new();
    store
        .expect_fetch_webhook_records()
        .withf(|id, status| id == "1319718807" && *status == Some(WebhookRecordStatus::Completed))
        .times(1)
        .returning(|id, _| Ok(vec![record(3, id, WebhookRecordStatus::Completed)]));
    let (status, body) = send_request(notification(), configure(store, gateway, false)).await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["outcome"]["outcome"], "already_completed");
    assert_eq!(ack["outcome"]["payment_id"], "1319718807");
}

#[actix_web::test]
async fn approved_payment_approves_the_order() {
    let _ = env_logger::try_init().ok();
    let gateway = gateway_reporting(GatewayStatus::Approved);
    let mut store = MockReconcileStore::new();
    store
        .expect_fetch_webhook_records()
        .withf(|_, status| *status == Some(WebhookRecordStatus::Completed))
        .times(1)
        .returning(|_, _| Ok(vec![]));
    store.expect_insert_webhook_record().times(1).returning(|id| Ok(record(11, id, WebhookRecordStatus::Processing)));
    store
        .expect_fetch_webhook_records()
        .withf(|_, status| *status == Some(WebhookRecordStatus::Processing))
        .times(1)
        .returning(|id, _| Ok(vec![record(11, id, WebhookRecordStatus::Processing)]));
    store.expect_search_orders().times(1).returning(|_| {
        let mut pending = order(7, PaymentStatus::Pending, FulfillmentStatus::AwaitingShipment);
        pending.payment_id = Some("1319718807".into());
        Ok(vec![pending])
    });
    store.expect_approve_order().withf(|id| *id == 7).times(1).returning(|id| {
        let approved = order(id, PaymentStatus::Approved, FulfillmentStatus::AwaitingShipment);
        Ok(Some(ApprovalResult { order: approved, movements: vec![], coupon_usage: None }))
    });
    store
        .expect_update_webhook_record()
        .withf(|id, status| *id == 11 && *status == WebhookRecordStatus::Completed)
        .times(1)
        .returning(|_, _| Ok(()));
    let (status, body) = send_request(notification(), configure(store, gateway, false)).await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["outcome"]["outcome"], "approved");
    assert_eq!(ack["outcome"]["order_id"], 7);
    assert_eq!(ack["message"], "Order 7 approved by payment 1319718807");
}

#[actix_web::test]
async fn store_failures_ask_for_a_retry() {
    let _ = env_logger::try_init().ok();
    let gateway = gateway_reporting(GatewayStatus::Approved);
    let mut store = MockReconcileStore::new();
    store
        .expect_fetch_webhook_records()
        .times(1)
        .returning(|_, _| Err(StoreError::DatabaseError("database is locked".into())));
    let (status, body) = send_request(notification(), configure(store, gateway, false)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("database is locked"), "{body}");
}

#[actix_web::test]
async fn unsigned_notifications_are_refused() {
    let _ = env_logger::try_init().ok();
    let app = configure(MockReconcileStore::new(), MockGateway::new(), true);
    let (status, _) = send_request(notification(), app).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn badly_signed_notifications_are_refused() {
    let _ = env_logger::try_init().ok();
    let manifest = signature_manifest(Some("1319718807"), Some("req-4b1d"), "1704908010");
    let signature = calculate_signature("not-the-secret", &manifest).unwrap();
    let req = notification()
        .insert_header((REQUEST_ID_HEADER, "req-4b1d"))
        .insert_header((SIGNATURE_HEADER, format!("ts=1704908010,v1={signature}")));
    let (status, _) = send_request(req, configure(MockReconcileStore::new(), MockGateway::new(), true)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn signed_notifications_reach_the_reconciler() {
    let _ = env_logger::try_init().ok();
    let manifest = signature_manifest(Some("1319718807"), Some("req-4b1d"), "1704908010");
    let signature = calculate_signature(SECRET, &manifest).unwrap();
    let req = notification()
        .insert_header((REQUEST_ID_HEADER, "req-4b1d"))
        .insert_header((SIGNATURE_HEADER, format!("ts=1704908010,v1={signature}")));
    let gateway = gateway_reporting(GatewayStatus::Pending);
    let (status, body) = send_request(req, configure(MockReconcileStore::new(), gateway, true)).await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["outcome"]["outcome"], "not_approved");
}

#[actix_web::test]
async fn malformed_payment_ids_are_refused() {
    let _ = env_logger::try_init().ok();
    // Would reach an unrelated provider resource if it were put into a URL
    let req = TestRequest::post()
        .uri("/payment/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(r#"{"type":"payment","data":{"id":"999/"}}"#);
    let (status, body) = send_request(req, configure(MockReconcileStore::new(), MockGateway::new(), false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid webhook data"}"#);

    let req = TestRequest::post().uri("/payment/webhook?topic=payment&id=999%3Fx");
    let (status, _) = send_request(req, configure(MockReconcileStore::new(), MockGateway::new(), false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn checkout_return_links_the_payment() {
    let _ = env_logger::try_init().ok();
    // Once to confirm the payment belongs to the order, once more to reconcile it
    let gateway = gateway_reporting_times(GatewayStatus::Pending, 2);
    let mut store = MockReconcileStore::new();
    store.expect_search_orders().times(1).returning(|_| Ok(vec![unlinked_order()]));
    store.expect_bind_payment_id().withf(|id, payment_id| *id == 7 && payment_id == "1319718807").times(1).returning(
        |_, payment_id| {
            let mut linked = unlinked_order();
            linked.payment_id = Some(payment_id.to_string());
            Ok(Some(linked))
        },
    );
    // The buyer's claim of an approved payment carries no weight
    let req = TestRequest::get().uri(
        "/payment/return?collection_id=1319718807&payment_id=1319718807&status=approved&\
         external_reference=sale_1718029800000_000007",
    );
    let (status, body) = send_request(req, configure(store, gateway, true)).await;
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["result"], "linked");
    assert_eq!(result["order_id"], 7);
    assert_eq!(result["outcome"]["outcome"], "not_approved");
    assert_eq!(result["outcome"]["status"], "pending");
}

#[actix_web::test]
async fn checkout_return_for_someone_elses_payment() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockGateway::new();
    gateway.expect_payment_status().times(1).returning(|_| {
        PaymentReport::new(GatewayStatus::Approved).with_external_reference("sale_1718029800000_000099")
    });
    let mut store = MockReconcileStore::new();
    store.expect_search_orders().times(1).returning(|_| Ok(vec![unlinked_order()]));
    let req = TestRequest::get()
        .uri("/payment/return?payment_id=1319718899&external_reference=sale_1718029800000_000007&status=approved");
    let (status, body) = send_request(req, configure(store, gateway, false)).await;
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["result"], "unconfirmed");
    assert_eq!(result["payment_id"], "1319718899");
}

#[actix_web::test]
async fn checkout_return_needs_usable_parameters() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/payment/return?payment_id=999%2F&external_reference=sale_1718029800000_000007");
    let (status, body) = send_request(req, configure(MockReconcileStore::new(), MockGateway::new(), false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("not a valid payment id"), "{body}");

    let req = TestRequest::get().uri("/payment/return?payment_id=null&external_reference=sale_1718029800000_000007");
    let (status, body) = send_request(req, configure(MockReconcileStore::new(), MockGateway::new(), false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("payment_id is required"), "{body}");

    let req = TestRequest::get().uri("/payment/return?payment_id=1319718807");
    let (status, _) = send_request(req, configure(MockReconcileStore::new(), MockGateway::new(), false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use sfg_engine::{
    db_types::{Coupon, CouponUsage, Money},
    traits::StoreError,
    CouponApi,
};

use super::{helpers::send_request, mocks::MockStorefront};
use crate::routes::{
    CouponByCodeRoute,
    CouponUsageRoute,
    CouponsRoute,
    CreateCouponRoute,
    UpdateCouponRoute,
    ValidateCouponRoute,
};

fn configure(store: MockStorefront) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(CouponApi::new(store)))
            .service(CouponsRoute::<MockStorefront>::new())
            .service(CreateCouponRoute::<MockStorefront>::new())
            .service(CouponByCodeRoute::<MockStorefront>::new())
            .service(UpdateCouponRoute::<MockStorefront>::new())
            .service(ValidateCouponRoute::<MockStorefront>::new())
            .service(CouponUsageRoute::<MockStorefront>::new());
    }
}

fn coupon(code: &str, active: bool, usage_limit: Option<i64>, usage_count: i64) -> Coupon {
    let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    Coupon {
        id: 4,
        code: code.to_string(),
        discount_percent: 15,
        active,
        usage_limit,
        usage_count,
        description: Some("Invierno".into()),
        created_at,
        updated_at: created_at,
    }
}

#[actix_web::test]
async fn create_coupon_normalizes_the_code() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store
        .expect_insert_coupon()
        .withf(|c| c.code == "INVIERNO-15" && c.discount_percent == 15 && c.usage_limit == Some(100))
        .times(1)
        .returning(|c| Ok(coupon(&c.code, true, c.usage_limit, 0)));
    let req = TestRequest::post()
        .uri("/coupons")
        .set_json(json!({ "code": " invierno-15 ", "discount_percent": 15, "usage_limit": 100 }));
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::CREATED);
    let coupon: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(coupon["code"], "INVIERNO-15");
    assert_eq!(coupon["usage_count"], 0);
}

#[actix_web::test]
async fn create_coupon_rejects_bad_discounts() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/coupons").set_json(json!({ "code": "TODOGRATIS", "discount_percent": 120 }));
    let (status, body) = send_request(req, configure(MockStorefront::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("not 120"), "{body}");
}

#[actix_web::test]
async fn duplicate_coupons_conflict() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store.expect_insert_coupon().returning(|c| Err(StoreError::CouponAlreadyExists(c.code)));
    let req = TestRequest::post().uri("/coupons").set_json(json!({ "code": "VERANO", "discount_percent": 10 }));
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Coupon VERANO already exists"), "{body}");
}

#[actix_web::test]
async fn empty_updates_are_refused() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::patch().uri("/coupons/VERANO").set_json(json!({}));
    let (status, body) = send_request(req, configure(MockStorefront::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("does not change anything"), "{body}");
}

#[actix_web::test]
async fn deactivate_coupon() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store
        .expect_update_coupon()
        .withf(|code, update| code == "VERANO" && update.active == Some(false) && update.discount_percent.is_none())
        .times(1)
        .returning(|code, _| Ok(coupon(code, false, None, 3)));
    let req = TestRequest::patch().uri("/coupons/verano").set_json(json!({ "active": false }));
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let coupon: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(coupon["active"], false);
}

#[actix_web::test]
async fn exhausted_coupons_do_not_validate() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store.expect_fetch_coupon_by_code().returning(|code| Ok(Some(coupon(code, true, Some(10), 10))));
    let (status, body) = send_request(TestRequest::get().uri("/coupons/VERANO/validate"), configure(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("reached its usage limit"), "{body}");
}

#[actix_web::test]
async fn valid_coupon() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store.expect_fetch_coupon_by_code().returning(|code| Ok(Some(coupon(code, true, Some(10), 2))));
    let (status, body) = send_request(TestRequest::get().uri("/coupons/verano/validate"), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let coupon: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(coupon["code"], "VERANO");
    assert_eq!(coupon["discount_percent"], 15);
}

#[actix_web::test]
async fn usage_of_unknown_coupon() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store.expect_fetch_coupon_by_code().returning(|_| Ok(None));
    let (status, body) = send_request(TestRequest::get().uri("/coupons/OTONO/usage"), configure(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Coupon OTONO does not exist"), "{body}");
}

#[actix_web::test]
async fn usage_history() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store.expect_fetch_coupon_by_code().returning(|code| Ok(Some(coupon(code, true, None, 1))));
    store.expect_fetch_coupon_usages().withf(|id| *id == 4).times(1).returning(|coupon_id| {
        Ok(vec![CouponUsage {
            id: 1,
            coupon_id,
            code: "VERANO".into(),
            order_id: 42,
            customer_email: "ana@example.com".into(),
            discount_percent: 15,
            original_total: Money::from_pesos(10000),
            discount_amount: Money::from_pesos(1500),
            used_at: Utc.with_ymd_and_hms(2024, 6, 10, 15, 0, 0).unwrap(),
        }])
    });
    let (status, body) = send_request(TestRequest::get().uri("/coupons/VERANO/usage"), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let usage: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0]["order_id"], 42);
    assert_eq!(usage[0]["discount_amount"], 150000);
}

#[actix_web::test]
async fn list_coupons() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store.expect_fetch_coupons().times(1).returning(|| Ok(vec![coupon("VERANO", true, None, 0)]));
    let (status, body) = send_request(TestRequest::get().uri("/coupons"), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let coupons: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(coupons[0]["code"], "VERANO");
}

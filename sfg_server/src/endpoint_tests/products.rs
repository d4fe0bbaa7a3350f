use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use sfg_engine::{
    db_types::{MovementKind, ProductId, StockAdjustment, StockMovement},
    sfg_api::inventory_api::DEFAULT_LOW_STOCK_THRESHOLD,
    traits::StoreError,
    InventoryApi,
};

use super::{
    helpers::{product, send_request},
    mocks::MockStorefront,
};
use crate::routes::{AdjustStockRoute, LowStockRoute, ProductByIdRoute, StockMovementsRoute, UpsertProductRoute};

fn configure(store: MockStorefront) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(InventoryApi::new(store)))
            .service(UpsertProductRoute::<MockStorefront>::new())
            .service(LowStockRoute::<MockStorefront>::new())
            .service(ProductByIdRoute::<MockStorefront>::new())
            .service(AdjustStockRoute::<MockStorefront>::new())
            .service(StockMovementsRoute::<MockStorefront>::new());
    }
}

fn movement(product_id: &ProductId, adjustment: StockAdjustment, user_id: &str, before: i64) -> StockMovement {
    let after = adjustment.apply(before);
    StockMovement {
        id: 8,
        product_id: product_id.clone(),
        kind: adjustment.kind(),
        quantity: after - before,
        stock_before: before,
        stock_after: after,
        user_id: user_id.to_string(),
        order_id: None,
        note: None,
        created_at: Utc.with_ymd_and_hms(2024, 6, 11, 8, 0, 0).unwrap(),
    }
}

#[actix_web::test]
async fn upsert_product() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store
        .expect_upsert_product()
        .withf(|p| p.id.as_str() == "yerba-1kg" && p.stock_quantity == 20)
        .times(1)
        .returning(|p| Ok(product(p.id.as_str(), p.stock_quantity)));
    let req = TestRequest::post()
        .uri("/products")
        .set_json(json!({ "id": "yerba-1kg", "name": "Yerba 1kg", "unit_price": 450000, "stock_quantity": 20 }));
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let product: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(product["id"], "yerba-1kg");
    assert_eq!(product["in_stock"], true);
}

#[actix_web::test]
async fn products_need_a_name() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/products")
        .set_json(json!({ "id": "yerba-1kg", "name": " ", "unit_price": 450000, "stock_quantity": 20 }));
    let (status, body) = send_request(req, configure(MockStorefront::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("needs a name"), "{body}");
}

#[actix_web::test]
async fn unknown_product() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store.expect_fetch_product().returning(|_| Ok(None));
    let (status, body) = send_request(TestRequest::get().uri("/products/mate-calabaza"), configure(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Product mate-calabaza does not exist"), "{body}");
}

#[actix_web::test]
async fn stock_intake() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store
        .expect_adjust_stock()
        .withf(|id, adjustment, user, note| {
            id.as_str() == "yerba-1kg" &&
                *adjustment == StockAdjustment::Intake(12) &&
                user == "depo" &&
                note.as_deref() == Some("proveedor")
        })
        .times(1)
        .returning(|id, adjustment, user, _| Ok(movement(id, adjustment, user, 3)));
    let req = TestRequest::post()
        .uri("/products/yerba-1kg/stock")
        .set_json(json!({ "action": "intake", "quantity": 12, "user_id": "depo", "note": "proveedor" }));
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let movement: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(movement["kind"], "intake");
    assert_eq!(movement["stock_before"], 3);
    assert_eq!(movement["stock_after"], 15);
}

#[actix_web::test]
async fn set_stock_on_missing_product() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store.expect_adjust_stock().returning(|id, _, _, _| Err(StoreError::ProductNotFound(id.clone())));
    let req = TestRequest::post()
        .uri("/products/mate-calabaza/stock")
        .set_json(json!({ "action": "set_to", "quantity": 4, "user_id": "admin" }));
    let (status, _) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn invalid_stock_requests() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/products/yerba-1kg/stock")
        .set_json(json!({ "action": "remove", "quantity": 4, "user_id": "admin" }));
    let (status, _) = send_request(req, configure(MockStorefront::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::post()
        .uri("/products/yerba-1kg/stock")
        .set_json(json!({ "action": "intake", "quantity": 0, "user_id": "admin" }));
    let (status, body) = send_request(req, configure(MockStorefront::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid stock quantity: 0"), "{body}");

    let req = TestRequest::post()
        .uri("/products/yerba-1kg/stock")
        .set_json(json!({ "action": "set_to", "quantity": 4, "user_id": "" }));
    let (status, body) = send_request(req, configure(MockStorefront::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("user_id is required"), "{body}");
}

#[actix_web::test]
async fn low_stock_uses_the_default_threshold() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store
        .expect_fetch_low_stock_products()
        .withf(|threshold| *threshold == DEFAULT_LOW_STOCK_THRESHOLD)
        .times(1)
        .returning(|_| Ok(vec![product("yerba-1kg", 2)]));
    let (status, body) = send_request(TestRequest::get().uri("/products/low_stock"), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let products: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["stock_quantity"], 2);
}

#[actix_web::test]
async fn low_stock_with_threshold() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store.expect_fetch_low_stock_products().withf(|threshold| *threshold == 10).times(1).returning(|_| Ok(vec![]));
    let req = TestRequest::get().uri("/products/low_stock?threshold=10");
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[actix_web::test]
async fn movement_history() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStorefront::new();
    store
        .expect_fetch_stock_movements()
        .withf(|id, limit| id.as_str() == "yerba-1kg" && *limit == 20)
        .times(1)
        .returning(|id, _| Ok(vec![movement(id, StockAdjustment::SetTo(6), "admin", 9)]));
    let req = TestRequest::get().uri("/products/yerba-1kg/movements?limit=20");
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let movements: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(movements[0]["kind"], MovementKind::Adjustment.to_string());
    assert_eq!(movements[0]["quantity"], -3);
}

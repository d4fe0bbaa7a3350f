use actix_web::{body, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use sfg_engine::db_types::{
    CustomerInfo,
    DeliveryOption,
    FulfillmentStatus,
    LineItem,
    Money,
    Order,
    PaymentStatus,
    Product,
    ProductId,
};

/// Sends `req` to an app built from `configure`. Errors raised by middleware are turned into the response the client
/// would have seen, so callers only ever deal with a status and a body.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
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
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = body::to_bytes(res.into_body()).await.unwrap();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Ana López".into(),
        email: "ana@example.com".into(),
        phone: "+54 11 5555-1234".into(),
        address: Some("Av. Corrientes 1234, CABA".into()),
    }
}

pub fn order(id: i64, payment_status: PaymentStatus, fulfillment_status: FulfillmentStatus) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 6, 10, 14, 30, 0).unwrap();
    let items = vec![LineItem {
        product_id: ProductId::from("yerba-1kg"),
        product_name: "Yerba 1kg".into(),
        unit_price: Money::from_pesos(4500),
        shipping_cost: Money::from_pesos(500),
        quantity: 2,
    }];
    let approved = payment_status == PaymentStatus::Approved;
    Order {
        id,
        external_reference: format!("sale_1718029800000_{id:06}"),
        checkout_session_id: Some(format!("pref-{id}")),
        payment_id: Some(format!("13197188{id:02}")),
        customer: customer(),
        delivery: DeliveryOption::HomeDelivery,
        delivery_window: Some("tarde".into()),
        comments: None,
        items,
        subtotal: Money::from_pesos(9000),
        shipping_total: Money::from_pesos(1000),
        total: Money::from_pesos(10000),
        coupon: None,
        payment_status,
        fulfillment_status,
        webhook_processed: approved,
        webhook_processed_at: approved.then_some(created_at),
        approved_at: approved.then_some(created_at),
        rejected_at: None,
        payment_cancelled_at: None,
        preparing_at: None,
        ready_at: None,
        in_transit_at: None,
        delivered_at: None,
        cancelled_at: None,
        admin_note: None,
        admin_id: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn product(id: &str, stock_quantity: i64) -> Product {
    Product {
        id: ProductId::from(id),
        name: format!("Producto {id}"),
        unit_price: Money::from_pesos(4500),
        shipping_cost: Money::from_pesos(500),
        stock_quantity,
        in_stock: stock_quantity > 0,
        updated_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
    }
}

mod checkout;
mod coupons;
mod helpers;
mod mocks;
mod products;
mod webhook;

use actix_web::{http::StatusCode, test::TestRequest};

use crate::routes::health;

#[actix_web::test]
async fn health_check() {
    let (status, body) = helpers::send_request(TestRequest::get().uri("/health"), |cfg| {
        cfg.service(health);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

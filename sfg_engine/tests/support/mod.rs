#![allow(dead_code)]
use log::*;
use sfg_common::Money;
use sfg_engine::{
    db_types::{CustomerInfo, LineItem, NewOrder, NewProduct, Order, Product},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{InventoryManagement, OrderManagement},
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn new_database() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn tear_down(mut db: SqliteDatabase) {
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(db.url()).await {
        warn!("🚀️ Failed to drop test database: {e}");
    }
}

pub fn customer(name: &str) -> CustomerInfo {
    CustomerInfo {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: "1145678901".to_string(),
        address: Some("Av. Corrientes 1234, CABA".to_string()),
    }
}

pub async fn stock_product(db: &SqliteDatabase, id: &str, pesos: i64, stock: i64) -> Product {
    let product = NewProduct::new(id, format!("Product {id}"), Money::from_pesos(pesos), stock);
    db.upsert_product(product).await.expect("Error creating product")
}

pub fn line(product: &Product, quantity: i64) -> LineItem {
    LineItem {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        unit_price: product.unit_price,
        shipping_cost: product.shipping_cost,
        quantity,
    }
}

pub async fn place_order(db: &SqliteDatabase, reference: &str, items: Vec<LineItem>) -> Order {
    let order = NewOrder::new(reference, customer("Ana López"), items).with_checkout_session_id(format!("pref-{reference}"));
    db.insert_order(order).await.expect("Error inserting order")
}

pub async fn fetch_order(db: &SqliteDatabase, id: i64) -> Order {
    db.fetch_order(id).await.expect("Error fetching order").expect("Order does not exist")
}

pub async fn stock_of(db: &SqliteDatabase, product: &Product) -> i64 {
    db.fetch_product(&product.id).await.expect("Error fetching product").expect("Product does not exist").stock_quantity
}

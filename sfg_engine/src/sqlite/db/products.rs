use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::db_types::{MovementKind, NewProduct, Product, ProductId, StockMovement};

pub async fn upsert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let stock = product.stock_quantity.max(0);
    sqlx::query_as(
        r#"
        INSERT INTO products (id, name, unit_price, shipping_cost, stock_quantity, in_stock, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            name = excluded.name,
            unit_price = excluded.unit_price,
            shipping_cost = excluded.shipping_cost,
            stock_quantity = excluded.stock_quantity,
            in_stock = excluded.in_stock,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(product.id)
    .bind(product.name)
    .bind(product.unit_price)
    .bind(product.shipping_cost)
    .bind(stock)
    .bind(stock > 0)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

pub async fn fetch_product(id: &ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await
}

/// Takes the database write lock for the current transaction by touching the product row. SQLite upgrades a deferred
/// transaction's lock on its first write, and a read-then-write sequence can otherwise fail with `SQLITE_BUSY` under
/// contention. Returns false if the product does not exist.
pub async fn lock_product(id: &ProductId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE products SET updated_at = updated_at WHERE id = $1").bind(id.as_str()).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Writes a new absolute stock level and returns the previous one. The caller is responsible for clamping.
pub async fn set_stock(
    id: &ProductId,
    new_quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<(i64, i64)>, sqlx::Error> {
    let before: Option<i64> = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    let Some(before) = before else {
        return Ok(None);
    };
    sqlx::query("UPDATE products SET stock_quantity = $1, in_stock = $2, updated_at = $3 WHERE id = $4")
        .bind(new_quantity)
        .bind(new_quantity > 0)
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(conn)
        .await?;
    Ok(Some((before, new_quantity)))
}

pub struct MovementRecord<'a> {
    pub product_id: &'a ProductId,
    pub kind: MovementKind,
    pub stock_before: i64,
    pub stock_after: i64,
    pub user_id: &'a str,
    pub order_id: Option<i64>,
    pub note: Option<String>,
}

pub async fn insert_movement(
    movement: MovementRecord<'_>,
    conn: &mut SqliteConnection,
) -> Result<StockMovement, sqlx::Error> {
    let movement = sqlx::query_as(
        r#"
        INSERT INTO stock_movements
            (product_id, kind, quantity, stock_before, stock_after, user_id, order_id, note, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(movement.product_id.as_str())
    .bind(movement.kind)
    .bind(movement.stock_after - movement.stock_before)
    .bind(movement.stock_before)
    .bind(movement.stock_after)
    .bind(movement.user_id)
    .bind(movement.order_id)
    .bind(movement.note)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    trace!("📦️ Stock movement recorded: {movement:?}");
    Ok(movement)
}

/// Decrements stock for a sale, clamped at zero, and records the movement. Returns `None` if the product is unknown.
pub async fn record_sale(
    id: &ProductId,
    quantity: i64,
    order_id: i64,
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<StockMovement>, sqlx::Error> {
    let before: Option<i64> = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    let Some(before) = before else {
        return Ok(None);
    };
    let after = (before - quantity).max(0);
    set_stock(id, after, conn).await?;
    let movement = MovementRecord {
        product_id: id,
        kind: MovementKind::Sale,
        stock_before: before,
        stock_after: after,
        user_id,
        order_id: Some(order_id),
        note: None,
    };
    insert_movement(movement, conn).await.map(Some)
}

pub async fn fetch_movements(
    id: &ProductId,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<StockMovement>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM stock_movements WHERE product_id = $1 ORDER BY id DESC LIMIT $2")
        .bind(id.as_str())
        .bind(limit)
        .fetch_all(conn)
        .await
}

pub async fn fetch_low_stock(threshold: i64, conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM products WHERE stock_quantity > 0 AND stock_quantity <= $1 ORDER BY stock_quantity ASC, id ASC",
    )
    .bind(threshold)
    .fetch_all(conn)
    .await
}

use chrono::Utc;
use log::*;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Coupon, CouponUpdate, CouponUsage, NewCoupon, Order},
    traits::StoreError,
};

pub async fn insert_coupon(coupon: NewCoupon, conn: &mut SqliteConnection) -> Result<Coupon, StoreError> {
    if fetch_coupon_by_code(&coupon.code, conn).await?.is_some() {
        return Err(StoreError::CouponAlreadyExists(coupon.code));
    }
    let now = Utc::now();
    let coupon = sqlx::query_as(
        r#"
        INSERT INTO coupons (code, discount_percent, active, usage_limit, usage_count, description, created_at, updated_at)
        VALUES ($1, $2, 1, $3, 0, $4, $5, $5)
        RETURNING *
        "#,
    )
    .bind(coupon.code)
    .bind(coupon.discount_percent)
    .bind(coupon.usage_limit)
    .bind(coupon.description)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(coupon)
}

pub async fn fetch_coupon_by_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupons WHERE code = $1").bind(code).fetch_optional(conn).await
}

pub async fn fetch_coupons(conn: &mut SqliteConnection) -> Result<Vec<Coupon>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupons ORDER BY code ASC").fetch_all(conn).await
}

pub async fn update_coupon(
    code: &str,
    update: CouponUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Coupon>, StoreError> {
    if update.is_empty() {
        debug!("🎟️ No fields to update for coupon {code}. Update request skipped.");
        return Err(StoreError::ModificationNoOp);
    }
    let mut builder = QueryBuilder::new("UPDATE coupons SET ");
    let mut set_clause = builder.separated(", ");
    set_clause.push("updated_at = ");
    set_clause.push_bind_unseparated(Utc::now());
    if let Some(percent) = update.discount_percent {
        set_clause.push("discount_percent = ");
        set_clause.push_bind_unseparated(percent);
    }
    if let Some(active) = update.active {
        set_clause.push("active = ");
        set_clause.push_bind_unseparated(active);
    }
    if let Some(limit) = update.usage_limit {
        set_clause.push("usage_limit = ");
        set_clause.push_bind_unseparated(limit);
    }
    if let Some(description) = update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description);
    }
    builder.push(" WHERE code = ");
    builder.push_bind(code);
    builder.push(" RETURNING *");
    trace!("🎟️ Executing query: {}", builder.sql());
    let coupon = builder.build_query_as::<Coupon>().fetch_optional(conn).await?;
    Ok(coupon)
}

/// Records that `order` used its coupon and bumps the coupon's counter by exactly one. Returns `None` if the coupon
/// no longer exists.
pub async fn record_usage(order: &Order, conn: &mut SqliteConnection) -> Result<Option<CouponUsage>, sqlx::Error> {
    let Some(applied) = order.coupon.as_ref() else {
        return Ok(None);
    };
    let Some(coupon) = fetch_coupon_by_code(&applied.code, &mut *conn).await? else {
        return Ok(None);
    };
    let usage = sqlx::query_as(
        r#"
        INSERT INTO coupon_usages
            (coupon_id, code, order_id, customer_email, discount_percent, original_total, discount_amount, used_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(coupon.id)
    .bind(&coupon.code)
    .bind(order.id)
    .bind(&order.customer.email)
    .bind(applied.discount_percent)
    .bind(applied.original_total)
    .bind(applied.discount_amount)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    sqlx::query("UPDATE coupons SET usage_count = usage_count + 1, updated_at = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(coupon.id)
        .execute(conn)
        .await?;
    Ok(Some(usage))
}

pub async fn fetch_usages(coupon_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CouponUsage>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupon_usages WHERE coupon_id = $1 ORDER BY id DESC")
        .bind(coupon_id)
        .fetch_all(conn)
        .await
}

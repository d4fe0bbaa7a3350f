use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{FulfillmentStatus, LineItem, NewOrder, Order, PaymentStatus},
    sfg_api::order_objects::{OrderQueryFilter, OrderUpdate},
    traits::StoreError,
};

/// Inserts a new order and its line items using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, StoreError> {
    if fetch_order_by_external_reference(&order.external_reference, conn).await?.is_some() {
        return Err(StoreError::OrderAlreadyExists(order.external_reference));
    }
    let now = Utc::now();
    let coupon = order.coupon.as_ref();
    let mut inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                external_reference,
                checkout_session_id,
                customer_name,
                customer_email,
                customer_phone,
                customer_address,
                delivery_option,
                delivery_window,
                comments,
                subtotal,
                shipping_total,
                total,
                coupon_code,
                coupon_discount_percent,
                coupon_discount_amount,
                coupon_original_total,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
            RETURNING *;
        "#,
    )
    .bind(&order.external_reference)
    .bind(&order.checkout_session_id)
    .bind(&order.customer.name)
    .bind(&order.customer.email)
    .bind(&order.customer.phone)
    .bind(&order.customer.address)
    .bind(order.delivery)
    .bind(&order.delivery_window)
    .bind(&order.comments)
    .bind(order.subtotal)
    .bind(order.shipping_total)
    .bind(order.total)
    .bind(coupon.map(|c| c.code.clone()))
    .bind(coupon.map(|c| c.discount_percent))
    .bind(coupon.map(|c| c.discount_amount))
    .bind(coupon.map(|c| c.original_total))
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    for item in &order.items {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, product_name, unit_price, shipping_cost, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(inserted.id)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.unit_price)
        .bind(item.shipping_cost)
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;
    }
    inserted.items = order.items;
    debug!("🗃️ Order [{}] inserted with id {}", inserted.external_reference, inserted.id);
    Ok(inserted)
}

pub async fn fetch_line_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LineItem>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT product_id, product_name, unit_price, shipping_cost, quantity
        FROM order_items WHERE order_id = $1 ORDER BY id ASC
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await
}

async fn with_items(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    match order {
        Some(mut order) => {
            order.items = fetch_line_items(order.id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&mut *conn).await?;
    with_items(order, conn).await
}

pub async fn fetch_order_by_external_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE external_reference = $1")
        .bind(reference)
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(payment_id) = query.payment_id {
        where_clause.push("payment_id = ");
        where_clause.push_bind_unseparated(payment_id);
    }
    if let Some(reference) = query.external_reference {
        where_clause.push("external_reference = ");
        where_clause.push_bind_unseparated(reference);
    }
    if let Some(session_id) = query.checkout_session_id {
        where_clause.push("checkout_session_id = ");
        where_clause.push_bind_unseparated(session_id);
    }
    if let Some(email) = query.customer_email {
        where_clause.push("customer_email = ");
        where_clause.push_bind_unseparated(email);
    }
    if let Some(status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(status);
    }
    if let Some(status) = query.fulfillment_status {
        where_clause.push("fulfillment_status = ");
        where_clause.push_bind_unseparated(status);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(&mut *conn).await?;
    trace!("🗃️ Result of search_orders: {:?}", orders.len());
    let mut result = Vec::with_capacity(orders.len());
    for order in orders {
        if let Some(order) = with_items(Some(order), conn).await? {
            result.push(order);
        }
    }
    Ok(result)
}

pub async fn update_order(
    id: i64,
    update: OrderUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    if update.is_empty() {
        debug!("🗃️ No fields to update for order {id}. Update request skipped.");
        return Err(StoreError::ModificationNoOp);
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET ");
    let mut set_clause = builder.separated(", ");
    set_clause.push("updated_at = ");
    set_clause.push_bind_unseparated(Utc::now());
    macro_rules! set_field {
        ($field:ident) => {
            if let Some(value) = update.$field {
                set_clause.push(concat!(stringify!($field), " = "));
                set_clause.push_bind_unseparated(value);
            }
        };
    }
    set_field!(payment_id);
    set_field!(payment_status);
    set_field!(fulfillment_status);
    set_field!(approved_at);
    set_field!(rejected_at);
    set_field!(payment_cancelled_at);
    set_field!(preparing_at);
    set_field!(ready_at);
    set_field!(in_transit_at);
    set_field!(delivered_at);
    set_field!(cancelled_at);
    set_field!(admin_note);
    set_field!(admin_id);
    if let Some(at) = update.webhook_processed_at {
        set_clause.push("webhook_processed = 1, webhook_processed_at = ");
        set_clause.push_bind_unseparated(at);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let res =
        builder.build().fetch_optional(&mut *conn).await?.map(|row: SqliteRow| Order::from_row(&row)).transpose()?;
    let res = with_items(res, conn).await?;
    trace!("🗃️ Result of update_order: {res:?}");
    Ok(res)
}

/// Sets the payment id, unless the order already carries a different one.
pub async fn bind_payment_id(
    order_id: i64,
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET payment_id = $1, updated_at = $2
        WHERE id = $3 AND (payment_id IS NULL OR payment_id = $1)
        RETURNING *
        "#,
    )
    .bind(payment_id)
    .bind(Utc::now())
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;
    with_items(order, conn).await
}

/// The compare-and-swap at the heart of approval. Only one caller can ever flip `webhook_processed` from 0 to 1, and
/// only while the payment is still pending.
pub async fn claim_for_approval(
    order_id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET
            payment_status = $1,
            fulfillment_status = $2,
            approved_at = $3,
            webhook_processed = 1,
            webhook_processed_at = $3,
            updated_at = $3
        WHERE id = $4 AND webhook_processed = 0 AND payment_status = $5
        RETURNING *
        "#,
    )
    .bind(PaymentStatus::Approved)
    .bind(FulfillmentStatus::AwaitingShipment)
    .bind(now)
    .bind(order_id)
    .bind(PaymentStatus::Pending)
    .fetch_optional(&mut *conn)
    .await?;
    with_items(order, conn).await
}

/// Moves a pending order to a declined payment status and cancels its fulfillment.
pub async fn decline_order(
    order_id: i64,
    status: PaymentStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let (rejected_at, cancelled_at) = match status {
        PaymentStatus::Rejected => (Some(now), None),
        _ => (None, Some(now)),
    };
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET
            payment_status = $1,
            fulfillment_status = $2,
            rejected_at = COALESCE($3, rejected_at),
            payment_cancelled_at = COALESCE($4, payment_cancelled_at),
            cancelled_at = $5,
            updated_at = $5
        WHERE id = $6 AND payment_status = $7
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(FulfillmentStatus::Cancelled)
    .bind(rejected_at)
    .bind(cancelled_at)
    .bind(now)
    .bind(order_id)
    .bind(PaymentStatus::Pending)
    .fetch_optional(&mut *conn)
    .await?;
    with_items(order, conn).await
}

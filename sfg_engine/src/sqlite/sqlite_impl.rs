//! `SqliteDatabase` is a concrete implementation of a storefront engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::{migrate, SqlitePool};

use super::db::{coupons, db_url, new_pool, orders, products, webhook_records};
use crate::{
    db_types::{
        Coupon,
        CouponUpdate,
        CouponUsage,
        NewCoupon,
        NewOrder,
        NewProduct,
        Order,
        PaymentStatus,
        Product,
        ProductId,
        StockAdjustment,
        StockMovement,
        WebhookRecord,
        WebhookRecordStatus,
        SYSTEM_USER,
    },
    sfg_api::order_objects::{OrderQueryFilter, OrderUpdate},
    sqlite::db::products::MovementRecord,
    traits::{
        ApprovalResult,
        CouponManagement,
        InventoryManagement,
        OrderManagement,
        ReconciliationStore,
        StoreError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn update_order(&self, id: i64, update: OrderUpdate) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order(id, update, &mut conn).await?.ok_or(StoreError::OrderNotFound(id))
    }
}

impl ReconciliationStore for SqliteDatabase {
    async fn fetch_webhook_records(
        &self,
        payment_id: &str,
        status: Option<WebhookRecordStatus>,
    ) -> Result<Vec<WebhookRecord>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let records = webhook_records::fetch_records(payment_id, status, &mut conn).await?;
        Ok(records)
    }

    async fn insert_webhook_record(&self, payment_id: &str) -> Result<WebhookRecord, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let record = webhook_records::insert_processing_record(payment_id, &mut conn).await?;
        trace!("🗃️ Processing marker #{} written for payment {payment_id}", record.id);
        Ok(record)
    }

    async fn update_webhook_record(&self, id: i64, status: WebhookRecordStatus) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        webhook_records::update_record_status(id, status, &mut conn).await?;
        Ok(())
    }

    async fn delete_webhook_record(&self, id: i64) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        webhook_records::delete_record(id, &mut conn).await?;
        Ok(())
    }

    async fn bind_payment_id(&self, order_id: i64, payment_id: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::bind_payment_id(order_id, payment_id, &mut conn).await?;
        Ok(order)
    }

    async fn approve_order(&self, order_id: i64) -> Result<Option<ApprovalResult>, StoreError> {
        let mut tx = self.pool.begin().await?;
        // The claim is the first write, so the transaction holds the write lock from here until commit.
        let Some(order) = orders::claim_for_approval(order_id, Utc::now(), &mut tx).await? else {
            debug!("🗃️ Order #{order_id} was already processed or is no longer pending. Nothing to approve.");
            tx.rollback().await?;
            return Ok(None);
        };
        let mut movements = Vec::with_capacity(order.items.len());
        for item in &order.items {
            match products::record_sale(&item.product_id, item.quantity, order.id, SYSTEM_USER, &mut tx).await? {
                Some(movement) => {
                    debug!(
                        "📦️ Stock for {} went from {} to {} (order #{})",
                        item.product_id, movement.stock_before, movement.stock_after, order.id
                    );
                    movements.push(movement);
                },
                None => warn!(
                    "📦️ Product {} in order #{} is not in the catalogue. No stock was decremented for it.",
                    item.product_id, order.id
                ),
            }
        }
        let coupon_usage = coupons::record_usage(&order, &mut tx).await?;
        if let (Some(applied), None) = (&order.coupon, &coupon_usage) {
            warn!("🎟️ Coupon {} on order #{} no longer exists. Usage was not recorded.", applied.code, order.id);
        }
        tx.commit().await?;
        info!("🗃️ Order #{} approved", order.id);
        Ok(Some(ApprovalResult { order, movements, coupon_usage }))
    }

    async fn decline_order(&self, order_id: i64, status: PaymentStatus) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::decline_order(order_id, status, Utc::now(), &mut conn).await?;
        Ok(order)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn upsert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::upsert_product(product, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(id, &mut conn).await?;
        Ok(product)
    }

    async fn adjust_stock(
        &self,
        id: &ProductId,
        adjustment: StockAdjustment,
        user_id: &str,
        note: Option<String>,
    ) -> Result<StockMovement, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !products::lock_product(id, &mut tx).await? {
            return Err(StoreError::ProductNotFound(id.clone()));
        }
        let product = products::fetch_product(id, &mut tx).await?.ok_or_else(|| StoreError::ProductNotFound(id.clone()))?;
        let after = adjustment.apply(product.stock_quantity);
        products::set_stock(id, after, &mut tx).await?;
        let movement = MovementRecord {
            product_id: id,
            kind: adjustment.kind(),
            stock_before: product.stock_quantity,
            stock_after: after,
            user_id,
            order_id: None,
            note,
        };
        let movement = products::insert_movement(movement, &mut tx).await?;
        tx.commit().await?;
        Ok(movement)
    }

    async fn fetch_stock_movements(&self, id: &ProductId, limit: i64) -> Result<Vec<StockMovement>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let movements = products::fetch_movements(id, limit, &mut conn).await?;
        Ok(movements)
    }

    async fn fetch_low_stock_products(&self, threshold: i64) -> Result<Vec<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let products = products::fetch_low_stock(threshold, &mut conn).await?;
        Ok(products)
    }
}

impl CouponManagement for SqliteDatabase {
    async fn insert_coupon(&self, coupon: NewCoupon) -> Result<Coupon, StoreError> {
        let mut conn = self.pool.acquire().await?;
        coupons::insert_coupon(coupon, &mut conn).await
    }

    async fn fetch_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let coupon = coupons::fetch_coupon_by_code(code, &mut conn).await?;
        Ok(coupon)
    }

    async fn fetch_coupons(&self) -> Result<Vec<Coupon>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let coupons = coupons::fetch_coupons(&mut conn).await?;
        Ok(coupons)
    }

    async fn update_coupon(&self, code: &str, update: CouponUpdate) -> Result<Coupon, StoreError> {
        let mut conn = self.pool.acquire().await?;
        coupons::update_coupon(code, update, &mut conn).await?.ok_or_else(|| StoreError::CouponNotFound(code.into()))
    }

    async fn fetch_coupon_usages(&self, coupon_id: i64) -> Result<Vec<CouponUsage>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let usages = coupons::fetch_usages(coupon_id, &mut conn).await?;
        Ok(usages)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await.map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}

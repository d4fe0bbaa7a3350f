use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewProduct, Product, ProductId, StockAdjustment, StockMovement},
    sfg_api::errors::InventoryError,
    traits::{InventoryManagement, StoreError},
};

/// Products with this many units or fewer are reported as running low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;
/// How many movements a history query returns unless told otherwise.
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;

pub struct InventoryApi<B> {
    db: B,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    pub async fn upsert_product(&self, product: NewProduct) -> Result<Product, InventoryError> {
        if product.id.as_str().trim().is_empty() {
            return Err(InventoryError::InvalidProduct("a product id is required".into()));
        }
        if product.name.trim().is_empty() {
            return Err(InventoryError::InvalidProduct(format!("product {} needs a name", product.id)));
        }
        if product.unit_price.value() < 0 || product.shipping_cost.value() < 0 {
            return Err(InventoryError::InvalidProduct(format!("product {} has a negative price", product.id)));
        }
        if product.stock_quantity < 0 {
            return Err(InventoryError::InvalidQuantity(product.stock_quantity));
        }
        let product = self.db.upsert_product(product).await?;
        debug!("📦️ Product {} saved with {} units in stock", product.id, product.stock_quantity);
        Ok(product)
    }

    pub async fn fetch_product(&self, id: &ProductId) -> Result<Product, InventoryError> {
        self.db.fetch_product(id).await?.ok_or_else(|| InventoryError::ProductNotFound(id.clone()))
    }

    /// Sets the stock of a product to an absolute quantity.
    pub async fn set_stock(
        &self,
        id: &ProductId,
        quantity: i64,
        user_id: &str,
        note: Option<String>,
    ) -> Result<StockMovement, InventoryError> {
        if quantity < 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        self.adjust(id, StockAdjustment::SetTo(quantity), user_id, note).await
    }

    /// Records newly received stock.
    pub async fn receive_stock(
        &self,
        id: &ProductId,
        quantity: i64,
        user_id: &str,
        note: Option<String>,
    ) -> Result<StockMovement, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        self.adjust(id, StockAdjustment::Intake(quantity), user_id, note).await
    }

    pub async fn adjust(
        &self,
        id: &ProductId,
        adjustment: StockAdjustment,
        user_id: &str,
        note: Option<String>,
    ) -> Result<StockMovement, InventoryError> {
        match adjustment {
            StockAdjustment::SetTo(q) if q < 0 => return Err(InventoryError::InvalidQuantity(q)),
            StockAdjustment::Intake(q) if q <= 0 => return Err(InventoryError::InvalidQuantity(q)),
            _ => {},
        }
        let movement = self.db.adjust_stock(id, adjustment, user_id, note).await.map_err(|e| match e {
            StoreError::ProductNotFound(id) => InventoryError::ProductNotFound(id),
            e => InventoryError::StoreError(e),
        })?;
        info!(
            "📦️ {} on {} by {user_id}: {} -> {}",
            movement.kind, movement.product_id, movement.stock_before, movement.stock_after
        );
        Ok(movement)
    }

    /// Movement history for a product, newest first.
    pub async fn stock_history(&self, id: &ProductId, limit: Option<i64>) -> Result<Vec<StockMovement>, InventoryError> {
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_HISTORY_LIMIT);
        Ok(self.db.fetch_stock_movements(id, limit).await?)
    }

    pub async fn low_stock(&self, threshold: Option<i64>) -> Result<Vec<Product>, InventoryError> {
        let threshold = threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
        Ok(self.db.fetch_low_stock_products(threshold).await?)
    }
}

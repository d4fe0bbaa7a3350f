use crate::{
    db_types::{NewProduct, Product, ProductId, StockAdjustment, StockMovement},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    /// Creates the product, or overwrites its catalogue data and stock level if it already exists.
    async fn upsert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError>;

    /// Changes the stock of a product and records the movement against `user_id`, atomically.
    async fn adjust_stock(
        &self,
        id: &ProductId,
        adjustment: StockAdjustment,
        user_id: &str,
        note: Option<String>,
    ) -> Result<StockMovement, StoreError>;

    /// Movement history for a product, newest first.
    async fn fetch_stock_movements(&self, id: &ProductId, limit: i64) -> Result<Vec<StockMovement>, StoreError>;

    /// Products that still have stock, but no more than `threshold` units.
    async fn fetch_low_stock_products(&self, threshold: i64) -> Result<Vec<Product>, StoreError>;
}

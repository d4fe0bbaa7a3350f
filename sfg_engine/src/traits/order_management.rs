use crate::{
    db_types::{NewOrder, Order},
    sfg_api::order_objects::{OrderQueryFilter, OrderUpdate},
    traits::StoreError,
};

/// The order store as seen by the rest of the engine.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a brand-new order with its line items. Fails with [`StoreError::OrderAlreadyExists`] if the external
    /// reference is already taken.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError>;

    /// Returns all orders matching every field set in `query`, oldest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError>;

    /// Applies the fields that are set in `update`. An empty update is rejected with
    /// [`StoreError::ModificationNoOp`].
    async fn update_order(&self, id: i64, update: OrderUpdate) -> Result<Order, StoreError>;
}

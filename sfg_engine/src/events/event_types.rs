use crate::db_types::{Order, StockMovement};

/// Published once, and only once, for every order whose payment is approved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderApprovedEvent {
    pub order: Order,
    /// The stock that left the shelves because of this order.
    pub movements: Vec<StockMovement>,
}

impl OrderApprovedEvent {
    pub fn new(order: Order, movements: Vec<StockMovement>) -> Self {
        Self { order, movements }
    }
}

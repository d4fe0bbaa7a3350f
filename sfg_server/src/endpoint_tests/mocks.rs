use mockall::mock;
use sfg_common::PaymentReport;
use sfg_engine::{
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
    },
    order_objects::{OrderQueryFilter, OrderUpdate},
    traits::{
        ApprovalResult,
        CheckoutSession,
        CheckoutSessionRequest,
        CouponManagement,
        GatewayError,
        InventoryManagement,
        OrderManagement,
        PaymentGateway,
        ReconciliationStore,
        StoreError,
    },
};

mock! {
    pub ReconcileStore {}
    impl OrderManagement for ReconcileStore {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError>;
        async fn update_order(&self, id: i64, update: OrderUpdate) -> Result<Order, StoreError>;
    }
    impl ReconciliationStore for ReconcileStore {
        async fn fetch_webhook_records(&self, payment_id: &str, status: Option<WebhookRecordStatus>) -> Result<Vec<WebhookRecord>, StoreError>;
        async fn insert_webhook_record(&self, payment_id: &str) -> Result<WebhookRecord, StoreError>;
        async fn update_webhook_record(&self, id: i64, status: WebhookRecordStatus) -> Result<(), StoreError>;
        async fn delete_webhook_record(&self, id: i64) -> Result<(), StoreError>;
        async fn bind_payment_id(&self, order_id: i64, payment_id: &str) -> Result<Option<Order>, StoreError>;
        async fn approve_order(&self, order_id: i64) -> Result<Option<ApprovalResult>, StoreError>;
        async fn decline_order(&self, order_id: i64, status: PaymentStatus) -> Result<Option<Order>, StoreError>;
    }
}

mock! {
    pub Storefront {}
    impl OrderManagement for Storefront {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError>;
        async fn update_order(&self, id: i64, update: OrderUpdate) -> Result<Order, StoreError>;
    }
    impl InventoryManagement for Storefront {
        async fn upsert_product(&self, product: NewProduct) -> Result<Product, StoreError>;
        async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError>;
        async fn adjust_stock(&self, id: &ProductId, adjustment: StockAdjustment, user_id: &str, note: Option<String>) -> Result<StockMovement, StoreError>;
        async fn fetch_stock_movements(&self, id: &ProductId, limit: i64) -> Result<Vec<StockMovement>, StoreError>;
        async fn fetch_low_stock_products(&self, threshold: i64) -> Result<Vec<Product>, StoreError>;
    }
    impl CouponManagement for Storefront {
        async fn insert_coupon(&self, coupon: NewCoupon) -> Result<Coupon, StoreError>;
        async fn fetch_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;
        async fn fetch_coupons(&self) -> Result<Vec<Coupon>, StoreError>;
        async fn update_coupon(&self, code: &str, update: CouponUpdate) -> Result<Coupon, StoreError>;
        async fn fetch_coupon_usages(&self, coupon_id: i64) -> Result<Vec<CouponUsage>, StoreError>;
    }
}

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_checkout_session(&self, request: CheckoutSessionRequest) -> Result<CheckoutSession, GatewayError>;
        async fn payment_status(&self, payment_id: &str) -> PaymentReport;
    }
}

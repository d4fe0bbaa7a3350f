use crate::{
    db_types::{Coupon, CouponUpdate, CouponUsage, NewCoupon},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait CouponManagement {
    /// Stores a new, active coupon with zero usage. The code is stored as given.
    async fn insert_coupon(&self, coupon: NewCoupon) -> Result<Coupon, StoreError>;

    async fn fetch_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;

    async fn fetch_coupons(&self) -> Result<Vec<Coupon>, StoreError>;

    async fn update_coupon(&self, code: &str, update: CouponUpdate) -> Result<Coupon, StoreError>;

    /// Usage history for a coupon, newest first.
    async fn fetch_coupon_usages(&self, coupon_id: i64) -> Result<Vec<CouponUsage>, StoreError>;
}

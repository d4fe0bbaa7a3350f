use std::fmt::Debug;

use log::*;
use regex::Regex;

use crate::{
    db_types::{Coupon, CouponUpdate, CouponUsage, NewCoupon},
    sfg_api::errors::CouponError,
    traits::{CouponManagement, StoreError},
};

const COUPON_CODE_PATTERN: &str = r"^[A-Z0-9_-]{3,32}$";

/// Coupon codes are case-insensitive and stored upper-cased.
pub fn normalize_code(code: &str) -> Result<String, CouponError> {
    let code = code.trim().to_uppercase();
    let re = Regex::new(COUPON_CODE_PATTERN).map_err(|e| CouponError::InvalidCode(e.to_string()))?;
    if re.is_match(&code) {
        Ok(code)
    } else {
        Err(CouponError::InvalidCode(code))
    }
}

/// Checks that a coupon exists, is active and has uses left. Nothing is counted here; usage is only recorded when an
/// order using the coupon is approved.
pub async fn validate_coupon<B: CouponManagement>(db: &B, code: &str) -> Result<Coupon, CouponError> {
    let code = normalize_code(code)?;
    let coupon = db.fetch_coupon_by_code(&code).await?.ok_or_else(|| CouponError::NotFound(code.clone()))?;
    if !coupon.active {
        return Err(CouponError::Inactive(code));
    }
    if coupon.is_exhausted() {
        return Err(CouponError::Exhausted(code));
    }
    trace!("🎟️ Coupon {code} is valid for {}% off", coupon.discount_percent);
    Ok(coupon)
}

fn check_percent(percent: i64) -> Result<(), CouponError> {
    if (0..=100).contains(&percent) {
        Ok(())
    } else {
        Err(CouponError::InvalidPercent(percent))
    }
}

fn check_usage_limit(limit: Option<i64>) -> Result<(), CouponError> {
    match limit {
        Some(l) if l <= 0 => Err(CouponError::InvalidUsageLimit(l)),
        _ => Ok(()),
    }
}

/// Administration of discount coupons.
pub struct CouponApi<B> {
    db: B,
}

impl<B> Debug for CouponApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CouponApi")
    }
}

impl<B> CouponApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CouponApi<B>
where B: CouponManagement
{
    pub async fn create_coupon(&self, mut coupon: NewCoupon) -> Result<Coupon, CouponError> {
        coupon.code = normalize_code(&coupon.code)?;
        check_percent(coupon.discount_percent)?;
        check_usage_limit(coupon.usage_limit)?;
        let coupon = self.db.insert_coupon(coupon).await?;
        info!("🎟️ Coupon {} created ({}% off)", coupon.code, coupon.discount_percent);
        Ok(coupon)
    }

    pub async fn update_coupon(&self, code: &str, update: CouponUpdate) -> Result<Coupon, CouponError> {
        let code = normalize_code(code)?;
        if let Some(percent) = update.discount_percent {
            check_percent(percent)?;
        }
        if let Some(limit) = update.usage_limit {
            check_usage_limit(limit)?;
        }
        let coupon = self.db.update_coupon(&code, update).await.map_err(|e| match e {
            StoreError::CouponNotFound(code) => CouponError::NotFound(code),
            e => CouponError::StoreError(e),
        })?;
        debug!("🎟️ Coupon {code} updated");
        Ok(coupon)
    }

    pub async fn fetch_coupon(&self, code: &str) -> Result<Coupon, CouponError> {
        let code = normalize_code(code)?;
        self.db.fetch_coupon_by_code(&code).await?.ok_or(CouponError::NotFound(code))
    }

    pub async fn list_coupons(&self) -> Result<Vec<Coupon>, CouponError> {
        Ok(self.db.fetch_coupons().await?)
    }

    pub async fn validate_coupon(&self, code: &str) -> Result<Coupon, CouponError> {
        validate_coupon(&self.db, code).await
    }

    pub async fn usage_history(&self, code: &str) -> Result<Vec<CouponUsage>, CouponError> {
        let coupon = self.fetch_coupon(code).await?;
        Ok(self.db.fetch_coupon_usages(coupon.id).await?)
    }
}

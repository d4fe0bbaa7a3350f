use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Every price in the store is quoted in Argentine pesos.
pub const STORE_CURRENCY_CODE: &str = "ARS";

//--------------------------------------       Money         ---------------------------------------------------------
/// An amount of money in the smallest currency unit (centavos).
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);

/// Saturates instead of overflowing.
impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value().saturating_mul(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a money amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {value} is too large to convert to Money")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_pesos(pesos: i64) -> Self {
        Self(pesos * 100)
    }

    /// The amount in whole currency units, as the payment provider expects it on the wire.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `percent`% of this amount, rounded half-up to the nearest centavo.
    pub fn percent_of(&self, percent: i64) -> Self {
        let scaled = self.0 * percent;
        Self((scaled + scaled.signum() * 50) / 100)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Sub},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Amount        ---------------------------------------------------------
/// A monetary value in whole platform currency units. There are no fractional units.
///
/// The wrapped value is signed so that it maps cleanly onto SQLite's INTEGER, but all amounts produced by the engine
/// are non-negative. Use [`Amount::is_negative`] to validate externally supplied values.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Amount(i64);

op!(binary Amount, Add, add);
op!(binary Amount, Sub, sub);
op!(inplace Amount, AddAssign, add_assign);

impl Mul<i64> for Amount {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as an amount: {0}")]
pub struct AmountConversionError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("The amount is too large to represent")]
pub struct AmountOverflow;

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Amount {
    type Error = AmountConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(AmountConversionError(format!("Value {value} is too large to convert to an amount")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Amount {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, AmountOverflow> {
        self.0.checked_add(rhs.0).map(Self).ok_or(AmountOverflow)
    }

    pub fn checked_mul(self, rhs: i64) -> Result<Self, AmountOverflow> {
        self.0.checked_mul(rhs).map(Self).ok_or(AmountOverflow)
    }

    /// Sums `amounts`, failing instead of wrapping if the total does not fit.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Result<Self, AmountOverflow> {
        amounts.into_iter().try_fold(Self::zero(), Self::checked_add)
    }
}

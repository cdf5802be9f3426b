//! Money Conversion Module
//!
//! Wallet balances and transfer amounts are fixed-point integers in minor
//! units (cents). Client-facing values are `rust_decimal::Decimal` or decimal
//! strings. All conversions MUST go through this module.
//!
//! ## Internal Representation
//! - `Money` wraps an `i64` count of minor units
//! - The scale factor is `10^MONEY_DECIMALS` (100)
//! - Storage uses `BIGINT` columns holding the same integer
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use wallet_gateway::money::Money;
//!
//! let amount = Money::from_decimal(Decimal::new(2005, 1)).unwrap(); // 200.5
//! assert_eq!(amount.minor_units(), 20_050);
//! assert_eq!(amount.to_string(), "200.50");
//! ```

use std::fmt;
use std::ops::Neg;

use rust_decimal::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Decimal places carried by every amount
pub const MONEY_DECIMALS: u32 = 2;

const SCALE: i64 = 100;

// ============================================================================
// Error Types
// ============================================================================

/// Money conversion errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

// ============================================================================
// Money
// ============================================================================

/// Fixed-point monetary amount in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor_units(units: i64) -> Self {
        Self(units)
    }

    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Whole units, e.g. `Money::from_major(1000)` is 1000.00
    pub const fn from_major(units: i64) -> Self {
        Self(units * SCALE)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Convert a client decimal into minor units.
    ///
    /// Sign is preserved; callers decide whether non-positive amounts are
    /// acceptable. Trailing zeros are ignored (`1.2300` is `1.23`), but any
    /// non-zero digit beyond `MONEY_DECIMALS` is rejected rather than rounded.
    pub fn from_decimal(decimal: Decimal) -> Result<Money, MoneyError> {
        let normalized = decimal.normalize();
        if normalized.scale() > MONEY_DECIMALS {
            return Err(MoneyError::PrecisionOverflow {
                provided: normalized.scale(),
                max: MONEY_DECIMALS,
            });
        }

        let scaled = normalized
            .checked_mul(Decimal::from(SCALE))
            .ok_or(MoneyError::Overflow)?;
        scaled.to_i64().map(Money).ok_or(MoneyError::Overflow)
    }

    /// Parse a client decimal string, e.g. `"200.50"`.
    pub fn parse(amount_str: &str) -> Result<Money, MoneyError> {
        let amount_str = amount_str.trim();
        if amount_str.is_empty() {
            return Err(MoneyError::InvalidFormat("empty string".into()));
        }
        let decimal = Decimal::from_str_exact(amount_str)
            .map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;
        Self::from_decimal(decimal)
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, MONEY_DECIMALS)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.prec$}", self.to_decimal(), prec = MONEY_DECIMALS as usize)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let decimal = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::from_decimal(decimal).map_err(serde::de::Error::custom)
    }
}

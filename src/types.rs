//! Core types and IDs for the exchange (assets, accounts, orders, balances).
//!
//! All identifiers are newtype wrappers. Quantities are fixed-point integers:
//! `u64` base units scaled by [`UNIT`] (8 decimal places), with `u128`
//! intermediates for products. No floating point anywhere in the engine.

use serde::{Deserialize, Serialize};

/// Fixed-point scale: one whole unit of any asset, price, or fee rate.
pub const UNIT: u64 = 100_000_000;

/// `floor(a * b / denom)` with a 128-bit intermediate. `None` if the result
/// does not fit in `u64`. `denom` must be nonzero (callers pass [`UNIT`]).
pub fn mul_div(a: u64, b: u64, denom: u64) -> Option<u64> {
    let wide = (a as u128) * (b as u128) / (denom as u128);
    u64::try_from(wide).ok()
}

/// Quote-asset value of `amount` base units at `price`: `floor(amount * price / UNIT)`.
pub fn quote_value(amount: u64, price: u64) -> Option<u64> {
    mul_div(amount, price, UNIT)
}

/// Asset identifier. [`AssetId::NATIVE`] is the native (quote) asset; every
/// other value names a fungible token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u64);

impl AssetId {
    /// The native asset all markets quote against.
    pub const NATIVE: AssetId = AssetId(0);

    pub fn is_native(self) -> bool {
        self == Self::NATIVE
    }
}

/// Account identifier. `AccountId(0)` is the cleared-owner sentinel on
/// tombstoned order slots and never owns funds or orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

impl AccountId {
    /// Sentinel owner of cleared order slots.
    pub const NONE: AccountId = AccountId(0);
}

/// Order identifier, sequential per market starting at 1. `OrderId(0)` is the
/// chain terminator and the "no resting order" return of a fully-matched
/// submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl OrderId {
    /// Chain terminator / no-order sentinel.
    pub const NONE: OrderId = OrderId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl Default for OrderId {
    fn default() -> Self {
        OrderId::NONE
    }
}

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn is_sell(self) -> bool {
        matches!(self, Side::Sell)
    }
}

/// One order record in a market's arena.
///
/// Linked orders (`remaining > 0`, `owner` set) are threaded into their side's
/// price-sorted chain via `prev`/`next`. A cancelled or fully-filled order is
/// tombstoned in place: `owner` becomes [`AccountId::NONE`], `remaining` 0,
/// pointers [`OrderId::NONE`]; the slot is never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: AccountId,
    /// Unfilled quantity in base units of the market's asset.
    pub remaining: u64,
    /// Quote-asset price per whole unit, scaled by [`UNIT`].
    pub price: u64,
    /// Neighbor toward the frontier ([`OrderId::NONE`] if this is the frontier).
    pub prev: OrderId,
    /// Neighbor toward the tail ([`OrderId::NONE`] if this is the tail).
    pub next: OrderId,
    pub side: Side,
}

impl Order {
    /// True once the slot has been tombstoned by cancellation or a full fill.
    pub fn is_cleared(&self) -> bool {
        self.owner == AccountId::NONE
    }
}

/// Frontier pointers of one market: best resting buy and best resting sell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    /// Highest-priced resting buy order, or [`OrderId::NONE`].
    pub best_bid: OrderId,
    /// Lowest-priced resting sell order, or [`OrderId::NONE`].
    pub best_ask: OrderId,
}

/// Funds held for one (asset, account): spendable vs. locked behind resting
/// orders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub available: u64,
    pub reserved: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_floors() {
        // 3 * (1/3 unit) truncates, never rounds up
        assert_eq!(mul_div(3, UNIT / 3, UNIT), Some(0));
        assert_eq!(mul_div(10, UNIT / 2, UNIT), Some(5));
        assert_eq!(quote_value(2 * UNIT, UNIT / 5), Some(2 * UNIT / 5));
    }

    #[test]
    fn mul_div_overflow_is_none() {
        assert_eq!(mul_div(u64::MAX, u64::MAX, 1), None);
        // product needs the wide intermediate but the quotient fits
        assert_eq!(mul_div(u64::MAX, UNIT, UNIT), Some(u64::MAX));
    }

    #[test]
    fn sentinels() {
        assert!(OrderId::NONE.is_none());
        assert!(!OrderId(1).is_none());
        assert!(AssetId::NATIVE.is_native());
        assert!(!AssetId(7).is_native());
    }

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }
}

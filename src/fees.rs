//! Proportional fee arithmetic and the exchange fee configuration.
//!
//! [`fee`] is the one pure primitive: `floor(value * rate / UNIT)`, truncating
//! so the maker and taker fees of a trade never sum past its nominal value.
//! [`FeeSchedule`] holds the configured rates and the collector account.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, UNIT};

/// Default maker rate: 0.1% per unit traded.
pub const DEFAULT_MAKER_RATE: u64 = UNIT / 1_000;
/// Default taker rate: 0.2% per unit traded.
pub const DEFAULT_TAKER_RATE: u64 = UNIT / 500;
/// Hard ceiling on the withdraw fee: 5%, applied at charge time no matter
/// what rate was configured.
pub const WITHDRAW_FEE_CAP: u64 = UNIT / 20;

/// Proportional fee on `value` at `rate` (parts per [`UNIT`]): truncating,
/// never rounding up. Pure; no error conditions for rates up to [`UNIT`].
pub fn fee(value: u64, rate: u64) -> u64 {
    ((value as u128 * rate as u128) / UNIT as u128) as u64
}

/// Configured fee rates and the account fees are routed to.
///
/// `maker_rebate` flips maker settlement from "value minus fee" to "value plus
/// rebate": the maker-rate amount is credited on top of the traded value and
/// funded from the collector's balance. An explicit design switch, not an
/// error path.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Fee rate charged on what the maker receives, parts per [`UNIT`].
    pub maker_rate: u64,
    /// Fee rate charged on what the taker receives, parts per [`UNIT`].
    pub taker_rate: u64,
    /// Fee rate charged on withdrawals, capped by [`WITHDRAW_FEE_CAP`].
    pub withdraw_rate: u64,
    /// When set, makers are credited the maker-rate amount instead of paying it.
    pub maker_rebate: bool,
    /// Account all fee amounts are routed to (and rebates funded from).
    pub collector: AccountId,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            maker_rate: DEFAULT_MAKER_RATE,
            taker_rate: DEFAULT_TAKER_RATE,
            withdraw_rate: 0,
            maker_rebate: false,
            collector: AccountId(u64::MAX),
        }
    }
}

impl FeeSchedule {
    /// Maker fee (or rebate amount, in rebate mode) on a received value.
    pub fn maker_fee(&self, value: u64) -> u64 {
        fee(value, self.maker_rate)
    }

    /// Taker fee on a received value.
    pub fn taker_fee(&self, value: u64) -> u64 {
        fee(value, self.taker_rate)
    }

    /// Withdraw fee on an amount, with the configured rate capped at
    /// [`WITHDRAW_FEE_CAP`].
    pub fn withdraw_fee(&self, amount: u64) -> u64 {
        fee(amount, self.withdraw_rate.min(WITHDRAW_FEE_CAP))
    }
}

//! Balance ledger: available and reserved funds per (asset, account).
//!
//! Five primitives — credit, debit, reserve, release, spend_reserved — all
//! checked, all atomic per call. The engine composes them so that an
//! account's reserved balance always equals the collateral behind its resting
//! orders.

use std::collections::HashMap;

use crate::error::ExchangeError;
use crate::types::{AccountId, AssetId, Balance};

/// In-memory balance ledger. Entries are created lazily at zero.
#[derive(Clone, Debug, Default)]
pub struct BalanceLedger {
    balances: HashMap<(AssetId, AccountId), Balance>,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance for (asset, account); zero if never touched.
    pub fn balance(&self, asset: AssetId, account: AccountId) -> Balance {
        self.balances
            .get(&(asset, account))
            .copied()
            .unwrap_or_default()
    }

    fn entry(&mut self, asset: AssetId, account: AccountId) -> &mut Balance {
        self.balances.entry((asset, account)).or_default()
    }

    /// Add to available. Fails with `AmountOverflow` past the `u64` range.
    pub fn credit(
        &mut self,
        asset: AssetId,
        account: AccountId,
        amount: u64,
    ) -> Result<(), ExchangeError> {
        let entry = self.entry(asset, account);
        entry.available = entry
            .available
            .checked_add(amount)
            .ok_or(ExchangeError::AmountOverflow)?;
        Ok(())
    }

    /// Remove from available. Fails with `InsufficientBalance` if short.
    pub fn debit(
        &mut self,
        asset: AssetId,
        account: AccountId,
        amount: u64,
    ) -> Result<(), ExchangeError> {
        let entry = self.entry(asset, account);
        if entry.available < amount {
            return Err(ExchangeError::InsufficientBalance);
        }
        entry.available -= amount;
        Ok(())
    }

    /// Move from available to reserved (locking collateral behind an order).
    pub fn reserve(
        &mut self,
        asset: AssetId,
        account: AccountId,
        amount: u64,
    ) -> Result<(), ExchangeError> {
        let entry = self.entry(asset, account);
        if entry.available < amount {
            return Err(ExchangeError::InsufficientBalance);
        }
        entry.reserved = entry
            .reserved
            .checked_add(amount)
            .ok_or(ExchangeError::AmountOverflow)?;
        entry.available -= amount;
        Ok(())
    }

    /// Move from reserved back to available (cancellation or fill refund).
    pub fn release(
        &mut self,
        asset: AssetId,
        account: AccountId,
        amount: u64,
    ) -> Result<(), ExchangeError> {
        let entry = self.entry(asset, account);
        if entry.reserved < amount {
            return Err(ExchangeError::InsufficientBalance);
        }
        entry.available = entry
            .available
            .checked_add(amount)
            .ok_or(ExchangeError::AmountOverflow)?;
        entry.reserved -= amount;
        Ok(())
    }

    /// Consume reserved funds outright (collateral delivered in a fill).
    pub fn spend_reserved(
        &mut self,
        asset: AssetId,
        account: AccountId,
        amount: u64,
    ) -> Result<(), ExchangeError> {
        let entry = self.entry(asset, account);
        if entry.reserved < amount {
            return Err(ExchangeError::InsufficientBalance);
        }
        entry.reserved -= amount;
        Ok(())
    }

    /// All nonzero balances, for snapshots and conservation checks.
    pub fn entries(&self) -> impl Iterator<Item = (AssetId, AccountId, Balance)> + '_ {
        self.balances
            .iter()
            .map(|(&(asset, account), &balance)| (asset, account, balance))
    }

    /// Rebuild a ledger from snapshot entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (AssetId, AccountId, Balance)>) -> Self {
        Self {
            balances: entries
                .into_iter()
                .map(|(asset, account, balance)| ((asset, account), balance))
                .collect(),
        }
    }
}

//! Single-entry exchange facade.
//!
//! Owns the ledger, the fee schedule, and one [`MarketBook`] per token asset,
//! so callers submit orders without touching book or ledger internals. Every
//! operation validates fully before its first mutation: a failing call leaves
//! no observable state change, so no rollback machinery exists anywhere.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;
use crate::events::{Event, EventSink, InMemoryEventSink, LogEventSink};
use crate::fees::FeeSchedule;
use crate::ledger::BalanceLedger;
use crate::matching::{cross, rebate_requirement, Incoming};
use crate::order_book::MarketBook;
use crate::types::{
    quote_value, AccountId, AssetId, Balance, MarketInfo, Order, OrderId, Side, UNIT,
};

/// The exchange: custody ledger, fee schedule, and per-market order books.
///
/// All operations run synchronously to completion; callers impose the total
/// order (the REST layer wraps this in one mutex).
pub struct Exchange {
    ledger: BalanceLedger,
    fees: FeeSchedule,
    books: HashMap<AssetId, MarketBook>,
    events: Arc<dyn EventSink>,
}

impl Exchange {
    /// Exchange that logs its events as JSON lines.
    pub fn new() -> Self {
        Self::with_events(Arc::new(LogEventSink))
    }

    /// Exchange emitting to the given sink (tests use [`InMemoryEventSink`]).
    pub fn with_events(events: Arc<dyn EventSink>) -> Self {
        Self {
            ledger: BalanceLedger::new(),
            fees: FeeSchedule::default(),
            books: HashMap::new(),
            events,
        }
    }

    // ------------------------------------------------------------------
    // Funding
    // ------------------------------------------------------------------

    /// Credit deposited funds to an account's available balance.
    pub fn deposit(
        &mut self,
        asset: AssetId,
        account: AccountId,
        amount: u64,
    ) -> Result<(), ExchangeError> {
        self.ledger.credit(asset, account, amount)?;
        log::info!(
            "deposit asset={} account={} amount={}",
            asset.0,
            account.0,
            amount
        );
        self.events.emit(&Event::Deposit {
            asset,
            account,
            amount,
        });
        Ok(())
    }

    /// Debit a withdrawal from available funds. The account is debited the
    /// full amount; the withdraw fee (capped at 5%) goes to the collector and
    /// the remainder leaves the exchange.
    pub fn withdraw(
        &mut self,
        asset: AssetId,
        account: AccountId,
        amount: u64,
    ) -> Result<(), ExchangeError> {
        let fee_amount = self.fees.withdraw_fee(amount);
        if self.ledger.balance(asset, account).available < amount {
            return Err(ExchangeError::InsufficientBalance);
        }
        let collector_available = self.ledger.balance(asset, self.fees.collector).available;
        if collector_available.checked_add(fee_amount).is_none() {
            return Err(ExchangeError::AmountOverflow);
        }

        self.ledger.debit(asset, account, amount)?;
        self.ledger.credit(asset, self.fees.collector, fee_amount)?;
        log::info!(
            "withdraw asset={} account={} amount={} fee={}",
            asset.0,
            account.0,
            amount,
            fee_amount
        );
        self.events.emit(&Event::Withdraw {
            asset,
            account,
            amount,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Submit a limit order: reserve collateral, cross against the opposite
    /// frontier while prices allow, rest any remainder in the book.
    ///
    /// Returns the resting order's id, or [`OrderId::NONE`] when the order
    /// was fully matched and nothing rests.
    pub fn create_order(
        &mut self,
        asset: AssetId,
        account: AccountId,
        amount: u64,
        price: u64,
        side: Side,
    ) -> Result<OrderId, ExchangeError> {
        if asset.is_native() {
            return Err(ExchangeError::InvalidMarket);
        }
        if amount == 0 || price == 0 {
            return Err(ExchangeError::InvalidOrder);
        }

        // collateral: the sold asset itself for sells, quote value at the
        // limit price for buys
        let (collateral_asset, required) = match side {
            Side::Sell => (asset, amount),
            Side::Buy => {
                let value = quote_value(amount, price).ok_or(ExchangeError::AmountOverflow)?;
                if value == 0 {
                    return Err(ExchangeError::InvalidOrder);
                }
                (AssetId::NATIVE, value)
            }
        };
        if self.ledger.balance(collateral_asset, account).available < required {
            return Err(ExchangeError::InsufficientBalance);
        }

        let incoming = Incoming {
            account,
            side,
            price,
            amount,
        };

        // rebate mode: the collector funds maker rebates, so the exact total
        // this call would pay (a read-only frontier scan) must be covered
        // before anything mutates. After this, the crossing loop cannot fail.
        if self.fees.maker_rebate {
            let rebate_asset = match side {
                Side::Buy => AssetId::NATIVE,
                Side::Sell => asset,
            };
            let needed = match self.books.get(&asset) {
                Some(book) => rebate_requirement(book, &self.fees, &incoming)?,
                None => 0,
            };
            if self
                .ledger
                .balance(rebate_asset, self.fees.collector)
                .available
                < needed
            {
                return Err(ExchangeError::InsufficientBalance);
            }
        }

        // validation complete; every step from here succeeds
        self.ledger.reserve(collateral_asset, account, required)?;

        let book = self.books.entry(asset).or_default();
        let (remaining, fills) = cross(book, &mut self.ledger, &self.fees, asset, &incoming)?;

        for fill in &fills {
            log::info!(
                "trade market={} bid={} ask={} price={} quantity={}",
                asset.0,
                fill.bid_id.0,
                fill.ask_id.0,
                fill.price,
                fill.quantity
            );
            self.events.emit(&Event::Trade {
                market: asset,
                bid_id: fill.bid_id,
                ask_id: fill.ask_id,
                price: fill.price,
                amount: fill.quantity,
                sell: side.is_sell(),
            });
        }

        if remaining == 0 {
            // fully matched: no record is created and no id consumed
            return Ok(OrderId::NONE);
        }

        let id = book.allocate(account, remaining, price, side);
        book.insert(id)?;
        log::info!(
            "order resting market={} id={} account={} side={:?} price={} remaining={}",
            asset.0,
            id.0,
            account.0,
            side,
            price,
            remaining
        );
        self.events.emit(&Event::NewOrder {
            market: asset,
            owner: account,
            id,
            sell: side.is_sell(),
            price,
            amount: remaining,
        });
        Ok(id)
    }

    /// Cancel a resting order: splice it out of its chain, refund the
    /// remaining collateral from reserved to available, tombstone the slot.
    pub fn cancel_order(
        &mut self,
        asset: AssetId,
        account: AccountId,
        id: OrderId,
    ) -> Result<(), ExchangeError> {
        if asset.is_native() {
            return Err(ExchangeError::InvalidMarket);
        }
        let book = self
            .books
            .get_mut(&asset)
            .ok_or(ExchangeError::OrderNotFound)?;
        let order = *book.get(id)?;
        if order.owner != account {
            return Err(ExchangeError::Unauthorized);
        }

        let (refund_asset, refund) = match order.side {
            Side::Sell => (asset, order.remaining),
            Side::Buy => (
                AssetId::NATIVE,
                quote_value(order.remaining, order.price).ok_or(ExchangeError::AmountOverflow)?,
            ),
        };

        book.remove(id)?;
        book.clear(id)?;
        self.ledger.release(refund_asset, account, refund)?;
        log::info!("order canceled market={} id={}", asset.0, id.0);
        self.events.emit(&Event::CancelOrder { market: asset, id });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read-only accessors
    // ------------------------------------------------------------------

    /// A resting order's record. `OrderNotFound` for cleared or unknown ids.
    pub fn get_order(&self, asset: AssetId, id: OrderId) -> Result<Order, ExchangeError> {
        if asset.is_native() {
            return Err(ExchangeError::InvalidMarket);
        }
        let book = self.books.get(&asset).ok_or(ExchangeError::OrderNotFound)?;
        Ok(*book.get(id)?)
    }

    /// Frontier pointers of a market (empty for a market with no orders yet).
    pub fn get_market_info(&self, asset: AssetId) -> Result<MarketInfo, ExchangeError> {
        if asset.is_native() {
            return Err(ExchangeError::InvalidMarket);
        }
        Ok(self
            .books
            .get(&asset)
            .map(|book| book.market_info())
            .unwrap_or_default())
    }

    /// Available and reserved funds for (asset, account); zero if untouched.
    pub fn get_balance(&self, asset: AssetId, account: AccountId) -> Balance {
        self.ledger.balance(asset, account)
    }

    /// The market book for an asset, if any order was ever placed there.
    pub fn market_book(&self, asset: AssetId) -> Option<&MarketBook> {
        self.books.get(&asset)
    }

    pub fn fee_schedule(&self) -> &FeeSchedule {
        &self.fees
    }

    // ------------------------------------------------------------------
    // Fee administration (access control lives at the serving surface)
    // ------------------------------------------------------------------

    /// Set maker/taker rates (capped at 100%) and the rebate switch.
    pub fn set_fee_rates(&mut self, maker_rate: u64, taker_rate: u64, maker_rebate: bool) {
        self.fees.maker_rate = maker_rate.min(UNIT);
        self.fees.taker_rate = taker_rate.min(UNIT);
        self.fees.maker_rebate = maker_rebate;
        log::info!(
            "fee rates changed maker={} taker={} rebate={}",
            self.fees.maker_rate,
            self.fees.taker_rate,
            maker_rebate
        );
    }

    /// Set the withdraw rate. Stored as configured; charging caps it at 5%.
    pub fn set_withdraw_rate(&mut self, rate: u64) {
        self.fees.withdraw_rate = rate;
        log::info!("withdraw rate changed rate={}", rate);
    }

    pub fn set_fee_collector(&mut self, account: AccountId) {
        self.fees.collector = account;
        log::info!("fee collector changed account={}", account.0);
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Full state capture for persistence. Deterministic field order.
    pub fn snapshot(&self) -> ExchangeSnapshot {
        let mut balances: Vec<_> = self.ledger.entries().collect();
        balances.sort_by_key(|(asset, account, _)| (asset.0, account.0));
        let mut markets: Vec<_> = self
            .books
            .iter()
            .map(|(&asset, book)| (asset, book.clone()))
            .collect();
        markets.sort_by_key(|(asset, _)| asset.0);
        ExchangeSnapshot {
            balances,
            fees: self.fees,
            markets,
        }
    }

    /// Rebuild an exchange from a snapshot, emitting to the given sink.
    pub fn from_snapshot(snapshot: ExchangeSnapshot, events: Arc<dyn EventSink>) -> Self {
        Self {
            ledger: BalanceLedger::from_entries(snapshot.balances),
            fees: snapshot.fees,
            books: snapshot.markets.into_iter().collect(),
            events,
        }
    }

    /// Convenience constructor with an in-memory event sink, for tests.
    pub fn with_captured_events() -> (Self, InMemoryEventSink) {
        let sink = InMemoryEventSink::new();
        (Self::with_events(Arc::new(sink.clone())), sink)
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable whole-exchange state: balances, fee schedule, every market.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExchangeSnapshot {
    pub balances: Vec<(AssetId, AccountId, Balance)>,
    pub fees: FeeSchedule,
    pub markets: Vec<(AssetId, MarketBook)>,
}

//! Per-market order storage and the two price-sorted chains.
//!
//! Orders live in a flat arena addressed by sequential id (slots are
//! tombstoned, never reused). The bid and ask sides are doubly-linked chains
//! threaded through the arena records: frontier-to-tail runs highest-to-lowest
//! price for bids and lowest-to-highest for asks, FIFO within a price.
//! Insertion scans from the frontier (linear in depth); removal splices in
//! O(1) given the id.

use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;
use crate::types::{AccountId, Order, OrderId, MarketInfo, Side};

/// One market's order arena plus its bid/ask frontier pointers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MarketBook {
    orders: Vec<Order>,
    best_bid: OrderId,
    best_ask: OrderId,
}

impl MarketBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest-priced resting buy, or [`OrderId::NONE`].
    pub fn best_bid(&self) -> OrderId {
        self.best_bid
    }

    /// Lowest-priced resting sell, or [`OrderId::NONE`].
    pub fn best_ask(&self) -> OrderId {
        self.best_ask
    }

    pub fn market_info(&self) -> MarketInfo {
        MarketInfo {
            best_bid: self.best_bid,
            best_ask: self.best_ask,
        }
    }

    fn slot(&self, id: OrderId) -> Option<usize> {
        if id.is_none() || id.0 as usize > self.orders.len() {
            return None;
        }
        Some(id.0 as usize - 1)
    }

    /// Look up a live order. Tombstoned slots and never-allocated ids are both
    /// `OrderNotFound`; callers cannot tell the two apart, by construction.
    pub fn get(&self, id: OrderId) -> Result<&Order, ExchangeError> {
        let order = self
            .slot(id)
            .and_then(|slot| self.orders.get(slot))
            .ok_or(ExchangeError::OrderNotFound)?;
        if order.is_cleared() {
            return Err(ExchangeError::OrderNotFound);
        }
        Ok(order)
    }

    pub(crate) fn get_mut(&mut self, id: OrderId) -> Result<&mut Order, ExchangeError> {
        let slot = self.slot(id).ok_or(ExchangeError::OrderNotFound)?;
        let order = self
            .orders
            .get_mut(slot)
            .ok_or(ExchangeError::OrderNotFound)?;
        if order.is_cleared() {
            return Err(ExchangeError::OrderNotFound);
        }
        Ok(order)
    }

    /// Append a new unlinked order record and return its id (sequential from 1).
    pub fn allocate(
        &mut self,
        owner: AccountId,
        remaining: u64,
        price: u64,
        side: Side,
    ) -> OrderId {
        let id = OrderId(self.orders.len() as u64 + 1);
        self.orders.push(Order {
            id,
            owner,
            remaining,
            price,
            prev: OrderId::NONE,
            next: OrderId::NONE,
            side,
        });
        id
    }

    /// Splice an allocated order into its side's chain at its sorted position.
    ///
    /// Scans from the frontier toward the tail until the first node with
    /// strictly worse priority (lower price for bids, higher for asks); equal
    /// prices keep scanning, so a new order rests behind every earlier order
    /// at its price. Updates the frontier pointer when the new order is best.
    pub fn insert(&mut self, id: OrderId) -> Result<(), ExchangeError> {
        let (side, price) = {
            let order = self.get(id)?;
            (order.side, order.price)
        };

        let mut prev = OrderId::NONE;
        let mut cursor = match side {
            Side::Buy => self.best_bid,
            Side::Sell => self.best_ask,
        };
        while !cursor.is_none() {
            let node = self.get(cursor)?;
            let worse = match side {
                Side::Buy => node.price < price,
                Side::Sell => node.price > price,
            };
            if worse {
                break;
            }
            prev = cursor;
            cursor = node.next;
        }

        {
            let order = self.get_mut(id)?;
            order.prev = prev;
            order.next = cursor;
        }
        if prev.is_none() {
            match side {
                Side::Buy => self.best_bid = id,
                Side::Sell => self.best_ask = id,
            }
        } else {
            self.get_mut(prev)?.next = id;
        }
        if !cursor.is_none() {
            self.get_mut(cursor)?.prev = id;
        }
        Ok(())
    }

    /// Splice a linked order out of its chain, bypassing it on both sides.
    /// If it was the frontier, the frontier advances to its successor (which
    /// may be the terminator, emptying the side). Does not tombstone the slot.
    pub fn remove(&mut self, id: OrderId) -> Result<(), ExchangeError> {
        let (side, prev, next) = {
            let order = self.get(id)?;
            (order.side, order.prev, order.next)
        };

        if prev.is_none() {
            match side {
                Side::Buy => self.best_bid = next,
                Side::Sell => self.best_ask = next,
            }
        } else {
            self.get_mut(prev)?.next = next;
        }
        if !next.is_none() {
            self.get_mut(next)?.prev = prev;
        }

        let order = self.get_mut(id)?;
        order.prev = OrderId::NONE;
        order.next = OrderId::NONE;
        Ok(())
    }

    /// Tombstone a slot: sentinel owner, zero remaining, pointers zeroed.
    /// The id is dead from here on; `get` reports it as not found.
    pub fn clear(&mut self, id: OrderId) -> Result<(), ExchangeError> {
        let order = self.get_mut(id)?;
        order.owner = AccountId::NONE;
        order.remaining = 0;
        order.prev = OrderId::NONE;
        order.next = OrderId::NONE;
        Ok(())
    }

    /// Ids of one side, frontier to tail.
    pub fn chain(&self, side: Side) -> Vec<OrderId> {
        let mut ids = Vec::new();
        let mut cursor = match side {
            Side::Buy => self.best_bid,
            Side::Sell => self.best_ask,
        };
        while !cursor.is_none() {
            ids.push(cursor);
            cursor = match self.get(cursor) {
                Ok(order) => order.next,
                Err(_) => break,
            };
        }
        ids
    }

    /// All live (non-tombstoned) orders, in allocation order.
    pub fn resting_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|order| !order.is_cleared())
    }

    /// Number of ids ever allocated in this market (live and tombstoned).
    pub fn allocated(&self) -> usize {
        self.orders.len()
    }
}

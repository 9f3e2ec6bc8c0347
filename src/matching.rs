//! The crossing loop: match an incoming order against the opposite chain's
//! frontier while prices allow, settling every fill through the ledger.
//!
//! The execution price is always the resting order's price. Collateral moves
//! are computed as differences of floors against each order's own limit
//! price, so reserved balances track the book exactly and price improvement
//! is refunded in the same step. All fallible conditions are validated by the
//! caller before the loop starts; nothing in here fails on well-formed state.

use crate::error::ExchangeError;
use crate::fees::FeeSchedule;
use crate::ledger::BalanceLedger;
use crate::order_book::MarketBook;
use crate::types::{quote_value, AccountId, AssetId, Order, OrderId, Side};

/// An order being matched, before it has any book presence (or id).
#[derive(Clone, Copy, Debug)]
pub struct Incoming {
    pub account: AccountId,
    pub side: Side,
    /// Limit price; collateral was reserved against this, fills execute at
    /// the resting price.
    pub price: u64,
    pub amount: u64,
}

/// One executed cross. The incoming side carries [`OrderId::NONE`] (ids are
/// only allocated for resting remainders); the resting side its real id.
#[derive(Clone, Copy, Debug)]
pub struct Fill {
    pub bid_id: OrderId,
    pub ask_id: OrderId,
    pub maker: AccountId,
    pub price: u64,
    pub quantity: u64,
}

/// Total maker rebate the crossing loop would pay out for `incoming`,
/// computed by a read-only walk of the opposite chain — the same frontier
/// scan the loop itself performs, so the result is exact. Zero when nothing
/// crosses. Used to validate the collector's balance before any mutation.
pub fn rebate_requirement(
    book: &MarketBook,
    fees: &FeeSchedule,
    incoming: &Incoming,
) -> Result<u64, ExchangeError> {
    let mut remaining = incoming.amount;
    let mut total = 0u64;
    let mut cursor = match incoming.side {
        Side::Buy => book.best_ask(),
        Side::Sell => book.best_bid(),
    };
    while remaining > 0 && !cursor.is_none() {
        let resting = book.get(cursor)?;
        let crossable = match incoming.side {
            Side::Buy => incoming.price >= resting.price,
            Side::Sell => incoming.price <= resting.price,
        };
        if !crossable {
            break;
        }
        let quantity = remaining.min(resting.remaining);
        let receipt = match incoming.side {
            Side::Buy => {
                quote_value(quantity, resting.price).ok_or(ExchangeError::AmountOverflow)?
            }
            Side::Sell => quantity,
        };
        total = total
            .checked_add(fees.maker_fee(receipt))
            .ok_or(ExchangeError::AmountOverflow)?;
        remaining -= quantity;
        cursor = resting.next;
    }
    Ok(total)
}

/// Runs the crossing loop for `incoming` against `book`, mutating resting
/// orders in place and unlinking any that reach zero remaining. Returns the
/// unmatched remainder and the executed fills, frontier-first.
///
/// Requires the incoming order's full collateral to be reserved already, and
/// (in rebate mode) the collector pre-funded per [`rebate_requirement`].
pub fn cross(
    book: &mut MarketBook,
    ledger: &mut BalanceLedger,
    fees: &FeeSchedule,
    asset: AssetId,
    incoming: &Incoming,
) -> Result<(u64, Vec<Fill>), ExchangeError> {
    let mut remaining = incoming.amount;
    let mut fills = Vec::new();

    while remaining > 0 {
        let frontier = match incoming.side {
            Side::Buy => book.best_ask(),
            Side::Sell => book.best_bid(),
        };
        if frontier.is_none() {
            break;
        }
        let resting = *book.get(frontier)?;
        let crossable = match incoming.side {
            Side::Buy => incoming.price >= resting.price,
            Side::Sell => incoming.price <= resting.price,
        };
        if !crossable {
            break;
        }

        let quantity = remaining.min(resting.remaining);
        settle(ledger, fees, asset, incoming, remaining, &resting, quantity)?;

        remaining -= quantity;
        let resting_after = resting.remaining - quantity;
        book.get_mut(frontier)?.remaining = resting_after;
        if resting_after == 0 {
            book.remove(frontier)?;
            book.clear(frontier)?;
        }

        let (bid_id, ask_id) = match incoming.side {
            Side::Buy => (OrderId::NONE, frontier),
            Side::Sell => (frontier, OrderId::NONE),
        };
        fills.push(Fill {
            bid_id,
            ask_id,
            maker: resting.owner,
            price: resting.price,
            quantity,
        });
    }

    Ok((remaining, fills))
}

/// Moves the funds of one fill: collateral out of both reserves, proceeds to
/// maker and taker net of their fees, fee amounts to the collector.
fn settle(
    ledger: &mut BalanceLedger,
    fees: &FeeSchedule,
    asset: AssetId,
    incoming: &Incoming,
    taker_remaining: u64,
    resting: &Order,
    quantity: u64,
) -> Result<(), ExchangeError> {
    let quote = AssetId::NATIVE;
    let taker = incoming.account;
    let maker = resting.owner;
    let value = quote_value(quantity, resting.price).ok_or(ExchangeError::AmountOverflow)?;

    match incoming.side {
        Side::Buy => {
            // taker pays quote from the reserve taken at its own limit price;
            // the floor-difference covers the execution value, the surplus is
            // the price-improvement refund
            let before = quote_value(taker_remaining, incoming.price)
                .ok_or(ExchangeError::AmountOverflow)?;
            let after = quote_value(taker_remaining - quantity, incoming.price)
                .ok_or(ExchangeError::AmountOverflow)?;
            ledger.release(quote, taker, before - after)?;
            ledger.debit(quote, taker, value)?;

            // maker delivers the asset it reserved when its sell rested
            ledger.spend_reserved(asset, maker, quantity)?;

            credit_maker(ledger, fees, quote, maker, value)?;
            credit_taker(ledger, fees, asset, taker, quantity)?;
        }
        Side::Sell => {
            // taker delivers the asset it reserved on submission
            ledger.spend_reserved(asset, taker, quantity)?;

            // maker pays quote reserved at its own price, which is also the
            // execution price
            let before = quote_value(resting.remaining, resting.price)
                .ok_or(ExchangeError::AmountOverflow)?;
            let after = quote_value(resting.remaining - quantity, resting.price)
                .ok_or(ExchangeError::AmountOverflow)?;
            ledger.release(quote, maker, before - after)?;
            ledger.debit(quote, maker, value)?;

            credit_maker(ledger, fees, asset, maker, quantity)?;
            credit_taker(ledger, fees, quote, taker, value)?;
        }
    }
    Ok(())
}

/// Maker receives `received` minus the maker fee — or plus the rebate, funded
/// by the collector, when rebate mode is on.
fn credit_maker(
    ledger: &mut BalanceLedger,
    fees: &FeeSchedule,
    received_asset: AssetId,
    maker: AccountId,
    received: u64,
) -> Result<(), ExchangeError> {
    let fee_amount = fees.maker_fee(received);
    if fees.maker_rebate {
        let credited = received
            .checked_add(fee_amount)
            .ok_or(ExchangeError::AmountOverflow)?;
        ledger.debit(received_asset, fees.collector, fee_amount)?;
        ledger.credit(received_asset, maker, credited)?;
    } else {
        ledger.credit(received_asset, maker, received - fee_amount)?;
        ledger.credit(received_asset, fees.collector, fee_amount)?;
    }
    Ok(())
}

/// Taker receives `received` minus the taker fee; the fee goes to the collector.
fn credit_taker(
    ledger: &mut BalanceLedger,
    fees: &FeeSchedule,
    received_asset: AssetId,
    taker: AccountId,
    received: u64,
) -> Result<(), ExchangeError> {
    let fee_amount = fees.taker_fee(received);
    ledger.credit(received_asset, taker, received - fee_amount)?;
    ledger.credit(received_asset, fees.collector, fee_amount)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UNIT;

    const TOKEN: AssetId = AssetId(1);
    const MAKER: AccountId = AccountId(1);
    const TAKER: AccountId = AccountId(2);
    const COLLECTOR: AccountId = AccountId(9);

    fn zero_fees() -> FeeSchedule {
        FeeSchedule {
            maker_rate: 0,
            taker_rate: 0,
            withdraw_rate: 0,
            maker_rebate: false,
            collector: COLLECTOR,
        }
    }

    /// Book with one resting sell: `amount` at `price`, collateral reserved.
    fn book_with_ask(
        ledger: &mut BalanceLedger,
        amount: u64,
        price: u64,
    ) -> (MarketBook, OrderId) {
        let mut book = MarketBook::new();
        ledger.credit(TOKEN, MAKER, amount).unwrap();
        ledger.reserve(TOKEN, MAKER, amount).unwrap();
        let id = book.allocate(MAKER, amount, price, Side::Sell);
        book.insert(id).unwrap();
        (book, id)
    }

    fn reserve_quote(ledger: &mut BalanceLedger, account: AccountId, amount: u64, price: u64) {
        let required = quote_value(amount, price).unwrap();
        ledger.credit(AssetId::NATIVE, account, required).unwrap();
        ledger.reserve(AssetId::NATIVE, account, required).unwrap();
    }

    #[test]
    fn buy_crosses_resting_ask_at_ask_price() {
        let mut ledger = BalanceLedger::new();
        let (mut book, ask_id) = book_with_ask(&mut ledger, UNIT, UNIT);
        // taker bids above the ask; execution must happen at the ask price
        reserve_quote(&mut ledger, TAKER, UNIT, 2 * UNIT);

        let incoming = Incoming {
            account: TAKER,
            side: Side::Buy,
            price: 2 * UNIT,
            amount: UNIT,
        };
        let (remaining, fills) =
            cross(&mut book, &mut ledger, &zero_fees(), TOKEN, &incoming).unwrap();

        assert_eq!(remaining, 0);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, UNIT);
        assert_eq!(fills[0].quantity, UNIT);
        assert_eq!(fills[0].ask_id, ask_id);
        assert!(fills[0].bid_id.is_none());

        // filled ask is unlinked and tombstoned
        assert!(book.best_ask().is_none());
        assert_eq!(book.get(ask_id), Err(ExchangeError::OrderNotFound));

        // maker sold 1 token for 1 quote unit; taker's price improvement
        // (reserved at 2.0, paid 1.0) is refunded to available
        assert_eq!(ledger.balance(AssetId::NATIVE, MAKER).available, UNIT);
        assert_eq!(ledger.balance(TOKEN, MAKER).reserved, 0);
        assert_eq!(ledger.balance(TOKEN, TAKER).available, UNIT);
        assert_eq!(ledger.balance(AssetId::NATIVE, TAKER).available, UNIT);
        assert_eq!(ledger.balance(AssetId::NATIVE, TAKER).reserved, 0);
    }

    #[test]
    fn partial_fill_leaves_resting_remainder_linked() {
        let mut ledger = BalanceLedger::new();
        let (mut book, ask_id) = book_with_ask(&mut ledger, 3 * UNIT, UNIT);
        reserve_quote(&mut ledger, TAKER, UNIT, UNIT);

        let incoming = Incoming {
            account: TAKER,
            side: Side::Buy,
            price: UNIT,
            amount: UNIT,
        };
        let (remaining, fills) =
            cross(&mut book, &mut ledger, &zero_fees(), TOKEN, &incoming).unwrap();

        assert_eq!(remaining, 0);
        assert_eq!(fills.len(), 1);
        assert_eq!(book.best_ask(), ask_id);
        assert_eq!(book.get(ask_id).unwrap().remaining, 2 * UNIT);
        assert_eq!(ledger.balance(TOKEN, MAKER).reserved, 2 * UNIT);
    }

    #[test]
    fn does_not_cross_when_prices_do_not_meet() {
        let mut ledger = BalanceLedger::new();
        let (mut book, _) = book_with_ask(&mut ledger, UNIT, 2 * UNIT);
        reserve_quote(&mut ledger, TAKER, UNIT, UNIT);

        let incoming = Incoming {
            account: TAKER,
            side: Side::Buy,
            price: UNIT,
            amount: UNIT,
        };
        let (remaining, fills) =
            cross(&mut book, &mut ledger, &zero_fees(), TOKEN, &incoming).unwrap();

        assert_eq!(remaining, UNIT);
        assert!(fills.is_empty());
        assert!(!book.best_ask().is_none());
    }

    #[test]
    fn sweeps_multiple_price_levels_in_order() {
        let mut ledger = BalanceLedger::new();
        let mut book = MarketBook::new();
        for price in [2 * UNIT, UNIT] {
            ledger.credit(TOKEN, MAKER, UNIT).unwrap();
            ledger.reserve(TOKEN, MAKER, UNIT).unwrap();
            let id = book.allocate(MAKER, UNIT, price, Side::Sell);
            book.insert(id).unwrap();
        }
        reserve_quote(&mut ledger, TAKER, 2 * UNIT, 2 * UNIT);

        let incoming = Incoming {
            account: TAKER,
            side: Side::Buy,
            price: 2 * UNIT,
            amount: 2 * UNIT,
        };
        let (remaining, fills) =
            cross(&mut book, &mut ledger, &zero_fees(), TOKEN, &incoming).unwrap();

        assert_eq!(remaining, 0);
        // best-priced ask fills first
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].price, UNIT);
        assert_eq!(fills[1].price, 2 * UNIT);
        assert!(book.best_ask().is_none());
        // taker paid 1.0 + 2.0 against 4.0 reserved; the rest came back
        assert_eq!(ledger.balance(AssetId::NATIVE, TAKER).available, UNIT);
    }

    #[test]
    fn incoming_sell_fills_best_bid_first() {
        let mut ledger = BalanceLedger::new();
        let mut book = MarketBook::new();
        for price in [UNIT, 3 * UNIT] {
            let required = quote_value(UNIT, price).unwrap();
            ledger.credit(AssetId::NATIVE, MAKER, required).unwrap();
            ledger.reserve(AssetId::NATIVE, MAKER, required).unwrap();
            let id = book.allocate(MAKER, UNIT, price, Side::Buy);
            book.insert(id).unwrap();
        }
        ledger.credit(TOKEN, TAKER, UNIT).unwrap();
        ledger.reserve(TOKEN, TAKER, UNIT).unwrap();

        let incoming = Incoming {
            account: TAKER,
            side: Side::Sell,
            price: 2 * UNIT,
            amount: UNIT,
        };
        let (remaining, fills) =
            cross(&mut book, &mut ledger, &zero_fees(), TOKEN, &incoming).unwrap();

        // only the 3.0 bid is crossable from a 2.0 sell; execution at 3.0
        assert_eq!(remaining, 0);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 3 * UNIT);
        assert!(fills[0].ask_id.is_none());
        assert_eq!(ledger.balance(AssetId::NATIVE, TAKER).available, 3 * UNIT);
        assert_eq!(ledger.balance(TOKEN, MAKER).available, UNIT);
        // the 1.0 bid is untouched
        assert_eq!(book.get(book.best_bid()).unwrap().price, UNIT);
    }

    #[test]
    fn fees_route_to_collector_on_both_legs() {
        let mut ledger = BalanceLedger::new();
        let (mut book, _) = book_with_ask(&mut ledger, UNIT, UNIT);
        reserve_quote(&mut ledger, TAKER, UNIT, UNIT);

        let fees = FeeSchedule {
            maker_rate: UNIT / 1_000, // 0.1%
            taker_rate: UNIT / 500,   // 0.2%
            ..zero_fees()
        };
        let incoming = Incoming {
            account: TAKER,
            side: Side::Buy,
            price: UNIT,
            amount: UNIT,
        };
        cross(&mut book, &mut ledger, &fees, TOKEN, &incoming).unwrap();

        let maker_fee = UNIT / 1_000;
        let taker_fee = UNIT / 500;
        assert_eq!(
            ledger.balance(AssetId::NATIVE, MAKER).available,
            UNIT - maker_fee
        );
        assert_eq!(ledger.balance(TOKEN, TAKER).available, UNIT - taker_fee);
        assert_eq!(
            ledger.balance(AssetId::NATIVE, COLLECTOR).available,
            maker_fee
        );
        assert_eq!(ledger.balance(TOKEN, COLLECTOR).available, taker_fee);
    }

    #[test]
    fn maker_rebate_credits_value_plus_fee_from_collector() {
        let mut ledger = BalanceLedger::new();
        let (mut book, _) = book_with_ask(&mut ledger, UNIT, UNIT);
        reserve_quote(&mut ledger, TAKER, UNIT, UNIT);
        ledger.credit(AssetId::NATIVE, COLLECTOR, UNIT).unwrap();

        let fees = FeeSchedule {
            maker_rate: UNIT / 100, // 1% rebate
            maker_rebate: true,
            ..zero_fees()
        };
        let incoming = Incoming {
            account: TAKER,
            side: Side::Buy,
            price: UNIT,
            amount: UNIT,
        };
        cross(&mut book, &mut ledger, &fees, TOKEN, &incoming).unwrap();

        let rebate = UNIT / 100;
        assert_eq!(
            ledger.balance(AssetId::NATIVE, MAKER).available,
            UNIT + rebate
        );
        assert_eq!(
            ledger.balance(AssetId::NATIVE, COLLECTOR).available,
            UNIT - rebate
        );
    }
}

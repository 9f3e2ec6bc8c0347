//! # DEX Matching Engine
//!
//! Deterministic exchange core: custody ledger, per-market order books, and
//! price-time-priority matching with proportional integer fees.
//!
//! Accounts deposit collateral (the native asset and/or fungible tokens) and
//! place limit orders against a market. Incoming orders cross against the
//! best-priced resting orders on the opposite side, splitting fills at the
//! resting price, charging maker/taker fees, and resting any unmatched
//! remainder in the book. Every book is a pair of price-sorted chains
//! threaded through a flat arena of order records, so cancellation is an
//! O(1) splice.
//!
//! ## Entry point
//!
//! Use [`Exchange`] as the single entry point: create with [`Exchange::new`],
//! fund with [`Exchange::deposit`], then [`Exchange::create_order`] and
//! [`Exchange::cancel_order`].
//!
//! ## Example
//!
//! ```rust
//! use dex_matching_engine::{AccountId, AssetId, Exchange, Side, UNIT};
//!
//! let mut exchange = Exchange::new();
//! let token = AssetId(1);
//! let seller = AccountId(1);
//! let buyer = AccountId(2);
//!
//! exchange.deposit(token, seller, 10 * UNIT).unwrap();
//! exchange.create_order(token, seller, 10 * UNIT, UNIT, Side::Sell).unwrap();
//!
//! exchange.deposit(AssetId::NATIVE, buyer, 2 * UNIT).unwrap();
//! let id = exchange.create_order(token, buyer, 2 * UNIT, UNIT, Side::Buy).unwrap();
//! assert!(id.is_none()); // fully matched against the resting sell
//! ```
//!
//! ## Lower-level API
//!
//! [`MarketBook`] and [`cross`] are exposed for callers that manage their own
//! ledger and fee schedule.

pub mod api;
pub mod auth;
pub mod engine;
pub mod error;
pub mod events;
pub mod fees;
pub mod flow_gen;
pub mod ledger;
pub mod matching;
pub mod order_book;
pub mod persistence;
pub mod types;

pub use engine::{Exchange, ExchangeSnapshot};
pub use error::ExchangeError;
pub use events::{Event, EventSink, InMemoryEventSink, LogEventSink};
pub use fees::{fee, FeeSchedule, WITHDRAW_FEE_CAP};
pub use flow_gen::{replay_into_exchange, FlowConfig, FlowGenerator, FlowOp, ReplayStats};
pub use ledger::BalanceLedger;
pub use matching::{cross, Fill, Incoming};
pub use order_book::MarketBook;
pub use persistence::FilePersistence;
pub use types::{
    quote_value, AccountId, AssetId, Balance, MarketInfo, Order, OrderId, Side, UNIT,
};

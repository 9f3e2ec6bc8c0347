//! Observable exchange events through a pluggable sink.
//!
//! One event per logical observation: `NewOrder` when a remainder rests,
//! `Trade` per individual cross, `CancelOrder`, `Deposit`, `Withdraw`.
//! The binary logs one JSON line per event; tests capture them in memory.

use serde::Serialize;

use crate::types::{AccountId, AssetId, OrderId};

/// A single observable state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A resting order was created (post-matching remainder).
    NewOrder {
        market: AssetId,
        owner: AccountId,
        id: OrderId,
        sell: bool,
        price: u64,
        amount: u64,
    },
    /// One cross between a bid and an ask. The non-resting (incoming) side is
    /// reported as [`OrderId::NONE`]; `sell` is the incoming side.
    Trade {
        market: AssetId,
        bid_id: OrderId,
        ask_id: OrderId,
        price: u64,
        amount: u64,
        sell: bool,
    },
    /// A resting order was cancelled and its collateral refunded.
    CancelOrder { market: AssetId, id: OrderId },
    Deposit {
        asset: AssetId,
        account: AccountId,
        amount: u64,
    },
    Withdraw {
        asset: AssetId,
        account: AccountId,
        amount: u64,
    },
}

/// Sink for exchange events. Implementations log, broadcast, or buffer (tests).
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event);
}

/// Logs one JSON line per event at info level.
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: &Event) {
        if let Ok(line) = serde_json::to_string(event) {
            log::info!("event {}", line);
        }
    }
}

/// In-memory sink that stores events for tests. Clone shares the same backing
/// buffer.
#[derive(Clone, Default)]
pub struct InMemoryEventSink {
    events: std::sync::Arc<std::sync::Mutex<Vec<Event>>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("lock").clone()
    }

    pub fn clear(&self) {
        self.events.lock().expect("lock").clear();
    }
}

impl EventSink for InMemoryEventSink {
    fn emit(&self, event: &Event) {
        self.events.lock().expect("lock").push(event.clone());
    }
}

//! Synthetic order-flow generator.
//!
//! Deterministic, configurable streams of orders and cancels for replay
//! tests, demos, and load tests. Same seed ⇒ same flow ⇒ same final exchange
//! state.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::Exchange;
use crate::error::ExchangeError;
use crate::types::{AccountId, AssetId, OrderId, Side, UNIT};

/// Configuration for the synthetic flow. All ranges are inclusive. Same
/// config + seed produces the same stream.
#[derive(Clone, Debug)]
pub struct FlowConfig {
    /// RNG seed. Same seed ⇒ same flow.
    pub seed: u64,
    /// Market all generated orders trade in.
    pub asset: AssetId,
    /// Number of operations to generate.
    pub num_ops: usize,
    /// Accounts 1..=num_accounts submit the flow.
    pub num_accounts: u64,
    /// Probability of Buy (0.0..=1.0). Sell otherwise.
    pub buy_ratio: f64,
    /// Probability that an operation is a cancel of an earlier order.
    pub cancel_ratio: f64,
    /// Limit price range, scaled by [`UNIT`].
    pub price_min: u64,
    pub price_max: u64,
    /// Order amount range, scaled by [`UNIT`].
    pub amount_min: u64,
    pub amount_max: u64,
    /// Per-account funding applied by [`replay_into_exchange`] before the flow.
    pub initial_native: u64,
    pub initial_token: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            asset: AssetId(1),
            num_ops: 1000,
            num_accounts: 5,
            buy_ratio: 0.5,
            cancel_ratio: 0.1,
            price_min: 95 * UNIT / 100,
            price_max: 105 * UNIT / 100,
            amount_min: UNIT,
            amount_max: 100 * UNIT,
            initial_native: 1_000_000 * UNIT,
            initial_token: 1_000_000 * UNIT,
        }
    }
}

/// One generated operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowOp {
    Order {
        account: AccountId,
        side: Side,
        price: u64,
        amount: u64,
    },
    /// Cancel one of the account's earlier resting orders; `pick` selects
    /// among whatever is live at replay time.
    Cancel { account: AccountId, pick: usize },
}

/// Deterministic flow stream. Create with [`FlowGenerator::new`]; iterate to
/// get operations.
pub struct FlowGenerator {
    rng: StdRng,
    config: FlowConfig,
}

impl FlowGenerator {
    /// Builds a generator. Same config (including seed) ⇒ same stream.
    pub fn new(config: FlowConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { rng, config }
    }

    /// Generates the next operation, advancing the RNG.
    pub fn next_op(&mut self) -> FlowOp {
        let account = AccountId(self.rng.gen_range(1..=self.config.num_accounts.max(1)));
        if self.rng.gen::<f64>() < self.config.cancel_ratio {
            return FlowOp::Cancel {
                account,
                pick: self.rng.gen_range(0..usize::MAX),
            };
        }
        let side = if self.rng.gen::<f64>() < self.config.buy_ratio {
            Side::Buy
        } else {
            Side::Sell
        };
        FlowOp::Order {
            account,
            side,
            price: self
                .rng
                .gen_range(self.config.price_min..=self.config.price_max),
            amount: self
                .rng
                .gen_range(self.config.amount_min..=self.config.amount_max),
        }
    }

    /// Returns exactly `n` operations, advancing the generator state.
    pub fn take_ops(&mut self, n: usize) -> Vec<FlowOp> {
        (0..n).map(|_| self.next_op()).collect()
    }

    /// Returns the full stream as defined by `config.num_ops`.
    pub fn all_ops(&mut self) -> Vec<FlowOp> {
        self.take_ops(self.config.num_ops)
    }
}

/// What a replay did: per-asset funding totals and operation counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub deposited_native: u64,
    pub deposited_token: u64,
    pub orders_accepted: usize,
    pub orders_rejected: usize,
    pub cancels: usize,
}

/// Funds every account per the config, then replays the flow into the
/// exchange. Insolvent orders and cancels of already-gone orders are counted,
/// not errors; anything else propagates.
pub fn replay_into_exchange(
    exchange: &mut Exchange,
    config: &FlowConfig,
    ops: impl IntoIterator<Item = FlowOp>,
) -> Result<ReplayStats, ExchangeError> {
    let mut stats = ReplayStats::default();
    for account in 1..=config.num_accounts {
        exchange.deposit(AssetId::NATIVE, AccountId(account), config.initial_native)?;
        exchange.deposit(config.asset, AccountId(account), config.initial_token)?;
        stats.deposited_native += config.initial_native;
        stats.deposited_token += config.initial_token;
    }

    // resting orders per account, for cancels to pick from
    let mut live: std::collections::HashMap<AccountId, Vec<OrderId>> =
        std::collections::HashMap::new();

    for op in ops {
        match op {
            FlowOp::Order {
                account,
                side,
                price,
                amount,
            } => match exchange.create_order(config.asset, account, amount, price, side) {
                Ok(id) => {
                    stats.orders_accepted += 1;
                    if !id.is_none() {
                        live.entry(account).or_default().push(id);
                    }
                }
                Err(ExchangeError::InsufficientBalance) => stats.orders_rejected += 1,
                Err(e) => return Err(e),
            },
            FlowOp::Cancel { account, pick } => {
                let Some(ids) = live.get_mut(&account) else {
                    continue;
                };
                if ids.is_empty() {
                    continue;
                }
                let id = ids.swap_remove(pick % ids.len());
                match exchange.cancel_order(config.asset, account, id) {
                    Ok(()) => stats.cancels += 1,
                    // the pick may have been fully filled since it rested
                    Err(ExchangeError::OrderNotFound) => {}
                    Err(e) => return Err(e),
                }
            }
        }
    }
    Ok(stats)
}

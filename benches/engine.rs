//! Engine performance benchmarks (Criterion).
//!
//! Run: `cargo bench` or `cargo bench --bench engine`.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use dex_matching_engine::{
    replay_into_exchange, AccountId, AssetId, Exchange, FlowConfig, FlowGenerator, FlowOp,
    OrderId, Side,
};

const TOKEN: AssetId = AssetId(1);

fn funded_exchange(config: &FlowConfig) -> Exchange {
    let mut exchange = Exchange::default();
    replay_into_exchange(&mut exchange, config, std::iter::empty()).unwrap();
    exchange
}

fn bench_create_order_throughput(c: &mut Criterion) {
    const N: usize = 1000;
    let mut group = c.benchmark_group("engine");
    group.throughput(Throughput::Elements(N as u64));
    group.bench_function("create_order_1000", |b| {
        b.iter_batched(
            || {
                let config = FlowConfig {
                    seed: 42,
                    asset: TOKEN,
                    num_ops: N,
                    cancel_ratio: 0.0,
                    ..Default::default()
                };
                let ops = FlowGenerator::new(config.clone()).all_ops();
                (funded_exchange(&config), ops)
            },
            |(mut exchange, ops)| {
                for op in ops {
                    if let FlowOp::Order {
                        account,
                        side,
                        price,
                        amount,
                    } = op
                    {
                        let _ = exchange.create_order(TOKEN, account, amount, price, side);
                    }
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_cancel_order(c: &mut Criterion) {
    const RESTING: usize = 500;
    const CANCELS_PER_ITER: usize = 100;
    let mut group = c.benchmark_group("engine");
    group.throughput(Throughput::Elements(CANCELS_PER_ITER as u64));
    group.bench_function("cancel_order_100_after_500_resting", |b| {
        b.iter_batched(
            || {
                // all sells so nothing crosses: the book stays 500 deep
                let config = FlowConfig {
                    seed: 123,
                    asset: TOKEN,
                    num_ops: RESTING,
                    buy_ratio: 0.0,
                    cancel_ratio: 0.0,
                    ..Default::default()
                };
                let mut exchange = funded_exchange(&config);
                let mut resting: Vec<(AccountId, OrderId)> = Vec::with_capacity(RESTING);
                for op in FlowGenerator::new(config.clone()).all_ops() {
                    if let FlowOp::Order {
                        account,
                        side,
                        price,
                        amount,
                    } = op
                    {
                        let id = exchange
                            .create_order(TOKEN, account, amount, price, side)
                            .unwrap();
                        resting.push((account, id));
                    }
                }
                resting.truncate(CANCELS_PER_ITER);
                (exchange, resting)
            },
            |(mut exchange, resting)| {
                for (account, id) in resting {
                    exchange.cancel_order(TOKEN, account, id).unwrap();
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_cross_deep_book(c: &mut Criterion) {
    const DEPTH: usize = 200;
    let mut group = c.benchmark_group("engine");
    group.throughput(Throughput::Elements(1));
    group.bench_function("sweep_200_level_book", |b| {
        b.iter_batched(
            || {
                let config = FlowConfig {
                    seed: 7,
                    asset: TOKEN,
                    num_ops: DEPTH,
                    buy_ratio: 0.0,
                    cancel_ratio: 0.0,
                    amount_min: dex_matching_engine::UNIT,
                    amount_max: dex_matching_engine::UNIT,
                    ..Default::default()
                };
                let mut exchange = funded_exchange(&config);
                let mut total = 0u64;
                for op in FlowGenerator::new(config.clone()).all_ops() {
                    if let FlowOp::Order {
                        account,
                        side,
                        price,
                        amount,
                    } = op
                    {
                        exchange
                            .create_order(TOKEN, account, amount, price, side)
                            .unwrap();
                        total += amount;
                    }
                }
                // one buy that sweeps every resting ask
                (exchange, total, config.price_max)
            },
            |(mut exchange, total, top)| {
                let _ = exchange.create_order(TOKEN, AccountId(1), total, top, Side::Buy);
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_create_order_throughput,
    bench_cancel_order,
    bench_cross_deep_book
);
criterion_main!(benches);

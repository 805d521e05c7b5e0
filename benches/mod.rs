use criterion::{criterion_group, criterion_main};


use arbitrator::register_benchmarks as register_arbitrator_benchmarks;
use order_book_side::register_benchmarks as register_order_book_side_benchmarks;
use spread_table::register_benchmarks as register_spread_table_benchmarks;

// Define the benchmark groups
criterion_group!(
    benches,
    register_spread_table_benchmarks,
    register_order_book_side_benchmarks,
    register_arbitrator_benchmarks,
);

criterion_main!(benches);

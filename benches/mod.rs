use criterion::{criterion_group, criterion_main};


use codec::register_benchmarks as register_codec_benchmarks;
use stream::register_benchmarks as register_stream_benchmarks;

// Define the benchmark groups
criterion_group!(
    benches,
    register_codec_benchmarks,
    register_stream_benchmarks,
);

criterion_main!(benches);

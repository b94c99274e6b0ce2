use criterion::{black_box, criterion_group, criterion_main, Criterion};

use primespan::{Flags, PrimeSieve};

fn bench_count_primes_1e7(c: &mut Criterion) {
    c.bench_function("count_primes(0, 1e7)", |b| {
        let mut sieve = PrimeSieve::new();
        b.iter(|| sieve.count_primes(0, black_box(10_000_000)).unwrap());
    });
}

fn bench_count_all_kinds_1e7(c: &mut Criterion) {
    c.bench_function("count_all_kinds(0, 1e7)", |b| {
        let mut sieve = PrimeSieve::new();
        sieve.set_flags(Flags::COUNT_ALL);
        sieve.set_start(0);
        sieve.set_stop(10_000_000);
        b.iter(|| sieve.sieve().unwrap());
    });
}

fn bench_offset_interval_1e12(c: &mut Criterion) {
    c.bench_function("count_primes(1e12, 1e12+1e8)", |b| {
        let mut sieve = PrimeSieve::new();
        sieve.set_sieve_size_kb(256).unwrap();
        b.iter(|| {
            sieve
                .count_primes(black_box(1_000_000_000_000), 1_000_000_000_000 + 100_000_000)
                .unwrap()
        });
    });
}

fn bench_sieve_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("sieve_size_sweep");
    for kb in [16u32, 32, 64, 256, 1024] {
        group.bench_function(format!("{}KiB", kb), |b| {
            let mut sieve = PrimeSieve::new();
            sieve.set_sieve_size_kb(kb).unwrap();
            b.iter(|| sieve.count_primes(0, black_box(10_000_000)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_count_primes_1e7,
    bench_count_all_kinds_1e7,
    bench_offset_interval_1e12,
    bench_sieve_sizes,
);
criterion_main!(benches);

//! Property-based tests for the sieve engine.
//!
//! These tests use the `proptest` framework to verify invariants across
//! thousands of randomly generated intervals, instead of pinning individual
//! known values. The ground truth is an independent naive implementation: a
//! boolean primality table built by trial sieving, with k-tuplet counting
//! expressed directly over the admissible difference patterns.
//!
//! # How to run
//!
//! ```bash
//! cargo test --test property_tests
//!
//! # Increase case count for thorough testing (default is 256):
//! PROPTEST_CASES=2000 cargo test --test property_tests
//! ```
//!
//! # Testing strategy
//!
//! - **Reference agreement**: every count kind over random intervals equals
//!   the naive count.
//! - **Additivity**: prime counts add up across arbitrary splits; tuplet
//!   counts add up across splits aligned the way the parallel controller
//!   aligns its sub-intervals.
//! - **Geometry independence**: segment size and pre-sieve limit never
//!   change a result.
//! - **Stream discipline**: the callback sequence is strictly increasing,
//!   in range, and exactly the primes of the interval.
//! - **Parallel aggregation**: worker splits reproduce the serial counts.

use std::ops::ControlFlow;
use std::sync::OnceLock;

use proptest::prelude::*;

use primespan::{Flags, ParallelPrimeSieve, PrimeSieve, KINDS};

/// Upper bound of the naive reference table.
const LIMIT: usize = 70_000;

/// Admissible difference patterns per kind, mirroring the counted families
/// (the septuplet family starting ≡ 29 (mod 30) is deliberately absent: it
/// straddles a byte boundary and is not recognized).
const PATTERNS: [&[&[u64]]; KINDS] = [
    &[],
    &[&[0, 2]],
    &[&[0, 2, 6], &[0, 4, 6]],
    &[&[0, 2, 6, 8]],
    &[&[0, 2, 6, 8, 12], &[0, 4, 6, 10, 12]],
    &[&[0, 4, 6, 10, 12, 16]],
    &[&[0, 2, 6, 8, 12, 18, 20]],
];

fn prime_table() -> &'static Vec<bool> {
    static TABLE: OnceLock<Vec<bool>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut is_prime = vec![true; LIMIT + 1];
        is_prime[0] = false;
        is_prime[1] = false;
        let mut p = 2;
        while p * p <= LIMIT {
            if is_prime[p] {
                let mut m = p * p;
                while m <= LIMIT {
                    is_prime[m] = false;
                    m += p;
                }
            }
            p += 1;
        }
        is_prime
    })
}

/// Naive count of one kind: bases whose whole pattern is prime and inside
/// [start, stop].
fn reference_count(kind: usize, start: u64, stop: u64) -> u64 {
    let table = prime_table();
    if kind == 0 {
        return (start..=stop).filter(|&n| table[n as usize]).count() as u64;
    }
    let mut count = 0;
    for base in start..=stop {
        for &pattern in PATTERNS[kind] {
            let last = base + pattern[pattern.len() - 1];
            if last <= stop && pattern.iter().all(|&d| table[(base + d) as usize]) {
                count += 1;
                break;
            }
        }
    }
    count
}

fn engine_count(kind: usize, start: u64, stop: u64) -> u64 {
    PrimeSieve::new().count_kind(kind, start, stop).unwrap()
}

fn interval() -> impl Strategy<Value = (u64, u64)> {
    (0..LIMIT as u64, 0..LIMIT as u64).prop_map(|(a, b)| (a.min(b), a.max(b)))
}

proptest! {
    /// Every kind agrees with the naive pattern count on random intervals.
    #[test]
    fn prop_counts_match_reference((start, stop) in interval(), kind in 0usize..KINDS) {
        prop_assert_eq!(
            engine_count(kind, start, stop),
            reference_count(kind, start, stop),
            "kind {} on [{}, {}]", kind, start, stop
        );
    }

    /// Prime counts are additive under any disjoint split.
    #[test]
    fn prop_prime_counts_additive((start, stop) in interval(), split_seed in any::<u64>()) {
        prop_assume!(stop > start);
        let split = start + split_seed % (stop - start);
        let whole = engine_count(0, start, stop);
        let lower = engine_count(0, start, split);
        let upper = engine_count(0, split + 1, stop);
        prop_assert_eq!(whole, lower + upper);
    }

    /// Tuplet counts are additive when the split boundary falls between
    /// residues 1 and 2 of a 30-block — the alignment rule the parallel
    /// controller uses, which no counted tuplet can straddle.
    #[test]
    fn prop_tuplet_counts_additive_at_aligned_splits(
        (start, stop) in interval(),
        block in 1u64..(LIMIT as u64 / 30),
        kind in 1usize..KINDS,
    ) {
        let split = 30 * block + 1;
        prop_assume!(start < split && split < stop);
        let whole = engine_count(kind, start, stop);
        let lower = engine_count(kind, start, split);
        let upper = engine_count(kind, split + 1, stop);
        prop_assert_eq!(whole, lower + upper, "kind {} split {}", kind, split);
    }

    /// The callback stream is exactly the ascending primes of the interval.
    #[test]
    fn prop_stream_is_sorted_prime_and_bounded((start, stop) in interval()) {
        let table = prime_table();
        let mut seen = Vec::new();
        PrimeSieve::new()
            .for_each_prime(start, stop, &mut |p| {
                seen.push(p);
                ControlFlow::Continue(())
            })
            .unwrap();
        prop_assert!(seen.windows(2).all(|w| w[0] < w[1]));
        let expected: Vec<u64> = (start..=stop).filter(|&n| table[n as usize]).collect();
        prop_assert_eq!(seen, expected);
    }
}

proptest! {
    // Geometry and parallel sweeps re-sieve the interval several times per
    // case; fewer cases keep the suite fast.
    #![proptest_config(ProptestConfig { cases: 24, ..ProptestConfig::default() })]

    /// Segment size and pre-sieve limit never change any count.
    #[test]
    fn prop_counts_independent_of_geometry(
        (start, stop) in interval(),
        kb_exp in 0u32..7,
        pre_idx in 0usize..6,
    ) {
        let pre = [7u32, 11, 13, 17, 19, 23][pre_idx];
        let mut sieve = PrimeSieve::new();
        sieve.set_sieve_size_kb(1 << kb_exp).unwrap();
        sieve.set_pre_sieve(pre).unwrap();
        sieve.set_start(start);
        sieve.set_stop(stop);
        sieve.set_flags(Flags::COUNT_ALL);
        sieve.sieve().unwrap();
        for kind in 0..KINDS {
            prop_assert_eq!(
                sieve.count(kind),
                reference_count(kind, start, stop),
                "kind {} kb 2^{} pre {}", kind, kb_exp, pre
            );
        }
    }

    /// Aggregated parallel counts equal the serial counts for every kind.
    #[test]
    fn prop_parallel_equals_serial(
        (start, stop) in interval(),
        threads in 2usize..5,
    ) {
        let mut parallel = ParallelPrimeSieve::new();
        parallel.set_start(start);
        parallel.set_stop(stop);
        parallel.set_threads(threads);
        parallel.set_sieve_size_kb(1).unwrap();
        parallel.set_flags(Flags::COUNT_ALL);
        parallel.sieve().unwrap();
        for kind in 0..KINDS {
            prop_assert_eq!(
                parallel.count(kind),
                reference_count(kind, start, stop),
                "kind {} threads {}", kind, threads
            );
        }
    }
}

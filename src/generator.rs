//! # Generator — Sieving-Prime Production
//!
//! Sieving [start, stop] needs every prime p ≤ √stop. Those are produced by
//! a second, L1-resident instance of the segmented sieve over [7, √stop],
//! whose own sieving primes (≤ √√stop ≤ 2¹⁶) come from a small one-shot
//! mod-30 sieve — the trivial stub that terminates the recursion.
//!
//! Primes are emitted strictly ascending through a callback so the main
//! sieve can interleave segment processing with prime generation.

use std::ops::ControlFlow;

use crate::bits::{self, BIT_VALUES};
use crate::erat::{Erat, SegmentVisitor};
use crate::isqrt;

/// Segment size of the generator sieve; small enough to stay L1-resident.
const GENERATOR_SIEVE_BYTES: usize = 32 * 1024;

/// Pre-sieve limit of the generator sieve; the 7·11·13 pattern is ~1 KiB.
const GENERATOR_PRE_SIEVE: u32 = 13;

/// Simple non-segmented mod-30 sieve, returning the primes in [7, limit].
/// 2, 3 and 5 are omitted: they have no bit representation and never act as
/// sieving primes.
pub(crate) fn simple_primes(limit: u32) -> Vec<u32> {
    if limit < 7 {
        return Vec::new();
    }
    let limit = u64::from(limit);
    let bytes = (limit / 30 + 1) as usize;
    let mut sieve = vec![0xFFu8; bytes];
    let mut n = 7u64;
    while n * n <= limit {
        let set = bits::bit_position(n)
            .map(|(byte, bit)| sieve[byte as usize] & (1 << bit) != 0)
            .unwrap_or(false);
        if set {
            let mut m = n * n;
            while m <= limit {
                if let Some((byte, bit)) = bits::bit_position(m) {
                    sieve[byte as usize] &= !(1 << bit);
                }
                m += n;
            }
        }
        n += 2;
    }
    let mut primes = Vec::new();
    for (i, &byte) in sieve.iter().enumerate() {
        for (bit, &v) in BIT_VALUES.iter().enumerate() {
            let value = 30 * i as u64 + v;
            if byte & (1 << bit) != 0 && value <= limit {
                primes.push(value as u32);
            }
        }
    }
    primes
}

/// Extracts set bits from the generator's segments and forwards each prime.
struct Extractor<'a, F> {
    emit: &'a mut F,
}

impl<F: FnMut(u64) -> ControlFlow<()>> SegmentVisitor for Extractor<'_, F> {
    fn segment(&mut self, sieve: &[u8], low: u64, _high: u64) -> ControlFlow<()> {
        for (i, &byte) in sieve.iter().enumerate() {
            let mut b = byte;
            while b != 0 {
                let bit = b.trailing_zeros() as usize;
                let flow = (self.emit)(low + 30 * i as u64 + BIT_VALUES[bit]);
                if flow.is_break() {
                    return flow;
                }
                b &= b - 1;
            }
        }
        ControlFlow::Continue(())
    }
}

/// Calls `emit` with every prime in [7, limit] in ascending order. `Break`
/// from the callback stops generation immediately.
pub(crate) fn each_sieving_prime<F>(limit: u64, emit: &mut F) -> ControlFlow<()>
where
    F: FnMut(u64) -> ControlFlow<()>,
{
    if limit < 7 {
        return ControlFlow::Continue(());
    }
    debug_assert!(limit < 1 << 32);
    let mut erat = Erat::new(7, limit, GENERATOR_SIEVE_BYTES, GENERATOR_PRE_SIEVE);
    let mut extractor = Extractor { emit };
    for prime in simple_primes(isqrt(limit) as u32) {
        let flow = erat.add_sieving_prime(u64::from(prime), &mut extractor);
        if flow.is_break() {
            return flow;
        }
    }
    erat.finish(&mut extractor)
}

//! # EratSmall — Cross-Off Engine for Small Sieving Primes
//!
//! Handles sieving primes below √(30·SegmentSize): each such prime strikes a
//! segment many times, so the inner loop dominates. It walks the mod-30 wheel
//! in whole revolutions — 8 clears per iteration with a single bounds test,
//! exploiting the fact that one full revolution advances the byte offset by
//! exactly the prime itself.

use crate::wheel::{wheel30, Placement, SievingPrime, SPOKE_RESIDUES};

#[derive(Default)]
pub(crate) struct EratSmall {
    primes: Vec<SievingPrime>,
}

impl EratSmall {
    pub(crate) fn new() -> EratSmall {
        EratSmall::default()
    }

    pub(crate) fn add(&mut self, prime: u64, segment_low: u64, stop: u64) {
        if let Some(Placement { multiple_index, wheel_index }) =
            wheel30().position(prime, segment_low, stop)
        {
            self.primes.push(SievingPrime {
                sieving_prime: (prime / 30) as u32,
                multiple_index: multiple_index as u32,
                wheel_index,
            });
        }
    }

    /// Clears every multiple of the owned primes inside the segment and
    /// carries each prime's position over to the next segment.
    pub(crate) fn cross_off(&mut self, sieve: &mut [u8]) {
        let wheel = &wheel30().elements;
        let len = sieve.len();
        for sp in &mut self.primes {
            let s = sp.sieving_prime as usize;
            let mut m = sp.multiple_index as usize;
            let mut w = sp.wheel_index as usize;
            // Bytes advanced by one 8-step revolution = the prime itself.
            let revolution = 30 * s + usize::from(SPOKE_RESIDUES[w / 8]);
            while m + revolution <= len {
                for _ in 0..8 {
                    let e = &wheel[w];
                    sieve[m] &= e.unset;
                    m += usize::from(e.factor) * s + usize::from(e.correct);
                    w = (w as isize + isize::from(e.next)) as usize;
                }
            }
            while m < len {
                let e = &wheel[w];
                sieve[m] &= e.unset;
                m += usize::from(e.factor) * s + usize::from(e.correct);
                w = (w as isize + isize::from(e.next)) as usize;
            }
            sp.multiple_index = (m - len) as u32;
            sp.wheel_index = w as u32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BIT_VALUES;

    /// Cross-off across several consecutive segments must clear exactly the
    /// multiples p·q with q ≥ p and q coprime to 30.
    #[test]
    fn multi_segment_state_carries_over() {
        let seg_bytes = 16;
        let segments = 12;
        let stop = 30 * (seg_bytes * segments) as u64;
        let mut erat = EratSmall::new();
        for prime in [7u64, 11, 13, 17, 19] {
            erat.add(prime, 0, stop);
        }
        let mut cleared = Vec::new();
        for seg in 0..segments {
            let mut sieve = vec![0xFFu8; seg_bytes];
            erat.cross_off(&mut sieve);
            let low = 30 * (seg * seg_bytes) as u64;
            for (i, &byte) in sieve.iter().enumerate() {
                for (bit, &v) in BIT_VALUES.iter().enumerate() {
                    if byte & (1 << bit) == 0 {
                        cleared.push(low + 30 * i as u64 + v);
                    }
                }
            }
        }
        for &n in &cleared {
            let divisible = [7u64, 11, 13, 17, 19].iter().any(|&p| n % p == 0 && n > p);
            assert!(divisible, "{} wrongly cleared", n);
        }
        // 7·7, 7·11, 11·11, 19·23 must all be present.
        for n in [49u64, 77, 121, 437] {
            assert!(cleared.contains(&n), "{} not cleared", n);
        }
        // Primes themselves never get cleared.
        for p in [7u64, 11, 13, 17, 19, 23, 29, 31, 53, 101, 4993] {
            assert!(!cleared.contains(&p), "prime {} wrongly cleared", p);
        }
    }

    #[test]
    fn add_skips_primes_without_multiples_in_range() {
        let mut erat = EratSmall::new();
        erat.add(31, 0, 900); // 31² = 961 > 900
        assert!(erat.primes.is_empty());
    }
}

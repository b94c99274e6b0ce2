//! # EratMedium — Cross-Off Engine for Medium Sieving Primes
//!
//! Handles sieving primes up to 30·SegmentSize: a handful of strikes per
//! segment, few enough that revolution unrolling buys nothing but the extra
//! residue skipping of the mod-210 wheel (multiples of 7 in the quotient are
//! never visited; the pre-sieve owns them) still pays.

use crate::wheel::{wheel210, Placement, SievingPrime};

#[derive(Default)]
pub(crate) struct EratMedium {
    primes: Vec<SievingPrime>,
}

impl EratMedium {
    pub(crate) fn new() -> EratMedium {
        EratMedium::default()
    }

    pub(crate) fn add(&mut self, prime: u64, segment_low: u64, stop: u64) {
        if let Some(Placement { multiple_index, wheel_index }) =
            wheel210().position(prime, segment_low, stop)
        {
            self.primes.push(SievingPrime {
                sieving_prime: (prime / 30) as u32,
                multiple_index: multiple_index as u32,
                wheel_index,
            });
        }
    }

    pub(crate) fn cross_off(&mut self, sieve: &mut [u8]) {
        let wheel = &wheel210().elements;
        let len = sieve.len();
        for sp in &mut self.primes {
            let s = sp.sieving_prime as usize;
            let mut m = sp.multiple_index as usize;
            let mut w = sp.wheel_index as usize;
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

//! # EratBig — Bucketed Cross-Off Engine for Large Sieving Primes
//!
//! Handles sieving primes above 30·SegmentSize. Such a prime strikes at most
//! one bit per segment, so scanning the whole prime store every segment
//! would cost O(π(√stop)) per segment. Instead, primes live in a ring of
//! buckets indexed by the number of segments until their next strike: on
//! entering a segment only its own bucket is drained, and each prime is
//! re-filed under its next target segment after striking.
//!
//! The ring replaces the classic linked bucket lists with plain vectors and
//! integer indices; drained vectors keep their allocation and are reused in
//! place. Ring capacity is fixed at construction from √stop — the farthest a
//! placement can reach ahead — so a bucket index out of range is a broken
//! invariant, not a resize signal.

use crate::wheel::{wheel210, Placement, SievingPrime};

pub(crate) struct EratBig {
    buckets: Vec<Vec<SievingPrime>>,
    head: usize,
    log2_segment: u32,
    index_mask: u32,
}

impl EratBig {
    /// `segment_bytes` must be a power of two; `sqrt_stop` bounds how far
    /// ahead of the current segment a first multiple can land.
    pub(crate) fn new(segment_bytes: usize, sqrt_stop: u64) -> EratBig {
        debug_assert!(segment_bytes.is_power_of_two());
        let log2_segment = segment_bytes.trailing_zeros();
        // A placement reaches at most segment_bytes + 11p/30 bytes ahead of
        // the current segment (first multiple past the segment plus one
        // wheel gap); size the ring for the largest possible prime.
        let ring = ((sqrt_stop * 11 / 30 + 64) >> log2_segment) as usize + 3;
        EratBig {
            buckets: vec![Vec::new(); ring],
            head: 0,
            log2_segment,
            index_mask: (segment_bytes - 1) as u32,
        }
    }

    pub(crate) fn add(&mut self, prime: u64, segment_low: u64, stop: u64) {
        if let Some(Placement { multiple_index, wheel_index }) =
            wheel210().position(prime, segment_low, stop)
        {
            let skip = (multiple_index >> self.log2_segment) as usize;
            assert!(skip < self.buckets.len(), "bucket ring too small");
            let slot = (self.head + skip) % self.buckets.len();
            self.buckets[slot].push(SievingPrime {
                sieving_prime: (prime / 30) as u32,
                multiple_index: multiple_index as u32 & self.index_mask,
                wheel_index,
            });
        }
    }

    /// Drains the current segment's bucket, strikes each prime once (rarely
    /// twice when its wheel step is shorter than the segment), and re-files
    /// it under the segment of its next multiple. Must be called exactly
    /// once per segment, in order.
    pub(crate) fn cross_off(&mut self, sieve: &mut [u8]) {
        let wheel = &wheel210().elements;
        let len = sieve.len();
        let ring = self.buckets.len();
        let mut current = std::mem::take(&mut self.buckets[self.head]);
        for sp in current.drain(..) {
            let s = sp.sieving_prime as usize;
            let mut m = sp.multiple_index as usize;
            let mut w = sp.wheel_index as usize;
            while m < len {
                let e = &wheel[w];
                sieve[m] &= e.unset;
                m += usize::from(e.factor) * s + usize::from(e.correct);
                w = (w as isize + isize::from(e.next)) as usize;
            }
            let skip = m >> self.log2_segment;
            assert!(skip < ring, "bucket ring too small");
            let slot = (self.head + skip) % ring;
            self.buckets[slot].push(SievingPrime {
                sieving_prime: sp.sieving_prime,
                multiple_index: m as u32 & self.index_mask,
                wheel_index: w as u32,
            });
        }
        // Hand the drained vector back so its allocation is recycled.
        self.buckets[self.head] = current;
        self.head = (self.head + 1) % ring;
    }
}

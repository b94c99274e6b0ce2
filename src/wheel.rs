//! # Wheel — Modulo-30 and Modulo-210 Wheel Factorization
//!
//! Wheel factorization skips candidates divisible by the wheel's factors while
//! crossing off multiples of a sieving prime. Two wheels are used:
//!
//! - the **mod-30 wheel** (factors 2, 3, 5) with 8 positions per spoke, used
//!   by the small-prime engine where the tightest inner loop wins;
//! - the **mod-210 wheel** (factors 2, 3, 5, 7) with 48 positions per spoke,
//!   used by the medium and bucketed engines where skipping ~77% of
//!   candidates outweighs the larger table.
//!
//! Both wheels have 8 spokes, one per residue of the sieving prime mod 30.
//! A [`WheelElement`] encodes one cross-off step: the bit to clear, the
//! quotient gap to the next multiple, a byte-offset correction, and the jump
//! to the next element (negative at the end of a spoke to wrap a revolution).
//! With it the hot loop reduces to "AND a mask, add a precomputed constant
//! times p/30, add a small correction" — no division or modulo.
//!
//! Tables are built once at first use; tests pin entries against the known
//! reference values.
//!
//! ## References
//!
//! - <https://en.wikipedia.org/wiki/Wheel_factorization>

use std::sync::OnceLock;

use crate::bits::RES_TO_BIT;

/// One cross-off step along a wheel spoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct WheelElement {
    /// AND mask clearing the bit of the current multiple.
    pub unset: u8,
    /// Quotient gap to the next multiple coprime to the wheel modulo.
    pub factor: u8,
    /// Fine correction added to the byte offset after `factor * (p / 30)`.
    pub correct: u8,
    /// Jump to the next wheel element; negative wraps back to spoke start.
    pub next: i8,
}

/// Placement entry: for a quotient residue `n`, the gap to the next quotient
/// coprime to the modulo and that quotient's element index within a spoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct WheelInit {
    pub factor: u8,
    pub index: u8,
}

/// State of one sieving prime: `p / 30`, the byte offset of its next multiple
/// relative to the current segment, and its current wheel element.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SievingPrime {
    pub sieving_prime: u32,
    pub multiple_index: u32,
    pub wheel_index: u32,
}

/// First multiple of a freshly added sieving prime, as a byte offset relative
/// to the segment base plus the wheel element to start from.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Placement {
    pub multiple_index: u64,
    pub wheel_index: u32,
}

/// A complete wheel: 8 spokes of `spoke_len` elements plus the placement
/// table indexed by quotient mod `modulo`.
pub(crate) struct Wheel {
    pub modulo: u64,
    pub spoke_len: u32,
    pub init: Vec<WheelInit>,
    pub elements: Vec<WheelElement>,
}

/// Sieving-prime residue per spoke; residue 1 sits on the last spoke.
pub(crate) const SPOKE_RESIDUES: [u8; 8] = [7, 11, 13, 17, 19, 23, 29, 1];

/// Maps `prime % 30` to its spoke number.
const SPOKE_OF_RESIDUE: [u8; 30] = {
    let mut map = [0xFFu8; 30];
    let mut spoke = 0;
    while spoke < 8 {
        map[SPOKE_RESIDUES[spoke] as usize] = spoke as u8;
        spoke += 1;
    }
    map
};

impl Wheel {
    /// Spoke base index for a sieving prime, from its residue mod 30.
    #[inline]
    pub(crate) fn spoke_offset(&self, prime: u64) -> u32 {
        let spoke = SPOKE_OF_RESIDUE[(prime % 30) as usize];
        debug_assert_ne!(spoke, 0xFF, "sieving prime {} shares a factor with 30", prime);
        u32::from(spoke) * self.spoke_len
    }

    /// Computes where `prime` first strikes at or after `segment_low`,
    /// starting from `prime²`, as a byte offset relative to `segment_low`.
    /// Returns `None` when no multiple lands in `[segment_low, stop]` (the
    /// prime is not needed), including when the first multiple would overflow
    /// u64 near the top of the range.
    pub(crate) fn position(&self, prime: u64, segment_low: u64, stop: u64) -> Option<Placement> {
        // Offset by 6 so that residues 7..=31 of one 30-block all map to the
        // same byte index under plain division by 30.
        let low = segment_low + 6;
        let mut quotient = low / prime + 1;
        let mut multiple = prime.checked_mul(quotient)?;
        if multiple > stop {
            return None;
        }
        // The first multiple that still needs crossing off is prime².
        let square = prime * prime;
        if multiple < square {
            multiple = square;
            quotient = prime;
        }
        // Advance to the next quotient coprime to the wheel modulo.
        let init = self.init[(quotient % self.modulo) as usize];
        let adjust = prime * u64::from(init.factor);
        if adjust > stop - multiple {
            return None;
        }
        multiple += adjust;
        Some(Placement {
            multiple_index: (multiple - low) / 30,
            wheel_index: self.spoke_offset(prime) + u32::from(init.index),
        })
    }
}

/// The mod-30 wheel (8 elements per spoke).
pub(crate) fn wheel30() -> &'static Wheel {
    static WHEEL: OnceLock<Wheel> = OnceLock::new();
    WHEEL.get_or_init(|| build_wheel(30))
}

/// The mod-210 wheel (48 elements per spoke).
pub(crate) fn wheel210() -> &'static Wheel {
    static WHEEL: OnceLock<Wheel> = OnceLock::new();
    WHEEL.get_or_init(|| build_wheel(210))
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Quotient residues coprime to the modulo, ascending from 1.
fn coprime_residues(modulo: u64) -> Vec<u64> {
    (1..modulo).filter(|&q| gcd(q, modulo) == 1).collect()
}

fn build_init(modulo: u64, residues: &[u64]) -> Vec<WheelInit> {
    (0..modulo)
        .map(|n| {
            // The largest residue (modulo - 1) is always coprime, so a next
            // quotient at or above n always exists within the same turn.
            let index = residues.partition_point(|&q| q < n);
            WheelInit {
                factor: (residues[index] - n) as u8,
                index: index as u8,
            }
        })
        .collect()
}

fn build_wheel(modulo: u64) -> Wheel {
    let residues = coprime_residues(modulo);
    let spoke_len = residues.len();
    let mut elements = Vec::with_capacity(8 * spoke_len);
    for &spoke_residue in &SPOKE_RESIDUES {
        let prime_residue = u64::from(spoke_residue);
        for (i, &q) in residues.iter().enumerate() {
            let gap = if i + 1 < spoke_len {
                residues[i + 1] - q
            } else {
                modulo + residues[0] - q
            };
            // Residue of the multiple, normalized into 7..=31 so that the
            // residue-1 case lands on bit 7 of the current byte.
            let mut r = (prime_residue * q) % 30;
            if r <= 1 {
                r += 30;
            }
            let bit = if r == 31 { 7 } else { RES_TO_BIT[r as usize] };
            // Byte advance = gap * (p / 30) + correct; the correction absorbs
            // the contribution of p's residue and the in-byte position.
            let correct = ((r - 6) + gap * prime_residue) / 30;
            let next = if i + 1 == spoke_len {
                -((spoke_len as i8) - 1)
            } else {
                1
            };
            elements.push(WheelElement {
                unset: !(1u8 << bit),
                factor: gap as u8,
                correct: correct as u8,
                next,
            });
        }
    }
    Wheel {
        modulo,
        spoke_len: spoke_len as u32,
        init: build_init(modulo, &residues),
        elements,
    }
}

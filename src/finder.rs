//! # Finder — Counting, Printing and Callback Extraction
//!
//! Consumes fully sieved segments and, per enabled flag, counts primes,
//! counts prime k-tuplets, prints values to stdout, or forwards each prime
//! to a caller-supplied callback.
//!
//! ## k-tuplet recognition
//!
//! In the mod-30 byte layout every admissible k-tuplet pattern (k ≥ 2) that
//! does not involve 2, 3 or 5 corresponds to a fixed AND-mask over a single
//! byte: a tuplet is present iff `byte & mask == mask`. Counting uses a
//! 256-entry lookup table per kind (how many of the kind's masks match each
//! byte value); the tuplets that do involve the primes ≤ 5 are emitted once
//! by the driver before segmented sieving begins.
//!
//! Because the interval edges are clipped before the finder runs, the same
//! buffer drives counting, printing and callbacks consistently.

use std::io::{self, Write};
use std::ops::{BitOr, BitOrAssign, ControlFlow};

use crate::bits::{self, BIT_VALUES};

/// Number of count kinds: primes plus the six tuplet sizes.
pub const KINDS: usize = 7;

/// Human-readable kind names, indexed like [`Counts`].
pub const KIND_NAMES: [&str; KINDS] = [
    "primes",
    "twins",
    "triplets",
    "quadruplets",
    "quintuplets",
    "sextuplets",
    "septuplets",
];

/// Byte masks recognizing each k-tuplet kind, indexed by kind.
const TUPLET_MASKS: [&[u8]; KINDS] = [
    &[],
    &[0x06, 0x18, 0xC0],
    &[0x07, 0x0E, 0x1C, 0x38],
    &[0x1E],
    &[0x1F, 0x3E],
    &[0x3F],
    &[0xFE],
];

/// Bitset of finder options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags(u32);

impl Flags {
    pub const COUNT_PRIMES: Flags = Flags(1 << 0);
    pub const COUNT_TWINS: Flags = Flags(1 << 1);
    pub const COUNT_TRIPLETS: Flags = Flags(1 << 2);
    pub const COUNT_QUADRUPLETS: Flags = Flags(1 << 3);
    pub const COUNT_QUINTUPLETS: Flags = Flags(1 << 4);
    pub const COUNT_SEXTUPLETS: Flags = Flags(1 << 5);
    pub const COUNT_SEPTUPLETS: Flags = Flags(1 << 6);
    pub const PRINT_PRIMES: Flags = Flags(1 << 7);
    pub const PRINT_TWINS: Flags = Flags(1 << 8);
    pub const PRINT_TRIPLETS: Flags = Flags(1 << 9);
    pub const PRINT_QUADRUPLETS: Flags = Flags(1 << 10);
    pub const PRINT_QUINTUPLETS: Flags = Flags(1 << 11);
    pub const PRINT_SEXTUPLETS: Flags = Flags(1 << 12);
    pub const PRINT_SEPTUPLETS: Flags = Flags(1 << 13);
    pub const CALCULATE_STATUS: Flags = Flags(1 << 14);
    pub const PRINT_STATUS: Flags = Flags(1 << 15);

    /// All seven count flags.
    pub const COUNT_ALL: Flags = Flags(0x7F);
    /// All seven print flags.
    pub const PRINT_ALL: Flags = Flags(0x7F << 7);

    pub const fn empty() -> Flags {
        Flags(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Flags {
        Flags(bits)
    }

    /// Count flag for a kind index in 0..7.
    pub fn count_kind(kind: usize) -> Flags {
        debug_assert!(kind < KINDS);
        Flags(1 << kind)
    }

    /// Print flag for a kind index in 0..7.
    pub fn print_kind(kind: usize) -> Flags {
        debug_assert!(kind < KINDS);
        Flags(1 << (7 + kind))
    }

    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_count(self, kind: usize) -> bool {
        self.contains(Flags::count_kind(kind))
    }

    pub fn is_print(self, kind: usize) -> bool {
        self.contains(Flags::print_kind(kind))
    }

    pub const fn any_count(self) -> bool {
        self.0 & Flags::COUNT_ALL.0 != 0
    }

    pub const fn any_print(self) -> bool {
        self.0 & Flags::PRINT_ALL.0 != 0
    }
}

impl BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

/// Per-kind result counters of one sieve run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counts(pub(crate) [u64; KINDS]);

impl Counts {
    pub fn get(&self, kind: usize) -> u64 {
        self.0[kind]
    }

    pub fn primes(&self) -> u64 {
        self.0[0]
    }

    pub fn twins(&self) -> u64 {
        self.0[1]
    }

    pub fn triplets(&self) -> u64 {
        self.0[2]
    }

    pub fn quadruplets(&self) -> u64 {
        self.0[3]
    }

    pub fn quintuplets(&self) -> u64 {
        self.0[4]
    }

    pub fn sextuplets(&self) -> u64 {
        self.0[5]
    }

    pub fn septuplets(&self) -> u64 {
        self.0[6]
    }

    pub(crate) fn merge(&mut self, other: &Counts) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a += b;
        }
    }
}

/// Caller-supplied prime sink; invoked in ascending order. `Break` cancels
/// the run before the next emission.
pub(crate) enum Callback<'a> {
    U64(&'a mut dyn FnMut(u64) -> ControlFlow<()>),
    U32(&'a mut dyn FnMut(u32) -> ControlFlow<()>),
}

pub(crate) struct Finder<'a> {
    flags: Flags,
    counts: Counts,
    /// Per counted tuplet kind: (kind, matches-per-byte-value table).
    count_tables: Vec<(usize, [u8; 256])>,
    out: Option<io::BufWriter<io::StdoutLock<'static>>>,
    callback: Option<Callback<'a>>,
}

fn tuplet_table(kind: usize) -> [u8; 256] {
    let mut table = [0u8; 256];
    for (value, entry) in table.iter_mut().enumerate() {
        for &mask in TUPLET_MASKS[kind] {
            if value as u8 & mask == mask {
                *entry += 1;
            }
        }
    }
    table
}

impl<'a> Finder<'a> {
    pub(crate) fn new(flags: Flags, callback: Option<Callback<'a>>) -> Finder<'a> {
        let count_tables = (1..KINDS)
            .filter(|&kind| flags.is_count(kind))
            .map(|kind| (kind, tuplet_table(kind)))
            .collect();
        let out = flags
            .any_print()
            .then(|| io::BufWriter::new(io::stdout().lock()));
        Finder {
            flags,
            counts: Counts::default(),
            count_tables,
            out,
            callback,
        }
    }

    pub(crate) fn counts(&self) -> &Counts {
        &self.counts
    }

    /// Flushes buffered print output; called once after the last segment.
    pub(crate) fn finish(&mut self) {
        if let Some(out) = &mut self.out {
            let _ = out.flush();
        }
    }

    /// Emits one entry of the small-prime table (primes below 7 and the
    /// tuplets containing them): counted, printed as the given text, and —
    /// for single primes — forwarded to the callback.
    pub(crate) fn emit_small(&mut self, kind: usize, text: &str, value: u64) -> ControlFlow<()> {
        if self.flags.is_count(kind) {
            self.counts.0[kind] += 1;
        }
        if self.flags.is_print(kind) {
            if let Some(out) = &mut self.out {
                if writeln!(out, "{}", text).is_err() {
                    return ControlFlow::Break(());
                }
            }
        }
        if kind == 0 {
            if let Some(callback) = &mut self.callback {
                let flow = match callback {
                    Callback::U64(f) => f(value),
                    Callback::U32(f) => f(value as u32),
                };
                if flow.is_break() {
                    return flow;
                }
            }
        }
        ControlFlow::Continue(())
    }

    pub(crate) fn process(&mut self, sieve: &[u8], low: u64) -> ControlFlow<()> {
        // Primes: callback path counts per emission so that a cancelled run
        // reports exactly the number of values the caller saw.
        if let Some(callback) = &mut self.callback {
            let count_primes = self.flags.is_count(0);
            for (i, &byte) in sieve.iter().enumerate() {
                let mut b = byte;
                while b != 0 {
                    let bit = b.trailing_zeros() as usize;
                    let value = low + 30 * i as u64 + BIT_VALUES[bit];
                    if count_primes {
                        self.counts.0[0] += 1;
                    }
                    let flow = match callback {
                        Callback::U64(f) => f(value),
                        Callback::U32(f) => f(value as u32),
                    };
                    if flow.is_break() {
                        return flow;
                    }
                    b &= b - 1;
                }
            }
        } else if self.flags.is_count(0) {
            self.counts.0[0] += bits::count_set_bits(sieve);
        }

        for (kind, table) in &self.count_tables {
            let mut n: u64 = 0;
            for &byte in sieve {
                n += u64::from(table[byte as usize]);
            }
            self.counts.0[*kind] += n;
        }

        if let Some(out) = self.out.take() {
            let flow = self.print_segment(out, sieve, low);
            if flow.is_break() {
                return flow;
            }
        }
        ControlFlow::Continue(())
    }

    fn print_segment(
        &mut self,
        mut out: io::BufWriter<io::StdoutLock<'static>>,
        sieve: &[u8],
        low: u64,
    ) -> ControlFlow<()> {
        let mut result = io::Result::Ok(());
        if self.flags.is_print(0) {
            for (i, &byte) in sieve.iter().enumerate() {
                let mut b = byte;
                while b != 0 {
                    let bit = b.trailing_zeros() as usize;
                    result = writeln!(out, "{}", low + 30 * i as u64 + BIT_VALUES[bit]);
                    b &= b - 1;
                }
            }
        }
        for kind in 1..KINDS {
            if !self.flags.is_print(kind) {
                continue;
            }
            for (i, &byte) in sieve.iter().enumerate() {
                for &mask in TUPLET_MASKS[kind] {
                    if byte & mask == mask {
                        result = write_tuplet(&mut out, low + 30 * i as u64, mask);
                    }
                }
            }
        }
        self.out = Some(out);
        // A dead output stream (e.g. a closed pipe) cancels the run.
        match result {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }
}

fn write_tuplet(out: &mut impl Write, base: u64, mask: u8) -> io::Result<()> {
    let mut sep = "(";
    for (bit, &v) in BIT_VALUES.iter().enumerate() {
        if mask & (1 << bit) != 0 {
            write!(out, "{}{}", sep, base + v)?;
            sep = ", ";
        }
    }
    writeln!(out, ")")
}

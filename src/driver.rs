//! # Driver — Single-Threaded Sieve Orchestration
//!
//! [`PrimeSieve`] owns one segmented sieve run: configuration (range, sieve
//! size, pre-sieve limit, flags), the segment-by-segment progression, the
//! count vector, status and elapsed time, and cancellation.
//!
//! The driver is a state machine: `Idle` until configured, `Ready` once any
//! setter ran, `Running` inside `sieve()`, then `Done` or `Cancelled`.
//! Cancellation is a non-error outcome — either the external cancel flag
//! observed at a segment boundary, or a callback returning `Break` — and
//! leaves the counts accumulated so far readable.
//!
//! Primes 2, 3 and 5 have no representation in the segment encoding, so
//! they and the k-tuplets containing them are emitted from a fixed table
//! before segmented sieving begins.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::erat::{Erat, SegmentVisitor};
use crate::error::SieveError;
use crate::finder::{Callback, Counts, Finder, Flags};
use crate::generator;
use crate::isqrt;
use crate::presieve::{DEFAULT_PRE_SIEVE, PRE_SIEVE_PRIMES};
use crate::progress::{Progress, ReporterGuard};

/// Default segment size in KiB; sized for L1-resident segments.
pub const DEFAULT_SIEVE_SIZE_KB: u32 = 32;

/// How a sieve run ended. Both outcomes leave counts readable; after
/// `Cancelled` they cover only the interval processed so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SieveOutcome {
    Completed,
    Cancelled,
}

/// Driver lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Ready,
    Running,
    Done,
    Cancelled,
}

/// Primes below 7 and the k-tuplets containing them, handled outside the
/// segmented representation.
struct SmallPrime {
    min: u64,
    max: u64,
    kind: usize,
    text: &'static str,
}

const SMALL_PRIMES: [SmallPrime; 8] = [
    SmallPrime { min: 2, max: 2, kind: 0, text: "2" },
    SmallPrime { min: 3, max: 3, kind: 0, text: "3" },
    SmallPrime { min: 5, max: 5, kind: 0, text: "5" },
    SmallPrime { min: 3, max: 5, kind: 1, text: "(3, 5)" },
    SmallPrime { min: 5, max: 7, kind: 1, text: "(5, 7)" },
    SmallPrime { min: 5, max: 11, kind: 2, text: "(5, 7, 11)" },
    SmallPrime { min: 5, max: 13, kind: 3, text: "(5, 7, 11, 13)" },
    SmallPrime { min: 5, max: 17, kind: 4, text: "(5, 7, 11, 13, 17)" },
];

pub struct PrimeSieve {
    start: u64,
    stop: u64,
    sieve_size_kb: u32,
    pre_sieve: u32,
    flags: Flags,
    counts: Counts,
    seconds: f64,
    state: DriverState,
    cancel: Arc<AtomicBool>,
    progress: Arc<Progress>,
    shared_progress: bool,
}

impl Default for PrimeSieve {
    fn default() -> PrimeSieve {
        PrimeSieve::new()
    }
}

/// Forwards sieved segments to the finder, accounts progress, and polls the
/// cancel flag — the only per-segment-boundary synchronization points.
struct Pass<'a, 'b> {
    finder: &'a mut Finder<'b>,
    progress: &'a Progress,
    cancel: &'a AtomicBool,
}

impl SegmentVisitor for Pass<'_, '_> {
    fn segment(&mut self, sieve: &[u8], low: u64, high: u64) -> ControlFlow<()> {
        let flow = self.finder.process(sieve, low);
        if flow.is_break() {
            return flow;
        }
        self.progress.add_span(low, high);
        if self.cancel.load(Ordering::Relaxed) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

impl PrimeSieve {
    pub fn new() -> PrimeSieve {
        PrimeSieve {
            start: 0,
            stop: 0,
            sieve_size_kb: DEFAULT_SIEVE_SIZE_KB,
            pre_sieve: DEFAULT_PRE_SIEVE,
            flags: Flags::COUNT_PRIMES,
            counts: Counts::default(),
            seconds: 0.0,
            state: DriverState::Idle,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: Progress::new(0, 0),
            shared_progress: false,
        }
    }

    /// Copies another driver's configuration; counts and state start fresh.
    pub fn inherit(parent: &PrimeSieve) -> PrimeSieve {
        let mut child = PrimeSieve::new();
        child.start = parent.start;
        child.stop = parent.stop;
        child.sieve_size_kb = parent.sieve_size_kb;
        child.pre_sieve = parent.pre_sieve;
        child.flags = parent.flags;
        child.state = DriverState::Ready;
        child
    }

    // ── Configuration ───────────────────────────────────────────────

    pub fn set_start(&mut self, start: u64) {
        self.start = start;
        self.state = DriverState::Ready;
    }

    pub fn set_stop(&mut self, stop: u64) {
        self.stop = stop;
        self.state = DriverState::Ready;
    }

    /// Segment size in KiB, floored to a power of two within 1..=4096.
    pub fn set_sieve_size_kb(&mut self, kb: u32) -> Result<(), SieveError> {
        if !(1..=4096).contains(&kb) {
            return Err(SieveError::InvalidSieveSize(kb));
        }
        self.sieve_size_kb = 1 << (31 - kb.leading_zeros());
        self.state = DriverState::Ready;
        Ok(())
    }

    /// Pre-sieve limit; one of {7, 11, 13, 17, 19, 23}.
    pub fn set_pre_sieve(&mut self, limit: u32) -> Result<(), SieveError> {
        if !PRE_SIEVE_PRIMES.contains(&limit) {
            return Err(SieveError::UnsupportedPreSieve(limit));
        }
        self.pre_sieve = limit;
        self.state = DriverState::Ready;
        Ok(())
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
        self.state = DriverState::Ready;
    }

    pub fn add_flags(&mut self, flags: Flags) {
        self.flags |= flags;
        self.state = DriverState::Ready;
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn stop(&self) -> u64 {
        self.stop
    }

    pub fn sieve_size_kb(&self) -> u32 {
        self.sieve_size_kb
    }

    pub fn pre_sieve(&self) -> u32 {
        self.pre_sieve
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Counts of the most recent run.
    pub fn counts(&self) -> &Counts {
        &self.counts
    }

    pub fn count(&self, kind: usize) -> u64 {
        self.counts.get(kind)
    }

    /// Wall seconds of the most recent run.
    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    /// Completed percentage of the current or last run, in [0, 100].
    pub fn status(&self) -> f64 {
        self.progress.percent()
    }

    /// Shared flag observed at segment boundaries; set it from another
    /// thread (or a signal handler) to cancel a running sieve. The flag is
    /// not cleared automatically: reset it before reusing the driver.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub(crate) fn share_progress(&mut self, progress: Arc<Progress>) {
        self.progress = progress;
        self.shared_progress = true;
    }

    pub(crate) fn share_cancel(&mut self, cancel: Arc<AtomicBool>) {
        self.cancel = cancel;
    }

    // ── Sieving ─────────────────────────────────────────────────────

    /// Runs the engine over [start, stop] with the configured flags.
    pub fn sieve(&mut self) -> Result<SieveOutcome, SieveError> {
        self.run(None)
    }

    pub fn sieve_range(&mut self, start: u64, stop: u64) -> Result<SieveOutcome, SieveError> {
        self.set_start(start);
        self.set_stop(stop);
        self.sieve()
    }

    /// Invokes `f` with every prime in [start, stop] in ascending order;
    /// `Break` cancels the run after the current emission.
    pub fn for_each_prime(
        &mut self,
        start: u64,
        stop: u64,
        f: &mut dyn FnMut(u64) -> ControlFlow<()>,
    ) -> Result<SieveOutcome, SieveError> {
        self.set_start(start);
        self.set_stop(stop);
        self.flags = Flags::COUNT_PRIMES;
        self.run(Some(Callback::U64(f)))
    }

    /// Narrow-value variant of [`Self::for_each_prime`]; requires stop < 2³².
    pub fn for_each_prime_u32(
        &mut self,
        start: u64,
        stop: u64,
        f: &mut dyn FnMut(u32) -> ControlFlow<()>,
    ) -> Result<SieveOutcome, SieveError> {
        if stop > u64::from(u32::MAX) {
            return Err(SieveError::CallbackRange(stop));
        }
        self.set_start(start);
        self.set_stop(stop);
        self.flags = Flags::COUNT_PRIMES;
        self.run(Some(Callback::U32(f)))
    }

    /// Counts one kind over [start, stop], replacing the configured flags.
    pub fn count_kind(&mut self, kind: usize, start: u64, stop: u64) -> Result<u64, SieveError> {
        assert!(kind < crate::finder::KINDS, "kind index out of range: {}", kind);
        self.set_start(start);
        self.set_stop(stop);
        self.flags = Flags::count_kind(kind);
        self.sieve()?;
        Ok(self.counts.get(kind))
    }

    pub fn count_primes(&mut self, start: u64, stop: u64) -> Result<u64, SieveError> {
        self.count_kind(0, start, stop)
    }

    pub fn count_twins(&mut self, start: u64, stop: u64) -> Result<u64, SieveError> {
        self.count_kind(1, start, stop)
    }

    pub fn count_triplets(&mut self, start: u64, stop: u64) -> Result<u64, SieveError> {
        self.count_kind(2, start, stop)
    }

    pub fn count_quadruplets(&mut self, start: u64, stop: u64) -> Result<u64, SieveError> {
        self.count_kind(3, start, stop)
    }

    pub fn count_quintuplets(&mut self, start: u64, stop: u64) -> Result<u64, SieveError> {
        self.count_kind(4, start, stop)
    }

    pub fn count_sextuplets(&mut self, start: u64, stop: u64) -> Result<u64, SieveError> {
        self.count_kind(5, start, stop)
    }

    pub fn count_septuplets(&mut self, start: u64, stop: u64) -> Result<u64, SieveError> {
        self.count_kind(6, start, stop)
    }

    /// Prints one kind over [start, stop] to stdout, one value or tuplet
    /// per line, replacing the configured flags.
    pub fn print_kind(&mut self, kind: usize, start: u64, stop: u64) -> Result<SieveOutcome, SieveError> {
        assert!(kind < crate::finder::KINDS, "kind index out of range: {}", kind);
        self.set_start(start);
        self.set_stop(stop);
        self.flags = Flags::print_kind(kind);
        self.sieve()
    }

    pub fn print_primes(&mut self, start: u64, stop: u64) -> Result<SieveOutcome, SieveError> {
        self.print_kind(0, start, stop)
    }

    fn run(&mut self, callback: Option<Callback<'_>>) -> Result<SieveOutcome, SieveError> {
        if self.start > self.stop {
            return Err(SieveError::InvalidRange { start: self.start, stop: self.stop });
        }
        self.counts = Counts::default();
        self.seconds = 0.0;
        self.state = DriverState::Running;
        if !self.shared_progress {
            self.progress = Progress::new(self.start, self.stop);
        }
        let _reporter = (self.flags.contains(Flags::PRINT_STATUS) && !self.shared_progress)
            .then(|| ReporterGuard::start(&self.progress));
        let timer = Instant::now();
        debug!(
            start = self.start,
            stop = self.stop,
            sieve_size_kb = self.sieve_size_kb,
            pre_sieve = self.pre_sieve,
            flags = self.flags.bits(),
            "sieve started"
        );

        let mut finder = Finder::new(self.flags, callback);
        let mut flow = ControlFlow::Continue(());
        for sp in &SMALL_PRIMES {
            if self.start <= sp.min && sp.max <= self.stop {
                flow = finder.emit_small(sp.kind, sp.text, sp.min);
                if flow.is_break() {
                    break;
                }
            }
        }

        let sieve_start = self.start.max(7);
        if flow.is_continue() && sieve_start <= self.stop {
            let sieve_bytes = self.sieve_size_kb as usize * 1024;
            let mut erat = Erat::new(sieve_start, self.stop, sieve_bytes, self.pre_sieve);
            let mut pass = Pass {
                finder: &mut finder,
                progress: &self.progress,
                cancel: &self.cancel,
            };
            flow = generator::each_sieving_prime(isqrt(self.stop), &mut |prime| {
                erat.add_sieving_prime(prime, &mut pass)
            });
            if flow.is_continue() {
                flow = erat.finish(&mut pass);
            }
        }

        finder.finish();
        self.counts.merge(finder.counts());
        self.seconds = timer.elapsed().as_secs_f64();
        let outcome = if flow.is_break() {
            self.state = DriverState::Cancelled;
            SieveOutcome::Cancelled
        } else {
            self.state = DriverState::Done;
            SieveOutcome::Completed
        };
        debug!(
            seconds = self.seconds,
            primes = self.counts.primes(),
            outcome = ?outcome,
            "sieve finished"
        );
        Ok(outcome)
    }
}

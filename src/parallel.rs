//! # Parallel — Multi-Threaded Count Controller
//!
//! Splits [start, stop] into per-worker sub-intervals, runs one independent
//! [`PrimeSieve`] driver per rayon worker, and sums the count vectors after
//! all workers finish. Workers share nothing but the progress atomic and the
//! cancel flag; aggregation is associative, so the result equals the serial
//! one regardless of scheduling.
//!
//! Print and callback flags are rejected for more than one thread: emission
//! order across sub-intervals would be violated.
//!
//! Sub-interval boundaries sit between 30k+1 and 30k+2. Every counted
//! k-tuplet pattern lives inside a single byte of the mod-30 layout, i.e.
//! inside [30k+7, 30k+31], so no tuplet can straddle such a boundary and
//! per-kind counts stay additive. Cancellation is observed by each worker at
//! its own segment boundaries.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::driver::{DriverState, PrimeSieve, SieveOutcome, DEFAULT_SIEVE_SIZE_KB};
use crate::error::SieveError;
use crate::finder::{Counts, Flags};
use crate::presieve::DEFAULT_PRE_SIEVE;
use crate::progress::{Progress, ReporterGuard};

pub struct ParallelPrimeSieve {
    start: u64,
    stop: u64,
    sieve_size_kb: u32,
    pre_sieve: u32,
    flags: Flags,
    threads: usize,
    counts: Counts,
    seconds: f64,
    state: DriverState,
    cancel: Arc<AtomicBool>,
    progress: Arc<Progress>,
}

impl Default for ParallelPrimeSieve {
    fn default() -> ParallelPrimeSieve {
        ParallelPrimeSieve::new()
    }
}

impl ParallelPrimeSieve {
    pub fn new() -> ParallelPrimeSieve {
        ParallelPrimeSieve {
            start: 0,
            stop: 0,
            sieve_size_kb: DEFAULT_SIEVE_SIZE_KB,
            pre_sieve: DEFAULT_PRE_SIEVE,
            flags: Flags::COUNT_PRIMES,
            threads: 0,
            counts: Counts::default(),
            seconds: 0.0,
            state: DriverState::Idle,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: Progress::new(0, 0),
        }
    }

    pub fn set_start(&mut self, start: u64) {
        self.start = start;
        self.state = DriverState::Ready;
    }

    pub fn set_stop(&mut self, stop: u64) {
        self.stop = stop;
        self.state = DriverState::Ready;
    }

    pub fn set_sieve_size_kb(&mut self, kb: u32) -> Result<(), SieveError> {
        let mut probe = PrimeSieve::new();
        probe.set_sieve_size_kb(kb)?;
        self.sieve_size_kb = probe.sieve_size_kb();
        self.state = DriverState::Ready;
        Ok(())
    }

    pub fn set_pre_sieve(&mut self, limit: u32) -> Result<(), SieveError> {
        let mut probe = PrimeSieve::new();
        probe.set_pre_sieve(limit)?;
        self.pre_sieve = limit;
        self.state = DriverState::Ready;
        Ok(())
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
        self.state = DriverState::Ready;
    }

    /// Worker count; 0 means one worker per logical core.
    pub fn set_threads(&mut self, threads: usize) {
        self.threads = threads;
        self.state = DriverState::Ready;
    }

    pub fn counts(&self) -> &Counts {
        &self.counts
    }

    pub fn count(&self, kind: usize) -> u64 {
        self.counts.get(kind)
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn status(&self) -> f64 {
        self.progress.percent()
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn effective_threads(&self) -> usize {
        let configured = if self.threads == 0 {
            rayon::current_num_threads()
        } else {
            self.threads
        };
        // No point in more workers than whole segments in the interval.
        let span = u128::from(self.stop) - u128::from(self.start) + 1;
        let min_chunk = 30 * u128::from(self.sieve_size_kb) * 1024;
        let useful = (span / min_chunk).max(1);
        configured.max(1).min(useful.min(4096) as usize)
    }

    /// Sub-interval boundaries: ascending, starting at `start`, ending past
    /// `stop`, with every interior boundary ≡ 2 (mod 30) and chunk lengths
    /// aligned to whole segments.
    fn chunk_starts(&self, threads: usize) -> Vec<u64> {
        let start = u128::from(self.start);
        let stop = u128::from(self.stop);
        let span = stop - start + 1;
        let segment = 30 * u128::from(self.sieve_size_kb) * 1024;
        let chunk = (span / threads as u128 / segment + 1) * segment;
        let mut starts = vec![self.start];
        let mut next = start + chunk;
        while next + 36 < stop {
            // Align down to the residue-2 slot of the enclosing 30-block.
            let aligned = (next - next % 30 + 2) as u64;
            debug_assert!(aligned > *starts.last().unwrap());
            starts.push(aligned);
            next += chunk;
        }
        starts
    }

    /// Counts over [start, stop] with the configured worker count.
    pub fn sieve(&mut self) -> Result<SieveOutcome, SieveError> {
        if self.start > self.stop {
            return Err(SieveError::InvalidRange { start: self.start, stop: self.stop });
        }
        let threads = self.effective_threads();
        if self.flags.any_print() && threads > 1 {
            return Err(SieveError::ParallelPrintUnsupported);
        }
        self.counts = Counts::default();
        self.state = DriverState::Running;
        self.progress = Progress::new(self.start, self.stop);
        let _reporter = self
            .flags
            .contains(Flags::PRINT_STATUS)
            .then(|| ReporterGuard::start(&self.progress));
        let timer = Instant::now();

        if threads == 1 {
            let mut driver = self.worker();
            driver.set_start(self.start);
            driver.set_stop(self.stop);
            let outcome = driver.sieve()?;
            self.counts = *driver.counts();
            self.seconds = timer.elapsed().as_secs_f64();
            self.state = driver.state();
            return Ok(outcome);
        }

        let starts = self.chunk_starts(threads);
        debug!(threads, chunks = starts.len(), "parallel sieve started");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SieveError::ThreadPool(e.to_string()))?;
        let stop = self.stop;
        let results: Vec<Result<(Counts, SieveOutcome), SieveError>> = pool.install(|| {
            starts
                .par_iter()
                .enumerate()
                .map(|(i, &chunk_start)| {
                    let chunk_stop = starts.get(i + 1).map_or(stop, |&next| next - 1);
                    let mut driver = self.worker();
                    driver.set_start(chunk_start);
                    driver.set_stop(chunk_stop);
                    let outcome = driver.sieve()?;
                    Ok((*driver.counts(), outcome))
                })
                .collect()
        });

        let mut outcome = SieveOutcome::Completed;
        for result in results {
            let (counts, worker_outcome) = result?;
            self.counts.merge(&counts);
            if worker_outcome == SieveOutcome::Cancelled {
                outcome = SieveOutcome::Cancelled;
            }
        }
        self.seconds = timer.elapsed().as_secs_f64();
        self.state = match outcome {
            SieveOutcome::Completed => DriverState::Done,
            SieveOutcome::Cancelled => DriverState::Cancelled,
        };
        debug!(seconds = self.seconds, primes = self.counts.primes(), "parallel sieve finished");
        Ok(outcome)
    }

    /// One worker driver sharing this controller's progress and cancel flag.
    fn worker(&self) -> PrimeSieve {
        let mut driver = PrimeSieve::new();
        driver
            .set_sieve_size_kb(self.sieve_size_kb)
            .expect("validated sieve size");
        driver.set_pre_sieve(self.pre_sieve).expect("validated pre-sieve");
        driver.set_flags(self.flags);
        driver.share_progress(Arc::clone(&self.progress));
        driver.share_cancel(Arc::clone(&self.cancel));
        driver
    }
}

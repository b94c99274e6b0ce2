//! # Progress — Atomic Sieve Progress and Status Reporter
//!
//! Thread-safe progress tracking shared between drivers and the optional
//! background status reporter. Workers add each processed segment span with
//! a relaxed atomic add — the only writable datum shared across threads —
//! and the reporter (or a caller polling `percent()`) reads it lock-free.
//!
//! Spans are accounted in 30-integer windows rather than raw integers so
//! that an interval covering the whole u64 range cannot overflow the
//! counter.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub struct Progress {
    /// Processed 30-integer windows.
    processed: AtomicU64,
    /// Total windows in the configured interval; at least 1.
    total: u64,
    start: Instant,
    shutdown: AtomicBool,
}

impl Progress {
    pub fn new(start: u64, stop: u64) -> Arc<Progress> {
        debug_assert!(start <= stop);
        Arc::new(Progress {
            processed: AtomicU64::new(0),
            total: stop / 30 - start / 30 + 1,
            start: Instant::now(),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Records one processed segment [low, high].
    pub(crate) fn add_span(&self, low: u64, high: u64) {
        self.processed
            .fetch_add(high / 30 - low / 30 + 1, Ordering::Relaxed);
    }

    /// Completed fraction of the interval in percent, clamped to [0, 100].
    pub fn percent(&self) -> f64 {
        let processed = self.processed.load(Ordering::Relaxed) as f64;
        (processed / self.total as f64 * 100.0).min(100.0)
    }

    /// Spawns a thread that prints the percentage to stderr until `stop()`.
    pub fn start_reporter(self: &Arc<Self>) -> thread::JoinHandle<()> {
        let progress = Arc::clone(self);
        thread::spawn(move || loop {
            thread::sleep(Duration::from_secs(2));
            if progress.shutdown.load(Ordering::Relaxed) {
                break;
            }
            progress.print_status();
        })
    }

    pub fn print_status(&self) {
        let elapsed = self.start.elapsed().as_secs();
        eprintln!(
            "[{:02}:{:02}:{:02}] {:5.1}%",
            elapsed / 3600,
            (elapsed % 3600) / 60,
            elapsed % 60,
            self.percent()
        );
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    #[cfg(test)]
    fn is_stopped(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

/// Stops and joins the reporter thread when the run ends, on every exit path.
pub(crate) struct ReporterGuard {
    progress: Arc<Progress>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ReporterGuard {
    pub(crate) fn start(progress: &Arc<Progress>) -> ReporterGuard {
        ReporterGuard {
            progress: Arc::clone(progress),
            handle: Some(progress.start_reporter()),
        }
    }
}

impl Drop for ReporterGuard {
    fn drop(&mut self) {
        self.progress.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

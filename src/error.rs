//! # Error — Configuration and Usage Errors
//!
//! All errors are reported synchronously from setters or from `sieve()`
//! before any sieving side effect happens. Cancellation is deliberately not
//! an error; it is the `Cancelled` outcome with partial counts readable.

use crate::presieve::PRE_SIEVE_PRIMES;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SieveError {
    #[error("invalid range: start {start} > stop {stop}")]
    InvalidRange { start: u64, stop: u64 },

    #[error("invalid sieve size: {0} KiB (expected 1..=4096)")]
    InvalidSieveSize(u32),

    #[error("unsupported pre-sieve limit: {0} (expected one of {allowed:?})", allowed = PRE_SIEVE_PRIMES)]
    UnsupportedPreSieve(u32),

    #[error("printing and callbacks preserve emission order and require a single thread")]
    ParallelPrintUnsupported,

    #[error("callback values exceed u32: stop {0} is above 4294967295")]
    CallbackRange(u64),

    #[error("failed to build worker thread pool: {0}")]
    ThreadPool(String),
}

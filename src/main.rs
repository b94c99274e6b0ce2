//! # Main — CLI Entry Point
//!
//! Parses the command line, initializes tracing, and hands off to the
//! execution functions in `cli`. The engine itself lives in the `primespan`
//! library; this binary only wires configuration to it and formats results.
//!
//! ## Usage
//!
//! ```text
//! primespan 1000000            # count primes in [0, 10⁶]
//! primespan 100 200 -c all     # count every kind in [100, 200]
//! primespan -p 2 0 1000        # print the twin primes up to 1000
//! primespan 1000000000000 1001000000000 -t 8 --status
//! ```

mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "primespan",
    about = "Count and print primes and prime k-tuplets with a segmented sieve",
    after_help = "Kinds: 1=primes 2=twins 3=triplets 4=quadruplets 5=quintuplets 6=sextuplets 7=septuplets"
)]
pub struct Cli {
    /// Start of the interval (or its stop when no second value is given)
    pub start: u64,

    /// End of the interval (inclusive)
    pub stop: Option<u64>,

    /// Kinds to count, e.g. "1", "1,2,3", "twins", "all"
    #[arg(short, long)]
    pub count: Option<String>,

    /// Kinds to print one per line, e.g. "1" or "twins"; forces one thread
    #[arg(short, long)]
    pub print: Option<String>,

    /// Sieve segment size in KiB (1..=4096, floored to a power of two)
    #[arg(short = 's', long)]
    pub sieve_size: Option<u32>,

    /// Pre-sieve limit: one of 7, 11, 13, 17, 19, 23
    #[arg(short = 'r', long)]
    pub pre_sieve: Option<u32>,

    /// Worker threads for counting (0 = all logical cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Report progress percentage to stderr while sieving
    #[arg(long)]
    pub status: bool,

    /// Emit results as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Suppress the timing summary on stderr
    #[arg(short, long)]
    pub quiet: bool,

    /// Config file with defaults (default: ./primespan.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose engine logging (equivalent to RUST_LOG=primespan=debug)
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "primespan=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
    cli::run(&cli)
}

//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim: kind-list parsing,
//! config-file merging, sieve construction and result formatting for both
//! the text and JSON output modes.

use anyhow::{bail, Context, Result};
use tracing::info;

use primespan::config::Config;
use primespan::{Counts, Flags, ParallelPrimeSieve, SieveOutcome, KINDS, KIND_NAMES};

use super::Cli;

/// Parses a kind list like `1`, `1,2,3`, `twins,septuplets` or `all` into
/// kind indices 0..7 (user-facing numbering starts at 1 = primes).
pub fn parse_kinds(input: &str) -> Result<Vec<usize>> {
    let mut kinds = Vec::new();
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if token.eq_ignore_ascii_case("all") {
            kinds.extend(0..KINDS);
            continue;
        }
        if let Ok(n) = token.parse::<usize>() {
            if (1..=KINDS).contains(&n) {
                kinds.push(n - 1);
                continue;
            }
            bail!("kind {} out of range (expected 1..=7)", n);
        }
        match KIND_NAMES.iter().position(|&name| name.eq_ignore_ascii_case(token)) {
            Some(kind) => kinds.push(kind),
            None => bail!(
                "unknown kind '{}' (expected 1..=7, 'all', or one of {:?})",
                token,
                KIND_NAMES
            ),
        }
    }
    if kinds.is_empty() {
        bail!("empty kind list");
    }
    kinds.sort_unstable();
    kinds.dedup();
    Ok(kinds)
}

/// Resolves the sieving interval from the positional arguments: one value
/// means [0, value], two mean [start, stop].
fn resolve_range(cli: &Cli) -> (u64, u64) {
    match cli.stop {
        Some(stop) => (cli.start, stop),
        None => (0, cli.start),
    }
}

struct Resolved {
    start: u64,
    stop: u64,
    flags: Flags,
    count_kinds: Vec<usize>,
    sieve_size_kb: Option<u32>,
    pre_sieve: Option<u32>,
    threads: usize,
    quiet: bool,
}

/// Merges CLI options over config-file defaults into a run plan.
fn resolve(cli: &Cli, config: &Config) -> Result<Resolved> {
    let (start, stop) = resolve_range(cli);

    let count_kinds = match &cli.count {
        Some(list) => parse_kinds(list).context("--count")?,
        // Counting primes is the default mode when nothing else is asked.
        None if cli.print.is_none() => vec![0],
        None => Vec::new(),
    };
    let mut flags = Flags::empty();
    for &kind in &count_kinds {
        flags |= Flags::count_kind(kind);
    }
    if let Some(print) = &cli.print {
        let kinds = parse_kinds(print).context("--print")?;
        for kind in kinds {
            flags |= Flags::print_kind(kind);
        }
    }
    if cli.status {
        flags |= Flags::CALCULATE_STATUS | Flags::PRINT_STATUS;
    }

    Ok(Resolved {
        start,
        stop,
        flags,
        count_kinds,
        sieve_size_kb: cli.sieve_size.or(config.sieve.sieve_size_kb),
        pre_sieve: cli.pre_sieve.or(config.sieve.pre_sieve),
        threads: cli
            .threads
            .or(config.run.threads)
            .unwrap_or(if cli.print.is_some() { 1 } else { 0 }),
        quiet: cli.quiet || config.run.quiet.unwrap_or(false),
    })
}

/// Runs one sieve invocation end to end and prints the results.
pub fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    let plan = resolve(cli, &config)?;

    let mut sieve = ParallelPrimeSieve::new();
    sieve.set_start(plan.start);
    sieve.set_stop(plan.stop);
    sieve.set_flags(plan.flags);
    sieve.set_threads(plan.threads);
    if let Some(kb) = plan.sieve_size_kb {
        sieve.set_sieve_size_kb(kb)?;
    }
    if let Some(limit) = plan.pre_sieve {
        sieve.set_pre_sieve(limit)?;
    }

    info!(
        start = plan.start,
        stop = plan.stop,
        threads = plan.threads,
        flags = plan.flags.bits(),
        "sieving"
    );
    let outcome = sieve.sieve()?;
    info!(
        seconds = sieve.seconds(),
        counts = %summarize(sieve.counts()),
        "sieve finished"
    );

    if cli.json {
        print_json(&plan, &sieve, outcome)?;
    } else {
        print_text(&plan, &sieve, outcome);
    }
    Ok(())
}

fn print_text(plan: &Resolved, sieve: &ParallelPrimeSieve, outcome: SieveOutcome) {
    for &kind in &plan.count_kinds {
        println!("{}: {}", capitalize(KIND_NAMES[kind]), sieve.count(kind));
    }
    if !plan.quiet {
        eprintln!("Seconds: {:.3}", sieve.seconds());
        if outcome == SieveOutcome::Cancelled {
            eprintln!("Cancelled: counts cover the processed part only");
        }
    }
}

fn print_json(plan: &Resolved, sieve: &ParallelPrimeSieve, outcome: SieveOutcome) -> Result<()> {
    let counts: serde_json::Map<String, serde_json::Value> = plan
        .count_kinds
        .iter()
        .map(|&kind| {
            (
                KIND_NAMES[kind].to_string(),
                serde_json::Value::from(sieve.count(kind)),
            )
        })
        .collect();
    let output = serde_json::json!({
        "start": plan.start,
        "stop": plan.stop,
        "seconds": sieve.seconds(),
        "cancelled": outcome == SieveOutcome::Cancelled,
        "counts": counts,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Formats a counts vector for log output.
pub fn summarize(counts: &Counts) -> String {
    (0..KINDS)
        .filter(|&k| counts.get(k) > 0)
        .map(|k| format!("{}={}", KIND_NAMES[k], counts.get(k)))
        .collect::<Vec<_>>()
        .join(" ")
}

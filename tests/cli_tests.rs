//! CLI integration tests for the `primespan` binary.
//!
//! These tests exercise the command-line interface using `assert_cmd`, which
//! spawns the compiled binary as a subprocess and asserts on exit code,
//! stdout and stderr. They verify the `clap` parser configuration, the
//! count/print output formats, JSON mode, the config-file merge, and error
//! reporting for invalid arguments — all on intervals small enough to sieve
//! instantly.
//!
//! # How to run
//!
//! ```bash
//! cargo test --test cli_tests
//! ```

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn primespan() -> Command {
    Command::cargo_bin("primespan").unwrap()
}

// == Help and argument validation =============================================

#[test]
fn help_lists_the_options() {
    primespan()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--count"))
        .stdout(predicate::str::contains("--print"))
        .stdout(predicate::str::contains("--sieve-size"))
        .stdout(predicate::str::contains("--pre-sieve"))
        .stdout(predicate::str::contains("--threads"))
        .stdout(predicate::str::contains("septuplets"));
}

#[test]
fn missing_interval_is_an_error() {
    primespan().assert().failure();
}

#[test]
fn inverted_range_reports_invalid_range() {
    primespan()
        .args(["10", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid range"));
}

#[test]
fn invalid_sieve_size_is_rejected() {
    primespan()
        .args(["100", "--sieve-size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid sieve size"));
}

#[test]
fn invalid_pre_sieve_is_rejected() {
    primespan()
        .args(["100", "--pre-sieve", "15"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported pre-sieve"));
}

#[test]
fn unknown_kind_is_rejected() {
    primespan()
        .args(["100", "-c", "nonsense"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown kind"));
}

// == Counting =================================================================

#[test]
fn single_positional_counts_from_zero() {
    primespan()
        .arg("100")
        .assert()
        .success()
        .stdout(predicate::str::contains("Primes: 25"));
}

#[test]
fn two_positionals_bound_the_interval() {
    // π(10⁴) − π(10³) = 1229 − 168.
    primespan()
        .args(["1001", "10000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Primes: 1061"));
}

#[test]
fn count_all_kinds_prints_seven_lines() {
    primespan()
        .args(["100", "-c", "all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Primes: 25"))
        .stdout(predicate::str::contains("Twins: 8"))
        .stdout(predicate::str::contains("Triplets: 8"))
        .stdout(predicate::str::contains("Quadruplets: 2"))
        .stdout(predicate::str::contains("Quintuplets: 3"))
        .stdout(predicate::str::contains("Sextuplets: 1"))
        .stdout(predicate::str::contains("Septuplets: 1"));
}

#[test]
fn count_by_name_and_number_agree() {
    primespan()
        .args(["1000000", "-c", "twins"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Twins: 8169"));
    primespan()
        .args(["1000000", "-c", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Twins: 8169"));
}

#[test]
fn multithreaded_count_matches() {
    primespan()
        .args(["2000000", "-t", "4", "-s", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Primes: 148933"));
}

// == Printing =================================================================

#[test]
fn print_primes_one_per_line() {
    primespan()
        .args(["-p", "1", "0", "30"])
        .assert()
        .success()
        .stdout("2\n3\n5\n7\n11\n13\n17\n19\n23\n29\n");
}

#[test]
fn print_twins_as_tuples() {
    primespan()
        .args(["-p", "2", "0", "31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(3, 5)"))
        .stdout(predicate::str::contains("(5, 7)"))
        .stdout(predicate::str::contains("(11, 13)"))
        .stdout(predicate::str::contains("(29, 31)"));
}

#[test]
fn print_respects_the_lower_bound() {
    primespan()
        .args(["-p", "1", "90", "100"])
        .assert()
        .success()
        .stdout("97\n");
}

// == JSON and config ==========================================================

#[test]
fn json_output_is_well_formed() {
    let output = primespan()
        .args(["100", "-c", "1,2", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(parsed["counts"]["primes"], 25);
    assert_eq!(parsed["counts"]["twins"], 8);
    assert_eq!(parsed["cancelled"], false);
    assert_eq!(parsed["stop"], 100);
}

#[test]
fn config_file_supplies_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[sieve]\nsieve_size_kb = 64\n\n[run]\nquiet = true").unwrap();
    primespan()
        .args(["100", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Primes: 25"))
        .stderr(predicate::str::contains("Seconds").not());
}

#[test]
fn invalid_config_file_fails_up_front() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[sieve]\npre_sieve = 4").unwrap();
    primespan()
        .args(["100", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("pre-sieve"));
}

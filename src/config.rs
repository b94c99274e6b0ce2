//! # Config — TOML Defaults File
//!
//! Optional configuration file supplying defaults for the command line:
//! explicit CLI options always win, the file fills whatever they leave
//! unset, and built-in defaults cover the rest. Looked up at
//! `primespan.toml` in the working directory unless `--config` points
//! elsewhere.
//!
//! ```toml
//! [sieve]
//! sieve_size_kb = 256
//! pre_sieve = 19
//!
//! [run]
//! threads = 8
//! quiet = true
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::driver::PrimeSieve;

/// Default config file name probed in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "primespan.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sieve: SieveConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// The `[sieve]` section: engine geometry defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SieveConfig {
    pub sieve_size_kb: Option<u32>,
    pub pre_sieve: Option<u32>,
}

/// The `[run]` section: execution defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    pub threads: Option<usize>,
    pub quiet: Option<bool>,
}

impl Config {
    /// Parses and validates a config file.
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating config file {}", path.display()))?;
        Ok(config)
    }

    /// Loads the default config file when present; empty defaults otherwise.
    pub fn load_default() -> Result<Config> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Config::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Checks value domains with the same rules as the driver setters.
    pub fn validate(&self) -> Result<()> {
        let mut probe = PrimeSieve::new();
        if let Some(kb) = self.sieve.sieve_size_kb {
            probe.set_sieve_size_kb(kb)?;
        }
        if let Some(limit) = self.sieve.pre_sieve {
            probe.set_pre_sieve(limit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn full_config_round_trips() {
        let file = write_config(
            "[sieve]\nsieve_size_kb = 256\npre_sieve = 23\n\n[run]\nthreads = 4\nquiet = true\n",
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.sieve.sieve_size_kb, Some(256));
        assert_eq!(config.sieve.pre_sieve, Some(23));
        assert_eq!(config.run.threads, Some(4));
        assert_eq!(config.run.quiet, Some(true));
    }

    #[test]
    fn missing_sections_default_to_none() {
        let file = write_config("[run]\nthreads = 2\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.sieve.sieve_size_kb, None);
        assert_eq!(config.run.threads, Some(2));
        assert_eq!(config.run.quiet, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let file = write_config("[sieve]\nsieve_size_kb = 0\n");
        assert!(Config::load(file.path()).is_err());
        let file = write_config("[sieve]\npre_sieve = 12\n");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let file = write_config("[sieve\nsieve_size_kb = 1\n");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error_but_default_lookup_is_not() {
        assert!(Config::load(Path::new("/nonexistent/primespan.toml")).is_err());
    }
}

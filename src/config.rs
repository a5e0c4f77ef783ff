use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::TimeLimits;
use crate::error::Error;

/// Number of blocks built per run.
pub const DEFAULT_CHAIN_LENGTH: usize = 5;

/// Miners racing on every block.
pub const DEFAULT_MINERS: usize = 10;

/// Blocks sealed faster than this raise the difficulty.
pub const DEFAULT_LOWER_LIMIT_SECS: u64 = 5;

/// Blocks sealed slower than this lower the difficulty.
pub const DEFAULT_UPPER_LIMIT_SECS: u64 = 10;

/// How sealed blocks are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

impl FromStr for Output {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Output::Text),
            "json" => Ok(Output::Json),
            other => Err(Error::InvalidConfig(format!("unknown output `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub chain_length: usize,
    pub miners: usize,
    pub limits: TimeLimits,
    pub initial_zeros: usize,
    pub output: Output,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_length: DEFAULT_CHAIN_LENGTH,
            miners: DEFAULT_MINERS,
            limits: TimeLimits {
                lower: Duration::from_secs(DEFAULT_LOWER_LIMIT_SECS),
                upper: Duration::from_secs(DEFAULT_UPPER_LIMIT_SECS),
            },
            initial_zeros: 0,
            output: Output::Text,
        }
    }
}

impl Config {
    /// Defaults overridden by `CHAIN_LENGTH`, `MINERS`, `LOWER_LIMIT_SECS`,
    /// `UPPER_LIMIT_SECS`, `INITIAL_ZEROS` and `OUTPUT`. Missing or
    /// unparsable values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chain_length: var_or("CHAIN_LENGTH", defaults.chain_length),
            miners: var_or("MINERS", defaults.miners),
            limits: TimeLimits {
                lower: Duration::from_secs(var_or("LOWER_LIMIT_SECS", DEFAULT_LOWER_LIMIT_SECS)),
                upper: Duration::from_secs(var_or("UPPER_LIMIT_SECS", DEFAULT_UPPER_LIMIT_SECS)),
            },
            initial_zeros: var_or("INITIAL_ZEROS", defaults.initial_zeros),
            output: var_or("OUTPUT", defaults.output),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.chain_length == 0 {
            return Err(Error::InvalidConfig("chain_length must be >= 1".into()));
        }
        if self.miners == 0 {
            return Err(Error::InvalidConfig("miners must be >= 1".into()));
        }
        if self.limits.lower >= self.limits.upper {
            return Err(Error::InvalidConfig(
                "lower limit must be below upper limit".into(),
            ));
        }
        Ok(())
    }
}

fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.chain_length, 5);
        assert_eq!(cfg.miners, 10);
        assert_eq!(cfg.limits.lower, Duration::from_secs(5));
        assert_eq!(cfg.limits.upper, Duration::from_secs(10));
        assert_eq!(cfg.initial_zeros, 0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_empty_chain_and_pool() {
        let cfg = Config {
            chain_length: 0,
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

        let cfg = Config {
            miners: 0,
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_inverted_window() {
        let cfg = Config {
            limits: TimeLimits {
                lower: Duration::from_secs(10),
                upper: Duration::from_secs(10),
            },
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn output_parses_case_insensitively() {
        assert_eq!("JSON".parse::<Output>().unwrap(), Output::Json);
        assert_eq!(" text ".parse::<Output>().unwrap(), Output::Text);
        assert!("xml".parse::<Output>().is_err());
    }
}

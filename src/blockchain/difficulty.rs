use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Direction of a difficulty change after a block was sealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjustment {
    Increased,
    Unchanged,
    Decreased,
}

/// Sealing-time window the controller tries to keep blocks inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimits {
    pub lower: Duration,
    pub upper: Duration,
}

/// Required hash prefix: a run of `'0'` characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Difficulty {
    prefix: String,
}

impl Difficulty {
    pub fn new(zeros: usize) -> Self {
        Self {
            prefix: "0".repeat(zeros),
        }
    }

    /// Number of leading zeros required.
    pub fn zeros(&self) -> usize {
        self.prefix.len()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_met_by(&self, hash: &str) -> bool {
        hash.starts_with(&self.prefix)
    }

    /// React to the last sealing time; affects future blocks only.
    pub fn adjust(&mut self, elapsed: Duration, limits: TimeLimits) -> Adjustment {
        let (prefix, adjustment) = adjust(&self.prefix, elapsed, limits);
        self.prefix = prefix;
        adjustment
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.zeros())
    }
}

/// One step of the hysteresis loop: faster than `lower` adds a zero, slower
/// than `upper` drops one (no-op on an empty prefix), anything in between
/// keeps the prefix. There is no upper cap on the prefix length.
pub fn adjust(prefix: &str, elapsed: Duration, limits: TimeLimits) -> (String, Adjustment) {
    if elapsed < limits.lower {
        (format!("{prefix}0"), Adjustment::Increased)
    } else if elapsed > limits.upper {
        let shorter = prefix.strip_suffix('0').unwrap_or(prefix);
        (shorter.to_string(), Adjustment::Decreased)
    } else {
        (prefix.to_string(), Adjustment::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: TimeLimits = TimeLimits {
        lower: Duration::from_secs(5),
        upper: Duration::from_secs(10),
    };

    #[test]
    fn fast_block_raises_difficulty() {
        let (p, a) = adjust("00", Duration::from_secs(2), LIMITS);
        assert_eq!(p, "000");
        assert_eq!(a, Adjustment::Increased);
    }

    #[test]
    fn slow_block_lowers_difficulty() {
        let (p, a) = adjust("00", Duration::from_secs(12), LIMITS);
        assert_eq!(p, "0");
        assert_eq!(a, Adjustment::Decreased);
    }

    #[test]
    fn lowering_empty_prefix_is_noop_but_reported() {
        let (p, a) = adjust("", Duration::from_secs(60), LIMITS);
        assert_eq!(p, "");
        assert_eq!(a, Adjustment::Decreased);
    }

    #[test]
    fn window_and_its_bounds_keep_difficulty() {
        for secs in [5, 7, 10] {
            let (p, a) = adjust("0", Duration::from_secs(secs), LIMITS);
            assert_eq!(p, "0");
            assert_eq!(a, Adjustment::Unchanged);
        }
    }

    #[test]
    fn three_block_scenario() {
        let mut d = Difficulty::default();
        assert_eq!(d.adjust(Duration::from_secs(2), LIMITS), Adjustment::Increased);
        assert_eq!(d.prefix(), "0");
        assert_eq!(d.adjust(Duration::from_secs(12), LIMITS), Adjustment::Decreased);
        assert_eq!(d.prefix(), "");
    }

    #[test]
    fn prefix_moves_by_at_most_one() {
        let mut d = Difficulty::new(3);
        for secs in [0, 1, 20, 7, 30, 30, 30, 30, 2] {
            let before = d.zeros();
            d.adjust(Duration::from_secs(secs), LIMITS);
            assert!(before.abs_diff(d.zeros()) <= 1);
        }
    }

    #[test]
    fn empty_prefix_matches_any_hash() {
        assert!(Difficulty::default().is_met_by("abc"));
        assert!(Difficulty::new(2).is_met_by("00ab"));
        assert!(!Difficulty::new(2).is_met_by("0ab0"));
    }
}

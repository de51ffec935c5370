//! Engine configuration shared by the diff, match and patch entry points.
//!
//! Modeled as a plain struct with public fields rather than an opaque
//! builder, because the upstream project's own tests (and this port's
//! property tests) toggle `match_threshold`, `match_distance` and
//! `diff_timeout` directly between calls; see DESIGN.md.

use std::time::Duration;

/// A bundle of tunables for the diff/match/patch engines.
///
/// Construct with [`Config::default`] and mutate fields directly, or use
/// the `with_*` builders for fluent construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Wall-clock budget for [`crate::diff::diff_main`]. `Duration::ZERO`
    /// means unlimited, which also disables half-match.
    pub diff_timeout: Duration,
    /// Minimum edit size (in chars) worth keeping around an equality during
    /// `cleanup_efficiency`.
    pub diff_edit_cost: usize,
    /// Maximum acceptable Bitap score: `0.0` requires an exact match, `1.0`
    /// accepts anything.
    pub match_threshold: f64,
    /// Characters from the hinted location that add `1.0` to a Bitap score.
    pub match_distance: usize,
    /// Maximum `Levenshtein(diffs) / len(text1)` ratio for an imperfect
    /// patch application to be accepted.
    pub patch_delete_threshold: f64,
    /// Number of context characters to carry around each patch hunk.
    pub patch_margin: usize,
    /// Bitap pattern length ceiling, i.e. the match engine's word size in
    /// bits.
    pub match_max_bits: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            diff_timeout: Duration::from_secs_f64(1.0),
            diff_edit_cost: 4,
            match_threshold: 0.5,
            match_distance: 1000,
            patch_delete_threshold: 0.5,
            patch_margin: 4,
            match_max_bits: 32,
        }
    }
}

impl Config {
    /// Returns a config with `diff_timeout` set to unlimited (`Duration::ZERO`).
    pub fn with_unlimited_diff_timeout(mut self) -> Self {
        self.diff_timeout = Duration::ZERO;
        self
    }

    /// Sets `diff_timeout`.
    pub fn with_diff_timeout(mut self, timeout: Duration) -> Self {
        self.diff_timeout = timeout;
        self
    }

    /// Sets `diff_edit_cost`.
    pub fn with_diff_edit_cost(mut self, cost: usize) -> Self {
        self.diff_edit_cost = cost;
        self
    }

    /// Sets `match_threshold`.
    pub fn with_match_threshold(mut self, threshold: f64) -> Self {
        self.match_threshold = threshold;
        self
    }

    /// Sets `match_distance`.
    pub fn with_match_distance(mut self, distance: usize) -> Self {
        self.match_distance = distance;
        self
    }

    /// Sets `patch_delete_threshold`.
    pub fn with_patch_delete_threshold(mut self, threshold: f64) -> Self {
        self.patch_delete_threshold = threshold;
        self
    }

    /// Sets `patch_margin`.
    pub fn with_patch_margin(mut self, margin: usize) -> Self {
        self.patch_margin = margin;
        self
    }

    /// Returns whether half-match and other minimality-sacrificing speedups
    /// are enabled, i.e. whether a deadline is actually in effect.
    pub(crate) fn diff_timeout_enabled(&self) -> bool {
        !self.diff_timeout.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.diff_timeout, Duration::from_secs_f64(1.0));
        assert_eq!(cfg.diff_edit_cost, 4);
        assert_eq!(cfg.match_threshold, 0.5);
        assert_eq!(cfg.match_distance, 1000);
        assert_eq!(cfg.patch_delete_threshold, 0.5);
        assert_eq!(cfg.patch_margin, 4);
        assert_eq!(cfg.match_max_bits, 32);
    }

    #[test]
    fn unlimited_timeout_disables_speedups() {
        let cfg = Config::default().with_unlimited_diff_timeout();
        assert!(!cfg.diff_timeout_enabled());
    }
}

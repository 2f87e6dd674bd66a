//! Score model for kernel variants.
//!
//! `mean = time / bytes`, `sigma = mean / sqrt(count)`, `score = mean + sigma`.
//! Lower is better. The `sigma` term penalises variants with few samples so a
//! single lucky measurement cannot win on its own.

use serde::Serialize;

/// A snapshot of one variant's accumulated evidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Sum of accepted elapsed cycles.
    pub time: u64,
    /// Sum of bytes copied in accepted samples.
    pub bytes: u64,
    /// Number of accepted samples.
    pub count: u64,
}

impl Stats {
    #[must_use]
    pub const fn new(time: u64, bytes: u64, count: u64) -> Self {
        Self { time, bytes, count }
    }

    /// Ranking value; `+inf` while there is no evidence.
    #[must_use]
    pub fn score(&self) -> f64 {
        if self.bytes == 0 || self.count == 0 {
            return f64::INFINITY;
        }
        let mean = self.time as f64 / self.bytes as f64;
        let sigma = mean / (self.count as f64).sqrt();
        mean + sigma
    }

    /// Halves every counter and floors it at one (`1 + v / 2`).
    #[must_use]
    pub const fn smoothed(&self) -> Self {
        Self {
            time: smooth_value(self.time),
            bytes: smooth_value(self.bytes),
            count: smooth_value(self.count),
        }
    }
}

/// Exponential decay step applied to each counter; never returns zero.
#[inline]
#[must_use]
pub const fn smooth_value(value: u64) -> u64 {
    1 + value / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scores_infinite() {
        assert!(Stats::default().score().is_infinite());
        assert!(Stats::new(10, 0, 3).score().is_infinite());
    }

    #[test]
    fn score_is_mean_plus_sigma() {
        let stats = Stats::new(400, 1000, 4);
        // mean 0.4, sigma 0.4 / 2
        assert!((stats.score() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn cheaper_per_byte_ranks_first() {
        let fast = Stats::new(1_000, 10_000, 50);
        let medium = Stats::new(2_000, 10_000, 50);
        let slow = Stats::new(9_000, 10_000, 50);
        assert!(fast.score() < medium.score());
        assert!(medium.score() < slow.score());
    }

    #[test]
    fn fewer_samples_rank_worse_at_equal_mean() {
        let proven = Stats::new(1_000, 10_000, 100);
        let lucky = Stats::new(100, 1_000, 1);
        assert!(proven.score() < lucky.score());
    }

    #[test]
    fn smoothing_floors_at_one() {
        assert_eq!(Stats::default().smoothed(), Stats::new(1, 1, 1));
        assert_eq!(Stats::new(1, 1, 1).smoothed(), Stats::new(1, 1, 1));
        assert_eq!(Stats::new(10, 21, 3).smoothed(), Stats::new(6, 11, 2));
    }

    #[test]
    fn smoothing_reduces_influence_without_flipping_rank() {
        let record = Stats::new(30_000, 100_000, 64);
        // Same mean, proportionally larger evidence.
        let untouched = Stats::new(300_000, 1_000_000, 640);

        let smoothed = record.smoothed();
        assert!(smoothed.time < record.time);
        assert!(smoothed.bytes < record.bytes);
        assert!(smoothed.count < record.count);

        // Fewer samples means a larger confidence penalty.
        assert!(smoothed.score() > record.score());
        assert!(untouched.score() < record.score());
        assert!(untouched.score() < smoothed.score());
    }

    #[test]
    fn repeated_smoothing_converges_to_floor() {
        let mut stats = Stats::new(u64::MAX, u64::MAX, u64::MAX);
        for _ in 0..80 {
            stats = stats.smoothed();
        }
        assert_eq!(stats, Stats::new(2, 2, 2));
    }
}

//! Stall detection by sampled displacement.

use serde::{Deserialize, Serialize};

use crate::config::StuckConfig;
use crate::math::Vec3;

/// Displacement tracker fed by the slow stuck-check cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StuckDetector {
    last_location: Vec3,
    stalled_for: f32,
}

impl StuckDetector {
    pub fn new(location: Vec3) -> Self {
        Self {
            last_location: location,
            stalled_for: 0.0,
        }
    }

    /// Take one sample. Returns `true` once accumulated stall time exceeds
    /// the threshold (and keeps returning `true` until movement or re-arm).
    ///
    /// Stall time grows by the fixed `step`, not by the wall-clock interval
    /// between samples. Movement resets the clock and the reference point.
    pub fn sample(&mut self, location: Vec3, config: &StuckConfig) -> bool {
        if location.distance(&self.last_location) < config.displacement_threshold {
            self.stalled_for += config.step;
        } else {
            self.stalled_for = 0.0;
            self.last_location = location;
        }
        self.stalled_for > config.stall_threshold
    }

    /// Clear accumulated stall time (after a footprint restore).
    pub fn rearm(&mut self) {
        self.stalled_for = 0.0;
    }

    pub fn stalled_for(&self) -> f32 {
        self.stalled_for
    }

    pub fn last_location(&self) -> Vec3 {
        self.last_location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stalls_after_seven_samples() {
        let cfg = StuckConfig::default();
        let mut d = StuckDetector::new(Vec3::ZERO);
        for _ in 0..6 {
            assert!(!d.sample(Vec3::new(1.0, 0.0, 0.0), &cfg));
        }
        // 7 * 0.3 = 2.1 > 2.0
        assert!(d.sample(Vec3::ZERO, &cfg));
    }

    #[test]
    fn test_movement_resets_reference() {
        let cfg = StuckConfig::default();
        let mut d = StuckDetector::new(Vec3::ZERO);
        d.sample(Vec3::ZERO, &cfg);
        d.sample(Vec3::ZERO, &cfg);
        assert!(d.stalled_for() > 0.0);

        let moved = Vec3::new(10.0, 0.0, 0.0);
        assert!(!d.sample(moved, &cfg));
        assert_eq!(d.stalled_for(), 0.0);
        assert_eq!(d.last_location(), moved);
    }

    #[test]
    fn test_slow_creep_still_counts_as_stalled() {
        // Reference point only moves when a single sample clears the threshold.
        let cfg = StuckConfig::default();
        let mut d = StuckDetector::new(Vec3::ZERO);
        d.sample(Vec3::new(3.0, 0.0, 0.0), &cfg);
        d.sample(Vec3::new(4.0, 0.0, 0.0), &cfg);
        assert!((d.stalled_for() - 0.6).abs() < 1e-6);
        assert!(!d.sample(Vec3::new(6.0, 0.0, 0.0), &cfg));
    }

    #[test]
    fn test_rearm() {
        let cfg = StuckConfig::default();
        let mut d = StuckDetector::new(Vec3::ZERO);
        for _ in 0..7 {
            d.sample(Vec3::ZERO, &cfg);
        }
        d.rearm();
        assert_eq!(d.stalled_for(), 0.0);
        assert!(!d.sample(Vec3::ZERO, &cfg));
    }
}

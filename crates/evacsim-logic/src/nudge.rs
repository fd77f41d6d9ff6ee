//! One-shot downhill impulse for agents stalled on stairs or ramps.

use crate::config::NudgeConfig;
use crate::locomotion::FloorContact;
use crate::math::{slope_degrees, Vec3};

/// Whether the floor contact is an incline inside the (exclusive) stairs band.
pub fn is_on_incline(floor: &FloorContact, config: &NudgeConfig) -> bool {
    if !floor.grounded {
        return false;
    }
    let angle = slope_degrees(floor.normal);
    angle > config.min_slope_degrees && angle < config.max_slope_degrees
}

/// Velocity impulse along the facing, biased downward.
pub fn downhill_nudge(forward: Vec3, config: &NudgeConfig) -> Vec3 {
    (forward - Vec3::new(0.0, 0.0, config.downward_bias)).safe_normal() * config.magnitude
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_at(degrees: f32) -> FloorContact {
        let r = degrees.to_radians();
        FloorContact {
            grounded: true,
            normal: Vec3::new(-r.sin(), 0.0, r.cos()),
        }
    }

    #[test]
    fn test_band_is_exclusive() {
        let cfg = NudgeConfig::default();
        assert!(!is_on_incline(&floor_at(0.0), &cfg));
        assert!(!is_on_incline(&floor_at(9.9), &cfg));
        assert!(is_on_incline(&floor_at(10.5), &cfg));
        assert!(is_on_incline(&floor_at(30.0), &cfg));
        assert!(!is_on_incline(&floor_at(45.5), &cfg));
        assert!(!is_on_incline(&floor_at(60.0), &cfg));
    }

    #[test]
    fn test_airborne_is_never_on_incline() {
        let mut floor = floor_at(30.0);
        floor.grounded = false;
        assert!(!is_on_incline(&floor, &NudgeConfig::default()));
    }

    #[test]
    fn test_nudge_direction_and_magnitude() {
        let cfg = NudgeConfig::default();
        let n = downhill_nudge(Vec3::FORWARD, &cfg);
        assert!((n.length() - 100.0).abs() < 1e-3);
        assert!(n.z < 0.0);
        assert!(n.x > 0.9 * 100.0);
    }
}

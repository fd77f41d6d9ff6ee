//! Property checks for the controller's numeric building blocks.

use evacsim_logic::avoidance::{repulsion, repulsion_strength};
use evacsim_logic::config::{AvoidanceConfig, FootprintConfig, TuningConfig};
use evacsim_logic::footprint::{Footprint, FootprintSize};
use evacsim_logic::math::Vec3;
use evacsim_logic::navigation::NavigationSurface;
use evacsim_logic::recovery::find_fallback_point;
use evacsim_logic::tuning::corridor_weight;
use proptest::prelude::*;

struct Nowhere;

impl NavigationSurface for Nowhere {
    fn project(&self, _point: Vec3, _extent: f32) -> Option<Vec3> {
        None
    }
}

proptest! {
    #[test]
    fn repulsion_decreases_with_distance(a in 0.01f32..79.0, b in 0.01f32..79.0) {
        let cfg = AvoidanceConfig::default();
        let (near, far) = if a < b { (a, b) } else { (b, a) };
        let s_near = repulsion_strength(near, cfg.interaction_radius, cfg.epsilon);
        let s_far = repulsion_strength(far, cfg.interaction_radius, cfg.epsilon);
        prop_assert!(s_near >= s_far);
    }

    #[test]
    fn repulsion_zero_beyond_radius(d in 80.0f32..10_000.0, angle in 0.0f32..std::f32::consts::TAU) {
        let cfg = AvoidanceConfig::default();
        let other = Vec3::new(d * angle.cos(), d * angle.sin(), 0.0);
        prop_assert_eq!(repulsion(Vec3::ZERO, [other], &cfg), Vec3::ZERO);
    }

    #[test]
    fn repulsion_is_mirror_symmetric(x in -79.0f32..79.0, y in -79.0f32..79.0) {
        let cfg = AvoidanceConfig::default();
        let a = Vec3::ZERO;
        let b = Vec3::new(x, y, 0.0);
        let on_a = repulsion(a, [b], &cfg);
        let on_b = repulsion(b, [a], &cfg);
        prop_assert!((on_a.length() - on_b.length()).abs() < 1e-5);
        prop_assert!((on_a + on_b).length() < 1e-5);
    }

    #[test]
    fn corridor_weight_non_increasing(a in 0.0f32..400.0, b in 0.0f32..400.0) {
        let cfg = TuningConfig::default();
        let (narrow, wide) = if a < b { (a, b) } else { (b, a) };
        let w_narrow = corridor_weight(narrow, &cfg);
        let w_wide = corridor_weight(wide, &cfg);
        prop_assert!(w_narrow >= w_wide - 1e-5);
        prop_assert!((10.0..=30.0).contains(&w_narrow));
        prop_assert!((10.0..=30.0).contains(&w_wide));
    }

    #[test]
    fn footprint_target_invariant(ops in proptest::collection::vec(0u8..3, 0..64), dt in 0.001f32..0.2) {
        let cfg = FootprintConfig::default();
        let defaults = FootprintSize::new(34.0, 88.0);
        let mut f = Footprint::capture(defaults);
        let shrunk = f.shrunk_size(&cfg);
        for op in ops {
            match op {
                0 => { f.begin_shrink(&cfg); }
                1 => f.begin_restore(),
                _ => { f.step(dt, &cfg); }
            }
            let t = f.target(&cfg);
            prop_assert!(t == defaults || t == shrunk);
            prop_assert_eq!(f.defaults(), defaults);
        }
    }

    #[test]
    fn fallback_returns_input_when_nothing_walkable(x in -1.0e4f32..1.0e4, y in -1.0e4f32..1.0e4) {
        let p = Vec3::new(x, y, 0.0);
        prop_assert_eq!(find_fallback_point(Some(&Nowhere), p, 500.0), p);
    }
}

//! Throttled speed and avoidance tuning.
//!
//! Two avoidance-weight strategies are kept side by side: the corridor-width
//! mapping (active by default) and a neighbour-density formula. Which one an
//! agent uses is a configuration choice.

use crate::config::{TuningConfig, WeightStrategy};
use crate::math::mapped_range_clamped;

/// Outcome of one throttled tuning pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub speed_cap: f32,
    /// `None` when the strategy's input was unavailable this cycle.
    pub avoidance_weight: Option<f32>,
}

/// Stairs cap when moving vertically faster than the threshold, flat otherwise.
pub fn speed_cap(vertical_speed: f32, config: &TuningConfig) -> f32 {
    if vertical_speed.abs() > config.stairs_vertical_speed {
        config.stairs_speed
    } else {
        config.flat_speed
    }
}

/// Inverted clamped mapping: wide corridors → low weight, narrow → high.
pub fn corridor_weight(width: f32, config: &TuningConfig) -> f32 {
    mapped_range_clamped(
        (config.wide_width, config.narrow_width),
        (config.wide_weight, config.narrow_weight),
        width,
    )
}

/// Weight linear in the neighbour count, clamped to the density band.
pub fn density_weight(neighbor_count: usize, config: &TuningConfig) -> f32 {
    let raw = config.density_base_weight + neighbor_count as f32 * config.density_weight_per_neighbor;
    raw.clamp(config.density_min_weight, config.density_max_weight)
}

/// Compute the throttled tuning for one agent.
pub fn tune(
    vertical_speed: f32,
    corridor_width: Option<f32>,
    neighbor_count: usize,
    config: &TuningConfig,
) -> Tuning {
    let avoidance_weight = match config.strategy {
        WeightStrategy::CorridorWidth => corridor_width.map(|w| corridor_weight(w, config)),
        WeightStrategy::NeighborDensity => Some(density_weight(neighbor_count, config)),
    };
    Tuning {
        speed_cap: speed_cap(vertical_speed, config),
        avoidance_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_cap_switches_on_vertical_speed() {
        let cfg = TuningConfig::default();
        assert_eq!(speed_cap(0.0, &cfg), 150.0);
        assert_eq!(speed_cap(20.0, &cfg), 150.0);
        assert_eq!(speed_cap(-25.0, &cfg), 100.0);
        assert_eq!(speed_cap(40.0, &cfg), 100.0);
    }

    #[test]
    fn test_corridor_weight_endpoints() {
        let cfg = TuningConfig::default();
        assert_eq!(corridor_weight(0.0, &cfg), 30.0);
        assert_eq!(corridor_weight(80.0, &cfg), 30.0);
        assert_eq!(corridor_weight(200.0, &cfg), 10.0);
        assert_eq!(corridor_weight(1000.0, &cfg), 10.0);
    }

    #[test]
    fn test_density_weight_band() {
        let mut cfg = TuningConfig::default();
        assert_eq!(density_weight(0, &cfg), 10.0);
        assert_eq!(density_weight(30, &cfg), 10.0);

        cfg.density_weight_per_neighbor = 0.5;
        assert_eq!(density_weight(4, &cfg), 12.0);
        assert_eq!(density_weight(100, &cfg), 15.0);
    }

    #[test]
    fn test_strategy_toggle() {
        let mut cfg = TuningConfig::default();
        let t = tune(0.0, Some(80.0), 3, &cfg);
        assert_eq!(t.avoidance_weight, Some(30.0));
        assert_eq!(tune(0.0, None, 3, &cfg).avoidance_weight, None);

        cfg.strategy = WeightStrategy::NeighborDensity;
        assert_eq!(tune(0.0, None, 3, &cfg).avoidance_weight, Some(10.0));
    }
}

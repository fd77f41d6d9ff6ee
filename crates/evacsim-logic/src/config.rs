//! Controller tunables and their validation.
//!
//! Every constant the controller uses lives here with its default, so a
//! scenario file can retune agents without touching code. The stairs band
//! and nudge magnitude in particular are empirical and expected to vary
//! between environments.
//!
//! ```
//! use evacsim_logic::config::{validate_config, ControllerConfig};
//!
//! let config = ControllerConfig::default();
//! assert!(validate_config(&config).is_empty());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Complete per-agent controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub avoidance: AvoidanceConfig,
    pub tuning: TuningConfig,
    pub stuck: StuckConfig,
    pub footprint: FootprintConfig,
    pub recovery: RecoveryConfig,
    pub nudge: NudgeConfig,
    pub schedule: ScheduleConfig,
}

/// Local repulsion between neighbouring agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// Neighbours closer than this push the agent away.
    pub interaction_radius: f32,
    /// Separations at or below this are ignored (coincident agents).
    pub epsilon: f32,
    /// Repulsion weight relative to the current heading.
    pub repulsion_weight: f32,
    /// Squared repulsion needed before an idle agent is nudged.
    pub idle_repulsion_threshold_sq: f32,
    /// Avoidance consideration radius applied at spawn.
    pub consideration_radius: f32,
    /// Consideration radius used while inside rooms.
    pub room_consideration_radius: f32,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            interaction_radius: 80.0,
            epsilon: 1.0e-4,
            repulsion_weight: 2.0,
            idle_repulsion_threshold_sq: 0.01,
            consideration_radius: 50.0,
            room_consideration_radius: 20.0,
        }
    }
}

/// Which formula the throttled loop uses for avoidance weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightStrategy {
    /// Narrow corridors get a high weight, open areas a low one.
    #[default]
    CorridorWidth,
    /// Linear in the cached neighbour count, clamped to a narrow band.
    NeighborDensity,
}

/// Throttled speed and avoidance tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// |vertical velocity| above this selects the stairs speed cap.
    pub stairs_vertical_speed: f32,
    pub flat_speed: f32,
    pub stairs_speed: f32,
    /// Lateral offset of each corridor probe.
    pub corridor_sample_distance: f32,
    /// Query extent used when projecting a corridor probe.
    pub corridor_probe_extent: f32,
    /// Corridor width at or above which the wide weight applies.
    pub wide_width: f32,
    /// Corridor width at or below which the narrow weight applies.
    pub narrow_width: f32,
    pub wide_weight: f32,
    pub narrow_weight: f32,
    pub strategy: WeightStrategy,
    pub density_base_weight: f32,
    pub density_weight_per_neighbor: f32,
    pub density_min_weight: f32,
    pub density_max_weight: f32,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            stairs_vertical_speed: 20.0,
            flat_speed: 150.0,
            stairs_speed: 100.0,
            corridor_sample_distance: 50.0,
            corridor_probe_extent: 50.0,
            wide_width: 200.0,
            narrow_width: 80.0,
            wide_weight: 10.0,
            narrow_weight: 30.0,
            strategy: WeightStrategy::CorridorWidth,
            density_base_weight: 10.0,
            density_weight_per_neighbor: -0.2,
            density_min_weight: 10.0,
            density_max_weight: 15.0,
        }
    }
}

/// Stall detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StuckConfig {
    /// Displacement below this between samples counts as stalled.
    pub displacement_threshold: f32,
    /// Stall time credited per stalled sample, independent of the real interval.
    pub step: f32,
    /// Accumulated stall time that triggers the shrink workaround.
    pub stall_threshold: f32,
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            displacement_threshold: 5.0,
            step: 0.3,
            stall_threshold: 2.0,
        }
    }
}

/// Footprint shrink / restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootprintConfig {
    pub shrink_radius_factor: f32,
    pub shrink_half_height_factor: f32,
    /// Interpolation speed toward the target size.
    pub resize_rate: f32,
    /// Both dimensions within this of target ends a resize.
    pub tolerance: f32,
    /// Seconds after a shrink begins before the restore fires.
    pub restore_delay: f32,
}

impl Default for FootprintConfig {
    fn default() -> Self {
        Self {
            shrink_radius_factor: 0.7,
            shrink_half_height_factor: 0.8,
            resize_rate: 50.0,
            tolerance: 0.5,
            restore_delay: 2.0,
        }
    }
}

/// Off-surface detection and relocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Projection extent for the periodic on-surface check.
    pub check_extent: f32,
    /// Projection extent for the fallback search.
    pub fallback_extent: f32,
    /// Projection extent used to snap each recovery step.
    pub snap_extent: f32,
    /// Interpolation speed toward the recovery target.
    pub interp_speed: f32,
    /// Squared distance to the target that completes recovery.
    pub arrival_distance_sq: f32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            check_extent: 100.0,
            fallback_extent: 500.0,
            snap_extent: 50.0,
            interp_speed: 2.0,
            arrival_distance_sq: 100.0,
        }
    }
}

/// One-shot downhill impulse for agents stalled on stairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NudgeConfig {
    /// Floor slope (degrees from vertical), exclusive lower bound.
    pub min_slope_degrees: f32,
    /// Floor slope (degrees from vertical), exclusive upper bound.
    pub max_slope_degrees: f32,
    /// Downward component subtracted from the facing before normalising.
    pub downward_bias: f32,
    pub magnitude: f32,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            min_slope_degrees: 10.0,
            max_slope_degrees: 45.0,
            downward_bias: 0.2,
            magnitude: 100.0,
        }
    }
}

/// Inclusive `[min, max]` seconds range an interval is sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalRange {
    pub min: f32,
    pub max: f32,
}

impl IntervalRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min > 0.0 && self.min <= self.max && self.max.is_finite()
    }
}

/// Periodic callback cadences, sampled once per agent at spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub throttle_interval: IntervalRange,
    pub stuck_interval: IntervalRange,
    pub surface_interval: IntervalRange,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            throttle_interval: IntervalRange::new(0.25, 0.35),
            stuck_interval: IntervalRange::new(2.0, 3.5),
            surface_interval: IntervalRange::new(3.0, 4.0),
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must be in (0, 1], got {value}")]
    FactorOutOfRange { field: &'static str, value: f32 },
    #[error("{field} range is invalid: min {min} > max {max} or non-positive")]
    InvalidRange {
        field: &'static str,
        min: f32,
        max: f32,
    },
    #[error("corridor widths must satisfy narrow ({narrow}) < wide ({wide})")]
    CorridorWidths { narrow: f32, wide: f32 },
    #[error("slope band must satisfy 0 <= min ({min}) < max ({max}) <= 90")]
    SlopeBand { min: f32, max: f32 },
}

fn require_positive(errors: &mut Vec<ConfigError>, field: &'static str, value: f32) {
    if !(value > 0.0 && value.is_finite()) {
        errors.push(ConfigError::NotPositive { field, value });
    }
}

fn require_factor(errors: &mut Vec<ConfigError>, field: &'static str, value: f32) {
    if !(value > 0.0 && value <= 1.0) {
        errors.push(ConfigError::FactorOutOfRange { field, value });
    }
}

fn require_range(errors: &mut Vec<ConfigError>, field: &'static str, range: IntervalRange) {
    if !range.is_valid() {
        errors.push(ConfigError::InvalidRange {
            field,
            min: range.min,
            max: range.max,
        });
    }
}

/// Validate a controller configuration, returning all errors found.
pub fn validate_config(config: &ControllerConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    let a = &config.avoidance;
    require_positive(&mut errors, "avoidance.interaction_radius", a.interaction_radius);
    require_positive(&mut errors, "avoidance.consideration_radius", a.consideration_radius);
    require_positive(
        &mut errors,
        "avoidance.room_consideration_radius",
        a.room_consideration_radius,
    );
    require_positive(&mut errors, "avoidance.repulsion_weight", a.repulsion_weight);

    let t = &config.tuning;
    require_positive(&mut errors, "tuning.flat_speed", t.flat_speed);
    require_positive(&mut errors, "tuning.stairs_speed", t.stairs_speed);
    require_positive(&mut errors, "tuning.corridor_sample_distance", t.corridor_sample_distance);
    require_positive(&mut errors, "tuning.corridor_probe_extent", t.corridor_probe_extent);
    if t.narrow_width >= t.wide_width {
        errors.push(ConfigError::CorridorWidths {
            narrow: t.narrow_width,
            wide: t.wide_width,
        });
    }
    if t.density_min_weight > t.density_max_weight {
        errors.push(ConfigError::InvalidRange {
            field: "tuning.density_weight",
            min: t.density_min_weight,
            max: t.density_max_weight,
        });
    }

    let s = &config.stuck;
    require_positive(&mut errors, "stuck.displacement_threshold", s.displacement_threshold);
    require_positive(&mut errors, "stuck.step", s.step);
    require_positive(&mut errors, "stuck.stall_threshold", s.stall_threshold);

    let f = &config.footprint;
    require_factor(&mut errors, "footprint.shrink_radius_factor", f.shrink_radius_factor);
    require_factor(
        &mut errors,
        "footprint.shrink_half_height_factor",
        f.shrink_half_height_factor,
    );
    require_positive(&mut errors, "footprint.resize_rate", f.resize_rate);
    require_positive(&mut errors, "footprint.tolerance", f.tolerance);
    require_positive(&mut errors, "footprint.restore_delay", f.restore_delay);

    let r = &config.recovery;
    require_positive(&mut errors, "recovery.check_extent", r.check_extent);
    require_positive(&mut errors, "recovery.fallback_extent", r.fallback_extent);
    require_positive(&mut errors, "recovery.snap_extent", r.snap_extent);
    require_positive(&mut errors, "recovery.interp_speed", r.interp_speed);
    require_positive(&mut errors, "recovery.arrival_distance_sq", r.arrival_distance_sq);
    if r.fallback_extent < r.check_extent {
        errors.push(ConfigError::InvalidRange {
            field: "recovery.extent",
            min: r.check_extent,
            max: r.fallback_extent,
        });
    }

    let n = &config.nudge;
    if !(0.0..90.0).contains(&n.min_slope_degrees)
        || n.max_slope_degrees > 90.0
        || n.min_slope_degrees >= n.max_slope_degrees
    {
        errors.push(ConfigError::SlopeBand {
            min: n.min_slope_degrees,
            max: n.max_slope_degrees,
        });
    }

    let sc = &config.schedule;
    require_range(&mut errors, "schedule.throttle_interval", sc.throttle_interval);
    require_range(&mut errors, "schedule.stuck_interval", sc.stuck_interval);
    require_range(&mut errors, "schedule.surface_interval", sc.surface_interval);

    errors
}

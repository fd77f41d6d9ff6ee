//! Hazard volumes that reshape traversal costs over time.
//!
//! A [`FireZone`] grows from a small footprint toward its maximum size on a
//! fixed step, slowly at first and rapidly near the end. A [`CrowdZone`]
//! periodically measures occupancy and slowdown and flips between
//! congested and clear. Both publish their state as an [`AreaClass`]
//! modifier over their current rectangle.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use evacsim_logic::math::Vec3;

use crate::navmesh::{AreaClass, Rect};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireZoneConfig {
    pub name: String,
    pub center: Vec3,
    pub initial_half_extent: f32,
    /// Full XY size reached at the end of the expansion.
    pub max_size: (f32, f32),
    /// Seconds to reach the maximum size.
    pub expansion_duration: f32,
    pub update_interval: f32,
    /// Exponent of the growth curve.
    pub growth_exponent: f32,
}

impl Default for FireZoneConfig {
    fn default() -> Self {
        Self {
            name: "fire".into(),
            center: Vec3::ZERO,
            initial_half_extent: 25.0,
            max_size: (5000.0, 5000.0),
            expansion_duration: 480.0,
            update_interval: 0.2,
            growth_exponent: 4.0,
        }
    }
}

/// Growing fire footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct FireZone {
    config: FireZoneConfig,
    elapsed: f32,
    half_extent: (f32, f32),
}

impl FireZone {
    pub fn new(config: FireZoneConfig) -> Self {
        let half = config.initial_half_extent;
        Self {
            config,
            elapsed: 0.0,
            half_extent: (half, half),
        }
    }

    pub fn config(&self) -> &FireZoneConfig {
        &self.config
    }

    pub fn is_fully_grown(&self) -> bool {
        self.elapsed >= self.config.expansion_duration
    }

    pub fn half_extent(&self) -> (f32, f32) {
        self.half_extent
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.config.center, self.half_extent.0, self.half_extent.1)
    }

    pub fn area_class(&self) -> AreaClass {
        AreaClass::Fire
    }

    /// Advance the expansion by one update interval.
    ///
    /// Returns `false` once the fire has reached full size; the owner should
    /// stop calling it.
    pub fn expand_step(&mut self) -> bool {
        if self.is_fully_grown() {
            return false;
        }
        self.elapsed += self.config.update_interval;

        let alpha = if self.config.expansion_duration > 0.0 {
            (self.elapsed / self.config.expansion_duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let eased = alpha.powf(self.config.growth_exponent);
        let initial = self.config.initial_half_extent;
        let lerp = |to: f32| initial + (to - initial) * eased;
        self.half_extent = (
            lerp(self.config.max_size.0 * 0.5),
            lerp(self.config.max_size.1 * 0.5),
        );
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrowdZoneConfig {
    pub name: String,
    pub center: Vec3,
    pub half_extent: (f32, f32),
    /// Half height of the sensing box.
    pub half_height: f32,
    pub check_interval: f32,
    /// Radius assumed for every occupant when measuring occupancy.
    pub occupant_radius: f32,
    /// Occupied fraction of the floor needed to count as dense.
    pub occupancy_threshold: f32,
    /// Fraction of occupants that must be slowed.
    pub slowed_fraction_threshold: f32,
    /// Speed ratio below which an occupant counts as slowed.
    pub slowdown_ratio: f32,
}

impl Default for CrowdZoneConfig {
    fn default() -> Self {
        Self {
            name: "crowd".into(),
            center: Vec3::ZERO,
            half_extent: (200.0, 200.0),
            half_height: 110.0,
            check_interval: 5.0,
            occupant_radius: 20.0,
            occupancy_threshold: 0.8,
            slowed_fraction_threshold: 0.5,
            slowdown_ratio: 0.8,
        }
    }
}

/// One occupant sampled by a congestion check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupantSample {
    pub speed: f32,
    pub speed_cap: f32,
}

/// Result of a congestion check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CongestionReading {
    pub occupants: usize,
    pub occupancy: f32,
    pub slowed_fraction: f32,
    pub congested: bool,
}

/// Congestion sensor over a fixed rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct CrowdZone {
    config: CrowdZoneConfig,
    congested: bool,
}

impl CrowdZone {
    pub fn new(config: CrowdZoneConfig) -> Self {
        Self {
            config,
            congested: false,
        }
    }

    pub fn config(&self) -> &CrowdZoneConfig {
        &self.config
    }

    pub fn is_congested(&self) -> bool {
        self.congested
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.config.center, self.config.half_extent.0, self.config.half_extent.1)
    }

    /// Whether `location` is inside the sensing box.
    pub fn contains(&self, location: Vec3) -> bool {
        self.bounds().contains(location.x, location.y)
            && (location.z - self.config.center.z).abs() <= self.config.half_height
    }

    pub fn area_class(&self) -> AreaClass {
        if self.congested {
            AreaClass::Crowded
        } else {
            AreaClass::Default
        }
    }

    /// Measure the occupants and update the congestion flag.
    ///
    /// Dense and slowed must both hold to become congested; an empty zone is
    /// always clear.
    pub fn evaluate(&mut self, occupants: &[OccupantSample]) -> CongestionReading {
        if occupants.is_empty() {
            self.congested = false;
            return CongestionReading {
                occupants: 0,
                occupancy: 0.0,
                slowed_fraction: 0.0,
                congested: false,
            };
        }

        let footprint = PI * self.config.occupant_radius * self.config.occupant_radius;
        let floor = self.bounds().area();
        let occupancy = if floor > 0.0 {
            occupants.len() as f32 * footprint / floor
        } else {
            0.0
        };

        let slowed = occupants
            .iter()
            .filter(|o| o.speed_cap <= 1.0 || o.speed / o.speed_cap < self.config.slowdown_ratio)
            .count();
        let slowed_fraction = slowed as f32 / occupants.len() as f32;

        self.congested = occupancy >= self.config.occupancy_threshold
            && slowed_fraction >= self.config.slowed_fraction_threshold;
        CongestionReading {
            occupants: occupants.len(),
            occupancy,
            slowed_fraction,
            congested: self.congested,
        }
    }
}

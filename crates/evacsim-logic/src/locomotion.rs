//! Host locomotion seam: what the controller reads and what it asks for.
//!
//! The host movement layer owns integration and collision. The controller
//! reads an [`AgentView`] snapshot each callback and issues desired changes
//! through a [`LocomotionSink`].

use serde::{Deserialize, Serialize};

use crate::footprint::FootprintSize;
use crate::math::Vec3;

/// Most recent floor hit reported by the host movement layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorContact {
    pub grounded: bool,
    pub normal: Vec3,
}

impl FloorContact {
    pub const FLAT: Self = Self {
        grounded: true,
        normal: Vec3::UP,
    };

    pub const AIRBORNE: Self = Self {
        grounded: false,
        normal: Vec3::UP,
    };
}

impl Default for FloorContact {
    fn default() -> Self {
        Self::FLAT
    }
}

/// Read-only kinematic snapshot of one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentView {
    pub location: Vec3,
    pub velocity: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub floor: FloorContact,
}

impl AgentView {
    /// Snapshot at rest on flat ground facing `forward`.
    pub fn at_rest(location: Vec3, forward: Vec3) -> Self {
        let forward = forward.horizontal().safe_normal();
        Self {
            location,
            velocity: Vec3::ZERO,
            forward,
            right: Vec3::UP.cross(&forward),
            floor: FloorContact::FLAT,
        }
    }
}

/// Desired-motion requests consumed by the host movement layer.
pub trait LocomotionSink {
    /// Add a movement input for this frame (unit direction).
    fn set_movement_direction(&mut self, direction: Vec3);
    fn set_speed_cap(&mut self, speed: f32);
    fn set_avoidance_weight(&mut self, weight: f32);
    fn set_avoidance_radius(&mut self, radius: f32);
    /// Stop all locomotion; inputs are ignored until walking is re-enabled.
    fn disable_movement(&mut self);
    fn enable_walking(&mut self);
    fn set_velocity(&mut self, velocity: Vec3);
    /// Relocate the agent directly (recovery only).
    fn set_location(&mut self, location: Vec3);
    fn set_footprint_size(&mut self, size: FootprintSize);
}

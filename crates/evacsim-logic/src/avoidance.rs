//! Local avoidance: short-range repulsion blended with heading.
//!
//! Runs every frame against the neighbour snapshot cached by the throttled
//! loop. Each neighbour inside the interaction radius contributes
//! `(radius - d) / radius` along the separation; the sum is clamped to unit
//! length and weighted against the current heading.

use crate::config::AvoidanceConfig;
use crate::math::Vec3;

/// Magnitude of one neighbour's push at separation `distance`.
///
/// Zero outside `(epsilon, radius)`, otherwise linear falloff from 1 at
/// contact to 0 at the radius.
pub fn repulsion_strength(distance: f32, radius: f32, epsilon: f32) -> f32 {
    if distance > epsilon && distance < radius {
        (radius - distance) / radius
    } else {
        0.0
    }
}

/// Aggregate repulsion on an agent at `location`, clamped to unit length.
pub fn repulsion<I>(location: Vec3, neighbors: I, config: &AvoidanceConfig) -> Vec3
where
    I: IntoIterator<Item = Vec3>,
{
    let mut force = Vec3::ZERO;
    for other in neighbors {
        let away = location - other;
        let distance = away.length();
        let strength = repulsion_strength(distance, config.interaction_radius, config.epsilon);
        if strength > 0.0 {
            force += away.safe_normal() * strength;
        }
    }
    force.clamped_to_max_size(1.0)
}

/// Movement direction to request this frame, if any.
///
/// Returns `None` when the blended direction is negligible, or when the agent
/// is idle and the repulsion is below the idle threshold, so noise-level
/// pushes never start a stationary agent moving.
pub fn steer(velocity: Vec3, repulsion: Vec3, config: &AvoidanceConfig) -> Option<Vec3> {
    let has_movement = !velocity.is_nearly_zero();
    let heading = if has_movement {
        velocity.safe_normal()
    } else {
        Vec3::ZERO
    };
    let push = repulsion.clamped_to_max_size(1.0);
    let direction = (heading + push * config.repulsion_weight).safe_normal();

    if direction.is_nearly_zero() {
        return None;
    }
    if has_movement || push.length_squared() > config.idle_repulsion_threshold_sq {
        Some(direction)
    } else {
        None
    }
}

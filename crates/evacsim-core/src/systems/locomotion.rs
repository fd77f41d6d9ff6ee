//! Host movement layer - integrates bodies on the navigation mesh.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use evacsim_logic::locomotion::FloorContact;
use evacsim_logic::math::Vec3;
use evacsim_logic::navigation::NavigationSurface;

use crate::components::Body;
use crate::navmesh::NavMesh;
use crate::spatial::SpatialGrid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Horizontal acceleration toward the requested velocity.
    pub acceleration: f32,
    /// Box half-size used to keep each step on the mesh.
    pub step_extent: f32,
    /// Vertical tolerance when looking up the region under an agent.
    pub floor_probe: f32,
    /// Push overlapping footprints apart.
    pub separation: bool,
    /// Extra reach added to footprints in the neighbour query.
    pub neighbor_padding: f32,
    pub grid_cell_size: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            acceleration: 600.0,
            step_extent: 40.0,
            floor_probe: 60.0,
            separation: true,
            neighbor_padding: 10.0,
            grid_cell_size: 100.0,
        }
    }
}

/// Integrate every walking body by `dt`.
pub fn locomotion_system(world: &mut World, mesh: &NavMesh, config: &LocomotionConfig, dt: f32) {
    if dt <= 0.0 {
        return;
    }
    for (_, body) in world.query_mut::<&mut Body>() {
        integrate_body(body, mesh, config, dt);
    }
}

/// One step of walking movement.
///
/// Requested input becomes a horizontal velocity capped at the body's speed
/// cap. The step is projected onto the mesh; a step with no walkable point
/// in reach is blocked and the body stays put. Velocity is the displacement
/// actually achieved, so sliding along an edge or climbing a ramp shows up
/// in it.
pub fn integrate_body(body: &mut Body, mesh: &NavMesh, config: &LocomotionConfig, dt: f32) {
    let input = body.consume_input();
    if !body.is_walking() {
        return;
    }

    let desired = input.horizontal().safe_normal() * body.speed_cap;
    let current = body.velocity.horizontal();
    let change = (desired - current).clamped_to_max_size(config.acceleration * dt);
    let horizontal = (current + change).clamped_to_max_size(body.speed_cap);

    let from = body.location;
    match mesh.project(from + horizontal * dt, config.step_extent) {
        Some(next) => {
            body.location = next;
            body.velocity = (next - from) * (1.0 / dt);
            body.floor = FloorContact {
                grounded: true,
                normal: mesh.floor_normal_at(next, config.floor_probe),
            };
        }
        None => {
            body.velocity = Vec3::ZERO;
            if mesh.project(from, config.step_extent).is_none() {
                body.floor = FloorContact::AIRBORNE;
            }
        }
    }

    let heading = horizontal.horizontal();
    if heading.length_squared() > 1.0 {
        body.forward = heading.safe_normal();
    }
}

/// Push overlapping footprints apart.
///
/// Each overlapping pair is separated along the line between centres by the
/// overlap depth, split between the bodies that can move. Pushes are not
/// projected onto the mesh, so a hard shove can leave an agent off it.
pub fn separation_system(world: &mut World, grid: &SpatialGrid) {
    let entries = grid.entries();
    let mut pushes: Vec<(Entity, Vec3)> = Vec::new();

    for (i, j) in grid.overlapping_pairs() {
        let a = &entries[i];
        let b = &entries[j];
        let apart = (a.location - b.location).horizontal();
        let distance = apart.length();
        let depth = a.radius + b.radius - distance;
        if depth <= 0.0 {
            continue;
        }
        let normal = if distance > 1e-3 {
            apart * (1.0 / distance)
        } else {
            // coincident: split along x, lower entity index moves forward
            if a.entity < b.entity {
                Vec3::FORWARD
            } else {
                -Vec3::FORWARD
            }
        };

        let (share_a, share_b) = match (a.movable, b.movable) {
            (true, true) => (0.5, 0.5),
            (true, false) => (1.0, 0.0),
            (false, true) => (0.0, 1.0),
            (false, false) => continue,
        };
        if share_a > 0.0 {
            pushes.push((a.entity, normal * (depth * share_a)));
        }
        if share_b > 0.0 {
            pushes.push((b.entity, -normal * (depth * share_b)));
        }
    }

    for (entity, push) in pushes {
        if let Ok(mut body) = world.get::<&mut Body>(entity) {
            body.location += push;
        }
    }
}

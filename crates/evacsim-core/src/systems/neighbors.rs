//! Spatial grid maintenance and the throttled neighbour overlap query.

use hecs::{Entity, World};

use evacsim_logic::controller::AgentController;

use crate::components::{Body, NeighborCache};
use crate::error::SimError;
use crate::spatial::{GridEntry, SpatialGrid};

/// Rebuild `grid` from every active agent. Retired agents are left out, so
/// they neither collide nor count as neighbours.
pub fn rebuild_grid(world: &World, grid: &mut SpatialGrid) {
    let mut query = world.query::<(&Body, &AgentController)>();
    grid.rebuild(
        query
            .iter()
            .filter(|(_, (_, controller))| !controller.is_retired())
            .map(|(entity, (body, _))| GridEntry {
                entity,
                location: body.location,
                radius: body.footprint.radius,
                half_height: body.footprint.half_height,
                movable: body.is_walking(),
            }),
    );
}

/// Replace `entity`'s neighbour cache with the agents overlapping its
/// padded footprint. Returns the new neighbour count.
pub fn refresh_neighbors(
    world: &mut World,
    entity: Entity,
    grid: &SpatialGrid,
    padding: f32,
) -> Result<usize, SimError> {
    let (body, cache) = world
        .query_one_mut::<(&Body, &mut NeighborCache)>(entity)
        .map_err(|_| SimError::UnknownAgent(entity))?;
    let probe = GridEntry {
        entity,
        location: body.location,
        radius: body.footprint.radius,
        half_height: body.footprint.half_height,
        movable: body.is_walking(),
    };
    cache.entities = grid.overlapping(&probe, padding);
    Ok(cache.entities.len())
}

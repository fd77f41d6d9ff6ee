//! Per-frame controller pass over every agent.

use std::collections::HashMap;

use hecs::{Entity, World};

use evacsim_logic::config::ControllerConfig;
use evacsim_logic::controller::{AgentController, ControllerEvent};
use evacsim_logic::math::Vec3;
use evacsim_logic::navigation::NavigationSurface;

use crate::components::{Body, NeighborCache};
use crate::run_log::RunStats;

/// Run [`AgentController::frame`] for every agent.
///
/// Neighbour positions are read fresh each frame, but the set of neighbours
/// is whatever the last throttled update cached.
pub fn controller_frame_system(
    world: &mut World,
    nav: Option<&dyn NavigationSurface>,
    config: &ControllerConfig,
    dt: f32,
    stats: &mut RunStats,
) {
    let locations: HashMap<Entity, Vec3> = world
        .query::<(&Body, &AgentController)>()
        .iter()
        .filter(|(_, (_, controller))| !controller.is_retired())
        .map(|(entity, (body, _))| (entity, body.location))
        .collect();

    for (_, (controller, body, cache)) in
        world.query_mut::<(&mut AgentController, &mut Body, &NeighborCache)>()
    {
        let view = body.view();
        let neighbors = cache
            .entities
            .iter()
            .filter_map(|entity| locations.get(entity).copied());
        if let Some(ControllerEvent::Recovered) =
            controller.frame(&view, neighbors, nav, body, dt, config)
        {
            stats.recoveries += 1;
        }
    }
}

//! Muster goals - the evacuation decision-maker.
//!
//! Each agent heads for the muster point whose marked route is cheapest
//! from where it stands, following the route's waypoints in order. Route
//! cost is the sum of straight-line costs over the current area classes,
//! so fire and congestion make a route less attractive. Goals are re-chosen
//! periodically; a switch restarts at the new route's first waypoint.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use evacsim_logic::locomotion::LocomotionSink;
use evacsim_logic::math::Vec3;

use crate::components::{Body, MusterGoal};
use crate::navmesh::NavMesh;

/// An assembly point and the marked route leading to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusterPoint {
    pub name: String,
    pub location: Vec3,
    /// Horizontal arrival radius.
    pub radius: f32,
    /// Waypoints walked in order before the point itself.
    #[serde(default)]
    pub route: Vec<Vec3>,
}

impl MusterPoint {
    /// Waypoint `index` of the route, or the point itself past the end.
    pub fn waypoint(&self, index: usize) -> Vec3 {
        self.route.get(index).copied().unwrap_or(self.location)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusterSettings {
    /// Seconds between goal re-evaluations.
    pub goal_refresh_interval: f32,
    /// Horizontal distance at which a waypoint counts as passed.
    pub waypoint_radius: f32,
}

impl Default for MusterSettings {
    fn default() -> Self {
        Self {
            goal_refresh_interval: 5.0,
            waypoint_radius: 75.0,
        }
    }
}

/// Cost of walking from `location` along `point`'s route starting at
/// waypoint `from`.
pub fn route_cost(mesh: &NavMesh, location: Vec3, point: &MusterPoint, from: usize) -> f32 {
    let mut at = location;
    let mut cost = 0.0;
    for &next in point.route.iter().skip(from) {
        cost += mesh.straight_line_cost(at, next);
        at = next;
    }
    cost + mesh.straight_line_cost(at, point.location)
}

/// Pick the cheapest muster point. The current goal keeps its route
/// progress; any other point starts from its first waypoint.
pub fn choose_goal(
    mesh: &NavMesh,
    location: Vec3,
    points: &[MusterPoint],
    current: Option<&MusterGoal>,
) -> Option<MusterGoal> {
    points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            let from = match current {
                Some(goal) if goal.muster_point == index => goal.waypoint,
                _ => 0,
            };
            (index, from, route_cost(mesh, location, point, from))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(index, waypoint, _)| MusterGoal {
            muster_point: index,
            waypoint,
            target: points[index].location,
            arrival_radius: points[index].radius,
        })
}

/// Steer every walking agent along its goal's route.
pub fn seek_system(world: &mut World, points: &[MusterPoint], waypoint_radius: f32) {
    let reach_sq = waypoint_radius * waypoint_radius;
    for (_, (goal, body)) in world.query_mut::<(&mut MusterGoal, &mut Body)>() {
        if !body.is_walking() {
            continue;
        }
        let Some(point) = points.get(goal.muster_point) else {
            continue;
        };
        while goal.waypoint < point.route.len()
            && (point.route[goal.waypoint] - body.location)
                .horizontal()
                .length_squared()
                <= reach_sq
        {
            goal.waypoint += 1;
        }

        let heading = (point.waypoint(goal.waypoint) - body.location)
            .horizontal()
            .safe_normal();
        if !heading.is_nearly_zero() {
            body.set_movement_direction(heading);
        }
    }
}

/// Agents standing inside their muster point's radius.
pub fn muster_arrivals(world: &World) -> Vec<Entity> {
    let mut query = world.query::<(&MusterGoal, &Body)>();
    query
        .iter()
        .filter(|(_, (goal, body))| body.is_walking() && goal.reached(body.location))
        .map(|(entity, _)| entity)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navmesh::{AreaClass, NavRegion, Rect};
    use evacsim_logic::footprint::FootprintSize;

    fn mesh() -> NavMesh {
        NavMesh::new(vec![NavRegion::flat(
            "deck",
            Rect::new(-1000.0, -1000.0, 1000.0, 1000.0),
            0.0,
        )])
        .unwrap()
    }

    fn points() -> Vec<MusterPoint> {
        vec![
            MusterPoint {
                name: "west".into(),
                location: Vec3::new(-800.0, 0.0, 0.0),
                radius: 100.0,
                route: Vec::new(),
            },
            MusterPoint {
                name: "east".into(),
                location: Vec3::new(800.0, 0.0, 0.0),
                radius: 100.0,
                route: vec![Vec3::new(400.0, 400.0, 0.0)],
            },
        ]
    }

    #[test]
    fn test_cheapest_route_wins() {
        let mesh = mesh();
        let goal = choose_goal(&mesh, Vec3::new(100.0, 0.0, 0.0), &points(), None).unwrap();
        // east is closer as the crow flies but its route detours
        assert_eq!(goal.muster_point, 0);
        assert_eq!(goal.waypoint, 0);
    }

    #[test]
    fn test_fire_diverts_goal() {
        let mut mesh = mesh();
        let at = Vec3::new(-100.0, 0.0, 0.0);
        assert_eq!(choose_goal(&mesh, at, &points(), None).unwrap().muster_point, 0);
        mesh.set_modifier(1, Rect::new(-600.0, -200.0, -400.0, 200.0), AreaClass::Fire);
        assert_eq!(choose_goal(&mesh, at, &points(), None).unwrap().muster_point, 1);
    }

    #[test]
    fn test_current_goal_keeps_route_progress() {
        let mesh = mesh();
        let current = MusterGoal {
            muster_point: 1,
            waypoint: 1,
            target: Vec3::new(800.0, 0.0, 0.0),
            arrival_radius: 100.0,
        };
        let goal =
            choose_goal(&mesh, Vec3::new(400.0, 300.0, 0.0), &points(), Some(&current)).unwrap();
        assert_eq!(goal.muster_point, 1);
        assert_eq!(goal.waypoint, 1);
    }

    #[test]
    fn test_seek_follows_waypoints_then_arrives() {
        let points = points();
        let mut world = World::new();
        let mut body = Body::new(Vec3::new(390.0, 390.0, 0.0), Vec3::FORWARD, FootprintSize::new(20.0, 88.0));
        body.set_speed_cap(150.0);
        let agent = world.spawn((
            body,
            MusterGoal {
                muster_point: 1,
                waypoint: 0,
                target: points[1].location,
                arrival_radius: points[1].radius,
            },
        ));

        seek_system(&mut world, &points, 75.0);
        {
            let goal = world.get::<&MusterGoal>(agent).unwrap();
            assert_eq!(goal.waypoint, 1);
            let body = world.get::<&Body>(agent).unwrap();
            let input = body.pending_input();
            assert!(input.x > 0.0 && input.y < 0.0);
        }
        assert!(muster_arrivals(&world).is_empty());

        world.get::<&mut Body>(agent).unwrap().location = Vec3::new(750.0, 20.0, 0.0);
        assert_eq!(muster_arrivals(&world), vec![agent]);
    }
}

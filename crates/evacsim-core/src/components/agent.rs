//! Agent identity, goals and the cached neighbour set.

use hecs::Entity;
use serde::{Deserialize, Serialize};

use evacsim_logic::math::Vec3;

/// Marks an entity as an evacuating person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: u32,
}

/// Neighbours found by the last throttled overlap query.
///
/// Only the throttled loop writes this; the per-frame avoidance reads the
/// current positions of whatever entities it names.
#[derive(Debug, Clone, Default)]
pub struct NeighborCache {
    pub entities: Vec<Entity>,
}

impl NeighborCache {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Whether the agent is currently inside a room region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPresence {
    pub inside: bool,
}

/// Steering target held by the evacuation decision-maker.
///
/// Removed when the agent finishes mustering, which releases its control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MusterGoal {
    /// Index into the engine's muster points.
    pub muster_point: usize,
    /// Next route waypoint; equal to the route length once only the muster
    /// point itself remains.
    pub waypoint: usize,
    pub target: Vec3,
    pub arrival_radius: f32,
}

impl MusterGoal {
    /// Horizontal arrival test.
    pub fn reached(&self, location: Vec3) -> bool {
        let d = (self.target - location).horizontal();
        d.length_squared() <= self.arrival_radius * self.arrival_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_arrival_ignores_height() {
        let goal = MusterGoal {
            muster_point: 0,
            waypoint: 0,
            target: Vec3::new(100.0, 0.0, 0.0),
            arrival_radius: 50.0,
        };
        assert!(goal.reached(Vec3::new(60.0, 10.0, 300.0)));
        assert!(!goal.reached(Vec3::new(0.0, 0.0, 0.0)));
    }
}

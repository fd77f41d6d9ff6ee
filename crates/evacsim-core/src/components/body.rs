//! Kinematic body driven by the host movement layer.
//!
//! `Body` is the host side of the locomotion seam: controllers and the
//! decision-maker write requests into it through [`LocomotionSink`], and the
//! locomotion system integrates it once per frame.

use serde::{Deserialize, Serialize};

use evacsim_logic::footprint::FootprintSize;
use evacsim_logic::locomotion::{AgentView, FloorContact, LocomotionSink};
use evacsim_logic::math::Vec3;

/// Movement mode of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementMode {
    #[default]
    Walking,
    /// No integration and no input; only direct relocation moves the body.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub location: Vec3,
    pub velocity: Vec3,
    /// Unit horizontal facing.
    pub forward: Vec3,
    pub floor: FloorContact,
    pub mode: MovementMode,
    pub speed_cap: f32,
    pub avoidance_weight: f32,
    pub avoidance_radius: f32,
    pub footprint: FootprintSize,
    /// Movement input accumulated since the last integration.
    #[serde(skip)]
    pending_input: Vec3,
}

impl Body {
    pub fn new(location: Vec3, forward: Vec3, footprint: FootprintSize) -> Self {
        let forward = forward.horizontal().safe_normal();
        Self {
            location,
            velocity: Vec3::ZERO,
            forward: if forward.is_nearly_zero() {
                Vec3::FORWARD
            } else {
                forward
            },
            floor: FloorContact::FLAT,
            mode: MovementMode::Walking,
            speed_cap: 0.0,
            avoidance_weight: 0.0,
            avoidance_radius: 0.0,
            footprint,
            pending_input: Vec3::ZERO,
        }
    }

    pub fn right(&self) -> Vec3 {
        Vec3::UP.cross(&self.forward)
    }

    pub fn is_walking(&self) -> bool {
        self.mode == MovementMode::Walking
    }

    /// Snapshot handed to the controller.
    pub fn view(&self) -> AgentView {
        AgentView {
            location: self.location,
            velocity: self.velocity,
            forward: self.forward,
            right: self.right(),
            floor: self.floor,
        }
    }

    /// Take the accumulated input, leaving none behind.
    pub fn consume_input(&mut self) -> Vec3 {
        std::mem::replace(&mut self.pending_input, Vec3::ZERO)
    }

    pub fn pending_input(&self) -> Vec3 {
        self.pending_input
    }
}

impl LocomotionSink for Body {
    fn set_movement_direction(&mut self, direction: Vec3) {
        if self.is_walking() {
            self.pending_input += direction;
        }
    }

    fn set_speed_cap(&mut self, speed: f32) {
        self.speed_cap = speed;
    }

    fn set_avoidance_weight(&mut self, weight: f32) {
        self.avoidance_weight = weight;
    }

    fn set_avoidance_radius(&mut self, radius: f32) {
        self.avoidance_radius = radius;
    }

    fn disable_movement(&mut self) {
        self.mode = MovementMode::Disabled;
        self.velocity = Vec3::ZERO;
        self.pending_input = Vec3::ZERO;
    }

    fn enable_walking(&mut self) {
        self.mode = MovementMode::Walking;
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn set_location(&mut self, location: Vec3) {
        self.location = location;
    }

    fn set_footprint_size(&mut self, size: FootprintSize) {
        self.footprint = size;
    }
}

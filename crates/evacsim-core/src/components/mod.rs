//! Component definitions for the ECS simulation.
//!
//! Components are pure data structs attached to entities.
//! Behavior lives in systems and in the `evacsim-logic` controller.

mod agent;
mod body;

pub use agent::*;
pub use body::*;

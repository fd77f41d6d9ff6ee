//! Systems - logic that operates on components.
//!
//! Per-frame systems run in a fixed order inside
//! [`SimulationEngine::update`](crate::engine::SimulationEngine::update):
//! muster seeking, the controller frame, host locomotion, grid rebuild and
//! overlap separation. Everything slower is driven by timers.

mod controller;
mod locomotion;
mod muster;
mod neighbors;

pub use controller::*;
pub use locomotion::*;
pub use muster::*;
pub use neighbors::*;

//! EvacSim Core - Crowd Evacuation Simulation Engine
//!
//! An ECS-based simulation of people evacuating a ship deck toward muster
//! points, each driven by the per-agent locomotion and recovery controller
//! from `evacsim-logic`.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Agents
//! - **Components**: Pure data attached to entities (Body, NeighborCache, MusterGoal, the controller)
//! - **Systems**: Per-frame logic that queries and updates components
//! - **Timers**: Every slower callback, cancellable per owner
//!
//! # Example
//!
//! ```rust,no_run
//! use evacsim_core::prelude::*;
//!
//! let scenario = Scenario::demo_deck();
//! let mut engine = SimulationEngine::from_scenario(&scenario).unwrap();
//!
//! let log = RunLog::new(std::io::stdout()).unwrap();
//! let (report, _) = engine.run(log).unwrap();
//! println!("{:?} after {:.1}s", report.end, report.elapsed_seconds);
//! ```

pub mod components;
pub mod engine;
pub mod error;
pub mod hazards;
pub mod navmesh;
pub mod run_log;
pub mod scenario;
pub mod spatial;
pub mod systems;
pub mod timers;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{AgentStatus, SimulationEngine};
    pub use crate::error::SimError;
    pub use crate::navmesh::{AreaClass, NavMesh, NavRegion, Rect};
    pub use crate::run_log::{RunEnd, RunLog, RunReport, RunSettings};
    pub use crate::scenario::Scenario;
    pub use evacsim_logic::math::Vec3;
}

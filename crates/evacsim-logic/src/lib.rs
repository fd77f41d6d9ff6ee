//! Pure per-agent locomotion and recovery logic for EvacSim.
//!
//! This crate holds the controller that keeps one evacuating agent moving:
//! local avoidance, congestion-aware tuning, stall detection with a
//! footprint-shrink workaround, and off-surface recovery. Functions take
//! plain data and talk to the outside world only through the
//! [`navigation::NavigationSurface`] and [`locomotion::LocomotionSink`]
//! traits, so everything here is unit-testable without an engine.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`avoidance`] | Short-range repulsion blended with the current heading |
//! | [`config`] | Controller tunables, defaults, validation |
//! | [`controller`] | `AgentController`: per-callback composition of everything below |
//! | [`corridor`] | Lateral corridor-width probe against the navigation surface |
//! | [`footprint`] | Footprint shrink / restore state machine |
//! | [`locomotion`] | Agent snapshot and the host locomotion sink trait |
//! | [`math`] | `Vec3`, safe normalisation, interpolation, range mapping |
//! | [`navigation`] | Navigation surface projection trait |
//! | [`nudge`] | Stairs detection and the one-shot downhill impulse |
//! | [`recovery`] | Off-surface detection and relocation state machine |
//! | [`stuck`] | Displacement-based stall detector |
//! | [`tuning`] | Speed cap and the two avoidance-weight strategies |

pub mod avoidance;
pub mod config;
pub mod controller;
pub mod corridor;
pub mod footprint;
pub mod locomotion;
pub mod math;
pub mod navigation;
pub mod nudge;
pub mod recovery;
pub mod stuck;
pub mod tuning;

//! Off-surface detection and smooth relocation back onto walkable ground.
//!
//! The periodic check only runs while [`SurfaceState::OnSurface`]. A failed
//! projection widens the search for a fallback point, which can never fail:
//! with nothing walkable in range the agent's own location is the target.
//! While [`SurfaceState::RecoveringTo`], every frame eases the agent toward
//! the target and snaps each step back onto the surface when possible.

use serde::{Deserialize, Serialize};

use crate::config::RecoveryConfig;
use crate::math::{vinterp_to, Vec3};
use crate::navigation::{project_with, NavigationSurface};

/// Surface phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum SurfaceState {
    #[default]
    OnSurface,
    /// Relocating toward a point on the navigable surface.
    RecoveringTo(Vec3),
}

impl SurfaceState {
    pub fn is_off_surface(&self) -> bool {
        matches!(self, SurfaceState::RecoveringTo(_))
    }

    pub fn target(&self) -> Option<Vec3> {
        match self {
            SurfaceState::OnSurface => None,
            SurfaceState::RecoveringTo(t) => Some(*t),
        }
    }
}

/// Outcome of the periodic surface check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceCheck {
    /// No navigation service this cycle.
    Skipped,
    OnSurface,
    OffSurface { fallback: Vec3 },
}

/// Nearest walkable point within `extent`, or `location` itself.
pub fn find_fallback_point(
    nav: Option<&dyn NavigationSurface>,
    location: Vec3,
    extent: f32,
) -> Vec3 {
    project_with(nav, location, extent).unwrap_or(location)
}

/// Check whether `location` still projects onto the surface.
pub fn check_surface(
    nav: Option<&dyn NavigationSurface>,
    location: Vec3,
    config: &RecoveryConfig,
) -> SurfaceCheck {
    let Some(surface) = nav else {
        return SurfaceCheck::Skipped;
    };
    if surface.project(location, config.check_extent).is_some() {
        return SurfaceCheck::OnSurface;
    }
    SurfaceCheck::OffSurface {
        fallback: find_fallback_point(nav, location, config.fallback_extent),
    }
}

/// One frame of relocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveryStep {
    pub location: Vec3,
    pub arrived: bool,
}

/// Ease `current` toward `target`, snapping onto the surface when a
/// projection exists within the snap extent.
pub fn recovery_step(
    nav: Option<&dyn NavigationSurface>,
    current: Vec3,
    target: Vec3,
    dt: f32,
    config: &RecoveryConfig,
) -> RecoveryStep {
    let eased = vinterp_to(current, target, dt, config.interp_speed);
    let location = project_with(nav, eased, config.snap_extent).unwrap_or(eased);
    RecoveryStep {
        location,
        arrived: location.distance_squared(&target) < config.arrival_distance_sq,
    }
}

//! Navigation surface seam.
//!
//! The controller never owns the walkable-area representation; it only asks
//! "where is the nearest walkable point?". Query failure is an ordinary
//! answer (`None`), not an error. Callers that may run without a surface take
//! `Option<&dyn NavigationSurface>` and skip their work for the cycle when it
//! is absent.

use crate::math::Vec3;

/// Nearest-walkable-point queries against the navigable surface.
///
/// Implementations are read concurrently by every agent, so `project` must
/// be free of observable side effects.
pub trait NavigationSurface {
    /// Nearest walkable point inside the axis-aligned box of half-size
    /// `extent` around `point`, or `None` if the box holds no walkable ground.
    fn project(&self, point: Vec3, extent: f32) -> Option<Vec3>;
}

impl<T: NavigationSurface + ?Sized> NavigationSurface for &T {
    fn project(&self, point: Vec3, extent: f32) -> Option<Vec3> {
        (**self).project(point, extent)
    }
}

/// Project through an optional service; a missing service behaves like a miss.
pub fn project_with(
    nav: Option<&dyn NavigationSurface>,
    point: Vec3,
    extent: f32,
) -> Option<Vec3> {
    nav.and_then(|n| n.project(point, extent))
}

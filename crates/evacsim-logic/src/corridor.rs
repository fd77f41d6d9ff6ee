//! Corridor width estimator.
//!
//! Probes the navigation surface a fixed distance to either side of the
//! agent's facing and measures the gap between the two projections.

use crate::config::TuningConfig;
use crate::math::Vec3;
use crate::navigation::NavigationSurface;

/// Estimated lateral open space around `location`.
///
/// - both probes project: distance between the projected points
/// - one probe projects: `2 * sample_distance` (open on the failing side)
/// - neither projects: `0.0` (enclosed, or standing on an edge)
///
/// Returns `None` only when no navigation service is available.
pub fn estimate_corridor_width(
    nav: Option<&dyn NavigationSurface>,
    location: Vec3,
    right: Vec3,
    config: &TuningConfig,
) -> Option<f32> {
    let nav = nav?;
    let offset = right.safe_normal() * config.corridor_sample_distance;
    let left = nav.project(location - offset, config.corridor_probe_extent);
    let right = nav.project(location + offset, config.corridor_probe_extent);

    Some(match (left, right) {
        (Some(l), Some(r)) => l.distance(&r),
        (Some(_), None) | (None, Some(_)) => config.corridor_sample_distance * 2.0,
        (None, None) => 0.0,
    })
}

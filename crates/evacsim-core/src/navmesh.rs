//! Navigable surface: sloped rectangular regions, area costs and modifiers.
//!
//! The mesh is a set of axis-aligned walkable regions, each with a floor
//! height that varies linearly across it (ramps and stairs). Regions that
//! touch are linked. Hazard volumes stamp [`AreaClass`] modifiers over the
//! mesh, which change traversal costs but never walkability.
//!
//! | Area class | Default cost | Entering cost |
//! |------------|--------------|---------------|
//! | `Default`  | 1            | 0             |
//! | `Crowded`  | 1            | 3000          |
//! | `Fire`     | 5000         | 10000         |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use evacsim_logic::math::Vec3;
use evacsim_logic::navigation::NavigationSurface;

use crate::error::SimError;

/// Spacing of cost samples along a straight segment.
const COST_SAMPLE_STEP: f32 = 25.0;
/// Regions closer than this along an edge count as touching.
const LINK_TOLERANCE: f32 = 1.0;

/// Axis-aligned rectangle in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_center(center: Vec3, half_x: f32, half_y: f32) -> Self {
        Self::new(
            center.x - half_x,
            center.y - half_y,
            center.x + half_x,
            center.y + half_y,
        )
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn depth(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f32 {
        self.width() * self.depth()
    }

    pub fn is_valid(&self) -> bool {
        self.width() > 0.0 && self.depth() > 0.0
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (x.clamp(self.min_x, self.max_x), y.clamp(self.min_y, self.max_y))
    }

    /// Overlapping or touching within `tolerance`.
    pub fn touches(&self, other: &Rect, tolerance: f32) -> bool {
        self.min_x <= other.max_x + tolerance
            && other.min_x <= self.max_x + tolerance
            && self.min_y <= other.max_y + tolerance
            && other.min_y <= self.max_y + tolerance
    }
}

/// Walkable region with a linearly varying floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavRegion {
    pub name: String,
    pub rect: Rect,
    /// Floor height at `(rect.min_x, rect.min_y)`.
    pub floor_z: f32,
    /// Rise per unit of x.
    #[serde(default)]
    pub slope_x: f32,
    /// Rise per unit of y.
    #[serde(default)]
    pub slope_y: f32,
    /// Enclosed room; agents tighten avoidance inside.
    #[serde(default)]
    pub room: bool,
}

impl NavRegion {
    pub fn flat(name: &str, rect: Rect, floor_z: f32) -> Self {
        Self {
            name: name.to_string(),
            rect,
            floor_z,
            slope_x: 0.0,
            slope_y: 0.0,
            room: false,
        }
    }

    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        self.floor_z + self.slope_x * (x - self.rect.min_x) + self.slope_y * (y - self.rect.min_y)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::new(-self.slope_x, -self.slope_y, 1.0).safe_normal()
    }

    /// Nearest point on this region to `point`.
    fn closest_point(&self, point: Vec3) -> Vec3 {
        let (x, y) = self.rect.clamp(point.x, point.y);
        Vec3::new(x, y, self.height_at(x, y))
    }
}

/// Traversal cost class stamped over part of the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AreaClass {
    #[default]
    Default,
    Crowded,
    Fire,
}

impl AreaClass {
    /// Cost multiplier per unit travelled.
    pub fn default_cost(self) -> f32 {
        match self {
            AreaClass::Default | AreaClass::Crowded => 1.0,
            AreaClass::Fire => 5000.0,
        }
    }

    /// Fixed cost paid when entering from another class.
    pub fn entering_cost(self) -> f32 {
        match self {
            AreaClass::Default => 0.0,
            AreaClass::Crowded => 3000.0,
            AreaClass::Fire => 10000.0,
        }
    }

    fn severity(self) -> f32 {
        self.default_cost() + self.entering_cost()
    }
}

/// Owner key for a modifier; one modifier per hazard volume.
pub type ModifierId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavModifier {
    pub rect: Rect,
    pub class: AreaClass,
}

/// Link between two regions with its traversal cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionLink {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone)]
pub struct NavMesh {
    regions: Vec<NavRegion>,
    links: Vec<RegionLink>,
    modifiers: BTreeMap<ModifierId, NavModifier>,
}

impl NavMesh {
    /// Build a mesh and link touching regions.
    pub fn new(regions: Vec<NavRegion>) -> Result<Self, SimError> {
        if regions.is_empty() {
            return Err(SimError::InvalidScenario(
                "navigation mesh needs at least one region".into(),
            ));
        }
        if let Some(bad) = regions.iter().find(|r| !r.rect.is_valid()) {
            return Err(SimError::InvalidScenario(format!(
                "region '{}' has an empty rectangle",
                bad.name
            )));
        }

        let mut links = Vec::new();
        for (i, a) in regions.iter().enumerate() {
            for (j, b) in regions.iter().enumerate() {
                if i != j && a.rect.touches(&b.rect, LINK_TOLERANCE) {
                    links.push(RegionLink { from: i, to: j });
                }
            }
        }

        Ok(Self {
            regions,
            links,
            modifiers: BTreeMap::new(),
        })
    }

    pub fn regions(&self) -> &[NavRegion] {
        &self.regions
    }

    pub fn links(&self) -> &[RegionLink] {
        &self.links
    }

    /// Region whose floor is nearest to `point` among those containing it
    /// horizontally, within `max_dz` vertically.
    pub fn region_at(&self, point: Vec3, max_dz: f32) -> Option<usize> {
        self.regions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.rect.contains(point.x, point.y))
            .map(|(i, r)| (i, (r.height_at(point.x, point.y) - point.z).abs()))
            .filter(|(_, dz)| *dz <= max_dz)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Floor normal under `point`; straight up off the mesh.
    pub fn floor_normal_at(&self, point: Vec3, max_dz: f32) -> Vec3 {
        self.region_at(point, max_dz)
            .map(|i| self.regions[i].normal())
            .unwrap_or(Vec3::UP)
    }

    /// Install or replace the modifier owned by `id`.
    pub fn set_modifier(&mut self, id: ModifierId, rect: Rect, class: AreaClass) {
        self.modifiers.insert(id, NavModifier { rect, class });
    }

    pub fn remove_modifier(&mut self, id: ModifierId) -> bool {
        self.modifiers.remove(&id).is_some()
    }

    pub fn modifier(&self, id: ModifierId) -> Option<&NavModifier> {
        self.modifiers.get(&id)
    }

    /// Most severe class covering `(x, y)`.
    pub fn area_class_at(&self, x: f32, y: f32) -> AreaClass {
        self.modifiers
            .values()
            .filter(|m| m.rect.contains(x, y))
            .map(|m| m.class)
            .max_by(|a, b| a.severity().total_cmp(&b.severity()))
            .unwrap_or_default()
    }

    /// Cost of the link from region `from` to region `to`: centre distance
    /// weighted by the destination's class, plus its entering cost when the
    /// class changes.
    pub fn link_cost(&self, from: usize, to: usize) -> Option<f32> {
        self.links.iter().find(|l| l.from == from && l.to == to)?;
        let a = &self.regions[from];
        let b = &self.regions[to];
        let (ax, ay) = a.rect.center();
        let (bx, by) = b.rect.center();
        let pa = Vec3::new(ax, ay, a.height_at(ax, ay));
        let pb = Vec3::new(bx, by, b.height_at(bx, by));

        let class_a = self.area_class_at(ax, ay);
        let class_b = self.area_class_at(bx, by);
        let entering = if class_a != class_b {
            class_b.entering_cost()
        } else {
            0.0
        };
        Some(pa.distance(&pb) * class_b.default_cost() + entering)
    }

    /// Cost of walking the straight segment `from -> to` across the current
    /// area classes.
    pub fn straight_line_cost(&self, from: Vec3, to: Vec3) -> f32 {
        let length = (to - from).horizontal().length();
        let steps = (length / COST_SAMPLE_STEP).ceil().max(1.0) as usize;
        let seg = length / steps as f32;

        let mut class = self.area_class_at(from.x, from.y);
        let mut cost = 0.0;
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            let x = from.x + (to.x - from.x) * t;
            let y = from.y + (to.y - from.y) * t;
            let here = self.area_class_at(x, y);
            if here != class {
                cost += here.entering_cost();
                class = here;
            }
            cost += seg * here.default_cost();
        }
        cost
    }
}

impl NavigationSurface for NavMesh {
    fn project(&self, point: Vec3, extent: f32) -> Option<Vec3> {
        self.regions
            .iter()
            .map(|r| r.closest_point(point))
            .filter(|p| {
                let d = *p - point;
                d.x.abs() <= extent && d.y.abs() <= extent && d.z.abs() <= extent
            })
            .min_by(|a, b| {
                a.distance_squared(&point)
                    .total_cmp(&b.distance_squared(&point))
            })
    }
}

//! Uniform grid over agent footprints for overlap and region queries.
//!
//! Rebuilt from scratch each frame; queries visit candidates in the cells a
//! search circle touches, then filter exactly.

use std::collections::HashMap;

use hecs::Entity;

use evacsim_logic::math::Vec3;

/// One indexed footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridEntry {
    pub entity: Entity,
    pub location: Vec3,
    pub radius: f32,
    pub half_height: f32,
    /// Can be pushed by overlap separation.
    pub movable: bool,
}

impl GridEntry {
    /// Capsule overlap test with `padding` added to the combined radius.
    pub fn overlaps(&self, other: &GridEntry, padding: f32) -> bool {
        let reach = self.radius + other.radius + padding;
        let d = (self.location - other.location).horizontal();
        d.length_squared() < reach * reach
            && (self.location.z - other.location.z).abs() < self.half_height + other.half_height
    }
}

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
    entries: Vec<GridEntry>,
    max_radius: f32,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: HashMap::new(),
            entries: Vec::new(),
            max_radius: 0.0,
        }
    }

    fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    pub fn rebuild<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = GridEntry>,
    {
        self.cells.clear();
        self.entries.clear();
        self.max_radius = 0.0;
        for entry in entries {
            let idx = self.entries.len();
            let cell = self.cell_of(entry.location.x, entry.location.y);
            self.cells.entry(cell).or_default().push(idx);
            self.max_radius = self.max_radius.max(entry.radius);
            self.entries.push(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GridEntry] {
        &self.entries
    }

    /// Visit every entry whose centre lies within `radius` of `center`
    /// horizontally.
    pub fn visit_within(&self, center: Vec3, radius: f32, visitor: &mut dyn FnMut(&GridEntry)) {
        let (x0, y0) = self.cell_of(center.x - radius, center.y - radius);
        let (x1, y1) = self.cell_of(center.x + radius, center.y + radius);
        let radius_sq = radius * radius;
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                let Some(bucket) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                for &idx in bucket {
                    let entry = &self.entries[idx];
                    if (entry.location - center).horizontal().length_squared() <= radius_sq {
                        visitor(entry);
                    }
                }
            }
        }
    }

    /// Entities whose footprint overlaps `probe` (padded), excluding the
    /// probe's own entity.
    pub fn overlapping(&self, probe: &GridEntry, padding: f32) -> Vec<Entity> {
        let reach = probe.radius + self.max_radius + padding;
        let mut found = Vec::new();
        self.visit_within(probe.location, reach, &mut |other| {
            if other.entity != probe.entity && probe.overlaps(other, padding) {
                found.push(other.entity);
            }
        });
        found
    }

    /// Overlapping pairs `(i, j)` with `i < j`, as indices into [`entries`].
    ///
    /// [`entries`]: SpatialGrid::entries
    pub fn overlapping_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, probe) in self.entries.iter().enumerate() {
            let reach = probe.radius + self.max_radius;
            let (x0, y0) = self.cell_of(probe.location.x - reach, probe.location.y - reach);
            let (x1, y1) = self.cell_of(probe.location.x + reach, probe.location.y + reach);
            for cx in x0..=x1 {
                for cy in y0..=y1 {
                    let Some(bucket) = self.cells.get(&(cx, cy)) else {
                        continue;
                    };
                    for &j in bucket {
                        if j > i && probe.overlaps(&self.entries[j], 0.0) {
                            pairs.push((i, j));
                        }
                    }
                }
            }
        }
        pairs
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(points: &[(f32, f32, f32)]) -> (SpatialGrid, Vec<Entity>) {
        let mut world = hecs::World::new();
        let entities: Vec<Entity> = points.iter().map(|_| world.spawn(())).collect();
        let mut grid = SpatialGrid::new(50.0);
        grid.rebuild(points.iter().zip(&entities).map(|(&(x, y, z), &entity)| GridEntry {
            entity,
            location: Vec3::new(x, y, z),
            radius: 20.0,
            half_height: 88.0,
            movable: true,
        }));
        (grid, entities)
    }

    #[test]
    fn test_overlap_across_cell_borders() {
        let (grid, e) = grid_with(&[(49.0, 0.0, 0.0), (51.0, 0.0, 0.0), (200.0, 0.0, 0.0)]);
        let probe = grid.entries()[0];
        assert_eq!(grid.overlapping(&probe, 0.0), vec![e[1]]);
        assert_eq!(grid.overlapping_pairs(), vec![(0, 1)]);
    }

    #[test]
    fn test_vertical_separation_prevents_overlap() {
        let (grid, _) = grid_with(&[(0.0, 0.0, 0.0), (10.0, 0.0, 400.0)]);
        assert!(grid.overlapping_pairs().is_empty());
    }

    #[test]
    fn test_padding_widens_query() {
        let (grid, e) = grid_with(&[(0.0, 0.0, 0.0), (45.0, 0.0, 0.0)]);
        let probe = grid.entries()[0];
        assert!(grid.overlapping(&probe, 0.0).is_empty());
        assert_eq!(grid.overlapping(&probe, 10.0), vec![e[1]]);
    }

    #[test]
    fn test_visit_within_negative_coordinates() {
        let (grid, _) = grid_with(&[(-120.0, -80.0, 0.0), (300.0, 300.0, 0.0)]);
        let mut seen = 0;
        grid.visit_within(Vec3::new(-100.0, -100.0, 0.0), 50.0, &mut |_| seen += 1);
        assert_eq!(seen, 1);
    }
}

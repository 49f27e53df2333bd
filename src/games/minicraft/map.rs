//! Terrain grid and map generation.

use rand::Rng;

use super::entity::EntityRef;

pub const GRID_SIZE: usize = 12;
const OBSTACLE_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileKind {
    #[default]
    Empty,
    Resource,
    Obstacle,
    Water,
}

impl TileKind {
    pub fn name(self) -> &'static str {
        match self {
            TileKind::Empty => "Empty",
            TileKind::Resource => "Crystal",
            TileKind::Obstacle => "Rock",
            TileKind::Water => "Water",
        }
    }

    pub fn is_passable(self) -> bool {
        self == TileKind::Empty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tile {
    pub kind: TileKind,
    pub entity: Option<EntityRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    tiles: Vec<Tile>,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            tiles: vec![Tile::default(); GRID_SIZE * GRID_SIZE],
        }
    }
}

impl Grid {
    /// Open field with the two crystal patches and nothing else.
    pub fn with_resources() -> Self {
        let mut grid = Self::default();
        for y in 3..=4 {
            for x in 2..=3 {
                grid.set_kind(x, y, TileKind::Resource);
                let (mx, my) = mirror(x, y, 1);
                grid.set_kind(mx, my, TileKind::Resource);
            }
        }
        grid
    }

    /// Crystal patches plus up to ten rocks or pools, kept clear of both
    /// starting corners. Each peer rolls its own.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut grid = Self::with_resources();
        for _ in 0..OBSTACLE_ATTEMPTS {
            let x = rng.random_range(1..GRID_SIZE - 1);
            let y = rng.random_range(1..GRID_SIZE - 1);
            if (x < 4 && y < 4) || (x > GRID_SIZE - 5 && y > GRID_SIZE - 5) {
                continue;
            }
            let kind = if rng.random_bool(0.5) {
                TileKind::Obstacle
            } else {
                TileKind::Water
            };
            grid.set_kind(x, y, kind);
        }
        grid
    }

    pub fn tile(&self, x: usize, y: usize) -> Option<&Tile> {
        in_bounds(x, y).then(|| &self.tiles[y * GRID_SIZE + x])
    }

    fn tile_mut(&mut self, x: usize, y: usize) -> Option<&mut Tile> {
        if in_bounds(x, y) {
            Some(&mut self.tiles[y * GRID_SIZE + x])
        } else {
            None
        }
    }

    pub fn set_kind(&mut self, x: usize, y: usize, kind: TileKind) {
        if let Some(tile) = self.tile_mut(x, y) {
            tile.kind = kind;
        }
    }

    pub fn entity_at(&self, x: usize, y: usize) -> Option<EntityRef> {
        self.tile(x, y).and_then(|tile| tile.entity)
    }

    /// In bounds, walkable terrain, nobody standing there.
    pub fn is_passable(&self, x: usize, y: usize) -> bool {
        self.tile(x, y)
            .is_some_and(|tile| tile.kind.is_passable() && tile.entity.is_none())
    }

    /// Every tile of the `size`×`size` square at (x, y) is on the map and free.
    pub fn is_footprint_free(&self, x: usize, y: usize, size: usize) -> bool {
        footprint(x, y, size).all(|(fx, fy)| self.tile(fx, fy).is_some_and(|t| t.entity.is_none()))
    }

    pub fn occupy(&mut self, x: usize, y: usize, size: usize, entity: EntityRef) {
        for (fx, fy) in footprint(x, y, size) {
            if let Some(tile) = self.tile_mut(fx, fy) {
                tile.entity = Some(entity);
            }
        }
    }

    pub fn vacate(&mut self, x: usize, y: usize, size: usize) {
        for (fx, fy) in footprint(x, y, size) {
            if let Some(tile) = self.tile_mut(fx, fy) {
                tile.entity = None;
            }
        }
    }

    pub fn positions() -> impl Iterator<Item = (usize, usize)> {
        (0..GRID_SIZE).flat_map(|y| (0..GRID_SIZE).map(move |x| (x, y)))
    }
}

pub fn in_bounds(x: usize, y: usize) -> bool {
    x < GRID_SIZE && y < GRID_SIZE
}

pub fn footprint(x: usize, y: usize, size: usize) -> impl Iterator<Item = (usize, usize)> {
    (y..y + size).flat_map(move |fy| (x..x + size).map(move |fx| (fx, fy)))
}

pub fn distance(x1: usize, y1: usize, x2: usize, y2: usize) -> u32 {
    (x1.abs_diff(x2) + y1.abs_diff(y2)) as u32
}

/// The same square seen from the other side of the board. Each player sees
/// their own base in the top-left corner.
pub fn mirror(x: usize, y: usize, size: usize) -> (usize, usize) {
    (GRID_SIZE - size - x, GRID_SIZE - size - y)
}

/// [`mirror`] for coordinates that arrived off the wire and may be garbage.
pub fn checked_mirror(x: usize, y: usize, size: usize) -> Option<(usize, usize)> {
    let limit = GRID_SIZE.checked_sub(size)?;
    Some((limit.checked_sub(x)?, limit.checked_sub(y)?))
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn resource_patches_are_symmetric() {
        let grid = Grid::with_resources();
        let resources: Vec<_> = Grid::positions()
            .filter(|&(x, y)| grid.tile(x, y).map(|t| t.kind) == Some(TileKind::Resource))
            .collect();
        assert_eq!(resources.len(), 8);
        for &(x, y) in &resources {
            let (mx, my) = mirror(x, y, 1);
            assert_eq!(grid.tile(mx, my).map(|t| t.kind), Some(TileKind::Resource));
        }
    }

    #[test]
    fn generated_obstacles_avoid_starting_corners() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let grid = Grid::generate(&mut rng);
            for (x, y) in footprint(0, 0, 4).chain(footprint(8, 8, 4)) {
                let kind = grid.tile(x, y).map(|t| t.kind);
                assert!(
                    !matches!(kind, Some(TileKind::Obstacle | TileKind::Water)),
                    "blocked corner tile ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn mirror_maps_starting_bases_onto_each_other() {
        assert_eq!(mirror(1, 1, 2), (9, 9));
        assert_eq!(mirror(3, 1, 1), (8, 10));
        assert_eq!(checked_mirror(11, 0, 2), None);
        assert_eq!(checked_mirror(12, 0, 1), None);
    }

    #[test]
    fn footprint_must_fit_on_the_map() {
        let grid = Grid::default();
        assert!(grid.is_footprint_free(10, 10, 2));
        assert!(!grid.is_footprint_free(11, 10, 2));
    }
}

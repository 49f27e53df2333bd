//! Entity type table and the live unit/building records.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Player,
    Opponent,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Player => Side::Opponent,
            Side::Opponent => Side::Player,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Opponent => "opponent",
        }
    }
}

/// One value per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerSide<T> {
    pub player: T,
    pub opponent: T,
}

impl<T> PerSide<T> {
    pub fn new(player: T, opponent: T) -> Self {
        Self { player, opponent }
    }
}

impl<T> Index<Side> for PerSide<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::Player => &self.player,
            Side::Opponent => &self.opponent,
        }
    }
}

impl<T> IndexMut<Side> for PerSide<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Player => &mut self.player,
            Side::Opponent => &mut self.opponent,
        }
    }
}

/// Serial number within the owner's namespace. Both peers hand them out in
/// the same order, so an id names the same entity on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub owner: Side,
    pub id: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitKind {
    Worker,
    Soldier,
    Archer,
}

#[derive(Debug)]
pub struct UnitStats {
    pub name: &'static str,
    pub glyph: char,
    pub cost: u32,
    pub health: i32,
    pub attack: i32,
    pub range: u32,
    pub speed: u32,
    pub can_harvest: bool,
    pub can_build: bool,
}

const WORKER: UnitStats = UnitStats {
    name: "Worker",
    glyph: 'w',
    cost: 50,
    health: 40,
    attack: 5,
    range: 1,
    speed: 1,
    can_harvest: true,
    can_build: true,
};

const SOLDIER: UnitStats = UnitStats {
    name: "Soldier",
    glyph: 's',
    cost: 100,
    health: 80,
    attack: 15,
    range: 1,
    speed: 1,
    can_harvest: false,
    can_build: false,
};

const ARCHER: UnitStats = UnitStats {
    name: "Archer",
    glyph: 'a',
    cost: 125,
    health: 60,
    attack: 12,
    range: 3,
    speed: 1,
    can_harvest: false,
    can_build: false,
};

impl UnitKind {
    pub fn stats(self) -> &'static UnitStats {
        match self {
            UnitKind::Worker => &WORKER,
            UnitKind::Soldier => &SOLDIER,
            UnitKind::Archer => &ARCHER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildingKind {
    CommandCenter,
    Barracks,
    Range,
}

#[derive(Debug)]
pub struct BuildingStats {
    pub name: &'static str,
    pub glyph: char,
    pub cost: u32,
    pub health: i32,
    pub size: usize,
    pub produces: UnitKind,
    pub is_base: bool,
}

const COMMAND_CENTER: BuildingStats = BuildingStats {
    name: "Command Center",
    glyph: 'C',
    cost: 0,
    health: 500,
    size: 2,
    produces: UnitKind::Worker,
    is_base: true,
};

const BARRACKS: BuildingStats = BuildingStats {
    name: "Barracks",
    glyph: 'B',
    cost: 150,
    health: 300,
    size: 2,
    produces: UnitKind::Soldier,
    is_base: false,
};

const RANGE: BuildingStats = BuildingStats {
    name: "Range",
    glyph: 'R',
    cost: 200,
    health: 250,
    size: 2,
    produces: UnitKind::Archer,
    is_base: false,
};

impl BuildingKind {
    /// What a worker may put down. Command centers only come with the map.
    pub const BUILDABLE: [BuildingKind; 2] = [BuildingKind::Barracks, BuildingKind::Range];

    pub fn stats(self) -> &'static BuildingStats {
        match self {
            BuildingKind::CommandCenter => &COMMAND_CENTER,
            BuildingKind::Barracks => &BARRACKS,
            BuildingKind::Range => &RANGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub id: EntityId,
    pub kind: UnitKind,
    pub owner: Side,
    pub x: usize,
    pub y: usize,
    pub health: i32,
    pub is_harvesting: bool,
}

impl Unit {
    pub fn new(id: EntityId, kind: UnitKind, owner: Side, x: usize, y: usize) -> Self {
        Self {
            id,
            kind,
            owner,
            x,
            y,
            health: kind.stats().health,
            is_harvesting: false,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            owner: self.owner,
            id: self.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Building {
    pub id: EntityId,
    pub kind: BuildingKind,
    pub owner: Side,
    pub x: usize,
    pub y: usize,
    pub health: i32,
}

impl Building {
    pub fn new(id: EntityId, kind: BuildingKind, owner: Side, x: usize, y: usize) -> Self {
        Self {
            id,
            kind,
            owner,
            x,
            y,
            health: kind.stats().health,
        }
    }

    pub fn size(&self) -> usize {
        self.kind.stats().size
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            owner: self.owner,
            id: self.id,
        }
    }
}

/// Borrowed view of whatever sits on a tile.
#[derive(Debug, Clone, Copy)]
pub enum EntityView<'a> {
    Unit(&'a Unit),
    Building(&'a Building),
}

impl EntityView<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            EntityView::Unit(unit) => unit.kind.stats().name,
            EntityView::Building(building) => building.kind.stats().name,
        }
    }

    pub fn owner(&self) -> Side {
        match self {
            EntityView::Unit(unit) => unit.owner,
            EntityView::Building(building) => building.owner,
        }
    }

    pub fn health(&self) -> (i32, i32) {
        match self {
            EntityView::Unit(unit) => (unit.health, unit.kind.stats().health),
            EntityView::Building(building) => (building.health, building.kind.stats().health),
        }
    }
}

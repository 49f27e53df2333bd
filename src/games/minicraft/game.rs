use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{layout::Rect, Frame};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::entity::{
    Building, BuildingKind, EntityId, EntityRef, EntityView, PerSide, Side, Unit, UnitKind,
};
use super::map::{checked_mirror, distance, footprint, in_bounds, mirror, Grid, TileKind, GRID_SIZE};
use super::renderer::MiniCraftRenderer;
use crate::core::error::ActionError;
use crate::core::game::{Context, Game};
use crate::core::renderer::GameRenderer;
use crate::games::GameId;

pub const STARTING_RESOURCES: u32 = 50;
pub const HARVEST_INCOME: u32 = 5;
pub const INCOME_INTERVAL: Duration = Duration::from_millis(1500);
pub const ACTION_COOLDOWN: Duration = Duration::from_millis(300);

/// Coordinates are always the sender's own view of the board; the receiver
/// mirrors them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum MiniCraftMessage {
    BuildingPlaced {
        x: usize,
        y: usize,
        building_type: BuildingKind,
    },
    UnitMoved {
        unit_id: EntityId,
        from_x: usize,
        from_y: usize,
        to_x: usize,
        to_y: usize,
    },
    UnitAttacked {
        attacker_id: EntityId,
        target_id: EntityId,
        damage: i32,
        target_destroyed: bool,
    },
    UnitHarvesting {
        unit_id: EntityId,
        x: usize,
        y: usize,
    },
    UnitProduced {
        unit_type: UnitKind,
        x: usize,
        y: usize,
        building_id: EntityId,
    },
    GameOver {
        winner: Side,
    },
}

impl MiniCraftMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            MiniCraftMessage::BuildingPlaced { .. } => "building-placed",
            MiniCraftMessage::UnitMoved { .. } => "unit-moved",
            MiniCraftMessage::UnitAttacked { .. } => "unit-attacked",
            MiniCraftMessage::UnitHarvesting { .. } => "unit-harvesting",
            MiniCraftMessage::UnitProduced { .. } => "unit-produced",
            MiniCraftMessage::GameOver { .. } => "game-over",
        }
    }
}

/// What the next tile click means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    None,
    Move,
    Attack,
    Harvest,
    Build(BuildingKind),
}

/// Result of damage landing on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    pub remaining: i32,
    pub destroyed: bool,
    pub base_lost: bool,
}

/// Everything on the board. The grid and the per-side collections always
/// agree: every entity in a collection occupies exactly its tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniCraftState {
    pub grid: Grid,
    pub resources: PerSide<u32>,
    pub units: PerSide<Vec<Unit>>,
    pub buildings: PerSide<Vec<Building>>,
    next_id: PerSide<u32>,
    pub winner: Option<Side>,
}

impl Default for MiniCraftState {
    fn default() -> Self {
        Self::new_match(Grid::with_resources())
    }
}

/// Places a square given in the local player's frame onto `side`'s corner.
fn orient(side: Side, x: usize, y: usize, size: usize) -> (usize, usize) {
    match side {
        Side::Player => (x, y),
        Side::Opponent => mirror(x, y, size),
    }
}

impl MiniCraftState {
    /// Fresh match on the given terrain: a command center and a worker in
    /// each corner, 50 resources apiece.
    pub fn new_match(grid: Grid) -> Self {
        let mut state = Self {
            grid,
            resources: PerSide::new(STARTING_RESOURCES, STARTING_RESOURCES),
            units: PerSide::default(),
            buildings: PerSide::default(),
            next_id: PerSide::default(),
            winner: None,
        };
        for side in [Side::Player, Side::Opponent] {
            let (x, y) = orient(side, 1, 1, BuildingKind::CommandCenter.stats().size);
            state.add_building(side, BuildingKind::CommandCenter, x, y);
            let (x, y) = orient(side, 3, 1, 1);
            state.add_unit(side, UnitKind::Worker, x, y);
        }
        state
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    pub fn allocate(&mut self, side: Side) -> EntityId {
        let id = EntityId(self.next_id[side]);
        self.next_id[side] += 1;
        id
    }

    pub fn add_unit(&mut self, side: Side, kind: UnitKind, x: usize, y: usize) -> EntityRef {
        let id = self.allocate(side);
        self.insert_unit(Unit::new(id, kind, side, x, y))
    }

    pub fn add_building(&mut self, side: Side, kind: BuildingKind, x: usize, y: usize) -> EntityRef {
        let id = self.allocate(side);
        self.insert_building(Building::new(id, kind, side, x, y))
    }

    fn insert_unit(&mut self, unit: Unit) -> EntityRef {
        let entity = unit.entity_ref();
        self.grid.occupy(unit.x, unit.y, 1, entity);
        self.units[unit.owner].push(unit);
        entity
    }

    fn insert_building(&mut self, building: Building) -> EntityRef {
        let entity = building.entity_ref();
        self.grid.occupy(building.x, building.y, building.size(), entity);
        self.buildings[building.owner].push(building);
        entity
    }

    pub fn unit(&self, entity: EntityRef) -> Option<&Unit> {
        self.units[entity.owner].iter().find(|u| u.id == entity.id)
    }

    pub fn unit_mut(&mut self, entity: EntityRef) -> Option<&mut Unit> {
        self.units[entity.owner].iter_mut().find(|u| u.id == entity.id)
    }

    pub fn building(&self, entity: EntityRef) -> Option<&Building> {
        self.buildings[entity.owner].iter().find(|b| b.id == entity.id)
    }

    pub fn building_mut(&mut self, entity: EntityRef) -> Option<&mut Building> {
        self.buildings[entity.owner].iter_mut().find(|b| b.id == entity.id)
    }

    pub fn entity(&self, entity: EntityRef) -> Option<EntityView<'_>> {
        self.unit(entity)
            .map(EntityView::Unit)
            .or_else(|| self.building(entity).map(EntityView::Building))
    }

    pub fn entity_at(&self, x: usize, y: usize) -> Option<EntityView<'_>> {
        self.grid.entity_at(x, y).and_then(|entity| self.entity(entity))
    }

    /// Walks a unit to (x, y). Moving always ends a harvest. Returns where it
    /// came from.
    pub fn move_unit(&mut self, entity: EntityRef, x: usize, y: usize) -> Option<(usize, usize)> {
        let unit = self.unit_mut(entity)?;
        let from = (unit.x, unit.y);
        unit.x = x;
        unit.y = y;
        unit.is_harvesting = false;
        self.grid.vacate(from.0, from.1, 1);
        self.grid.occupy(x, y, 1, entity);
        Some(from)
    }

    /// Lands flat damage on an entity, removing it at zero health or when
    /// `force_destroy` is set.
    pub fn strike(&mut self, target: EntityRef, damage: i32, force_destroy: bool) -> Option<Strike> {
        let remaining = if let Some(unit) = self.unit_mut(target) {
            unit.health -= damage;
            unit.health
        } else {
            let building = self.building_mut(target)?;
            building.health -= damage;
            building.health
        };
        let destroyed = remaining <= 0 || force_destroy;
        let base_lost = destroyed && self.destroy(target);
        Some(Strike {
            remaining,
            destroyed,
            base_lost,
        })
    }

    /// Removes an entity from its owner's collection and clears its tiles.
    /// Returns whether it was a base.
    pub fn destroy(&mut self, target: EntityRef) -> bool {
        let units = &mut self.units[target.owner];
        if let Some(pos) = units.iter().position(|u| u.id == target.id) {
            let unit = units.remove(pos);
            self.grid.vacate(unit.x, unit.y, 1);
            return false;
        }
        let buildings = &mut self.buildings[target.owner];
        if let Some(pos) = buildings.iter().position(|b| b.id == target.id) {
            let building = buildings.remove(pos);
            self.grid.vacate(building.x, building.y, building.size());
            return building.kind.stats().is_base;
        }
        false
    }

    pub fn harvesting_workers(&self, side: Side) -> usize {
        self.units[side]
            .iter()
            .filter(|u| u.kind == UnitKind::Worker && u.is_harvesting)
            .count()
    }

    fn collect_income(&mut self) {
        for side in [Side::Player, Side::Opponent] {
            self.resources[side] += self.harvesting_workers(side) as u32 * HARVEST_INCOME;
        }
    }
}

#[derive(Debug, Default)]
pub struct MiniCraft {
    state: MiniCraftState,
    selected: Option<EntityRef>,
    mode: Mode,
    busy_until: Option<Instant>,
    income_due: Option<Instant>,
    cursor: (usize, usize),
    status: String,
    visible: bool,
    initialized: bool,
}

impl MiniCraft {
    pub fn with_state(state: MiniCraftState) -> Self {
        Self {
            state,
            initialized: true,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &MiniCraftState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn selected(&self) -> Option<EntityRef> {
        self.selected
    }

    pub fn selected_entity(&self) -> Option<EntityView<'_>> {
        self.selected.and_then(|entity| self.state.entity(entity))
    }

    pub fn is_busy(&self, now: Instant) -> bool {
        self.busy_until.is_some_and(|until| now < until)
    }

    fn selected_unit(&self) -> Option<&Unit> {
        self.selected.and_then(|entity| self.state.unit(entity))
    }

    fn ensure_ready(&self, now: Instant) -> Result<(), ActionError> {
        if self.state.is_over() {
            return Err(ActionError::GameOver);
        }
        if self.is_busy(now) {
            return Err(ActionError::Cooldown);
        }
        Ok(())
    }

    /// Whole footprint on open, unoccupied ground and one of our workers
    /// standing next to the anchor tile.
    pub fn is_tile_buildable(&self, x: usize, y: usize, kind: BuildingKind) -> bool {
        let size = kind.stats().size;
        let clear = footprint(x, y, size).all(|(fx, fy)| {
            self.state
                .grid
                .tile(fx, fy)
                .is_some_and(|tile| tile.kind == TileKind::Empty && tile.entity.is_none())
        });
        clear
            && self.state.units[Side::Player]
                .iter()
                .any(|u| u.kind.stats().can_build && distance(u.x, u.y, x, y) <= 1)
    }

    fn is_legal_target(&self, mode: Mode, unit: &Unit, x: usize, y: usize) -> bool {
        let stats = unit.kind.stats();
        let reach = distance(unit.x, unit.y, x, y);
        match mode {
            Mode::Move => reach <= stats.speed && self.state.grid.is_passable(x, y),
            Mode::Attack => {
                reach <= stats.range
                    && self
                        .state
                        .grid
                        .entity_at(x, y)
                        .is_some_and(|target| target.owner != unit.owner)
            }
            Mode::Harvest => {
                reach <= 1
                    && self
                        .state
                        .grid
                        .tile(x, y)
                        .is_some_and(|tile| tile.kind == TileKind::Resource)
            }
            Mode::None | Mode::Build(_) => false,
        }
    }

    /// Tiles the pending action may be committed to.
    pub fn legal_targets(&self) -> Vec<(usize, usize)> {
        match self.mode {
            Mode::None => Vec::new(),
            Mode::Build(kind) => Grid::positions()
                .filter(|&(x, y)| self.is_tile_buildable(x, y, kind))
                .collect(),
            mode => match self.selected_unit() {
                Some(unit) => Grid::positions()
                    .filter(|&(x, y)| self.is_legal_target(mode, unit, x, y))
                    .collect(),
                None => Vec::new(),
            },
        }
    }

    /// A click on the map: commits the pending action when the tile is a
    /// legal target, otherwise selects whatever stands there.
    pub fn click_tile(&mut self, x: usize, y: usize, ctx: &Context<'_>) -> Result<(), ActionError> {
        self.ensure_ready(ctx.now())?;
        if !in_bounds(x, y) {
            return Err(ActionError::InvalidTarget);
        }

        if let Mode::Build(kind) = self.mode {
            if self.is_tile_buildable(x, y, kind) {
                return self.place_building(x, y, kind, ctx);
            }
        }

        let committed = match (self.mode, self.selected_unit()) {
            (mode @ (Mode::Move | Mode::Attack | Mode::Harvest), Some(unit)) => {
                self.is_legal_target(mode, unit, x, y).then_some(mode)
            }
            _ => None,
        };
        if let Some(mode) = committed {
            self.mode = Mode::None;
            return match mode {
                Mode::Move => self.execute_move(x, y, ctx),
                Mode::Attack => self.execute_attack(x, y, ctx),
                _ => self.execute_harvest(x, y, ctx),
            };
        }

        self.select_at(x, y);
        Ok(())
    }

    fn select_at(&mut self, x: usize, y: usize) {
        self.mode = Mode::None;
        self.selected = self.state.grid.entity_at(x, y);
        self.status = match self.selected_entity() {
            Some(entity) if entity.owner() == Side::Player => {
                format!("Selected your {}. Choose an action.", entity.name())
            }
            Some(entity) => format!("Selected {}'s {}", entity.owner().label(), entity.name()),
            None => String::new(),
        };
    }

    /// Arms move, attack or harvest for the selected unit.
    pub fn begin_action(&mut self, mode: Mode, now: Instant) -> Result<(), ActionError> {
        if let Mode::Build(kind) = mode {
            return self.start_building_placement(kind, now);
        }
        self.ensure_ready(now)?;
        let entity = self.selected_entity().ok_or(ActionError::NothingSelected)?;
        if entity.owner() != Side::Player {
            return Err(ActionError::NotYourUnit);
        }
        let status = match (mode, entity) {
            (Mode::Move, EntityView::Building(_)) => {
                return Err(ActionError::Incapable("Buildings cannot move"))
            }
            (Mode::Attack, EntityView::Building(_)) => {
                return Err(ActionError::Incapable("Buildings cannot attack"))
            }
            (Mode::Harvest, EntityView::Unit(unit)) if unit.kind.stats().can_harvest => {
                "Select a resource to harvest"
            }
            (Mode::Harvest, _) => {
                return Err(ActionError::Incapable("This unit cannot harvest resources"))
            }
            (Mode::Move, _) => "Select a destination",
            (Mode::Attack, _) => "Select a target",
            (Mode::None | Mode::Build(_), _) => "",
        };
        self.mode = mode;
        self.status = status.to_string();
        Ok(())
    }

    pub fn start_building_placement(
        &mut self,
        kind: BuildingKind,
        now: Instant,
    ) -> Result<(), ActionError> {
        self.ensure_ready(now)?;
        let entity = self.selected_entity().ok_or(ActionError::NothingSelected)?;
        if entity.owner() != Side::Player {
            return Err(ActionError::NotYourUnit);
        }
        if !matches!(entity, EntityView::Unit(unit) if unit.kind.stats().can_build) {
            return Err(ActionError::Incapable("Only workers can build"));
        }
        if !BuildingKind::BUILDABLE.contains(&kind) {
            return Err(ActionError::Incapable("Command centers cannot be built"));
        }
        let stats = kind.stats();
        if self.state.resources[Side::Player] < stats.cost {
            return Err(ActionError::NotEnoughResources { needed: stats.cost });
        }
        self.mode = Mode::Build(kind);
        self.status = format!("Select a location to build {}", stats.name);
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.mode = Mode::None;
        self.status.clear();
    }

    /// Puts down a building for the local player. The site is checked before
    /// the price, and nothing changes unless both pass.
    pub fn place_building(
        &mut self,
        x: usize,
        y: usize,
        kind: BuildingKind,
        ctx: &Context<'_>,
    ) -> Result<(), ActionError> {
        if self.state.is_over() {
            return Err(ActionError::GameOver);
        }
        if !self.is_tile_buildable(x, y, kind) {
            return Err(ActionError::NoBuildSite);
        }
        let stats = kind.stats();
        let funds = &mut self.state.resources[Side::Player];
        if *funds < stats.cost {
            return Err(ActionError::NotEnoughResources { needed: stats.cost });
        }
        *funds -= stats.cost;
        self.state.add_building(Side::Player, kind, x, y);
        self.mode = Mode::None;
        self.status = format!("{} built", stats.name);
        info!(x, y, kind = stats.name, "building placed");
        ctx.send(MiniCraftMessage::BuildingPlaced {
            x,
            y,
            building_type: kind,
        });
        Ok(())
    }

    /// Trains the selected building's unit on the tile just below it.
    pub fn produce_unit(&mut self, ctx: &Context<'_>) -> Result<(), ActionError> {
        self.ensure_ready(ctx.now())?;
        let building = match self.selected_entity().ok_or(ActionError::NothingSelected)? {
            EntityView::Building(building) if building.owner == Side::Player => building,
            EntityView::Building(_) => return Err(ActionError::NotYourUnit),
            EntityView::Unit(_) => return Err(ActionError::Incapable("Only buildings produce units")),
        };
        let building_id = building.id;
        let kind = building.kind.stats().produces;
        let (x, y) = (building.x, building.y + building.size());
        let stats = kind.stats();

        if self.state.resources[Side::Player] < stats.cost {
            return Err(ActionError::NotEnoughResources { needed: stats.cost });
        }
        if !in_bounds(x, y) || self.state.grid.entity_at(x, y).is_some() {
            return Err(ActionError::NoSpace);
        }

        self.state.resources[Side::Player] -= stats.cost;
        self.state.add_unit(Side::Player, kind, x, y);
        self.status = format!("{} produced!", stats.name);
        ctx.send(MiniCraftMessage::UnitProduced {
            unit_type: kind,
            x,
            y,
            building_id,
        });
        Ok(())
    }

    fn execute_move(&mut self, x: usize, y: usize, ctx: &Context<'_>) -> Result<(), ActionError> {
        let entity = self.selected.ok_or(ActionError::NothingSelected)?;
        let (from_x, from_y) = self
            .state
            .move_unit(entity, x, y)
            .ok_or(ActionError::NothingSelected)?;
        self.busy_until = Some(ctx.now() + ACTION_COOLDOWN);
        self.status.clear();
        ctx.send(MiniCraftMessage::UnitMoved {
            unit_id: entity.id,
            from_x,
            from_y,
            to_x: x,
            to_y: y,
        });
        Ok(())
    }

    fn execute_attack(&mut self, x: usize, y: usize, ctx: &Context<'_>) -> Result<(), ActionError> {
        let attacker = self.selected_unit().ok_or(ActionError::NothingSelected)?;
        let (attacker_id, damage) = (attacker.id, attacker.kind.stats().attack);
        let target = self.state.grid.entity_at(x, y).ok_or(ActionError::InvalidTarget)?;
        let strike = self
            .state
            .strike(target, damage, false)
            .ok_or(ActionError::InvalidTarget)?;

        if strike.destroyed && self.selected == Some(target) {
            self.selected = None;
        }
        self.busy_until = Some(ctx.now() + ACTION_COOLDOWN);
        self.status = if strike.destroyed {
            "Target destroyed!".to_string()
        } else {
            format!("Hit for {damage}")
        };
        debug!(target = target.id.0, damage, destroyed = strike.destroyed, "attack landed");
        ctx.send(MiniCraftMessage::UnitAttacked {
            attacker_id,
            target_id: target.id,
            damage,
            target_destroyed: strike.destroyed,
        });
        if strike.base_lost {
            self.game_over(target.owner.opposite(), ctx, true);
        }
        Ok(())
    }

    fn execute_harvest(&mut self, x: usize, y: usize, ctx: &Context<'_>) -> Result<(), ActionError> {
        let entity = self.selected.ok_or(ActionError::NothingSelected)?;
        let unit = self.state.unit_mut(entity).ok_or(ActionError::NothingSelected)?;
        unit.is_harvesting = true;
        self.status = "Worker is now harvesting resources".to_string();
        ctx.send(MiniCraftMessage::UnitHarvesting {
            unit_id: entity.id,
            x,
            y,
        });
        Ok(())
    }

    fn game_over(&mut self, winner: Side, ctx: &Context<'_>, broadcast: bool) {
        self.state.winner = Some(winner);
        self.income_due = None;
        self.mode = Mode::None;
        info!(winner = winner.label(), "minicraft game over");
        if broadcast {
            ctx.send(MiniCraftMessage::GameOver { winner });
        }
    }

    /// Discards everything and starts over on the given terrain.
    pub fn restart(&mut self, grid: Grid, ctx: &Context<'_>) {
        self.state = MiniCraftState::new_match(grid);
        self.selected = None;
        self.mode = Mode::None;
        self.busy_until = None;
        self.status.clear();
        self.income_due = self.visible.then(|| ctx.now() + INCOME_INTERVAL);
        self.initialized = true;
    }

    fn move_cursor(&mut self, dx: isize, dy: isize) {
        let (x, y) = self.cursor;
        let nx = x as isize + dx;
        let ny = y as isize + dy;
        if (0..GRID_SIZE as isize).contains(&nx) && (0..GRID_SIZE as isize).contains(&ny) {
            self.cursor = (nx as usize, ny as usize);
        }
    }

    fn apply_remote_building(&mut self, x: usize, y: usize, kind: BuildingKind) {
        // The serial is spent even if the building cannot land here, so ids
        // stay aligned with the sender.
        let id = self.state.allocate(Side::Opponent);
        let stats = kind.stats();
        match checked_mirror(x, y, stats.size) {
            Some((mx, my)) if self.state.grid.is_footprint_free(mx, my, stats.size) => {
                self.state
                    .insert_building(Building::new(id, kind, Side::Opponent, mx, my));
                let funds = &mut self.state.resources[Side::Opponent];
                *funds = funds.saturating_sub(stats.cost);
            }
            _ => warn!(x, y, kind = stats.name, "peer building does not fit here, skipped"),
        }
    }

    fn apply_remote_unit(&mut self, x: usize, y: usize, kind: UnitKind) {
        let id = self.state.allocate(Side::Opponent);
        let stats = kind.stats();
        match checked_mirror(x, y, 1) {
            Some((mx, my)) if self.state.grid.is_footprint_free(mx, my, 1) => {
                self.state
                    .insert_unit(Unit::new(id, kind, Side::Opponent, mx, my));
                let funds = &mut self.state.resources[Side::Opponent];
                *funds = funds.saturating_sub(stats.cost);
            }
            _ => warn!(x, y, kind = stats.name, "peer unit has no room here, skipped"),
        }
    }
}

impl Game for MiniCraft {
    type Message = MiniCraftMessage;

    const ID: GameId = GameId::MiniCraft;

    fn initialize(&mut self, ctx: &Context<'_>) {
        if self.initialized {
            return;
        }
        self.restart(Grid::generate(&mut rand::rng()), ctx);
    }

    fn start_new_game(&mut self, ctx: &Context<'_>) {
        self.reset(ctx);
    }

    fn handle_peer_data(&mut self, msg: MiniCraftMessage, ctx: &Context<'_>) {
        match msg {
            MiniCraftMessage::BuildingPlaced {
                x,
                y,
                building_type,
            } => self.apply_remote_building(x, y, building_type),
            MiniCraftMessage::UnitProduced { unit_type, x, y, .. } => {
                self.apply_remote_unit(x, y, unit_type)
            }
            MiniCraftMessage::UnitMoved {
                unit_id, to_x, to_y, ..
            } => {
                let entity = EntityRef {
                    owner: Side::Opponent,
                    id: unit_id,
                };
                let destination = checked_mirror(to_x, to_y, 1).filter(|&(x, y)| {
                    self.state
                        .grid
                        .tile(x, y)
                        .is_some_and(|tile| tile.entity.is_none_or(|e| e == entity))
                });
                match destination {
                    Some((x, y)) if self.state.unit(entity).is_some() => {
                        self.state.move_unit(entity, x, y);
                    }
                    _ => warn!(unit = unit_id.0, to_x, to_y, "peer move cannot be applied"),
                }
            }
            MiniCraftMessage::UnitAttacked {
                target_id,
                damage,
                target_destroyed,
                ..
            } => {
                let target = EntityRef {
                    owner: Side::Player,
                    id: target_id,
                };
                match self.state.strike(target, damage, target_destroyed) {
                    Some(strike) => {
                        if strike.destroyed && self.selected == Some(target) {
                            self.selected = None;
                        }
                        if strike.base_lost {
                            // The attacker announces the result itself.
                            self.game_over(Side::Opponent, ctx, false);
                        }
                    }
                    None => debug!(target = target_id.0, "peer attacked an entity we no longer have"),
                }
            }
            MiniCraftMessage::UnitHarvesting { unit_id, .. } => {
                let entity = EntityRef {
                    owner: Side::Opponent,
                    id: unit_id,
                };
                match self.state.unit_mut(entity) {
                    Some(unit) => unit.is_harvesting = true,
                    None => warn!(unit = unit_id.0, "peer harvest for unknown unit"),
                }
            }
            MiniCraftMessage::GameOver { winner } => {
                self.game_over(winner.opposite(), ctx, false);
            }
        }
    }

    fn reset(&mut self, ctx: &Context<'_>) {
        self.restart(Grid::generate(&mut rand::rng()), ctx);
    }

    fn show(&mut self, ctx: &Context<'_>) {
        self.visible = true;
        if !self.state.is_over() {
            self.income_due = Some(ctx.now() + INCOME_INTERVAL);
        }
    }

    fn hide(&mut self, _ctx: &Context<'_>) {
        self.visible = false;
        self.income_due = None;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn on_tick(&mut self, ctx: &Context<'_>) {
        let now = ctx.now();
        if self.busy_until.is_some_and(|until| now >= until) {
            self.busy_until = None;
        }
        let Some(mut due) = self.income_due else {
            return;
        };
        while due <= now {
            if self.state.is_over() {
                self.income_due = None;
                return;
            }
            self.state.collect_income();
            due += INCOME_INTERVAL;
        }
        self.income_due = Some(due);
    }

    fn handle_key(&mut self, key: KeyEvent, ctx: &Context<'_>) -> Result<(), ActionError> {
        match key.code {
            KeyCode::Left => self.move_cursor(-1, 0),
            KeyCode::Right => self.move_cursor(1, 0),
            KeyCode::Up => self.move_cursor(0, -1),
            KeyCode::Down => self.move_cursor(0, 1),
            KeyCode::Enter | KeyCode::Char(' ') => {
                let (x, y) = self.cursor;
                return self.click_tile(x, y, ctx);
            }
            KeyCode::Char('m') => return self.begin_action(Mode::Move, ctx.now()),
            KeyCode::Char('a') => return self.begin_action(Mode::Attack, ctx.now()),
            KeyCode::Char('h') => return self.begin_action(Mode::Harvest, ctx.now()),
            KeyCode::Char('b') => return self.start_building_placement(BuildingKind::Barracks, ctx.now()),
            KeyCode::Char('g') => return self.start_building_placement(BuildingKind::Range, ctx.now()),
            KeyCode::Char('u') => return self.produce_unit(ctx),
            KeyCode::Char('c') => self.cancel(),
            _ => {}
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        MiniCraftRenderer::render(frame, area, self);
    }
}

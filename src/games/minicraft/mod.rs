pub mod entity;
pub mod game;
pub mod map;
pub mod renderer;

pub use entity::{BuildingKind, EntityId, EntityRef, PerSide, Side, UnitKind};
pub use game::{MiniCraft, MiniCraftMessage, MiniCraftState, Mode};
pub use map::{Grid, GRID_SIZE};

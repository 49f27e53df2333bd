pub mod game;
pub mod renderer;

pub use game::{ordered_deck, shuffled_deck, Card, MemoryGame, MemoryMessage, MemoryState};

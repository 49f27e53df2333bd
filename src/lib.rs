pub mod core {
    pub mod connection;
    pub mod engine;
    pub mod error;
    pub mod game;
    pub mod lobby;
    pub mod network;
    pub mod protocol;
    pub mod renderer;
    pub mod session;
    pub mod timer;
}

pub mod cli;
pub mod games;

// Re-export for convenience
pub use crate::core::game::{Context, Game};

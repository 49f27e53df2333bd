pub mod instructions;
pub mod macros;
pub mod manager;
pub mod memory;
pub mod minicraft;
pub mod tictactoe;

pub use manager::GameManager;

use crate::register_games;

/// Metadata about a game
#[derive(Clone, Debug)]
pub struct GameInfo {
    pub id: GameId,
    pub name: &'static str,
    pub description: &'static str,
}

// Register all games here - menu order follows declaration order
register_games! {
    TicTacToe => {
        module: tictactoe,
        game: TicTacToe,
        message: TicTacToeMessage,
        id: "tictactoe",
        name: "Tic-Tac-Toe",
        description: "Three in a row. The host plays X and moves first"
    },
    Memory => {
        module: memory,
        game: MemoryGame,
        message: MemoryMessage,
        id: "memory",
        name: "Memory",
        description: "Flip cards, match pairs, keep your turn on a match"
    },
    MiniCraft => {
        module: minicraft,
        game: MiniCraft,
        message: MiniCraftMessage,
        id: "minicraft",
        name: "MiniCraft",
        description: "Tiny real-time strategy: harvest, build, destroy their base"
    }
}

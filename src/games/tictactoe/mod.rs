pub mod game;
pub mod renderer;

pub use game::{Board, Mark, Outcome, TicTacToe, TicTacToeMessage, TicTacToeState};

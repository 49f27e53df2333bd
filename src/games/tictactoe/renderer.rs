use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use super::game::{Mark, Outcome, TicTacToe};
use crate::core::renderer::{centered, frame_game, GameRenderer};

#[derive(Debug)]
pub struct TicTacToeRenderer;

impl GameRenderer<TicTacToe> for TicTacToeRenderer {
    fn render(frame: &mut Frame, area: Rect, game: &TicTacToe) {
        let state = game.state();
        let status = match state.outcome {
            Some(Outcome::X) => "X wins!".to_string(),
            Some(Outcome::O) => "O wins!".to_string(),
            Some(Outcome::Draw) => "Game ended in a draw!".to_string(),
            None if state.is_my_turn => format!("Your turn ({})", state.my_mark().symbol()),
            None => "Opponent's turn".to_string(),
        };
        let board_area = frame_game(
            frame,
            area,
            "Tic-Tac-Toe",
            &status,
            "[←↑↓→] Move  [Enter] Place  [n] New game  [?] Rules",
        );

        let [score_area, grid_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(board_area);
        frame.render_widget(
            Paragraph::new(format!(
                "X: {}  O: {}  Games: {}",
                state.score_x, state.score_o, state.games_played
            ))
            .centered(),
            score_area,
        );

        let grid = centered(grid_area, 3 * 7, 3 * 3);
        let rows = Layout::vertical([Constraint::Length(3); 3]).split(grid);
        for (row, row_area) in rows.iter().enumerate() {
            let cells = Layout::horizontal([Constraint::Length(7); 3]).split(*row_area);
            for (col, cell_area) in cells.iter().enumerate() {
                let index = row * 3 + col;
                let mark = state.board.get(index);
                let mut style = match mark {
                    Mark::X => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    Mark::O => Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
                    Mark::Empty => Style::default(),
                };
                let mut border = Style::default().fg(Color::DarkGray);
                if index == game.cursor() {
                    border = Style::default().fg(Color::Yellow);
                    style = style.bg(Color::DarkGray);
                }
                frame.render_widget(
                    Paragraph::new(mark.symbol())
                        .style(style)
                        .centered()
                        .block(Block::default().borders(Borders::ALL).border_style(border)),
                    *cell_area,
                );
            }
        }
    }
}

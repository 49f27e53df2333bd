use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use super::game::{MemoryGame, COLUMNS};
use crate::core::renderer::{centered, frame_game, GameRenderer};

const CARD_WIDTH: u16 = 8;
const CARD_HEIGHT: u16 = 3;

#[derive(Debug)]
pub struct MemoryRenderer;

impl GameRenderer<MemoryGame> for MemoryRenderer {
    fn render(frame: &mut Frame, area: Rect, game: &MemoryGame) {
        let state = game.state();
        let status = if state.game_complete {
            let verdict = match state.player_score.cmp(&state.opponent_score) {
                std::cmp::Ordering::Greater => "You win!",
                std::cmp::Ordering::Less => "Opponent wins. Try again!",
                std::cmp::Ordering::Equal => "It's a tie!",
            };
            format!("Game complete! {verdict}")
        } else if state.player_turn {
            "Your turn! Find matching pairs.".to_string()
        } else {
            "Opponent's turn.".to_string()
        };
        let board_area = frame_game(
            frame,
            area,
            "Memory",
            &status,
            "[←↑↓→] Move  [Enter] Flip  [n] New game  [?] Rules",
        );

        let [score_area, grid_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(board_area);
        frame.render_widget(
            Paragraph::new(format!(
                "You: {}  Opponent: {}  Moves: {}  Games: {}",
                state.player_score, state.opponent_score, state.moves, state.total_games
            ))
            .centered(),
            score_area,
        );

        let rows = state.cards.len().div_ceil(COLUMNS);
        let grid = centered(
            grid_area,
            CARD_WIDTH * COLUMNS as u16,
            CARD_HEIGHT * rows as u16,
        );
        let row_areas = Layout::vertical(vec![Constraint::Length(CARD_HEIGHT); rows]).split(grid);
        for (index, card) in state.cards.iter().enumerate() {
            let row = Layout::horizontal([Constraint::Length(CARD_WIDTH); COLUMNS])
                .split(row_areas[index / COLUMNS]);
            let face_up = card.matched || state.flipped.contains(&index);
            let label = if face_up {
                card.symbol.to_string()
            } else {
                "?".to_string()
            };
            let fill = if card.matched {
                Style::default().fg(Color::Green)
            } else if face_up {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::Blue)
            };
            let border = if index == game.cursor() {
                Style::default().fg(Color::Yellow)
            } else {
                fill
            };
            frame.render_widget(
                Paragraph::new(label)
                    .style(fill)
                    .centered()
                    .block(Block::default().borders(Borders::ALL).border_style(border)),
                row[index % COLUMNS],
            );
        }
    }
}

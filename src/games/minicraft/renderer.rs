use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use super::entity::{BuildingKind, EntityView, Side};
use super::game::{MiniCraft, Mode};
use super::map::{TileKind, GRID_SIZE};
use crate::core::renderer::{centered, frame_game, GameRenderer};

const TILE_WIDTH: u16 = 3;
const PANEL_WIDTH: u16 = 30;

#[derive(Debug)]
pub struct MiniCraftRenderer;

impl GameRenderer<MiniCraft> for MiniCraftRenderer {
    fn render(frame: &mut Frame, area: Rect, game: &MiniCraft) {
        let state = game.state();
        let status = match state.winner {
            Some(Side::Player) => "Victory! The enemy base has fallen.".to_string(),
            Some(Side::Opponent) => "Defeat! Your command center was destroyed.".to_string(),
            None if !game.status().is_empty() => game.status().to_string(),
            None => "Select a unit or building".to_string(),
        };
        let board_area = frame_game(
            frame,
            area,
            "MiniCraft",
            &status,
            "[←↑↓→] Cursor  [Enter] Select  [m]ove [a]ttack [h]arvest [c]ancel  [b]arracks ran[g]e [u]nit",
        );

        let [map_area, panel_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(PANEL_WIDTH)]).areas(board_area);

        let targets = game.legal_targets();
        let map_rect = centered(map_area, TILE_WIDTH * GRID_SIZE as u16 + 2, GRID_SIZE as u16 + 2);
        let lines: Vec<Line> = (0..GRID_SIZE)
            .map(|y| {
                Line::from(
                    (0..GRID_SIZE)
                        .map(|x| Self::tile_span(game, x, y, targets.contains(&(x, y))))
                        .collect::<Vec<_>>(),
                )
            })
            .collect();
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Map ")),
            map_rect,
        );

        frame.render_widget(
            Paragraph::new(Self::panel_lines(game))
                .block(Block::default().borders(Borders::ALL).title(" Command ")),
            panel_area,
        );
    }
}

impl MiniCraftRenderer {
    fn tile_span(game: &MiniCraft, x: usize, y: usize, highlighted: bool) -> Span<'static> {
        let state = game.state();
        let Some(tile) = state.grid.tile(x, y) else {
            return Span::raw("   ");
        };
        let (glyph, mut style) = match state.entity_at(x, y) {
            Some(entity) => {
                let glyph = match entity {
                    EntityView::Unit(unit) => unit.kind.stats().glyph,
                    EntityView::Building(building) => building.kind.stats().glyph,
                };
                let color = match entity.owner() {
                    Side::Player => Color::LightGreen,
                    Side::Opponent => Color::LightRed,
                };
                (glyph, Style::default().fg(color).add_modifier(Modifier::BOLD))
            }
            None => match tile.kind {
                TileKind::Empty => ('·', Style::default().fg(Color::DarkGray)),
                TileKind::Resource => ('◆', Style::default().fg(Color::Cyan)),
                TileKind::Obstacle => ('▲', Style::default().fg(Color::Gray)),
                TileKind::Water => ('~', Style::default().fg(Color::Blue)),
            },
        };
        if game.selected().is_some_and(|s| Some(s) == tile.entity) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        if highlighted {
            style = style.bg(Color::Rgb(40, 70, 40));
        }
        if game.cursor() == (x, y) {
            style = style.bg(Color::Yellow).fg(Color::Black);
        }
        Span::styled(format!(" {glyph} "), style)
    }

    fn panel_lines(game: &MiniCraft) -> Vec<Line<'static>> {
        let state = game.state();
        let mut lines = vec![
            Line::from(format!("Crystals: {}", state.resources[Side::Player])),
            Line::from(format!("Enemy:    {}", state.resources[Side::Opponent])),
            Line::from(""),
        ];

        match game.selected_entity() {
            Some(entity) => {
                let (health, max) = entity.health();
                lines.push(Line::from(format!("{} ({})", entity.name(), entity.owner().label())).bold());
                lines.push(Line::from(format!("HP {health}/{max}")));
                match entity {
                    EntityView::Unit(unit) => {
                        let stats = unit.kind.stats();
                        lines.push(Line::from(format!(
                            "ATK {}  RNG {}  SPD {}",
                            stats.attack, stats.range, stats.speed
                        )));
                        if unit.is_harvesting {
                            lines.push(Line::from("Harvesting").fg(Color::Cyan));
                        }
                        if stats.can_build && unit.owner == Side::Player {
                            lines.push(Line::from(""));
                            for kind in BuildingKind::BUILDABLE {
                                let b = kind.stats();
                                let key = if kind == BuildingKind::Barracks { 'b' } else { 'g' };
                                let line = Line::from(format!("[{key}] {} ({})", b.name, b.cost));
                                lines.push(if state.resources[Side::Player] >= b.cost {
                                    line
                                } else {
                                    line.fg(Color::DarkGray)
                                });
                            }
                        }
                    }
                    EntityView::Building(building) if building.owner == Side::Player => {
                        let unit = building.kind.stats().produces.stats();
                        lines.push(Line::from(format!("[u] Train {} ({})", unit.name, unit.cost)));
                    }
                    EntityView::Building(_) => {}
                }
            }
            None => lines.push(Line::from("Nothing selected").fg(Color::DarkGray)),
        }

        let mode = match game.mode() {
            Mode::None => None,
            Mode::Move => Some("Moving".to_string()),
            Mode::Attack => Some("Attacking".to_string()),
            Mode::Harvest => Some("Harvesting".to_string()),
            Mode::Build(kind) => Some(format!("Placing {}", kind.stats().name)),
        };
        if let Some(mode) = mode {
            lines.push(Line::from(""));
            lines.push(Line::from(mode).fg(Color::Yellow));
        }

        let (x, y) = game.cursor();
        if let Some(tile) = state.grid.tile(x, y) {
            lines.push(Line::from(""));
            lines.push(Line::from(format!("({x},{y}) {}", tile.kind.name())).fg(Color::Gray));
        }
        lines
    }
}

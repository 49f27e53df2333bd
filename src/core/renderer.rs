/// Renderer contract shared by the games
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Draws one game's state into the area the session hands it.
pub trait GameRenderer<G> {
    fn render(frame: &mut Frame, area: Rect, game: &G);
}

/// Standard game layout: title, status line, board, footer with key help.
/// Returns the board area.
pub fn frame_game(frame: &mut Frame, area: Rect, title: &str, status: &str, help: &str) -> Rect {
    let [title_area, status_area, board_area, help_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new(title)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .centered(),
        title_area,
    );
    frame.render_widget(
        Paragraph::new(status)
            .block(Block::default().borders(Borders::ALL).title(" Status "))
            .style(Style::default().fg(Color::Yellow)),
        status_area,
    );
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::Gray)).centered(),
        help_area,
    );
    board_area
}

/// Centered rect of the given size, clamped to `area`.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    cell
}

/// Modal dialog with static text, drawn over whatever is below.
pub fn rules_modal(frame: &mut Frame, title: &str, lines: Vec<Line<'_>>) {
    let area = centered(frame.area(), 70, 24);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {title} "))
                    .title_bottom(" [?] Got it! "),
            ),
        area,
    );
}

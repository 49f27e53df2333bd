use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyResult {
    Host,
    Join(String), // Session code
    Solo,
    Quit,
}

const OPTIONS: [(&str, &str); 4] = [
    ("Create session", "Host a timer and share the code with a friend"),
    ("Join session", "Paste a friend's session code"),
    ("Timer only", "Solo mode, games run locally"),
    ("Quit", ""),
];

/// Welcome screen shown when no subcommand was given.
pub struct LobbyManager {
    pub selected: usize,
    pub input_mode: bool,
    pub code_input: String,
}

impl LobbyManager {
    pub fn new() -> Self {
        Self {
            selected: 0,
            input_mode: false,
            code_input: String::new(),
        }
    }

    pub fn run(&mut self, terminal: &mut ratatui::DefaultTerminal) -> Result<LobbyResult> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if let Some(result) = self.handle_key(key) {
                        return Ok(result);
                    }
                }
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<LobbyResult> {
        if self.input_mode {
            match key.code {
                KeyCode::Enter => {
                    let code = self.code_input.trim();
                    if !code.is_empty() {
                        return Some(LobbyResult::Join(code.to_string()));
                    }
                }
                KeyCode::Esc => self.input_mode = false,
                KeyCode::Char(c) => self.code_input.push(c),
                KeyCode::Backspace => {
                    self.code_input.pop();
                }
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = (self.selected + 1).min(OPTIONS.len() - 1),
            KeyCode::Enter => return self.choose(self.selected),
            KeyCode::Char('h') => return self.choose(0),
            KeyCode::Char('j') => return self.choose(1),
            KeyCode::Char('s') => return self.choose(2),
            KeyCode::Char('q') | KeyCode::Esc => return Some(LobbyResult::Quit),
            _ => {}
        }
        None
    }

    fn choose(&mut self, index: usize) -> Option<LobbyResult> {
        self.selected = index;
        match index {
            0 => Some(LobbyResult::Host),
            1 => {
                self.input_mode = true;
                None
            }
            2 => Some(LobbyResult::Solo),
            _ => Some(LobbyResult::Quit),
        }
    }

    fn render(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(2)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(f.area());

        f.render_widget(
            Paragraph::new(" 🍅 POMOPAIR ")
                .block(Block::default().borders(Borders::ALL))
                .alignment(Alignment::Center),
            chunks[0],
        );

        if self.input_mode {
            f.render_widget(
                Paragraph::new(format!("Enter the host's session code:\n\n > {}", self.code_input))
                    .wrap(Wrap { trim: false })
                    .block(Block::default().title(" JOIN SESSION ").borders(Borders::ALL)),
                chunks[1],
            );
            f.render_widget(
                Paragraph::new("[Enter] Connect  [Esc] Back").alignment(Alignment::Center),
                chunks[2],
            );
        } else {
            let items: Vec<ListItem> = OPTIONS
                .iter()
                .enumerate()
                .map(|(i, (label, hint))| {
                    let style = if i == self.selected {
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    let text = if hint.is_empty() {
                        format!(" » {label}")
                    } else {
                        format!(" » {label} : {hint}")
                    };
                    ListItem::new(text).style(style)
                })
                .collect();

            f.render_widget(
                List::new(items).block(Block::default().title(" WELCOME ").borders(Borders::ALL)),
                chunks[1],
            );

            f.render_widget(
                Paragraph::new("[↑/↓] Navigate  [Enter] Choose  [H] Host  [J] Join  [S] Solo  [Q] Quit")
                    .alignment(Alignment::Center),
                chunks[2],
            );
        }
    }
}

impl Default for LobbyManager {
    fn default() -> Self {
        Self::new()
    }
}

//! Static rule text shown in the `?` overlay.

use ratatui::{
    style::{Modifier, Style},
    text::Line,
};

use super::GameId;

#[derive(Debug)]
pub struct Instructions {
    pub title: &'static str,
    pub objective: &'static str,
    pub steps: &'static [&'static str],
    pub tip: &'static str,
}

impl Instructions {
    /// Overlay body: objective, numbered steps, then the tip if there is one.
    pub fn lines(&self) -> Vec<Line<'static>> {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::styled("Objective", bold),
            Line::from(self.objective),
            Line::from(""),
        ];
        if !self.steps.is_empty() {
            lines.push(Line::styled("How to play", bold));
            lines.extend(
                self.steps
                    .iter()
                    .enumerate()
                    .map(|(i, step)| Line::from(format!("{}. {step}", i + 1))),
            );
        }
        if !self.tip.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(format!("Tip: {}", self.tip)));
        }
        lines
    }

    /// Title and overlay body as plain lines, for printing outside the UI.
    pub fn plain_text(&self) -> String {
        let mut text = format!("{}\n\n", self.title);
        for line in self.lines() {
            text.push_str(&line.to_string());
            text.push('\n');
        }
        text
    }
}

static TICTACTOE: Instructions = Instructions {
    title: "Tic-Tac-Toe Instructions",
    objective: "Be the first player to get three of your symbols in a row, column, or diagonal.",
    steps: &[
        "The game is played on a 3x3 grid.",
        "The host is X and moves first; the joining player is O.",
        "Players take turns placing their symbol with the arrow keys and Enter.",
        "Three in a row wins the round. A full board with no line is a draw.",
        "Wins for X and O and the number of games played are tracked across rounds.",
    ],
    tip: "Try to create two winning threats at once so your opponent can only block one.",
};

static MEMORY: Instructions = Instructions {
    title: "Memory Game Instructions",
    objective: "Match more pairs of identical cards than your opponent.",
    steps: &[
        "Sixteen cards lie face down: eight pairs of symbols.",
        "On your turn, flip two cards one after the other.",
        "A match stays face up, scores a point and you go again.",
        "A miss is turned back after a short peek and the turn passes.",
        "The game ends when all pairs have been found.",
    ],
    tip: "Watch what your opponent flips. Their misses tell you where the pairs are.",
};

static MINICRAFT: Instructions = Instructions {
    title: "MiniCraft Instructions",
    objective: "Destroy your opponent's Command Center while protecting your own.",
    steps: &[
        "Select a Worker, press h and pick a nearby crystal field to harvest. Each harvesting Worker earns 5 crystals every 1.5 seconds.",
        "Select a Worker and press b (Barracks, 150) or g (Range, 200), then pick a highlighted site next to it.",
        "Select a building and press u to train its unit: Command Center makes Workers (50), Barracks makes Soldiers (100), Range makes Archers (125).",
        "Select a unit, press m to move one tile or a to attack an enemy in range.",
        "Press c to cancel the pending action.",
    ],
    tip: "Get two or three Workers harvesting first, then build an army. Archers hit from three tiles away.",
};

static FALLBACK: Instructions = Instructions {
    title: "Instructions",
    objective: "No specific instructions available for this game.",
    steps: &[],
    tip: "",
};

pub fn instructions(id: GameId) -> &'static Instructions {
    match id {
        GameId::TicTacToe => &TICTACTOE,
        GameId::Memory => &MEMORY,
        GameId::MiniCraft => &MINICRAFT,
    }
}

/// Lookup by wire name; unknown names get a generic entry.
pub fn instructions_for(name: &str) -> &'static Instructions {
    name.parse().map(instructions).unwrap_or(&FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_game_has_rules() {
        for &id in GameId::ALL {
            let rules = instructions(id);
            assert!(!rules.steps.is_empty(), "{id} has no steps");
            assert!(std::ptr::eq(instructions_for(id.as_str()), rules));
        }
    }

    #[test]
    fn unknown_game_gets_generic_text() {
        let rules = instructions_for("chess");
        assert_eq!(rules.title, "Instructions");
        assert!(rules.steps.is_empty());
        let text = rules.plain_text();
        assert!(text.starts_with("Instructions\n"));
        assert!(!text.contains("How to play"));
        assert!(!text.contains("Tip:"));
    }

    #[test]
    fn overlay_numbers_the_steps() {
        let lines = instructions(GameId::TicTacToe).lines();
        assert!(lines.iter().any(|line| line.to_string().starts_with("1. ")));
    }
}

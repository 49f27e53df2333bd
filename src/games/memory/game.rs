use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use rand::{seq::SliceRandom, Rng};
use ratatui::{layout::Rect, Frame};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::renderer::MemoryRenderer;
use crate::core::error::ActionError;
use crate::core::game::{Context, Game};
use crate::core::renderer::GameRenderer;
use crate::games::GameId;

pub const PAIRS: usize = 8;
pub const DECK_SIZE: usize = PAIRS * 2;
pub const COLUMNS: usize = 4;

/// How long the second card stays face-up before the pair is judged.
pub const REVEAL_DELAY: Duration = Duration::from_secs(1);

const SYMBOLS: [char; 16] = [
    '🐱', '🐶', '🐼', '🦊', '🐵', '🦁', '🐮', '🐷', '🦄', '🐢', '🐘', '🦒', '🐠', '🦋', '🐝', '🦜',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub symbol: char,
    pub matched: bool,
}

impl Card {
    pub fn new(symbol: char) -> Self {
        Self {
            symbol,
            matched: false,
        }
    }
}

/// Eight pairs, side by side: `[🐱, 🐱, 🐶, 🐶, ...]`.
pub fn ordered_deck() -> Vec<Card> {
    SYMBOLS[..PAIRS]
        .iter()
        .flat_map(|&symbol| [Card::new(symbol), Card::new(symbol)])
        .collect()
}

pub fn shuffled_deck<R: Rng + ?Sized>(rng: &mut R) -> Vec<Card> {
    let mut deck = ordered_deck();
    deck.shuffle(rng);
    deck
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum MemoryMessage {
    GameCardFlip {
        card_index: usize,
    },
    GameMatchFound {
        card_indices: [usize; 2],
        player_score: u32,
        player_turn: bool,
    },
    GameTurnSwitch {
        player_turn: bool,
    },
    /// Scores from the sender's point of view.
    GameComplete {
        player_score: u32,
        opponent_score: u32,
        total_games: u32,
    },
    NewGame {
        cards: Vec<Card>,
        player_turn: bool,
    },
}

impl MemoryMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            MemoryMessage::GameCardFlip { .. } => "game-card-flip",
            MemoryMessage::GameMatchFound { .. } => "game-match-found",
            MemoryMessage::GameTurnSwitch { .. } => "game-turn-switch",
            MemoryMessage::GameComplete { .. } => "game-complete",
            MemoryMessage::NewGame { .. } => "new-game",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryState {
    pub cards: Vec<Card>,
    pub flipped: Vec<usize>,
    pub matched_pairs: usize,
    pub moves: u32,
    pub player_turn: bool,
    pub player_score: u32,
    pub opponent_score: u32,
    pub total_games: u32,
    pub game_complete: bool,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            cards: ordered_deck(),
            flipped: Vec::new(),
            matched_pairs: 0,
            moves: 0,
            player_turn: true,
            player_score: 0,
            opponent_score: 0,
            total_games: 0,
            game_complete: false,
        }
    }
}

impl MemoryState {
    /// Per-round reset. Scores and the games counter carry over.
    fn deal(&mut self, cards: Vec<Card>) {
        self.matched_pairs = cards.iter().filter(|card| card.matched).count() / 2;
        self.cards = cards;
        self.flipped.clear();
        self.moves = 0;
        self.game_complete = false;
    }

    fn mark_matched(&mut self, first: usize, second: usize) {
        for index in [first, second] {
            if let Some(card) = self.cards.get_mut(index) {
                card.matched = true;
            }
        }
        self.matched_pairs = self.cards.iter().filter(|card| card.matched).count() / 2;
    }

    /// Face-up cards that are not yet matched.
    pub fn face_up(&self) -> impl Iterator<Item = usize> + '_ {
        self.flipped
            .iter()
            .copied()
            .filter(|&index| self.cards.get(index).is_some_and(|card| !card.matched))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingReveal {
    due: Instant,
    first: usize,
    second: usize,
}

#[derive(Debug, Default)]
pub struct MemoryGame {
    state: MemoryState,
    pending: Option<PendingReveal>,
    cursor: usize,
    visible: bool,
    initialized: bool,
}

impl MemoryGame {
    /// Game dealt from a fixed deck instead of a shuffle.
    pub fn with_deck(cards: Vec<Card>) -> Self {
        let mut game = Self::default();
        game.state.deal(cards);
        game.initialized = true;
        game
    }

    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_evaluating(&self) -> bool {
        self.pending.is_some()
    }

    /// Flips a card for the local player. Returns whether it was flipped.
    pub fn handle_card_click(&mut self, index: usize, ctx: &Context<'_>) -> bool {
        let state = &self.state;
        let Some(card) = state.cards.get(index) else {
            return false;
        };
        if !state.player_turn
            || state.game_complete
            || state.flipped.contains(&index)
            || card.matched
            || state.flipped.len() >= 2
        {
            return false;
        }

        self.state.flipped.push(index);
        ctx.send(MemoryMessage::GameCardFlip { card_index: index });

        if let [first, second] = self.state.flipped[..] {
            self.state.moves += 1;
            self.pending = Some(PendingReveal {
                due: ctx.now() + REVEAL_DELAY,
                first,
                second,
            });
        }
        true
    }

    fn evaluate(&mut self, reveal: PendingReveal, ctx: &Context<'_>) {
        let PendingReveal { first, second, .. } = reveal;
        let symbols = (
            self.state.cards.get(first).map(|card| card.symbol),
            self.state.cards.get(second).map(|card| card.symbol),
        );
        self.state.flipped.clear();

        match symbols {
            (Some(a), Some(b)) if a == b => {
                self.state.mark_matched(first, second);
                self.state.player_score += 1;
                debug!(first, second, score = self.state.player_score, "memory pair matched");
                ctx.send(MemoryMessage::GameMatchFound {
                    card_indices: [first, second],
                    player_score: self.state.player_score,
                    player_turn: true,
                });
                if self.state.matched_pairs == PAIRS {
                    self.complete(ctx, true);
                }
            }
            _ => {
                // Alone at the table, the turn comes straight back.
                self.state.player_turn = !ctx.is_connected();
                ctx.send(MemoryMessage::GameTurnSwitch { player_turn: true });
            }
        }
    }

    fn complete(&mut self, ctx: &Context<'_>, broadcast: bool) {
        self.state.game_complete = true;
        self.state.total_games += 1;
        info!(
            player = self.state.player_score,
            opponent = self.state.opponent_score,
            "memory round complete"
        );
        if broadcast {
            ctx.send(MemoryMessage::GameComplete {
                player_score: self.state.player_score,
                opponent_score: self.state.opponent_score,
                total_games: self.state.total_games,
            });
        }
    }

    fn move_cursor(&mut self, dx: isize, dy: isize) {
        let rows = self.state.cards.len().div_ceil(COLUMNS) as isize;
        let col = (self.cursor % COLUMNS) as isize + dx;
        let row = (self.cursor / COLUMNS) as isize + dy;
        if (0..COLUMNS as isize).contains(&col) && (0..rows).contains(&row) {
            let index = (row * COLUMNS as isize + col) as usize;
            if index < self.state.cards.len() {
                self.cursor = index;
            }
        }
    }
}

impl Game for MemoryGame {
    type Message = MemoryMessage;

    const ID: GameId = GameId::Memory;

    fn initialize(&mut self, _ctx: &Context<'_>) {
        if self.initialized {
            return;
        }
        self.state.deal(shuffled_deck(&mut rand::rng()));
        self.initialized = true;
    }

    fn start_new_game(&mut self, ctx: &Context<'_>) {
        self.pending = None;
        self.state.deal(shuffled_deck(&mut rand::rng()));
        self.state.player_turn = ctx.is_host() || !ctx.is_connected();
        ctx.send(MemoryMessage::NewGame {
            cards: self.state.cards.clone(),
            player_turn: !self.state.player_turn,
        });
    }

    fn handle_peer_data(&mut self, msg: MemoryMessage, ctx: &Context<'_>) {
        match msg {
            MemoryMessage::NewGame { cards, player_turn } => {
                if cards.len() != DECK_SIZE {
                    warn!(len = cards.len(), "memory deck of the wrong size ignored");
                    return;
                }
                self.pending = None;
                self.state.deal(cards);
                self.state.player_turn = player_turn;
            }
            MemoryMessage::GameCardFlip { card_index } => {
                let state = &mut self.state;
                if card_index < state.cards.len()
                    && !state.flipped.contains(&card_index)
                    && state.flipped.len() < 2
                {
                    state.flipped.push(card_index);
                }
            }
            MemoryMessage::GameMatchFound {
                card_indices: [first, second],
                player_turn,
                ..
            } => {
                self.state.mark_matched(first, second);
                self.state.opponent_score += 1;
                self.state.player_turn = !player_turn;
                self.state.flipped.clear();
                if self.state.matched_pairs == PAIRS && !self.state.game_complete {
                    // The sender follows up with its own totals.
                    self.complete(ctx, false);
                }
            }
            MemoryMessage::GameTurnSwitch { player_turn } => {
                self.state.player_turn = player_turn;
                self.state.flipped.clear();
            }
            MemoryMessage::GameComplete {
                player_score,
                opponent_score,
                total_games,
            } => {
                self.state.player_score = opponent_score;
                self.state.opponent_score = player_score;
                self.state.total_games = total_games;
                self.state.game_complete = true;
            }
        }
    }

    fn reset(&mut self, ctx: &Context<'_>) {
        if self.state.game_complete {
            self.start_new_game(ctx);
        }
    }

    fn show(&mut self, _ctx: &Context<'_>) {
        self.visible = true;
    }

    fn hide(&mut self, _ctx: &Context<'_>) {
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn on_tick(&mut self, ctx: &Context<'_>) {
        if let Some(reveal) = self.pending {
            if ctx.now() >= reveal.due {
                self.pending = None;
                self.evaluate(reveal, ctx);
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent, ctx: &Context<'_>) -> Result<(), ActionError> {
        match key.code {
            KeyCode::Left => self.move_cursor(-1, 0),
            KeyCode::Right => self.move_cursor(1, 0),
            KeyCode::Up => self.move_cursor(0, -1),
            KeyCode::Down => self.move_cursor(0, 1),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if !self.handle_card_click(self.cursor, ctx) {
                    if self.state.game_complete {
                        return Err(ActionError::GameOver);
                    }
                    if !self.state.player_turn {
                        return Err(ActionError::NotYourTurn);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        MemoryRenderer::render(frame, area, self);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::{rngs::StdRng, SeedableRng};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;
    use crate::core::connection::ConnectionState;
    use crate::core::protocol::PeerMessage;
    use crate::games::GameMessage;

    fn peer(is_host: bool) -> (ConnectionState, UnboundedReceiver<PeerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionState::connected(tx, is_host), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<PeerMessage>) -> Vec<MemoryMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            match msg {
                PeerMessage::Game(GameMessage::Memory(msg)) => out.push(msg),
                other => panic!("unexpected {other:?}"),
            }
        }
        out
    }

    #[test]
    fn shuffle_is_a_permutation_of_eight_pairs() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let deck = shuffled_deck(&mut rng);
            assert_eq!(deck.len(), DECK_SIZE);
            let mut counts: HashMap<char, usize> = HashMap::new();
            for card in &deck {
                assert!(!card.matched);
                *counts.entry(card.symbol).or_default() += 1;
            }
            assert_eq!(counts.len(), PAIRS);
            assert!(counts.values().all(|&n| n == 2));
        }
    }

    #[test]
    fn matching_pair_scores_and_keeps_turn() {
        let (connection, mut rx) = peer(true);
        let start = Instant::now();
        let mut game = MemoryGame::with_deck(ordered_deck());

        let ctx = Context::new(&connection, start);
        assert!(game.handle_card_click(0, &ctx));
        assert!(game.handle_card_click(1, &ctx));
        assert_eq!(game.state().moves, 1);

        game.on_tick(&Context::new(&connection, start + Duration::from_millis(500)));
        assert!(game.is_evaluating());

        game.on_tick(&Context::new(&connection, start + REVEAL_DELAY));
        assert_eq!(game.state().player_score, 1);
        assert!(game.state().player_turn);
        assert!(game.state().cards[0].matched && game.state().cards[1].matched);
        assert_eq!(
            drain(&mut rx),
            vec![
                MemoryMessage::GameCardFlip { card_index: 0 },
                MemoryMessage::GameCardFlip { card_index: 1 },
                MemoryMessage::GameMatchFound {
                    card_indices: [0, 1],
                    player_score: 1,
                    player_turn: true,
                },
            ]
        );
    }

    #[test]
    fn mismatch_passes_the_turn() {
        let (connection, mut rx) = peer(true);
        let start = Instant::now();
        let mut game = MemoryGame::with_deck(ordered_deck());

        let ctx = Context::new(&connection, start);
        game.handle_card_click(0, &ctx);
        game.handle_card_click(2, &ctx);
        game.on_tick(&Context::new(&connection, start + REVEAL_DELAY));

        assert!(!game.state().player_turn);
        assert_eq!(game.state().face_up().count(), 0);
        assert_eq!(
            drain(&mut rx).last(),
            Some(&MemoryMessage::GameTurnSwitch { player_turn: true })
        );
    }

    #[test]
    fn clicks_are_ignored_while_two_cards_are_up() {
        let (connection, _rx) = peer(true);
        let ctx = Context::new(&connection, Instant::now());
        let mut game = MemoryGame::with_deck(ordered_deck());

        game.handle_card_click(0, &ctx);
        assert!(!game.handle_card_click(0, &ctx));
        game.handle_card_click(2, &ctx);
        assert!(!game.handle_card_click(4, &ctx));
        assert_eq!(game.state().flipped, vec![0, 2]);
    }

    #[test]
    fn at_most_one_unmatched_card_up_after_each_evaluation() {
        let (connection, _rx) = peer(true);
        let mut now = Instant::now();
        let mut game = MemoryGame::with_deck(ordered_deck());

        for (a, b) in [(0, 2), (1, 3), (4, 5), (6, 8)] {
            if !game.state().player_turn {
                game.handle_peer_data(
                    MemoryMessage::GameTurnSwitch { player_turn: true },
                    &Context::new(&connection, now),
                );
            }
            let ctx = Context::new(&connection, now);
            game.handle_card_click(a, &ctx);
            assert!(game.state().face_up().count() <= 1);
            game.handle_card_click(b, &ctx);
            now += REVEAL_DELAY;
            game.on_tick(&Context::new(&connection, now));
            assert!(game.state().face_up().count() <= 1);
        }
    }

    #[test]
    fn completion_scores_are_mirrored_by_the_peer() {
        let (host_conn, mut host_rx) = peer(true);
        let (guest_conn, _guest_rx) = peer(false);
        let mut now = Instant::now();
        let mut host = MemoryGame::with_deck(ordered_deck());
        let mut guest = MemoryGame::with_deck(ordered_deck());

        for pair in 0..PAIRS {
            let ctx = Context::new(&host_conn, now);
            host.handle_card_click(pair * 2, &ctx);
            host.handle_card_click(pair * 2 + 1, &ctx);
            now += REVEAL_DELAY;
            host.on_tick(&Context::new(&host_conn, now));
        }
        let sent = drain(&mut host_rx);
        assert!(matches!(
            sent[sent.len() - 2],
            MemoryMessage::GameMatchFound { .. }
        ));
        for msg in sent {
            guest.handle_peer_data(msg, &Context::new(&guest_conn, now));
        }

        assert!(host.state().game_complete && guest.state().game_complete);
        assert_eq!(
            (guest.state().player_score, guest.state().opponent_score),
            (host.state().opponent_score, host.state().player_score)
        );
        assert_eq!(guest.state().total_games, host.state().total_games);
        assert_eq!(host.state().total_games, 1);
    }

    #[test]
    fn new_game_hands_the_peer_the_other_turn() {
        let (connection, mut rx) = peer(true);
        let ctx = Context::new(&connection, Instant::now());
        let mut game = MemoryGame::default();
        game.start_new_game(&ctx);

        assert!(game.state().player_turn);
        match drain(&mut rx).pop() {
            Some(MemoryMessage::NewGame { cards, player_turn }) => {
                assert_eq!(cards, game.state().cards);
                assert!(!player_turn);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reset_only_deals_after_completion() {
        let (connection, _rx) = peer(true);
        let ctx = Context::new(&connection, Instant::now());
        let mut game = MemoryGame::with_deck(ordered_deck());
        game.handle_card_click(0, &ctx);

        game.reset(&ctx);
        assert_eq!(game.state().flipped, vec![0]);

        game.handle_peer_data(
            MemoryMessage::GameComplete { player_score: 5, opponent_score: 3, total_games: 2 },
            &ctx,
        );
        game.reset(&ctx);
        assert!(!game.state().game_complete);
        assert!(game.state().flipped.is_empty());
        assert_eq!(game.state().player_score, 3);
    }

    #[test]
    fn duplicate_remote_flip_is_recorded_once() {
        let (connection, _rx) = peer(false);
        let ctx = Context::new(&connection, Instant::now());
        let mut game = MemoryGame::with_deck(ordered_deck());
        game.handle_peer_data(MemoryMessage::GameCardFlip { card_index: 3 }, &ctx);
        game.handle_peer_data(MemoryMessage::GameCardFlip { card_index: 3 }, &ctx);
        assert_eq!(game.state().flipped, vec![3]);
    }
}

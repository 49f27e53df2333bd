use crossterm::event::KeyEvent;
use indexmap::IndexMap;
use ratatui::{layout::Rect, Frame};
use tracing::{debug, info, warn};

use crate::core::error::ActionError;
use crate::core::game::{Context, Game, RegisteredGame};
use crate::core::protocol::{PeerMessage, SwitchMessage};
use crate::games::{GameId, GameInfo, GameMessage};

/// Registry and switchboard for the break games.
///
/// Holds every game instance in menu order and tracks which one is active.
/// Game traffic from the peer is routed by its `gameType` tag, so a message
/// for a game that is not on screen still lands where it belongs.
pub struct GameManager {
    games: IndexMap<GameId, Box<dyn RegisteredGame>>,
    current: Option<GameId>,
}

impl GameManager {
    pub fn new() -> Self {
        Self {
            games: IndexMap::new(),
            current: None,
        }
    }

    pub fn register<G: Game + 'static>(&mut self, game: G) {
        self.games.insert(G::ID, Box::new(game));
    }

    pub fn list_games(&self) -> Vec<GameInfo> {
        self.games.keys().map(|id| id.info()).collect()
    }

    pub fn current(&self) -> Option<GameId> {
        self.current
    }

    /// Initializes every game, hides it, and makes the first one active.
    pub fn initialize(&mut self, ctx: &Context<'_>) {
        for game in self.games.values_mut() {
            game.initialize(ctx);
            game.hide(ctx);
        }
        if let Some(first) = self.games.keys().next().copied() {
            self.switch_game(first, ctx);
        }
    }

    /// Hides the previous game, then shows and resets the new one.
    /// Unknown ids are ignored.
    pub fn switch_game(&mut self, id: GameId, ctx: &Context<'_>) -> bool {
        if !self.games.contains_key(&id) {
            warn!(game = id.as_str(), "switch to unregistered game ignored");
            return false;
        }
        if let Some(previous) = self.current_game_mut() {
            previous.hide(ctx);
        }
        self.current = Some(id);
        if let Some(game) = self.current_game_mut() {
            game.show(ctx);
            game.reset(ctx);
        }
        info!(game = id.as_str(), "switched game");
        true
    }

    /// Local menu selection: switch here, then tell the peer.
    pub fn select_game(&mut self, id: GameId, ctx: &Context<'_>) -> bool {
        let switched = self.switch_game(id, ctx);
        if switched {
            ctx.send(PeerMessage::game_switch(id));
        }
        switched
    }

    pub fn show_current_game(&mut self, ctx: &Context<'_>) {
        if let Some(game) = self.current_game_mut() {
            game.show(ctx);
        }
    }

    pub fn hide_current_game(&mut self, ctx: &Context<'_>) {
        if let Some(game) = self.current_game_mut() {
            game.hide(ctx);
        }
    }

    pub fn reset_current_game(&mut self, ctx: &Context<'_>) {
        if let Some(game) = self.current_game_mut() {
            game.reset(ctx);
        }
    }

    pub fn start_new_current_game(&mut self, ctx: &Context<'_>) {
        if let Some(game) = self.current_game_mut() {
            game.start_new_game(ctx);
        }
    }

    pub fn current_is_visible(&self) -> bool {
        self.current
            .and_then(|id| self.games.get(&id))
            .is_some_and(|game| game.is_visible())
    }

    /// Peer traffic that is not for the timer.
    pub fn handle_peer_data(&mut self, msg: PeerMessage, ctx: &Context<'_>) {
        match msg {
            PeerMessage::Switch(SwitchMessage::GameSwitch { game_id }) => {
                self.switch_game(game_id, ctx);
            }
            PeerMessage::Game(msg) => self.dispatch(msg, ctx),
            PeerMessage::Timer(msg) => {
                warn!(kind = msg.kind(), "timer message reached the game manager");
            }
        }
    }

    fn dispatch(&mut self, msg: GameMessage, ctx: &Context<'_>) {
        let target = msg.game_id();
        match self.games.get_mut(&target) {
            Some(game) => {
                debug!(game = target.as_str(), kind = msg.kind(), "applying peer message");
                game.handle_peer_data(msg, ctx);
            }
            None => warn!(game = target.as_str(), "peer message for unregistered game dropped"),
        }
    }

    /// Ticks every game; each one only does work it has scheduled.
    pub fn on_tick(&mut self, ctx: &Context<'_>) {
        for game in self.games.values_mut() {
            game.on_tick(ctx);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, ctx: &Context<'_>) -> Result<(), ActionError> {
        match self.current_game_mut() {
            Some(game) => game.handle_key(key, ctx),
            None => Ok(()),
        }
    }

    pub fn render_current(&self, frame: &mut Frame, area: Rect) {
        if let Some(game) = self.current.and_then(|id| self.games.get(&id)) {
            game.render(frame, area);
        }
    }

    fn current_game_mut(&mut self) -> Option<&mut Box<dyn RegisteredGame>> {
        let id = self.current?;
        self.games.get_mut(&id)
    }
}

impl Default for GameManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use tokio::sync::mpsc;

    use super::*;
    use crate::core::connection::ConnectionState;
    use crate::games::create_default_manager;
    use crate::games::tictactoe::{Board, Mark, TicTacToeMessage};

    #[test]
    fn registers_games_in_menu_order() {
        let manager = create_default_manager();
        let ids: Vec<GameId> = manager.list_games().iter().map(|g| g.id).collect();
        assert_eq!(ids, GameId::ALL);
    }

    #[test]
    fn initialize_activates_first_game() {
        let connection = ConnectionState::solo();
        let ctx = Context::new(&connection, Instant::now());
        let mut manager = create_default_manager();
        manager.initialize(&ctx);
        assert_eq!(manager.current(), Some(GameId::TicTacToe));
        assert!(manager.current_is_visible());
    }

    #[test]
    fn peer_switch_is_applied_without_echo() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = ConnectionState::connected(tx, false);
        let ctx = Context::new(&connection, Instant::now());
        let mut manager = create_default_manager();
        manager.initialize(&ctx);

        manager.handle_peer_data(PeerMessage::game_switch(GameId::Memory), &ctx);
        assert_eq!(manager.current(), Some(GameId::Memory));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn local_selection_is_broadcast() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = ConnectionState::connected(tx, true);
        let ctx = Context::new(&connection, Instant::now());
        let mut manager = create_default_manager();
        manager.initialize(&ctx);

        assert!(manager.select_game(GameId::MiniCraft, &ctx));
        assert_eq!(rx.try_recv().ok(), Some(PeerMessage::game_switch(GameId::MiniCraft)));
    }

    #[test]
    fn tagged_message_reaches_hidden_game() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = ConnectionState::connected(tx, false);
        let ctx = Context::new(&connection, Instant::now());
        let mut manager = create_default_manager();
        manager.initialize(&ctx);
        manager.switch_game(GameId::Memory, &ctx);

        let mut board = Board::default();
        board.set(4, Mark::X);
        manager.handle_peer_data(TicTacToeMessage::GameMove { index: 4, board }.into(), &ctx);

        // The hidden game kept the move and handed us the turn.
        manager.switch_game(GameId::TicTacToe, &ctx);
        manager
            .handle_key(KeyEvent::from(crossterm::event::KeyCode::Enter), &ctx)
            .unwrap();
        match rx.try_recv() {
            Ok(PeerMessage::Game(GameMessage::TicTacToe(TicTacToeMessage::GameMove {
                index: 0,
                board,
            }))) => {
                assert_eq!(board.get(4), Mark::X);
                assert_eq!(board.get(0), Mark::O);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

/// Game capability contract for the break-time games
use std::fmt::Debug;
use std::time::Instant;

use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::core::connection::ConnectionState;
use crate::core::error::ActionError;
use crate::core::protocol::PeerMessage;
use crate::games::{GameId, GameMessage};

/// What a game sees of the outside world during one callback: the shared
/// connection record and the current instant.
pub struct Context<'a> {
    connection: &'a ConnectionState,
    now: Instant,
}

impl<'a> Context<'a> {
    pub fn new(connection: &'a ConnectionState, now: Instant) -> Self {
        Self { connection, now }
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn is_host(&self) -> bool {
        self.connection.is_host()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn send(&self, msg: impl Into<PeerMessage>) {
        self.connection.send(msg);
    }
}

/// Main game trait that all games must implement
pub trait Game: Default {
    /// This game's half of the peer protocol
    type Message: Serialize
        + DeserializeOwned
        + Clone
        + Debug
        + Into<GameMessage>
        + TryFrom<GameMessage, Error = GameMessage>;

    const ID: GameId;

    /// One-time setup. Safe to call again.
    fn initialize(&mut self, ctx: &Context<'_>);

    /// Fresh round. Cross-round counters survive where the game keeps them.
    fn start_new_game(&mut self, ctx: &Context<'_>);

    /// Applies a change that happened on the peer's side.
    fn handle_peer_data(&mut self, msg: Self::Message, ctx: &Context<'_>);

    /// Called when the game comes on screen for a break. Each game decides
    /// whether an unfinished round survives.
    fn reset(&mut self, ctx: &Context<'_>);

    fn show(&mut self, ctx: &Context<'_>);

    fn hide(&mut self, ctx: &Context<'_>);

    fn is_visible(&self) -> bool;

    /// Heartbeat for delayed steps. Default: nothing scheduled.
    fn on_tick(&mut self, _ctx: &Context<'_>) {}

    fn handle_key(&mut self, key: KeyEvent, ctx: &Context<'_>) -> Result<(), ActionError>;

    fn render(&self, frame: &mut Frame, area: Rect);
}

/// Type-erased game as held by the manager. Every [`Game`] gets this for free.
pub trait RegisteredGame {
    fn id(&self) -> GameId;
    fn initialize(&mut self, ctx: &Context<'_>);
    fn start_new_game(&mut self, ctx: &Context<'_>);
    fn handle_peer_data(&mut self, msg: GameMessage, ctx: &Context<'_>);
    fn reset(&mut self, ctx: &Context<'_>);
    fn show(&mut self, ctx: &Context<'_>);
    fn hide(&mut self, ctx: &Context<'_>);
    fn is_visible(&self) -> bool;
    fn on_tick(&mut self, ctx: &Context<'_>);
    fn handle_key(&mut self, key: KeyEvent, ctx: &Context<'_>) -> Result<(), ActionError>;
    fn render(&self, frame: &mut Frame, area: Rect);
}

impl<G: Game> RegisteredGame for G {
    fn id(&self) -> GameId {
        G::ID
    }

    fn initialize(&mut self, ctx: &Context<'_>) {
        <G as Game>::initialize(self, ctx)
    }

    fn start_new_game(&mut self, ctx: &Context<'_>) {
        <G as Game>::start_new_game(self, ctx)
    }

    fn handle_peer_data(&mut self, msg: GameMessage, ctx: &Context<'_>) {
        match G::Message::try_from(msg) {
            Ok(msg) => <G as Game>::handle_peer_data(self, msg, ctx),
            Err(other) => warn!(
                game = G::ID.as_str(),
                target = other.game_id().as_str(),
                "peer message routed to the wrong game"
            ),
        }
    }

    fn reset(&mut self, ctx: &Context<'_>) {
        <G as Game>::reset(self, ctx)
    }

    fn show(&mut self, ctx: &Context<'_>) {
        <G as Game>::show(self, ctx)
    }

    fn hide(&mut self, ctx: &Context<'_>) {
        <G as Game>::hide(self, ctx)
    }

    fn is_visible(&self) -> bool {
        <G as Game>::is_visible(self)
    }

    fn on_tick(&mut self, ctx: &Context<'_>) {
        <G as Game>::on_tick(self, ctx)
    }

    fn handle_key(&mut self, key: KeyEvent, ctx: &Context<'_>) -> Result<(), ActionError> {
        <G as Game>::handle_key(self, key, ctx)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        <G as Game>::render(self, frame, area)
    }
}

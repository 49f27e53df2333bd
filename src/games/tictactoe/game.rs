use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{layout::Rect, Frame};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::renderer::TicTacToeRenderer;
use crate::core::error::ActionError;
use crate::core::game::{Context, Game};
use crate::core::renderer::GameRenderer;
use crate::games::GameId;

const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2], [3, 4, 5], [6, 7, 8], // rows
    [0, 3, 6], [1, 4, 7], [2, 5, 8], // columns
    [0, 4, 8], [2, 4, 6],            // diagonals
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mark {
    #[default]
    #[serde(rename = "")]
    Empty,
    X,
    O,
}

impl Mark {
    pub fn symbol(self) -> &'static str {
        match self {
            Mark::Empty => " ",
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

/// Nine cells, row-major. Always sent whole, never as a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board([Mark; 9]);

impl Board {
    pub fn get(&self, index: usize) -> Mark {
        self.0[index]
    }

    pub fn set(&mut self, index: usize, mark: Mark) {
        self.0[index] = mark;
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&cell| cell == Mark::Empty)
    }

    pub fn is_full(&self) -> bool {
        self.0.iter().all(|&cell| cell != Mark::Empty)
    }

    /// First line holding three identical marks.
    pub fn winner(&self) -> Option<Mark> {
        WIN_LINES.iter().find_map(|&[a, b, c]| {
            let mark = self.0[a];
            (mark != Mark::Empty && mark == self.0[b] && mark == self.0[c]).then_some(mark)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    X,
    O,
    #[serde(rename = "draw")]
    Draw,
}

impl Outcome {
    fn from_board(board: &Board) -> Option<Self> {
        match board.winner() {
            Some(Mark::X) => Some(Outcome::X),
            Some(Mark::O) => Some(Outcome::O),
            _ if board.is_full() => Some(Outcome::Draw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TicTacToeMessage {
    GameMove {
        index: usize,
        board: Board,
    },
    GameEnd {
        winner: Outcome,
        board: Board,
        score_x: u32,
        score_o: u32,
        games_played: u32,
    },
    /// Turn and symbol are the receiver's, i.e. the sender's complement.
    NewGame {
        board: Board,
        is_my_turn: bool,
        is_player_x: bool,
    },
}

impl TicTacToeMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            TicTacToeMessage::GameMove { .. } => "game-move",
            TicTacToeMessage::GameEnd { .. } => "game-end",
            TicTacToeMessage::NewGame { .. } => "new-game",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicTacToeState {
    pub board: Board,
    pub is_player_x: bool,
    pub is_my_turn: bool,
    pub score_x: u32,
    pub score_o: u32,
    pub games_played: u32,
    pub outcome: Option<Outcome>,
}

impl TicTacToeState {
    pub fn my_mark(&self) -> Mark {
        if self.is_player_x {
            Mark::X
        } else {
            Mark::O
        }
    }

    /// The host is always X and always opens. Without a peer the local
    /// player takes both sides, starting as X.
    fn deal(&mut self, ctx: &Context<'_>) {
        let opens = ctx.is_host() || !ctx.is_connected();
        self.board = Board::default();
        self.is_player_x = opens;
        self.is_my_turn = opens;
        self.outcome = None;
    }
}

#[derive(Debug, Default)]
pub struct TicTacToe {
    state: TicTacToeState,
    cursor: usize,
    visible: bool,
    initialized: bool,
}

impl TicTacToe {
    pub fn state(&self) -> &TicTacToeState {
        &self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn check_winner(&self) -> Option<Mark> {
        self.state.board.winner()
    }

    /// Claims a cell for the local player. Returns whether the move was made;
    /// off-turn clicks and occupied cells are ignored.
    pub fn handle_cell_click(&mut self, index: usize, ctx: &Context<'_>) -> bool {
        let state = &mut self.state;
        if state.outcome.is_some()
            || !state.is_my_turn
            || index >= 9
            || state.board.get(index) != Mark::Empty
        {
            return false;
        }

        state.board.set(index, state.my_mark());

        if let Some(outcome) = Outcome::from_board(&state.board) {
            state.outcome = Some(outcome);
            match outcome {
                Outcome::X => state.score_x += 1,
                Outcome::O => state.score_o += 1,
                Outcome::Draw => {}
            }
            state.games_played += 1;
            debug!(?outcome, games_played = state.games_played, "tic-tac-toe round over");
            ctx.send(TicTacToeMessage::GameEnd {
                winner: outcome,
                board: state.board,
                score_x: state.score_x,
                score_o: state.score_o,
                games_played: state.games_played,
            });
            return true;
        }

        if ctx.is_connected() {
            state.is_my_turn = false;
        } else {
            state.is_player_x = !state.is_player_x;
        }
        ctx.send(TicTacToeMessage::GameMove {
            index,
            board: state.board,
        });
        true
    }

    fn move_cursor(&mut self, dx: isize, dy: isize) {
        let col = (self.cursor % 3) as isize + dx;
        let row = (self.cursor / 3) as isize + dy;
        if (0..3).contains(&col) && (0..3).contains(&row) {
            self.cursor = (row * 3 + col) as usize;
        }
    }
}

impl Game for TicTacToe {
    type Message = TicTacToeMessage;

    const ID: GameId = GameId::TicTacToe;

    fn initialize(&mut self, ctx: &Context<'_>) {
        if self.initialized {
            return;
        }
        self.state.deal(ctx);
        self.initialized = true;
    }

    fn start_new_game(&mut self, ctx: &Context<'_>) {
        self.state.deal(ctx);
        ctx.send(TicTacToeMessage::NewGame {
            board: self.state.board,
            is_my_turn: !self.state.is_my_turn,
            is_player_x: !self.state.is_player_x,
        });
    }

    fn handle_peer_data(&mut self, msg: TicTacToeMessage, _ctx: &Context<'_>) {
        let state = &mut self.state;
        match msg {
            TicTacToeMessage::GameMove { board, .. } => {
                state.board = board;
                // A peer ends rounds with game-end, so an outcome here means the
                // boards drifted; show it but leave the counters alone.
                state.outcome = Outcome::from_board(&board);
                if state.outcome.is_none() {
                    state.is_my_turn = true;
                }
            }
            TicTacToeMessage::GameEnd {
                winner,
                board,
                score_x,
                score_o,
                games_played,
            } => {
                state.board = board;
                state.score_x = score_x;
                state.score_o = score_o;
                state.games_played = games_played;
                state.outcome = Some(winner);
            }
            TicTacToeMessage::NewGame {
                board,
                is_my_turn,
                is_player_x,
            } => {
                state.board = board;
                state.is_my_turn = is_my_turn;
                state.is_player_x = is_player_x;
                state.outcome = Outcome::from_board(&board);
            }
        }
    }

    fn reset(&mut self, ctx: &Context<'_>) {
        if !self.state.board.is_empty() {
            debug!("tic-tac-toe round in progress, keeping board");
            return;
        }
        self.state.deal(ctx);
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

    fn handle_key(&mut self, key: KeyEvent, ctx: &Context<'_>) -> Result<(), ActionError> {
        match key.code {
            KeyCode::Left => self.move_cursor(-1, 0),
            KeyCode::Right => self.move_cursor(1, 0),
            KeyCode::Up => self.move_cursor(0, -1),
            KeyCode::Down => self.move_cursor(0, 1),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if !self.handle_cell_click(self.cursor, ctx) {
                    if self.state.outcome.is_some() {
                        return Err(ActionError::GameOver);
                    }
                    if !self.state.is_my_turn {
                        return Err(ActionError::NotYourTurn);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        TicTacToeRenderer::render(frame, area, self);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;
    use crate::core::connection::ConnectionState;
    use crate::core::protocol::PeerMessage;
    use crate::games::GameMessage;

    fn board(cells: &str) -> Board {
        let mut board = Board::default();
        for (i, c) in cells.chars().enumerate() {
            board.set(
                i,
                match c {
                    'X' => Mark::X,
                    'O' => Mark::O,
                    _ => Mark::Empty,
                },
            );
        }
        board
    }

    fn peer(is_host: bool) -> (ConnectionState, UnboundedReceiver<PeerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionState::connected(tx, is_host), rx)
    }

    fn sent(rx: &mut UnboundedReceiver<PeerMessage>) -> TicTacToeMessage {
        match rx.try_recv() {
            Ok(PeerMessage::Game(GameMessage::TicTacToe(msg))) => msg,
            other => panic!("expected a tic-tac-toe message, got {other:?}"),
        }
    }

    #[test]
    fn every_line_wins() {
        for line in WIN_LINES {
            let mut b = Board::default();
            for i in line {
                b.set(i, Mark::O);
            }
            assert_eq!(b.winner(), Some(Mark::O), "line {line:?}");
        }
    }

    #[test]
    fn full_board_without_line_is_a_draw() {
        let b = board("XOXXOOOXX");
        assert_eq!(b.winner(), None);
        assert_eq!(Outcome::from_board(&b), Some(Outcome::Draw));
    }

    #[test]
    fn partial_board_has_no_outcome() {
        assert_eq!(Outcome::from_board(&board("XO_______")), None);
    }

    #[test]
    fn host_diagonal_wins_and_broadcasts_game_end() {
        let (connection, mut rx) = peer(true);
        let ctx = Context::new(&connection, Instant::now());
        let mut game = TicTacToe::default();
        game.initialize(&ctx);

        assert!(game.handle_cell_click(0, &ctx));
        assert!(matches!(sent(&mut rx), TicTacToeMessage::GameMove { index: 0, .. }));
        game.handle_peer_data(
            TicTacToeMessage::GameMove { index: 1, board: board("XO_______") },
            &ctx,
        );

        assert!(game.handle_cell_click(4, &ctx));
        sent(&mut rx);
        game.handle_peer_data(
            TicTacToeMessage::GameMove { index: 2, board: board("XOO_X____") },
            &ctx,
        );

        assert!(game.handle_cell_click(8, &ctx));
        assert_eq!(game.check_winner(), Some(Mark::X));
        assert_eq!(game.state().score_x, 1);
        assert_eq!(game.state().games_played, 1);
        assert_eq!(
            sent(&mut rx),
            TicTacToeMessage::GameEnd {
                winner: Outcome::X,
                board: board("XOO_X___X"),
                score_x: 1,
                score_o: 0,
                games_played: 1,
            }
        );
    }

    #[test]
    fn clicks_ignored_off_turn_or_on_occupied_cells() {
        let (connection, mut rx) = peer(false);
        let ctx = Context::new(&connection, Instant::now());
        let mut game = TicTacToe::default();
        game.initialize(&ctx);

        assert!(!game.handle_cell_click(0, &ctx));
        game.handle_peer_data(
            TicTacToeMessage::GameMove { index: 0, board: board("X________") },
            &ctx,
        );
        assert!(!game.handle_cell_click(0, &ctx));
        assert!(rx.try_recv().is_err());
        assert!(game.handle_cell_click(1, &ctx));
        assert_eq!(game.state().board, board("XO_______"));
    }

    #[test]
    fn game_move_reproduces_sender_board() {
        let (host_conn, mut host_rx) = peer(true);
        let host_ctx = Context::new(&host_conn, Instant::now());
        let mut host = TicTacToe::default();
        host.initialize(&host_ctx);
        host.handle_cell_click(5, &host_ctx);

        let (guest_conn, _guest_rx) = peer(false);
        let guest_ctx = Context::new(&guest_conn, Instant::now());
        let mut guest = TicTacToe::default();
        guest.initialize(&guest_ctx);
        guest.handle_peer_data(sent(&mut host_rx), &guest_ctx);

        assert_eq!(guest.state().board, host.state().board);
        assert!(guest.state().is_my_turn);
    }

    #[test]
    fn new_game_assigns_the_complement() {
        let (host_conn, mut host_rx) = peer(true);
        let host_ctx = Context::new(&host_conn, Instant::now());
        let mut host = TicTacToe::default();
        host.start_new_game(&host_ctx);

        let (guest_conn, _guest_rx) = peer(false);
        let guest_ctx = Context::new(&guest_conn, Instant::now());
        let mut guest = TicTacToe::default();
        guest.handle_peer_data(sent(&mut host_rx), &guest_ctx);

        assert!(host.state().is_player_x && host.state().is_my_turn);
        assert!(!guest.state().is_player_x && !guest.state().is_my_turn);
    }

    #[test]
    fn reset_keeps_a_round_in_progress() {
        let (connection, _rx) = peer(true);
        let ctx = Context::new(&connection, Instant::now());
        let mut game = TicTacToe::default();
        game.initialize(&ctx);
        game.handle_cell_click(3, &ctx);

        game.reset(&ctx);
        assert_eq!(game.state().board.get(3), Mark::X);
    }

    #[test]
    fn reset_rederives_turn_on_an_empty_board() {
        let (guest, _guest_rx) = peer(false);
        let mut game = TicTacToe::default();
        game.initialize(&Context::new(&guest, Instant::now()));
        assert!(!game.state().is_my_turn);

        let (host, _host_rx) = peer(true);
        game.reset(&Context::new(&host, Instant::now()));
        assert!(game.state().is_player_x && game.state().is_my_turn);
    }

    #[test]
    fn solo_player_alternates_marks() {
        let solo = ConnectionState::solo();
        let ctx = Context::new(&solo, Instant::now());
        let mut game = TicTacToe::default();
        game.initialize(&ctx);

        assert!(game.handle_cell_click(0, &ctx));
        assert!(game.handle_cell_click(1, &ctx));
        assert_eq!(game.state().board, board("XO_______"));
        assert!(game.state().is_my_turn);
    }

    #[test]
    fn game_end_adopts_peer_counters() {
        let (connection, _rx) = peer(false);
        let ctx = Context::new(&connection, Instant::now());
        let mut game = TicTacToe::default();
        game.handle_peer_data(
            TicTacToeMessage::GameEnd {
                winner: Outcome::Draw,
                board: board("XOXXOOOXX"),
                score_x: 2,
                score_o: 1,
                games_played: 4,
            },
            &ctx,
        );
        assert_eq!(game.state().games_played, 4);
        assert_eq!(game.state().outcome, Some(Outcome::Draw));
        assert!(!game.handle_cell_click(0, &ctx));
    }
}

//! Top-level session: one Pomodoro timer shared with the peer, plus the
//! break area where the games live.
//!
//! The session owns the connection record and hands games a borrowed
//! [`Context`] for every callback, so nothing below it can mutate the
//! connection or outlive a frame.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};
use tracing::{debug, info};

use crate::core::connection::ConnectionState;
use crate::core::game::Context;
use crate::core::protocol::{PeerMessage, TimerMessage};
use crate::core::renderer::rules_modal;
use crate::core::timer::{format_time, Phase, PomodoroTimer, TimerState};
use crate::games::instructions::instructions;
use crate::games::{create_default_manager, GameId, GameManager};

pub const NOTICE_DURATION: Duration = Duration::from_secs(3);

const MINUTE: u32 = 60;
const MIN_MINUTES: u32 = 1;
const MAX_MINUTES: u32 = 90;

#[derive(Debug, Clone)]
struct Notice {
    text: String,
    expires: Instant,
}

pub struct Session {
    timer: PomodoroTimer,
    connection: ConnectionState,
    games: GameManager,
    notice: Option<Notice>,
    break_open: bool,
    show_rules: bool,
    quit: bool,
}

impl Session {
    /// Registers and initializes every game. The break area starts closed.
    pub fn new(timer: TimerState, connection: ConnectionState, now: Instant) -> Self {
        let mut session = Self {
            timer: PomodoroTimer::new(timer),
            connection,
            games: create_default_manager(),
            notice: None,
            break_open: false,
            show_rules: false,
            quit: false,
        };
        let ctx = Context::new(&session.connection, now);
        session.games.initialize(&ctx);
        session.games.hide_current_game(&ctx);
        session
    }

    pub fn timer(&self) -> &PomodoroTimer {
        &self.timer
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn games(&self) -> &GameManager {
        &self.games
    }

    pub fn is_break_open(&self) -> bool {
        self.break_open
    }

    pub fn is_showing_rules(&self) -> bool {
        self.show_rules
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_ref().map(|n| n.text.as_str())
    }

    fn notify(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        debug!(notice = %text, "notice");
        self.notice = Some(Notice {
            text,
            expires: now + NOTICE_DURATION,
        });
    }

    /// First call once the connection is settled. The host pushes its timer
    /// so both sides start from the same state.
    pub fn start(&mut self, now: Instant) {
        if !self.connection.is_connected() {
            self.notify("Timer started in solo mode", now);
            return;
        }
        if self.connection.is_host() {
            self.connection.send(self.timer.sync_message());
            self.notify("Peer connected!", now);
        } else {
            self.notify("Connected to host!", now);
        }
    }

    pub fn on_disconnect(&mut self, now: Instant) {
        if !self.connection.is_connected() {
            return;
        }
        info!("peer disconnected, continuing locally");
        self.connection.mark_disconnected();
        self.notify("Peer disconnected", now);
    }

    /// Timer traffic drives the timer; everything else belongs to the games.
    pub fn handle_peer_message(&mut self, msg: PeerMessage, now: Instant) {
        match msg {
            PeerMessage::Timer(msg) => {
                let settings = matches!(msg, TimerMessage::TimerSettingsUpdate { .. });
                if let Some(phase) = self.timer.apply(msg, now) {
                    self.enter_phase(phase, now);
                } else if settings {
                    self.notify("Timer settings updated by peer", now);
                }
            }
            other => {
                let switched = matches!(other, PeerMessage::Switch(_));
                let ctx = Context::new(&self.connection, now);
                self.games.handle_peer_data(other, &ctx);
                if switched && !self.break_open {
                    self.games.hide_current_game(&ctx);
                }
            }
        }
    }

    /// Heartbeat: runs due timer seconds, expires the notice, and lets games
    /// resolve whatever they scheduled.
    pub fn tick(&mut self, now: Instant) {
        if let Some(phase) = self.timer.advance(now) {
            self.connection.send(TimerMessage::TimerPhaseChange {
                state: *self.timer.state(),
            });
            self.enter_phase(phase, now);
        }
        if self.notice.as_ref().is_some_and(|n| n.expires <= now) {
            self.notice = None;
        }
        let ctx = Context::new(&self.connection, now);
        self.games.on_tick(&ctx);
    }

    fn enter_phase(&mut self, phase: Phase, now: Instant) {
        info!(?phase, "phase change");
        let ctx = Context::new(&self.connection, now);
        match phase {
            Phase::Rest => {
                self.break_open = true;
                self.games.show_current_game(&ctx);
                self.games.reset_current_game(&ctx);
                self.notify("Rest time! Game time!", now);
            }
            Phase::Focus => {
                self.break_open = false;
                self.games.hide_current_game(&ctx);
                self.notify("Focus time started!", now);
            }
        }
    }

    pub fn toggle_timer(&mut self, now: Instant) {
        let msg = self.timer.toggle(now);
        self.connection.send(msg);
    }

    pub fn reset_timer(&mut self, now: Instant) {
        let before = self.timer.phase();
        let msg = self.timer.reset();
        self.connection.send(msg);
        if self.timer.phase() != before {
            self.enter_phase(Phase::Focus, now);
        }
    }

    /// Steps a phase length by whole minutes, kept within 1..=90.
    pub fn adjust_durations(&mut self, focus_minutes: i32, rest_minutes: i32) {
        let state = self.timer.state();
        let focus = step_minutes(state.focus_duration, focus_minutes);
        let rest = step_minutes(state.rest_duration, rest_minutes);
        if focus == state.focus_duration && rest == state.rest_duration {
            return;
        }
        let msg = self.timer.update_settings(focus, rest);
        self.connection.send(msg);
    }

    /// Opens the break area now, whatever the phase.
    pub fn play_now(&mut self, now: Instant) {
        self.break_open = true;
        let ctx = Context::new(&self.connection, now);
        self.games.show_current_game(&ctx);
        self.games.reset_current_game(&ctx);
    }

    /// Switches locally and tells the peer. The newly shown game stays
    /// hidden while the break area is closed.
    pub fn select_game(&mut self, id: GameId, now: Instant) {
        let ctx = Context::new(&self.connection, now);
        if self.games.select_game(id, &ctx) && !self.break_open {
            self.games.hide_current_game(&ctx);
        }
    }

    pub fn new_game(&mut self, now: Instant) {
        let ctx = Context::new(&self.connection, now);
        self.games.start_new_current_game(&ctx);
    }

    pub fn toggle_rules(&mut self) {
        self.show_rules = !self.show_rules;
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }
        if self.show_rules {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Enter) {
                self.show_rules = false;
            }
            return;
        }
        match key.code {
            KeyCode::Esc => self.quit = true,
            KeyCode::Char('s') => self.toggle_timer(now),
            KeyCode::Char('r') => self.reset_timer(now),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_durations(1, 0),
            KeyCode::Char('-') => self.adjust_durations(-1, 0),
            KeyCode::Char(']') => self.adjust_durations(0, 1),
            KeyCode::Char('[') => self.adjust_durations(0, -1),
            KeyCode::Char('p') => self.play_now(now),
            KeyCode::Char('n') => self.new_game(now),
            KeyCode::Char('?') => self.toggle_rules(),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if let Some(&id) = GameId::ALL.get(index) {
                    self.select_game(id, now);
                }
            }
            _ if self.break_open => {
                let ctx = Context::new(&self.connection, now);
                if let Err(err) = self.games.handle_key(key, &ctx) {
                    debug!(%err, "action rejected");
                    self.notify(err.to_string(), now);
                }
            }
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        let [header, notice, body, footer] = Layout::vertical([
            Constraint::Length(5),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.render_header(frame, header);
        if let Some(text) = self.notice() {
            frame.render_widget(
                Paragraph::new(text)
                    .style(Style::default().fg(Color::Black).bg(Color::Yellow))
                    .centered(),
                notice,
            );
        }
        if self.break_open {
            self.render_break(frame, body);
        } else {
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from(""),
                    Line::from("Stay focused. The games open when the break starts."),
                    Line::from(""),
                    Line::from(Span::styled(
                        "[p] Play now",
                        Style::default().fg(Color::Gray),
                    )),
                ])
                .centered()
                .block(Block::default().borders(Borders::ALL)),
                body,
            );
        }
        frame.render_widget(
            Paragraph::new(
                "[s] Start/Pause  [r] Reset  [+/-] Focus  []/[] Rest  [1-3] Game  [n] New game  [?] Rules  [Esc] Quit",
            )
            .style(Style::default().fg(Color::Gray))
            .centered(),
            footer,
        );

        if self.show_rules {
            if let Some(id) = self.games.current() {
                let rules = instructions(id);
                rules_modal(frame, rules.title, rules.lines());
            }
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let state = self.timer.state();
        let (phase, color) = match state.phase() {
            Phase::Focus => ("FOCUS", Color::Red),
            Phase::Rest => ("REST", Color::Green),
        };
        let running = if state.is_running { "running" } else { "paused" };
        let connection = match (
            self.connection.is_connected(),
            self.connection.has_channel(),
            self.connection.is_host(),
        ) {
            (true, _, true) => "Connected with peer (host)".to_string(),
            (true, _, false) => "Connected to host".to_string(),
            (false, true, _) => "Connection closed".to_string(),
            (false, false, _) => "Solo mode".to_string(),
        };
        let connection = match self.connection.session_code() {
            Some(code) if self.connection.is_host() => format!("{connection}  code: {code}"),
            _ => connection,
        };

        let lines = vec![
            Line::from(vec![
                Span::styled(
                    format!(" {phase} "),
                    Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(
                    format_time(state.time_remaining),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("  ({running})")),
            ]),
            Line::from(format!(
                "Focus {} min  Rest {} min",
                state.focus_duration / MINUTE,
                state.rest_duration / MINUTE
            )),
            Line::from(Span::styled(connection, Style::default().fg(Color::Gray))),
        ];
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" pomopair "),
            ),
            area,
        );
    }

    fn render_break(&self, frame: &mut Frame, area: Rect) {
        let [tabs_area, caption_area, game_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(area);
        let titles: Vec<String> = self
            .games
            .list_games()
            .iter()
            .enumerate()
            .map(|(i, info)| format!("{} {}", i + 1, info.name))
            .collect();
        let selected = self
            .games
            .current()
            .and_then(|id| GameId::ALL.iter().position(|g| *g == id))
            .unwrap_or(0);
        frame.render_widget(
            Tabs::new(titles)
                .select(selected)
                .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            tabs_area,
        );
        if let Some(id) = self.games.current() {
            frame.render_widget(
                Paragraph::new(id.info().description).style(Style::default().fg(Color::DarkGray)),
                caption_area,
            );
        }
        self.games.render_current(frame, game_area);
    }
}

fn step_minutes(seconds: u32, delta: i32) -> u32 {
    let minutes = (seconds / MINUTE) as i32 + delta;
    minutes.clamp(MIN_MINUTES as i32, MAX_MINUTES as i32) as u32 * MINUTE
}

#[cfg(test)]
mod tests {
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;
    use crate::core::protocol::SwitchMessage;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::from(code)
    }

    fn drain(rx: &mut UnboundedReceiver<PeerMessage>) -> Vec<PeerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn connected(is_host: bool, timer: TimerState) -> (Session, UnboundedReceiver<PeerMessage>, Instant) {
        let (tx, rx) = mpsc::unbounded_channel();
        let now = Instant::now();
        let session = Session::new(timer, ConnectionState::connected(tx, is_host), now);
        (session, rx, now)
    }

    #[test]
    fn starts_with_break_closed() {
        let now = Instant::now();
        let session = Session::new(TimerState::default(), ConnectionState::solo(), now);
        assert!(!session.is_break_open());
        assert!(!session.games().current_is_visible());
        assert_eq!(session.games().current(), Some(GameId::TicTacToe));
    }

    #[test]
    fn host_pushes_timer_on_start() {
        let (mut session, mut rx, now) = connected(true, TimerState::default());
        session.start(now);
        assert_eq!(
            drain(&mut rx),
            vec![PeerMessage::Timer(TimerMessage::TimerSync {
                state: TimerState::default()
            })]
        );
        assert_eq!(session.notice(), Some("Peer connected!"));
    }

    #[test]
    fn joiner_does_not_push_timer() {
        let (mut session, mut rx, now) = connected(false, TimerState::default());
        session.start(now);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn countdown_opens_break_and_broadcasts() {
        let (mut session, mut rx, now) = connected(true, TimerState::new(2, 60));
        session.handle_key(key(KeyCode::Char('s')), now);
        session.tick(now + Duration::from_secs(2));

        assert!(session.is_break_open());
        assert!(session.games().current_is_visible());
        assert_eq!(session.notice(), Some("Rest time! Game time!"));

        let sent = drain(&mut rx);
        assert!(matches!(sent[0], PeerMessage::Timer(TimerMessage::TimerStart { .. })));
        match &sent[1] {
            PeerMessage::Timer(TimerMessage::TimerPhaseChange { state }) => {
                assert!(!state.is_focus_time);
                assert_eq!(state.time_remaining, 60);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn peer_phase_change_opens_break_without_echo() {
        let (mut session, mut rx, now) = connected(false, TimerState::new(120, 60));
        let rest = TimerState {
            time_remaining: 60,
            is_running: true,
            is_focus_time: false,
            focus_duration: 120,
            rest_duration: 60,
        };
        session.handle_peer_message(TimerMessage::TimerPhaseChange { state: rest }.into(), now);
        assert!(session.is_break_open());
        assert!(session.games().current_is_visible());
        assert!(drain(&mut rx).is_empty());

        session.handle_peer_message(TimerMessage::TimerReset { state: rest }.into(), now);
        assert!(!session.is_break_open());
        assert!(!session.games().current_is_visible());
        assert_eq!(session.notice(), Some("Focus time started!"));
    }

    #[test]
    fn durations_step_by_minutes_and_clamp() {
        let (mut session, mut rx, _now) = connected(true, TimerState::new(60, 60));
        session.adjust_durations(1, 0);
        assert_eq!(session.timer().state().focus_duration, 120);
        assert_eq!(session.timer().state().time_remaining, 120);
        assert!(matches!(
            drain(&mut rx)[..],
            [PeerMessage::Timer(TimerMessage::TimerSettingsUpdate { .. })]
        ));

        session.adjust_durations(0, -1);
        assert_eq!(session.timer().state().rest_duration, 60);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn number_keys_switch_and_announce() {
        let (mut session, mut rx, now) = connected(true, TimerState::default());
        session.handle_key(key(KeyCode::Char('2')), now);
        assert_eq!(session.games().current(), Some(GameId::Memory));
        assert!(!session.games().current_is_visible());
        assert_eq!(
            drain(&mut rx),
            vec![PeerMessage::Switch(SwitchMessage::GameSwitch {
                game_id: GameId::Memory
            })]
        );
    }

    #[test]
    fn rejected_action_becomes_notice() {
        let (mut session, mut rx, now) = connected(false, TimerState::default());
        session.play_now(now);
        drain(&mut rx);

        session.handle_key(key(KeyCode::Enter), now);
        assert_eq!(session.notice(), Some("It's not your turn"));
        assert!(drain(&mut rx).is_empty());

        session.tick(now + NOTICE_DURATION);
        assert_eq!(session.notice(), None);
    }

    #[test]
    fn game_keys_ignored_while_focusing() {
        let now = Instant::now();
        let mut session = Session::new(TimerState::default(), ConnectionState::solo(), now);
        session.handle_key(key(KeyCode::Enter), now);
        assert_eq!(session.notice(), None);
        assert!(!session.should_quit());
    }

    #[test]
    fn disconnect_keeps_local_play() {
        let (mut session, _rx, now) = connected(true, TimerState::default());
        session.on_disconnect(now);
        assert!(!session.connection().is_connected());
        assert_eq!(session.notice(), Some("Peer disconnected"));

        session.play_now(now);
        session.handle_key(key(KeyCode::Enter), now);
        assert_eq!(session.notice(), Some("Peer disconnected"));
    }

    #[test]
    fn rules_overlay_swallows_keys() {
        let now = Instant::now();
        let mut session = Session::new(TimerState::default(), ConnectionState::solo(), now);
        session.handle_key(key(KeyCode::Char('?')), now);
        assert!(session.is_showing_rules());
        session.handle_key(key(KeyCode::Char('s')), now);
        assert!(!session.timer().state().is_running);
        session.handle_key(key(KeyCode::Esc), now);
        assert!(!session.is_showing_rules());
        assert!(!session.should_quit());
        session.handle_key(key(KeyCode::Esc), now);
        assert!(session.should_quit());
    }

    #[test]
    fn break_shows_the_game_blurb() {
        let now = Instant::now();
        let mut session = Session::new(TimerState::default(), ConnectionState::solo(), now);
        session.play_now(now);

        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| session.render(f)).unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains(GameId::TicTacToe.info().description));
    }
}

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::protocol::TimerMessage;

pub const DEFAULT_FOCUS_SECS: u32 = 25 * 60;
pub const DEFAULT_REST_SECS: u32 = 5 * 60;
const TICK: Duration = Duration::from_secs(1);

/// Countdown state, exchanged verbatim with the peer. Durations are seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub time_remaining: u32,
    pub is_running: bool,
    pub is_focus_time: bool,
    pub focus_duration: u32,
    pub rest_duration: u32,
}

impl TimerState {
    pub fn new(focus_duration: u32, rest_duration: u32) -> Self {
        Self {
            time_remaining: focus_duration,
            is_running: false,
            is_focus_time: true,
            focus_duration,
            rest_duration,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.is_focus_time {
            Phase::Focus
        } else {
            Phase::Rest
        }
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(DEFAULT_FOCUS_SECS, DEFAULT_REST_SECS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Focus,
    Rest,
}

/// Focus ⇄ rest countdown. Pure state machine: callers feed it the current
/// instant and broadcast the messages it hands back.
#[derive(Debug, Clone)]
pub struct PomodoroTimer {
    state: TimerState,
    next_tick: Option<Instant>,
}

impl PomodoroTimer {
    pub fn new(state: TimerState) -> Self {
        Self { state, next_tick: None }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn sync_message(&self) -> TimerMessage {
        TimerMessage::TimerSync { state: self.state }
    }

    /// Start or pause.
    pub fn toggle(&mut self, now: Instant) -> TimerMessage {
        self.state.is_running = !self.state.is_running;
        if self.state.is_running {
            self.next_tick = Some(now + TICK);
            TimerMessage::TimerStart { state: self.state }
        } else {
            self.next_tick = None;
            TimerMessage::TimerPause { state: self.state }
        }
    }

    pub fn reset(&mut self) -> TimerMessage {
        self.stop_at_focus_start();
        TimerMessage::TimerReset { state: self.state }
    }

    /// New durations in seconds. A stopped timer picks up the new length of
    /// the phase it is in; a running one keeps counting.
    pub fn update_settings(&mut self, focus_duration: u32, rest_duration: u32) -> TimerMessage {
        let old_focus = self.state.focus_duration;
        let old_rest = self.state.rest_duration;
        self.state.focus_duration = focus_duration;
        self.state.rest_duration = rest_duration;

        if !self.state.is_running {
            if self.state.is_focus_time && old_focus != focus_duration {
                self.state.time_remaining = focus_duration;
            } else if !self.state.is_focus_time && old_rest != rest_duration {
                self.state.time_remaining = rest_duration;
            }
        }

        TimerMessage::TimerSettingsUpdate { state: self.state }
    }

    /// Runs every whole second that has elapsed. Returns the phase entered,
    /// if the countdown crossed zero.
    pub fn advance(&mut self, now: Instant) -> Option<Phase> {
        let mut entered = None;
        while let Some(due) = self.next_tick {
            if due > now {
                break;
            }
            self.next_tick = Some(due + TICK);
            if let Some(phase) = self.tick() {
                entered = Some(phase);
            }
        }
        entered
    }

    fn tick(&mut self) -> Option<Phase> {
        self.state.time_remaining = self.state.time_remaining.saturating_sub(1);
        if self.state.time_remaining > 0 {
            return None;
        }
        self.state.is_focus_time = !self.state.is_focus_time;
        self.state.time_remaining = if self.state.is_focus_time {
            self.state.focus_duration
        } else {
            self.state.rest_duration
        };
        Some(self.state.phase())
    }

    /// Applies a peer's timer message. Returns the phase entered when the
    /// message moved this timer into a different phase.
    pub fn apply(&mut self, msg: TimerMessage, now: Instant) -> Option<Phase> {
        let before = self.phase();
        match msg {
            TimerMessage::TimerSync { state } => {
                self.state = state;
                self.next_tick = state.is_running.then(|| now + TICK);
            }
            TimerMessage::TimerStart { .. } => {
                self.state.is_running = true;
                self.next_tick = Some(now + TICK);
            }
            TimerMessage::TimerPause { .. } => {
                self.state.is_running = false;
                self.next_tick = None;
            }
            TimerMessage::TimerReset { .. } => self.stop_at_focus_start(),
            TimerMessage::TimerPhaseChange { state } => {
                self.state.is_focus_time = state.is_focus_time;
                self.state.time_remaining = state.time_remaining;
            }
            TimerMessage::TimerSettingsUpdate { state } => {
                self.state.focus_duration = state.focus_duration;
                self.state.rest_duration = state.rest_duration;
                if state.is_focus_time == self.state.is_focus_time {
                    self.state.time_remaining = state.time_remaining;
                } else if !state.is_running {
                    self.state.time_remaining = if self.state.is_focus_time {
                        self.state.focus_duration
                    } else {
                        self.state.rest_duration
                    };
                }
            }
        }
        let after = self.phase();
        (after != before).then_some(after)
    }

    fn stop_at_focus_start(&mut self) {
        self.state.is_running = false;
        self.state.is_focus_time = true;
        self.state.time_remaining = self.state.focus_duration;
        self.next_tick = None;
    }
}

/// `MM:SS`
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_timer() -> PomodoroTimer {
        PomodoroTimer::new(TimerState::new(3, 2))
    }

    #[test]
    fn counts_down_and_flips_to_rest() {
        let mut timer = short_timer();
        let start = Instant::now();
        timer.toggle(start);

        assert_eq!(timer.advance(start + Duration::from_secs(2)), None);
        assert_eq!(timer.state().time_remaining, 1);

        assert_eq!(timer.advance(start + Duration::from_secs(3)), Some(Phase::Rest));
        assert_eq!(timer.state().time_remaining, 2);
        assert!(!timer.state().is_focus_time);
    }

    #[test]
    fn paused_timer_does_not_advance() {
        let mut timer = short_timer();
        let start = Instant::now();
        timer.toggle(start);
        let msg = timer.toggle(start);
        assert!(matches!(msg, TimerMessage::TimerPause { .. }));
        assert_eq!(timer.advance(start + Duration::from_secs(10)), None);
        assert_eq!(timer.state().time_remaining, 3);
    }

    #[test]
    fn reset_returns_to_focus() {
        let mut timer = short_timer();
        let start = Instant::now();
        timer.toggle(start);
        timer.advance(start + Duration::from_secs(3));
        timer.reset();
        assert_eq!(*timer.state(), TimerState::new(3, 2));
    }

    #[test]
    fn settings_only_rewind_a_stopped_timer() {
        let mut timer = short_timer();
        timer.update_settings(10, 2);
        assert_eq!(timer.state().time_remaining, 10);

        timer.toggle(Instant::now());
        timer.update_settings(20, 2);
        assert_eq!(timer.state().time_remaining, 10);
        assert_eq!(timer.state().focus_duration, 20);
    }

    #[test]
    fn peer_phase_change_reports_entered_phase_once() {
        let mut timer = short_timer();
        let now = Instant::now();
        let rest = TimerState {
            time_remaining: 2,
            is_running: true,
            is_focus_time: false,
            focus_duration: 3,
            rest_duration: 2,
        };
        assert_eq!(
            timer.apply(TimerMessage::TimerPhaseChange { state: rest }, now),
            Some(Phase::Rest)
        );
        assert_eq!(timer.apply(TimerMessage::TimerPhaseChange { state: rest }, now), None);
    }

    #[test]
    fn sync_adopts_running_state() {
        let mut timer = short_timer();
        let now = Instant::now();
        let remote = TimerState {
            time_remaining: 2,
            is_running: true,
            is_focus_time: true,
            focus_duration: 3,
            rest_duration: 2,
        };
        timer.apply(TimerMessage::TimerSync { state: remote }, now);
        assert_eq!(timer.advance(now + Duration::from_secs(1)), None);
        assert_eq!(timer.state().time_remaining, 1);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(25 * 60), "25:00");
        assert_eq!(format_time(61), "01:01");
    }
}

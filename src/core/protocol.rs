//! Peer wire protocol.
//!
//! Every message is a JSON object carrying a `type` tag. Game traffic also
//! carries a `gameType` tag naming the game it belongs to, so the receiving
//! Game Manager can route it even when a different game is on screen.

use serde::{Deserialize, Serialize};

use crate::core::error::ProtocolError;
use crate::core::timer::TimerState;
use crate::games::{GameId, GameMessage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeerMessage {
    Game(GameMessage),
    Switch(SwitchMessage),
    Timer(TimerMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SwitchMessage {
    #[serde(rename = "game-switch")]
    GameSwitch {
        #[serde(rename = "gameId")]
        game_id: GameId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TimerMessage {
    TimerSync { state: TimerState },
    TimerStart { state: TimerState },
    TimerPause { state: TimerState },
    TimerReset { state: TimerState },
    TimerPhaseChange { state: TimerState },
    TimerSettingsUpdate { state: TimerState },
}

impl TimerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            TimerMessage::TimerSync { .. } => "timer-sync",
            TimerMessage::TimerStart { .. } => "timer-start",
            TimerMessage::TimerPause { .. } => "timer-pause",
            TimerMessage::TimerReset { .. } => "timer-reset",
            TimerMessage::TimerPhaseChange { .. } => "timer-phase-change",
            TimerMessage::TimerSettingsUpdate { .. } => "timer-settings-update",
        }
    }
}

impl PeerMessage {
    /// The `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::Game(msg) => msg.kind(),
            PeerMessage::Switch(SwitchMessage::GameSwitch { .. }) => "game-switch",
            PeerMessage::Timer(msg) => msg.kind(),
        }
    }

    pub fn game_switch(game_id: GameId) -> Self {
        PeerMessage::Switch(SwitchMessage::GameSwitch { game_id })
    }
}

impl From<TimerMessage> for PeerMessage {
    fn from(msg: TimerMessage) -> Self {
        PeerMessage::Timer(msg)
    }
}

impl From<GameMessage> for PeerMessage {
    fn from(msg: GameMessage) -> Self {
        PeerMessage::Game(msg)
    }
}

pub fn encode(msg: &PeerMessage) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(msg)?)
}

pub fn decode(bytes: &[u8]) -> Result<PeerMessage, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

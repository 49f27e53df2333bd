use thiserror::Error;

/// Why a local action was refused. Refusals never touch game state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("It's not your turn")]
    NotYourTurn,
    #[error("The game is over")]
    GameOver,
    #[error("Select a unit first")]
    NothingSelected,
    #[error("You can only control your own units")]
    NotYourUnit,
    #[error("{0}")]
    Incapable(&'static str),
    #[error("That tile is not a valid target")]
    InvalidTarget,
    #[error("Not enough resources. Needed: {needed}")]
    NotEnoughResources { needed: u32 },
    #[error("No space to deploy unit")]
    NoSpace,
    #[error("Can't build there")]
    NoBuildSite,
    #[error("Wait for the last action to finish")]
    Cooldown,
}

/// A peer frame that could not be decoded into a known message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed peer message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("game '{0}' is not registered")]
pub struct UnknownGame(pub String);

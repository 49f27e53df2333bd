/// Macro to register games in the registry with automatic protocol wiring
///
/// Usage in games/mod.rs:
/// ```ignore
/// register_games! {
///     TicTacToe => {
///         module: tictactoe,
///         game: TicTacToe,
///         message: TicTacToeMessage,
///         id: "tictactoe",
///         name: "Tic-Tac-Toe",
///         description: "Three in a row, host plays X"
///     }
/// }
/// ```
///
/// Generates `GameId`, the `gameType`-tagged `GameMessage` sum type with its
/// conversions, and `create_default_manager()` which registers every game in
/// declaration order.
#[macro_export]
macro_rules! register_games {
    (
        $(
            $variant:ident => {
                module: $module:ident,
                game: $game:ident,
                message: $message:ident,
                id: $id:literal,
                name: $name:literal,
                description: $desc:literal $(,)?
            }
        ),* $(,)?
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum GameId {
            $(
                #[serde(rename = $id)]
                $variant,
            )*
        }

        impl GameId {
            /// Menu order
            pub const ALL: &'static [GameId] = &[$(GameId::$variant),*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(GameId::$variant => $id,)*
                }
            }

            pub fn info(self) -> GameInfo {
                match self {
                    $(
                        GameId::$variant => GameInfo {
                            id: self,
                            name: $name,
                            description: $desc,
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for GameId {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for GameId {
            type Err = $crate::core::error::UnknownGame;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($id => Ok(GameId::$variant),)*
                    other => Err($crate::core::error::UnknownGame(other.to_string())),
                }
            }
        }

        /// Game traffic, tagged with the target game's id under `gameType`.
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(tag = "gameType")]
        pub enum GameMessage {
            $(
                #[serde(rename = $id)]
                $variant($module::$message),
            )*
        }

        impl GameMessage {
            pub fn game_id(&self) -> GameId {
                match self {
                    $(GameMessage::$variant(_) => GameId::$variant,)*
                }
            }

            pub fn kind(&self) -> &'static str {
                match self {
                    $(GameMessage::$variant(msg) => msg.kind(),)*
                }
            }
        }

        $(
            impl From<$module::$message> for GameMessage {
                fn from(msg: $module::$message) -> Self {
                    GameMessage::$variant(msg)
                }
            }

            impl From<$module::$message> for $crate::core::protocol::PeerMessage {
                fn from(msg: $module::$message) -> Self {
                    $crate::core::protocol::PeerMessage::Game(GameMessage::$variant(msg))
                }
            }

            impl TryFrom<GameMessage> for $module::$message {
                type Error = GameMessage;

                fn try_from(msg: GameMessage) -> Result<Self, GameMessage> {
                    match msg {
                        GameMessage::$variant(inner) => Ok(inner),
                        #[allow(unreachable_patterns)]
                        other => Err(other),
                    }
                }
            }
        )*

        /// Manager with every registered game, in menu order.
        pub fn create_default_manager() -> GameManager {
            let mut manager = GameManager::new();
            $(
                manager.register($module::$game::default());
            )*
            manager
        }
    };
}

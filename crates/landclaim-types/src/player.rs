use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::identity::PlayerId;

/// Fixed textual date-time format of the last-login line in player files.
pub const LAST_LOGIN_FORMAT: &str = "%Y.%m.%d.%H.%M.%S";

/// Per-player claim-block accounting.
///
/// Created zero-valued on first access when no file exists. The owning layer
/// must persist it explicitly after every mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player: PlayerId,
    /// Local wall-clock time of the last login, second precision.
    pub last_login: Option<NaiveDateTime>,
    /// Blocks earned by play.
    pub accrued_blocks: i32,
    /// Blocks granted by administrators.
    pub bonus_blocks: i32,
}

impl PlayerRecord {
    /// The unknown-player default.
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            last_login: None,
            accrued_blocks: 0,
            bonus_blocks: 0,
        }
    }
}

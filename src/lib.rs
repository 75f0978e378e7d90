//! Spell Shooter - runtime core of an arcade spelling drill
//!
//! Core modules:
//! - `curriculum`: Drill content model, selection and preview
//! - `sim`: Deterministic simulation (rows, physics, scoring, escalation)
//! - `session`: Frame-driven session loop and scheduler abstraction
//! - `records`: High score and leaderboard records
//! - `settings`: Host/playfield settings

pub mod curriculum;
pub mod records;
pub mod session;
pub mod settings;
pub mod sim;

pub use curriculum::{Curriculum, DrillItem, DrillMode, Selection};
pub use records::{JsonFileStore, LeaderboardEntry, MemoryStore, OutcomeStore, RecordKey};
pub use session::{
    FrameHandle, FrameScheduler, HintSpeech, ManualScheduler, SessionLoop, StartError,
};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (assumed 60 Hz frame, not measured)
    pub const FRAME_DT: f32 = 1.0 / 60.0;

    /// Player ship dimensions
    pub const PLAYER_W: f32 = 48.0;
    pub const PLAYER_H: f32 = 64.0;

    /// Target ship dimensions
    pub const SHIP_W: f32 = 48.0;
    pub const SHIP_H: f32 = 48.0;

    /// Projectile hitbox
    pub const BULLET_W: f32 = 4.0;
    pub const BULLET_H: f32 = 16.0;

    /// Projectiles above this y have left the field
    pub const OFF_FIELD_Y: f32 = -20.0;

    /// Row top y at the start of every round
    pub const ROW_START_Y: f32 = 40.0;
    /// Distance kept between the row and the player before failing
    pub const SAFETY_BAND: f32 = 48.0;

    /// Minimum time between two shots
    pub const COOLDOWN_MS: u64 = 200;

    /// Player movement per discrete command
    pub const KEY_STEP: f32 = 14.0;
    pub const TAP_STEP: f32 = 44.0;

    /// Item tunable fallbacks
    pub const DEFAULT_ROW_SIZE: usize = 10;
    pub const DEFAULT_ROW_STEP: f32 = 36.0;
    pub const DEFAULT_BULLET_SPEED: f32 = 460.0;
    pub const DEFAULT_FALL_SPEED: f32 = 1.0;

    /// Only the first rounds of an item are played
    pub const MAX_ROUNDS: usize = 10;
}

/// Case-insensitive comparison key for tokens
///
/// Full Unicode uppercasing, so a key may be longer than its token
/// (`ß` folds to `SS`). Only ever compared, never displayed.
#[inline]
pub fn fold_token(token: &str) -> String {
    token.to_uppercase()
}

/// Compare two tokens ignoring case
#[inline]
pub fn tokens_match(a: &str, b: &str) -> bool {
    fold_token(a) == fold_token(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_fold_to_uppercase() {
        assert!(tokens_match("b", "B"));
        assert!(!tokens_match("b", "d"));
        assert_eq!(fold_token("Straße"), "STRASSE");
        assert!(tokens_match("straße", "STRASSE"));
    }
}

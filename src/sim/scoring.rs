//! Score, combo and hit counters

use serde::{Deserialize, Serialize};

use crate::curriculum::DrillMode;

/// Points for any correct hit
pub const BASE_POINTS: u64 = 50;
/// Bonus per consecutive correct hit beyond the first
pub const COMBO_STEP: u64 = 10;
pub const MAX_COMBO_BONUS: u64 = 50;
/// Deducted on a wrong hit (score floors at zero)
pub const WRONG_PENALTY: u64 = 10;

/// Points awarded for a correct hit at the given streak length
pub fn points_for_combo(combo: u32) -> u64 {
    let bonus = COMBO_STEP.saturating_mul(u64::from(combo.saturating_sub(1)));
    BASE_POINTS + bonus.min(MAX_COMBO_BONUS)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub score: u64,
    /// Consecutive correct hits
    pub combo: u32,
    /// Displayed "correct" counter (tokens, or rounds in word mode)
    pub correct: u32,
    pub wrong: u32,
}

impl Score {
    /// Apply a hit; returns the score change
    pub fn on_hit(&mut self, correct: bool, mode: DrillMode) -> i64 {
        if correct {
            self.combo += 1;
            let points = points_for_combo(self.combo);
            self.score += points;
            if mode != DrillMode::Word {
                self.correct += 1;
            }
            points as i64
        } else {
            self.combo = 0;
            self.wrong += 1;
            let penalty = WRONG_PENALTY.min(self.score);
            self.score -= penalty;
            -(penalty as i64)
        }
    }

    /// Word mode counts one "correct" per completed sequence
    pub fn on_round_complete(&mut self, mode: DrillMode) {
        if mode == DrillMode::Word {
            self.correct += 1;
        }
    }
}

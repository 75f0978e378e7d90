//! Row descent on misses and wrong hits

use super::state::{GameEvent, Outcome, SessionState};
use crate::consts::*;

/// Row y at which the session fails for a field of this height
pub fn failure_limit(field_height: f32) -> f32 {
    field_height - PLAYER_H - SAFETY_BAND
}

/// Result of a step-down
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Escalation {
    Held { row_y: f32 },
    Breached { row_y: f32 },
}

impl SessionState {
    /// Push the row one step toward the player; fails the session past the limit
    pub fn step_down(&mut self, events: &mut Vec<GameEvent>) -> Escalation {
        self.row_y += self.item.row_step();
        for target in &mut self.targets {
            target.pos.y = self.row_y;
        }
        events.push(GameEvent::SteppedDown { row_y: self.row_y });
        log::debug!("Row stepped down to {}", self.row_y);

        if self.row_y >= failure_limit(self.field.height) {
            self.finish(Outcome::Failed, events);
            Escalation::Breached { row_y: self.row_y }
        } else {
            Escalation::Held { row_y: self.row_y }
        }
    }
}

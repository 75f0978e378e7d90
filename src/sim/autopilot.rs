//! Demo player
//!
//! Steers under the target carrying the needed token and fires when lined
//! up. Used by the headless runner; never called from `tick`.

use super::state::SessionState;
use super::tick::{Command, StepSource};
use crate::consts::*;
use crate::tokens_match;

/// Next command for the demo player, if any
pub fn next_command(state: &SessionState) -> Option<Command> {
    if !state.is_running() {
        return None;
    }
    let need = state.rounds.needed()?;
    let target = state.targets.iter().find(|t| tokens_match(&t.token, need))?;

    // Bullet centre lines up with the target centre
    let desired = (target.pos.x + SHIP_W / 2.0 - PLAYER_W / 2.0).clamp(0.0, state.field.player_max_x());
    let delta = desired - state.player.x;
    let step = state.controls.key_step;

    if delta.abs() > step / 2.0 {
        let source = if delta.abs() > state.controls.tap_step {
            StepSource::Tap
        } else {
            StepSource::Key
        };
        return Some(if delta < 0.0 {
            Command::MoveLeft(source)
        } else {
            Command::MoveRight(source)
        });
    }

    // One shot in flight at a time
    if state.bullets.is_empty() {
        Some(Command::Fire)
    } else {
        None
    }
}

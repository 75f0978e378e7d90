//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (rows left to right, projectiles oldest first)
//! - No rendering, audio or platform dependencies

pub mod autopilot;
pub mod collision;
pub mod escalation;
pub mod line;
pub mod round;
pub mod scoring;
pub mod state;
pub mod tick;

pub use collision::{Aabb, advance_bullets, first_hit};
pub use escalation::{Escalation, failure_limit};
pub use line::{CandidateSource, build_row, slot_positions};
pub use round::{RoundAdvance, RoundContent, RoundTrack};
pub use scoring::{Score, points_for_combo};
pub use state::{
    Bullet, Controls, Field, GameEvent, Outcome, Player, SessionPhase, SessionState, Target,
};
pub use tick::{Command, StepSource, apply_command, tick};

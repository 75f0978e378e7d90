//! Session state and core simulation types
//!
//! Everything a session mutates lives in `SessionState`. A fresh value is
//! built on every session start; nothing here is global.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::round::RoundTrack;
use super::scoring::Score;
use crate::consts::*;
use crate::curriculum::{DrillItem, DrillMode};

/// How a finished session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Every round was completed
    Completed,
    /// The row reached the safety band
    Failed,
    /// Finished by the host before either of the above
    Abandoned,
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    NotStarted,
    Running,
    Finished(Outcome),
}

/// A spawned target carrying one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: u32,
    pub token: String,
    /// Top-left corner; x is fixed at spawn, y follows the row
    pub pos: Vec2,
}

/// A player projectile (moves straight up)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub id: u32,
    pub pos: Vec2,
    /// Vertical velocity in px/s (negative is up)
    pub vel: f32,
}

/// Horizontal-only player position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub x: f32,
}

/// Playfield dimensions in px
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub width: f32,
    pub height: f32,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            width: 540.0,
            height: 640.0,
        }
    }
}

impl Field {
    /// Rightmost x the player may occupy
    pub fn player_max_x(&self) -> f32 {
        (self.width - PLAYER_W).max(0.0)
    }
}

/// Player input tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Controls {
    pub key_step: f32,
    pub tap_step: f32,
    pub cooldown_ms: u64,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            key_step: KEY_STEP,
            tap_step: TAP_STEP,
            cooldown_ms: COOLDOWN_MS,
        }
    }
}

/// Things that happened during a step or command, for renderers and audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    RoundStarted {
        index: usize,
        count: usize,
        hint: String,
    },
    RowBuilt {
        need: String,
        tokens: Vec<String>,
    },
    Fired {
        bullet_id: u32,
    },
    Hit {
        token: String,
        correct: bool,
        points: i64,
    },
    /// A projectile left the field without hitting anything
    Missed,
    SteppedDown {
        row_y: f32,
    },
    RoundCompleted {
        index: usize,
    },
    Finished {
        outcome: Outcome,
    },
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Seed the row generator was created from
    pub seed: u64,
    pub(crate) rng: Pcg32,
    /// Immutable for the session's lifetime
    pub item: DrillItem,
    pub field: Field,
    pub controls: Controls,
    pub phase: SessionPhase,
    pub score: Score,
    pub rounds: RoundTrack,
    /// Current row top y
    pub row_y: f32,
    /// Live targets of the current row
    pub targets: Vec<Target>,
    /// Live projectiles (oldest first)
    pub bullets: Vec<Bullet>,
    pub player: Player,
    /// Time of the last accepted shot
    pub last_shot_ms: Option<u64>,
    /// Simulation steps taken
    pub time_ticks: u64,
    next_id: u32,
}

impl SessionState {
    /// Build a not-yet-started session; `None` when the item has no playable rounds
    pub fn new(item: DrillItem, field: Field, controls: Controls, seed: u64) -> Option<Self> {
        let rounds = RoundTrack::new(&item)?;
        Some(Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            item,
            field,
            controls,
            phase: SessionPhase::NotStarted,
            score: Score::default(),
            rounds,
            row_y: ROW_START_Y,
            targets: Vec::new(),
            bullets: Vec::new(),
            player: Player {
                x: field.player_max_x() / 2.0,
            },
            last_shot_ms: None,
            time_ticks: 0,
            next_id: 1,
        })
    }

    /// Enter the running phase and start the first round
    pub fn start(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.phase != SessionPhase::NotStarted {
            return events;
        }
        self.phase = SessionPhase::Running;
        log::info!(
            "Session started: {} rounds ({}), seed {}",
            self.rounds.round_count(),
            self.item.mode,
            self.seed
        );
        self.start_round(&mut events);
        events
    }

    pub fn mode(&self) -> DrillMode {
        self.item.mode
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            SessionPhase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Move to the finished phase. Returns false if the session was not running.
    pub fn finish(&mut self, outcome: Outcome, events: &mut Vec<GameEvent>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.phase = SessionPhase::Finished(outcome);
        log::info!(
            "Session finished ({:?}): score {}, right {}, wrong {}",
            outcome,
            self.score.score,
            self.right_count(),
            self.score.wrong
        );
        events.push(GameEvent::Finished { outcome });
        true
    }

    /// Rounds completed (word mode) or tokens caught in the current round
    /// (letter mode); the full round count once every round is done
    pub fn right_count(&self) -> u32 {
        let count = self.rounds.round_count();
        let index = self.rounds.index();
        if index >= count {
            return count as u32;
        }
        match self.mode() {
            DrillMode::Word => index as u32,
            DrillMode::LetterRounds => self.rounds.next_index() as u32,
        }
    }

    /// "(n / total)" label of the current round
    pub fn round_label(&self) -> String {
        let count = self.rounds.round_count();
        format!("({} / {})", (self.rounds.index() + 1).min(count), count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::LetterRound;

    fn item() -> DrillItem {
        DrillItem {
            rounds: vec![LetterRound {
                hint: "Opposite of no".into(),
                target: "yes".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_new_session_is_not_started() {
        let state = SessionState::new(item(), Field::default(), Controls::default(), 7).unwrap();
        assert_eq!(state.phase, SessionPhase::NotStarted);
        assert!(state.targets.is_empty());
        assert_eq!(state.row_y, ROW_START_Y);
        assert_eq!(state.player.x, (540.0 - PLAYER_W) / 2.0);
    }

    #[test]
    fn test_empty_item_has_no_session() {
        assert!(SessionState::new(DrillItem::default(), Field::default(), Controls::default(), 1).is_none());
    }

    #[test]
    fn test_start_builds_first_row() {
        let mut state = SessionState::new(item(), Field::default(), Controls::default(), 7).unwrap();
        let events = state.start();
        assert!(state.is_running());
        assert!(matches!(events[0], GameEvent::RoundStarted { index: 0, count: 1, .. }));
        assert!(events.iter().any(|e| matches!(e, GameEvent::RowBuilt { need, .. } if need == "y")));
        assert!(!state.targets.is_empty());

        // Starting twice does nothing
        assert!(state.start().is_empty());
    }

    #[test]
    fn test_finish_only_once() {
        let mut state = SessionState::new(item(), Field::default(), Controls::default(), 7).unwrap();
        let mut events = Vec::new();
        // Not running yet
        assert!(!state.finish(Outcome::Failed, &mut events));
        state.start();
        assert!(state.finish(Outcome::Failed, &mut events));
        assert!(!state.finish(Outcome::Completed, &mut events));
        assert_eq!(state.outcome(), Some(Outcome::Failed));
        assert_eq!(events, vec![GameEvent::Finished { outcome: Outcome::Failed }]);
    }

    #[test]
    fn test_entity_ids_increase() {
        let mut state = SessionState::new(item(), Field::default(), Controls::default(), 7).unwrap();
        let a = state.next_entity_id();
        let b = state.next_entity_id();
        assert!(b > a);
    }
}

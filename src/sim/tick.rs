//! Fixed timestep simulation step and player commands
//!
//! `tick` is the whole frame: physics first, then collisions and their
//! cascading effects. Commands are applied between frames.

use glam::Vec2;

use super::state::{Bullet, GameEvent, SessionState, Target};
use super::collision;
use crate::consts::*;
use crate::tokens_match;

/// Where a move command came from (sets the step size)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSource {
    Key,
    Tap,
}

/// Discrete player input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveLeft(StepSource),
    MoveRight(StepSource),
    Fire,
}

/// Apply one input immediately. Ignored unless the session is running;
/// a shot inside the cooldown window is dropped.
pub fn apply_command(state: &mut SessionState, command: Command, now_ms: u64) -> Option<GameEvent> {
    if !state.is_running() {
        return None;
    }
    match command {
        Command::MoveLeft(source) => {
            let step = step_for(state, source);
            state.player.x = (state.player.x - step).max(0.0);
            None
        }
        Command::MoveRight(source) => {
            let step = step_for(state, source);
            state.player.x = (state.player.x + step).min(state.field.player_max_x());
            None
        }
        Command::Fire => fire(state, now_ms),
    }
}

fn step_for(state: &SessionState, source: StepSource) -> f32 {
    match source {
        StepSource::Key => state.controls.key_step,
        StepSource::Tap => state.controls.tap_step,
    }
}

fn fire(state: &mut SessionState, now_ms: u64) -> Option<GameEvent> {
    if let Some(last) = state.last_shot_ms {
        if now_ms.saturating_sub(last) < state.controls.cooldown_ms {
            return None;
        }
    }
    state.last_shot_ms = Some(now_ms);

    let id = state.next_entity_id();
    let pos = Vec2::new(
        state.player.x + PLAYER_W / 2.0 - BULLET_W / 2.0,
        state.field.height - PLAYER_H - 10.0,
    );
    let vel = -state.item.bullet_speed() * state.item.fall_speed();
    state.bullets.push(Bullet { id, pos, vel });
    Some(GameEvent::Fired { bullet_id: id })
}

/// Advance the session by one frame
pub fn tick(state: &mut SessionState, dt: f32) -> Vec<GameEvent> {
    let mut events = Vec::new();
    if !state.is_running() {
        return events;
    }
    state.time_ticks += 1;

    collision::advance_bullets(&mut state.bullets, dt);

    let mut any_hit = false;
    let mut any_left = false;
    let bullets = std::mem::take(&mut state.bullets);
    let mut survivors = Vec::with_capacity(bullets.len());
    for bullet in bullets {
        // Nothing more resolves once the session has ended this frame
        if !state.is_running() {
            survivors.push(bullet);
            continue;
        }
        if bullet.has_left_field() {
            any_left = true;
            continue;
        }
        match collision::first_hit(&bullet, &state.targets) {
            Some(i) => {
                any_hit = true;
                let target = state.targets.remove(i);
                resolve_hit(state, target, &mut events);
            }
            None => survivors.push(bullet),
        }
    }
    state.bullets = survivors;

    if any_left && !any_hit && state.is_running() {
        events.push(GameEvent::Missed);
        state.step_down(&mut events);
    }

    events
}

fn resolve_hit(state: &mut SessionState, target: Target, events: &mut Vec<GameEvent>) {
    let mode = state.mode();
    let correct = state
        .rounds
        .needed()
        .is_some_and(|need| tokens_match(need, &target.token));
    let points = state.score.on_hit(correct, mode);
    log::debug!("Hit {:?} (correct: {}, {:+})", target.token, correct, points);
    events.push(GameEvent::Hit {
        token: target.token,
        correct,
        points,
    });

    if correct {
        if state.rounds.consume_needed() {
            state.score.on_round_complete(mode);
            events.push(GameEvent::RoundCompleted {
                index: state.rounds.index(),
            });
            state.advance_or_finish(events);
        } else {
            state.rebuild_row(events);
        }
    } else {
        state.step_down(events);
        if state.is_running() {
            // Same need, fresh row
            state.rebuild_row(events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::{DrillItem, DrillMode, LetterRound, WordRound};
    use crate::sim::state::{Controls, Field, Outcome, SessionPhase};

    fn letter_state(targets: &[&str]) -> SessionState {
        let item = DrillItem {
            row_size: Some(4.0),
            confusables: [("a".to_string(), "eo".to_string())].into_iter().collect(),
            rounds: targets
                .iter()
                .map(|t| LetterRound {
                    hint: String::new(),
                    target: t.to_string(),
                })
                .collect(),
            ..Default::default()
        };
        let mut state = SessionState::new(item, Field::default(), Controls::default(), 11).unwrap();
        state.start();
        state
    }

    /// Put a bullet just under the target carrying `token`
    fn aim_at(state: &mut SessionState, token: &str) {
        let target = state
            .targets
            .iter()
            .find(|t| t.token == token)
            .cloned()
            .unwrap();
        let id = state.next_entity_id();
        state.bullets.push(Bullet {
            id,
            pos: Vec2::new(target.pos.x + 10.0, target.pos.y + SHIP_H + 1.0),
            vel: -460.0,
        });
    }

    fn wrong_token(state: &SessionState) -> String {
        let need = state.rounds.needed().unwrap().to_string();
        state
            .targets
            .iter()
            .find(|t| !tokens_match(&t.token, &need))
            .map(|t| t.token.clone())
            .unwrap()
    }

    #[test]
    fn test_correct_hit_advances_cursor() {
        let mut state = letter_state(&["ab"]);
        aim_at(&mut state, "a");
        let events = tick(&mut state, FRAME_DT);
        assert!(events.contains(&GameEvent::Hit {
            token: "a".into(),
            correct: true,
            points: 50
        }));
        assert_eq!(state.rounds.next_index(), 1);
        assert_eq!(state.rounds.needed(), Some("b"));
        assert!(state.bullets.is_empty());
        // Fresh row for the new need
        assert_eq!(state.targets.iter().filter(|t| t.token == "b").count(), 1);
        assert_eq!(state.score.score, 50);
    }

    #[test]
    fn test_wrong_hit_steps_down_and_keeps_need() {
        let mut state = letter_state(&["ab"]);
        let wrong = wrong_token(&state);
        aim_at(&mut state, &wrong);
        let events = tick(&mut state, FRAME_DT);
        assert!(events.iter().any(|e| matches!(e, GameEvent::Hit { correct: false, .. })));
        assert!(events.contains(&GameEvent::SteppedDown { row_y: 76.0 }));
        assert_eq!(state.rounds.needed(), Some("a"));
        assert_eq!(state.score.wrong, 1);
        assert_eq!(state.score.combo, 0);
        // Rebuilt at the lowered offset
        assert!(state.targets.iter().all(|t| t.pos.y == 76.0));
        assert_eq!(state.targets.iter().filter(|t| t.token == "a").count(), 1);
    }

    #[test]
    fn test_completing_last_round_finishes() {
        let mut state = letter_state(&["a"]);
        aim_at(&mut state, "a");
        let events = tick(&mut state, FRAME_DT);
        assert!(events.contains(&GameEvent::RoundCompleted { index: 0 }));
        assert_eq!(state.phase, SessionPhase::Finished(Outcome::Completed));
        assert_eq!(state.right_count(), 1);
        // Further ticks do nothing
        assert!(tick(&mut state, FRAME_DT).is_empty());
    }

    #[test]
    fn test_next_round_resets_row_and_cursor() {
        let mut state = letter_state(&["a", "ox"]);
        let mut events = Vec::new();
        state.step_down(&mut events);
        aim_at(&mut state, "a");
        let events = tick(&mut state, FRAME_DT);
        assert!(events.iter().any(|e| matches!(e, GameEvent::RoundStarted { index: 1, .. })));
        assert_eq!(state.rounds.index(), 1);
        assert_eq!(state.rounds.next_index(), 0);
        assert_eq!(state.row_y, ROW_START_Y);
        assert_eq!(state.rounds.needed(), Some("o"));
        assert!(state.targets.iter().any(|t| t.token == "o"));
    }

    #[test]
    fn test_missed_bullet_steps_down_once() {
        let mut state = letter_state(&["ab"]);
        for x in [500.0, 510.0] {
            let id = state.next_entity_id();
            state.bullets.push(Bullet {
                id,
                pos: Vec2::new(x, -19.0),
                vel: -460.0,
            });
        }
        let events = tick(&mut state, FRAME_DT);
        assert_eq!(events.iter().filter(|e| **e == GameEvent::Missed).count(), 1);
        assert_eq!(state.row_y, 76.0);
        assert!(state.bullets.is_empty());
        // Row is not rebuilt after a miss
        assert!(!events.iter().any(|e| matches!(e, GameEvent::RowBuilt { .. })));
    }

    #[test]
    fn test_miss_ignored_when_frame_had_a_hit() {
        let mut state = letter_state(&["ab"]);
        aim_at(&mut state, "a");
        let id = state.next_entity_id();
        state.bullets.push(Bullet {
            id,
            pos: Vec2::new(530.0, -19.0),
            vel: -460.0,
        });
        let events = tick(&mut state, FRAME_DT);
        assert!(!events.contains(&GameEvent::Missed));
        assert_eq!(state.row_y, ROW_START_Y);
    }

    #[test]
    fn test_word_mode_counts_sequences() {
        let item = DrillItem {
            mode: DrillMode::Word,
            word_rounds: vec![WordRound {
                hint: "greeting".into(),
                target_words: vec!["good".into(), "day".into()],
                word_bank: vec!["good".into(), "day".into(), "bad".into(), "night".into()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut state = SessionState::new(item, Field::default(), Controls::default(), 5).unwrap();
        state.start();
        aim_at(&mut state, "good");
        tick(&mut state, FRAME_DT);
        assert_eq!(state.score.correct, 0);
        assert_eq!(state.right_count(), 0);
        aim_at(&mut state, "day");
        tick(&mut state, FRAME_DT);
        assert_eq!(state.score.correct, 1);
        assert_eq!(state.outcome(), Some(Outcome::Completed));
        assert_eq!(state.right_count(), 1);
    }

    #[test]
    fn test_fire_cooldown() {
        let mut state = letter_state(&["ab"]);
        assert!(apply_command(&mut state, Command::Fire, 1000).is_some());
        assert!(apply_command(&mut state, Command::Fire, 1100).is_none());
        assert!(apply_command(&mut state, Command::Fire, 1199).is_none());
        assert!(apply_command(&mut state, Command::Fire, 1200).is_some());
        assert_eq!(state.bullets.len(), 2);
        let b = &state.bullets[0];
        assert_eq!(b.pos.x, state.player.x + PLAYER_W / 2.0 - 2.0);
        assert_eq!(b.pos.y, 640.0 - PLAYER_H - 10.0);
        assert_eq!(b.vel, -460.0);
    }

    #[test]
    fn test_movement_is_clamped() {
        let mut state = letter_state(&["ab"]);
        for _ in 0..100 {
            apply_command(&mut state, Command::MoveLeft(StepSource::Tap), 0);
        }
        assert_eq!(state.player.x, 0.0);
        apply_command(&mut state, Command::MoveRight(StepSource::Key), 0);
        assert_eq!(state.player.x, KEY_STEP);
        for _ in 0..100 {
            apply_command(&mut state, Command::MoveRight(StepSource::Tap), 0);
        }
        assert_eq!(state.player.x, 540.0 - PLAYER_W);
    }

    #[test]
    fn test_commands_ignored_when_not_running() {
        let item = DrillItem {
            rounds: vec![LetterRound {
                hint: String::new(),
                target: "a".into(),
            }],
            ..Default::default()
        };
        let mut state = SessionState::new(item, Field::default(), Controls::default(), 1).unwrap();
        assert!(apply_command(&mut state, Command::Fire, 0).is_none());
        assert!(tick(&mut state, FRAME_DT).is_empty());
    }

    #[test]
    fn test_determinism() {
        let mut a = letter_state(&["banana"]);
        let mut b = letter_state(&["banana"]);
        for frame in 0..240u64 {
            let now = frame * 16;
            for state in [&mut a, &mut b] {
                if frame % 13 == 0 {
                    apply_command(state, Command::Fire, now);
                }
                if frame % 7 == 0 {
                    apply_command(state, Command::MoveRight(StepSource::Key), now);
                }
                tick(state, FRAME_DT);
            }
        }
        assert_eq!(a.score, b.score);
        assert_eq!(a.row_y, b.row_y);
        assert_eq!(a.targets, b.targets);
    }
}

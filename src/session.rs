//! Frame-driven session loop
//!
//! The loop owns the live `SessionState` and drives it one `tick` per
//! scheduled frame. Scheduling is injected: the host provides a
//! `FrameScheduler` and calls `on_frame` with each handle it fires. Only the
//! most recently scheduled handle is honoured, so a cancelled or stale
//! continuation can never step a session.

use std::collections::VecDeque;

use chrono::Utc;
use thiserror::Error;

use crate::consts::FRAME_DT;
use crate::curriculum::{Curriculum, Selection};
use crate::records::{LeaderboardEntry, OutcomeStore, RecordKey};
use crate::settings::Settings;
use crate::sim::{Command, GameEvent, Outcome, SessionState, apply_command, tick};

/// Identifies one scheduled frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host frame scheduling (animation frame, timer, test harness)
pub trait FrameScheduler {
    /// Request one more frame callback
    fn schedule_next(&mut self) -> FrameHandle;

    /// Drop a requested frame that has not fired yet
    fn cancel(&mut self, handle: FrameHandle);
}

/// Scheduler whose frames fire when the caller pulls them
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    pending: VecDeque<FrameHandle>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest frame still waiting to fire
    pub fn take_due(&mut self) -> Option<FrameHandle> {
        self.pending.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl FrameScheduler for ManualScheduler {
    fn schedule_next(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending.push_back(handle);
        handle
    }

    fn cancel(&mut self, handle: FrameHandle) {
        self.pending.retain(|h| *h != handle);
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("no content for {category} / {subcategory} ({mode})")]
    NoContent {
        category: String,
        subcategory: String,
        mode: String,
    },
}

impl StartError {
    fn no_content(selection: &Selection) -> Self {
        log::warn!(
            "No items for {} / {} ({})",
            selection.category,
            selection.subcategory,
            selection.mode
        );
        StartError::NoContent {
            category: selection.category.clone(),
            subcategory: selection.subcategory.clone(),
            mode: selection.mode.to_string(),
        }
    }
}

/// Hint text to hand to a speech collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintSpeech {
    pub text: String,
    pub language: String,
}

struct ActiveSession {
    state: SessionState,
    key: RecordKey,
    started_at_ms: u64,
    pending: Option<FrameHandle>,
    recorded: bool,
}

/// Single control point for one player's sessions
pub struct SessionLoop<S: FrameScheduler, O: OutcomeStore> {
    scheduler: S,
    store: O,
    settings: Settings,
    active: Option<ActiveSession>,
    last_entry: Option<LeaderboardEntry>,
}

impl<S: FrameScheduler, O: OutcomeStore> SessionLoop<S, O> {
    pub fn new(scheduler: S, store: O, settings: Settings) -> Self {
        Self {
            scheduler,
            store,
            settings,
            active: None,
            last_entry: None,
        }
    }

    /// Start a fresh session, cancelling whatever frame a previous one had pending
    pub fn start(
        &mut self,
        curriculum: &Curriculum,
        selection: &Selection,
        seed: u64,
        now_ms: u64,
    ) -> Result<Vec<GameEvent>, StartError> {
        if let Some(previous) = self.active.take() {
            if let Some(handle) = previous.pending {
                self.scheduler.cancel(handle);
            }
            if previous.state.is_running() {
                log::debug!("Discarding unfinished session");
            }
        }

        let item = curriculum
            .select_item(selection)
            .ok_or_else(|| StartError::no_content(selection))?;
        let mut state = SessionState::new(
            item.clone(),
            self.settings.field(),
            self.settings.controls(),
            seed,
        )
        .ok_or_else(|| StartError::no_content(selection))?;

        let events = state.start();
        let pending = Some(self.scheduler.schedule_next());
        self.active = Some(ActiveSession {
            state,
            key: RecordKey::from(selection),
            started_at_ms: now_ms,
            pending,
            recorded: false,
        });
        Ok(events)
    }

    /// Run the frame for `handle`; stale handles are ignored
    pub fn on_frame(&mut self, handle: FrameHandle, now_ms: u64) -> Vec<GameEvent> {
        let Some(active) = self.active.as_mut() else {
            return Vec::new();
        };
        if active.pending != Some(handle) {
            log::debug!("Ignoring stale frame {:?}", handle);
            return Vec::new();
        }
        active.pending = None;

        let events = tick(&mut active.state, FRAME_DT);
        if active.state.is_running() {
            active.pending = Some(self.scheduler.schedule_next());
        } else {
            self.record(now_ms);
        }
        events
    }

    /// Apply player input between frames
    pub fn command(&mut self, command: Command, now_ms: u64) -> Option<GameEvent> {
        let active = self.active.as_mut()?;
        apply_command(&mut active.state, command, now_ms)
    }

    /// End the session now. Returns false if there was nothing left to finish.
    pub fn finish(&mut self, now_ms: u64) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.recorded {
            return false;
        }
        let mut events = Vec::new();
        active.state.finish(Outcome::Abandoned, &mut events);
        self.record(now_ms)
    }

    /// Emit outcome records once per session and release the pending frame
    fn record(&mut self, now_ms: u64) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.recorded || active.state.is_running() {
            return false;
        }
        active.recorded = true;
        if let Some(handle) = active.pending.take() {
            self.scheduler.cancel(handle);
        }

        let state = &active.state;
        let entry = LeaderboardEntry {
            score: state.score.score,
            right: state.right_count(),
            wrong: state.score.wrong,
            duration_ms: now_ms.saturating_sub(active.started_at_ms),
            timestamp: Utc::now(),
        };
        match self.store.submit(&active.key, entry.clone()) {
            Ok(best) => log::info!("High score for {}: {}", active.key.leaderboard_key(), best),
            Err(e) => log::warn!("Failed to store session outcome: {}", e),
        }
        self.last_entry = Some(entry);
        true
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.active.as_ref().map(|a| &a.state)
    }

    pub fn is_running(&self) -> bool {
        self.state().is_some_and(SessionState::is_running)
    }

    /// Tokens already caught in the current round
    pub fn caught_tokens(&self) -> &[String] {
        self.state().map(|s| s.rounds.caught()).unwrap_or(&[])
    }

    /// Frame the loop is waiting on, if any
    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.active.as_ref().and_then(|a| a.pending)
    }

    /// Record written for the most recent finished session
    pub fn last_entry(&self) -> Option<&LeaderboardEntry> {
        self.last_entry.as_ref()
    }

    /// Best score stored for a selection
    pub fn high_score(&self, selection: &Selection) -> u64 {
        self.store.high_score(&RecordKey::from(selection))
    }

    /// Current round's hint, if hints are spoken
    pub fn hint_speech(&self) -> Option<HintSpeech> {
        if !self.settings.speak_hints {
            return None;
        }
        let state = self.state().filter(|s| s.is_running())?;
        let text = state.rounds.current()?.hint.trim().to_string();
        if text.is_empty() {
            return None;
        }
        Some(HintSpeech {
            text,
            language: self.settings.hint_language.clone(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &O {
        &self.store
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

//! Round progression
//!
//! Tracks which round is active and which token of it is needed next.

use super::state::{GameEvent, Outcome, SessionState};
use crate::consts::*;
use crate::curriculum::{DrillItem, DrillMode};

/// One playable round: a hint and the ordered tokens to consume
#[derive(Debug, Clone, PartialEq)]
pub struct RoundContent {
    pub hint: String,
    pub tokens: Vec<String>,
    /// Alternatives for word rows (empty for letter rounds)
    pub word_bank: Vec<String>,
}

impl RoundContent {
    /// Rounds of an item, capped at `MAX_ROUNDS`; rounds with no tokens are dropped
    pub fn from_item(item: &DrillItem) -> Vec<RoundContent> {
        let rounds: Vec<RoundContent> = match item.mode {
            DrillMode::LetterRounds => item
                .rounds
                .iter()
                .take(MAX_ROUNDS)
                .map(|r| RoundContent {
                    hint: r.hint.clone(),
                    tokens: r.target.chars().map(String::from).collect(),
                    word_bank: Vec::new(),
                })
                .collect(),
            DrillMode::Word => item
                .word_rounds
                .iter()
                .take(MAX_ROUNDS)
                .map(|wr| RoundContent {
                    hint: wr.hint.clone(),
                    tokens: wr.target_words.clone(),
                    word_bank: wr.word_bank.clone(),
                })
                .collect(),
        };
        rounds.into_iter().filter(|r| !r.tokens.is_empty()).collect()
    }

    /// Candidates for a word row: the bank if given, otherwise the targets
    pub fn word_pool(&self) -> &[String] {
        if self.word_bank.is_empty() {
            &self.tokens
        } else {
            &self.word_bank
        }
    }
}

/// Result of leaving a completed round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundAdvance {
    Next(usize),
    SessionComplete,
}

/// Round index plus the needed-token cursor
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrack {
    rounds: Vec<RoundContent>,
    index: usize,
    next_index: usize,
}

impl RoundTrack {
    /// `None` when the item has nothing to play
    pub fn new(item: &DrillItem) -> Option<Self> {
        let rounds = RoundContent::from_item(item);
        if rounds.is_empty() {
            return None;
        }
        Some(Self {
            rounds,
            index: 0,
            next_index: 0,
        })
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn current(&self) -> Option<&RoundContent> {
        self.rounds.get(self.index)
    }

    /// Token sequence of the current round
    pub fn tokens(&self) -> &[String] {
        self.current().map(|r| r.tokens.as_slice()).unwrap_or(&[])
    }

    /// The token at `tokens[next_index]`
    pub fn needed(&self) -> Option<&str> {
        self.tokens().get(self.next_index).map(String::as_str)
    }

    /// Tokens already consumed this round
    pub fn caught(&self) -> &[String] {
        let tokens = self.tokens();
        &tokens[..self.next_index.min(tokens.len())]
    }

    pub fn is_round_complete(&self) -> bool {
        self.next_index >= self.tokens().len()
    }

    pub(crate) fn reset_cursor(&mut self) {
        self.next_index = 0;
    }

    /// Mark the needed token consumed. Returns true once the round is complete.
    pub(crate) fn consume_needed(&mut self) -> bool {
        if !self.is_round_complete() {
            self.next_index += 1;
        }
        self.is_round_complete()
    }

    pub(crate) fn advance(&mut self) -> RoundAdvance {
        if self.index < self.rounds.len() {
            self.index += 1;
        }
        if self.index >= self.rounds.len() {
            RoundAdvance::SessionComplete
        } else {
            RoundAdvance::Next(self.index)
        }
    }
}

impl SessionState {
    /// Reset the cursor and row offset, then spawn the first row of the round
    pub fn start_round(&mut self, events: &mut Vec<GameEvent>) {
        self.rounds.reset_cursor();
        self.row_y = ROW_START_Y;
        let hint = self.rounds.current().map(|r| r.hint.clone()).unwrap_or_default();
        log::info!("Round {}: {}", self.round_label(), hint);
        events.push(GameEvent::RoundStarted {
            index: self.rounds.index(),
            count: self.rounds.round_count(),
            hint,
        });
        self.rebuild_row(events);
    }

    /// Move to the next round, or finish the session after the last one
    pub fn advance_or_finish(&mut self, events: &mut Vec<GameEvent>) {
        match self.rounds.advance() {
            RoundAdvance::Next(_) => self.start_round(events),
            RoundAdvance::SessionComplete => {
                self.targets.clear();
                self.finish(Outcome::Completed, events);
            }
        }
    }
}

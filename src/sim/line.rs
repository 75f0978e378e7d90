//! Row generation
//!
//! A row holds the needed token exactly once plus unique distractors, in
//! random order, laid out in evenly spaced slots across the field.

use std::collections::HashSet;

use glam::Vec2;
use rand::Rng;
use rand::seq::SliceRandom;

use super::state::{GameEvent, SessionState, Target};
use crate::consts::*;
use crate::curriculum::DrillMode;
use crate::fold_token;

/// Where distractors for a row come from
#[derive(Debug, Clone, Copy)]
pub enum CandidateSource<'a> {
    /// Confusables first, then shuffled alphabet + distractor characters
    Letters {
        confusables: &'a str,
        alphabet: &'a str,
        distractors: &'a str,
    },
    /// Random draws from a word pool
    Words { pool: &'a [String] },
}

/// Appends tokens whose folded form has not been seen yet
struct RowBuilder {
    tokens: Vec<String>,
    seen: HashSet<String>,
    row_size: usize,
}

impl RowBuilder {
    fn new(need: &str, row_size: usize) -> Self {
        let mut seen = HashSet::new();
        seen.insert(fold_token(need));
        Self {
            tokens: vec![need.to_string()],
            seen,
            row_size: row_size.max(1),
        }
    }

    fn is_full(&self) -> bool {
        self.tokens.len() >= self.row_size
    }

    /// Returns false once the row is full
    fn push(&mut self, token: &str) -> bool {
        if self.is_full() {
            return false;
        }
        if self.seen.insert(fold_token(token)) {
            self.tokens.push(token.to_string());
        }
        !self.is_full()
    }
}

/// Build the tokens of one row for `need`, shuffled
pub fn build_row<R: Rng + ?Sized>(
    need: &str,
    source: &CandidateSource<'_>,
    row_size: usize,
    rng: &mut R,
) -> Vec<String> {
    let mut row = RowBuilder::new(need, row_size);

    match *source {
        CandidateSource::Letters {
            confusables,
            alphabet,
            distractors,
        } => {
            let mut fallback: Vec<char> = alphabet.chars().chain(distractors.chars()).collect();
            fallback.shuffle(rng);
            for ch in confusables.chars().chain(fallback) {
                if !row.push(ch.encode_utf8(&mut [0; 4])) {
                    break;
                }
            }
        }
        CandidateSource::Words { pool } => {
            let mut pool: Vec<&String> = pool.iter().collect();
            if let Some(i) = pool.iter().position(|w| w.as_str() == need) {
                pool.remove(i);
            }
            while !row.is_full() && !pool.is_empty() {
                let i = rng.random_range(0..pool.len());
                let word = pool.remove(i);
                row.push(word);
            }
        }
    }

    let mut tokens = row.tokens;
    tokens.shuffle(rng);
    tokens
}

/// Left x of each slot for `count` targets spread across `field_width`
pub fn slot_positions(count: usize, field_width: f32) -> Vec<f32> {
    let gap = if count > 1 {
        (field_width - SHIP_W * count as f32) / (count - 1) as f32
    } else {
        0.0
    };
    (0..count)
        .map(|i| (i as f32 * (SHIP_W + gap)).round())
        .collect()
}

impl SessionState {
    /// Replace the row with a fresh one for the needed token
    pub fn rebuild_row(&mut self, events: &mut Vec<GameEvent>) {
        self.targets.clear();
        let Some(round) = self.rounds.current() else {
            return;
        };
        let Some(need) = round.tokens.get(self.rounds.next_index()) else {
            return;
        };

        let source = match self.item.mode {
            DrillMode::LetterRounds => CandidateSource::Letters {
                confusables: self.item.confusables_for(need),
                alphabet: self.item.alphabet(),
                distractors: &self.item.distractors,
            },
            DrillMode::Word => CandidateSource::Words {
                pool: round.word_pool(),
            },
        };
        let tokens = build_row(need, &source, self.item.row_size(), &mut self.rng);
        let need = need.clone();

        let xs = slot_positions(tokens.len(), self.field.width);
        for (token, x) in tokens.iter().zip(xs) {
            let id = self.next_entity_id();
            self.targets.push(Target {
                id,
                token: token.clone(),
                pos: Vec2::new(x, self.row_y),
            });
        }
        log::debug!("Row for {:?}: {:?}", need, tokens);
        events.push(GameEvent::RowBuilt { need, tokens });
    }
}

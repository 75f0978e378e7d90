//! Session outcome records
//!
//! High scores and leaderboards are keyed by category/subcategory/mode.
//! The core only emits records; where they live is up to the store.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::curriculum::{DrillMode, Selection};

/// Maximum number of entries kept per leaderboard
pub const MAX_LEADERBOARD_ENTRIES: usize = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("record store JSON failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key of one category/subcategory/mode
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub category: String,
    pub subcategory: String,
    pub mode: DrillMode,
}

impl RecordKey {
    pub fn high_score_key(&self) -> String {
        format!("highscore:shoot:{}:{}:{}", self.category, self.subcategory, self.mode)
    }

    pub fn leaderboard_key(&self) -> String {
        format!("shoot:{}:{}:{}", self.category, self.subcategory, self.mode)
    }
}

impl From<&Selection> for RecordKey {
    fn from(selection: &Selection) -> Self {
        Self {
            category: selection.category.clone(),
            subcategory: selection.subcategory.clone(),
            mode: selection.mode,
        }
    }
}

/// Outcome of one finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub score: u64,
    /// Tokens or rounds completed when the session ended
    pub right: u32,
    pub wrong: u32,
    pub duration_ms: u64,
    /// Serialized as an ISO-8601 string
    pub timestamp: DateTime<Utc>,
}

/// Best entries for one key, plus the most recent one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub latest: Option<LeaderboardEntry>,
}

impl Leaderboard {
    /// Check if a score would be ranked
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_LEADERBOARD_ENTRIES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Record an entry; returns the rank achieved (1-indexed) if it was ranked
    pub fn add(&mut self, entry: LeaderboardEntry) -> Option<usize> {
        self.latest = Some(entry.clone());
        if !self.qualifies(entry.score) {
            return None;
        }

        // Sorted descending by score; ties keep the older entry first
        let pos = self.entries.iter().position(|e| entry.score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };
        self.entries.truncate(MAX_LEADERBOARD_ENTRIES);
        Some(rank)
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }
}

/// Everything a store persists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordBook {
    pub high_scores: BTreeMap<String, u64>,
    pub leaderboards: BTreeMap<String, Leaderboard>,
}

impl RecordBook {
    pub fn high_score(&self, key: &RecordKey) -> u64 {
        self.high_scores.get(&key.high_score_key()).copied().unwrap_or(0)
    }

    pub fn leaderboard(&self, key: &RecordKey) -> Option<&Leaderboard> {
        self.leaderboards.get(&key.leaderboard_key())
    }

    /// Apply one outcome; returns the new best score and leaderboard rank
    pub fn apply(&mut self, key: &RecordKey, entry: LeaderboardEntry) -> (u64, Option<usize>) {
        let best = self.high_score(key).max(entry.score);
        self.high_scores.insert(key.high_score_key(), best);
        let rank = self
            .leaderboards
            .entry(key.leaderboard_key())
            .or_default()
            .add(entry);
        (best, rank)
    }
}

/// External store for outcome records
pub trait OutcomeStore {
    fn high_score(&self, key: &RecordKey) -> u64;

    fn leaderboard(&self, key: &RecordKey) -> Option<Leaderboard>;

    /// Persist one finished session: high score kept as the maximum, entry
    /// added to the leaderboard. Returns the best score for the key.
    fn submit(&mut self, key: &RecordKey, entry: LeaderboardEntry) -> Result<u64, StoreError>;
}

/// In-memory store (tests, headless runs without a records file)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub book: RecordBook,
    /// Number of submissions received
    pub writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutcomeStore for MemoryStore {
    fn high_score(&self, key: &RecordKey) -> u64 {
        self.book.high_score(key)
    }

    fn leaderboard(&self, key: &RecordKey) -> Option<Leaderboard> {
        self.book.leaderboard(key).cloned()
    }

    fn submit(&mut self, key: &RecordKey, entry: LeaderboardEntry) -> Result<u64, StoreError> {
        self.writes += 1;
        Ok(self.book.apply(key, entry).0)
    }
}

/// Store backed by a single JSON file, written atomically
pub struct JsonFileStore {
    path: PathBuf,
    book: RecordBook,
}

impl JsonFileStore {
    /// Open (or start) a records file. A corrupt file is replaced on next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let book = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str(&content) {
                Ok(book) => book,
                Err(e) => {
                    log::warn!("Ignoring unreadable records file {}: {}", path.display(), e);
                    RecordBook::default()
                }
            }
        } else {
            RecordBook::default()
        };
        Ok(Self { path, book })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn book(&self) -> &RecordBook {
        &self.book
    }

    fn save(&self) -> Result<(), StoreError> {
        let tmp_path = self.path.with_extension("tmp");
        let json = serde_json::to_string_pretty(&self.book)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl OutcomeStore for JsonFileStore {
    fn high_score(&self, key: &RecordKey) -> u64 {
        self.book.high_score(key)
    }

    fn leaderboard(&self, key: &RecordKey) -> Option<Leaderboard> {
        self.book.leaderboard(key).cloned()
    }

    fn submit(&mut self, key: &RecordKey, entry: LeaderboardEntry) -> Result<u64, StoreError> {
        let (best, rank) = self.book.apply(key, entry);
        self.save()?;
        log::info!(
            "Records saved to {} (best {}, rank {:?})",
            self.path.display(),
            best,
            rank
        );
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key() -> RecordKey {
        RecordKey {
            category: "Phonics".into(),
            subcategory: "Vowels".into(),
            mode: DrillMode::LetterRounds,
        }
    }

    fn entry(score: u64) -> LeaderboardEntry {
        LeaderboardEntry {
            score,
            right: 3,
            wrong: 1,
            duration_ms: 12_000,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_keys() {
        let k = key();
        assert_eq!(k.high_score_key(), "highscore:shoot:Phonics:Vowels:letter-rounds");
        assert_eq!(k.leaderboard_key(), "shoot:Phonics:Vowels:letter-rounds");
    }

    #[test]
    fn test_high_score_is_maximum() {
        let mut store = MemoryStore::new();
        assert_eq!(store.submit(&key(), entry(300)).unwrap(), 300);
        assert_eq!(store.submit(&key(), entry(120)).unwrap(), 300);
        assert_eq!(store.high_score(&key()), 300);
        assert_eq!(store.writes, 2);
        let board = store.leaderboard(&key()).unwrap();
        assert_eq!(board.latest.unwrap().score, 120);
    }

    #[test]
    fn test_leaderboard_ranking_and_cap() {
        let mut board = Leaderboard::default();
        assert_eq!(board.add(entry(100)), Some(1));
        assert_eq!(board.add(entry(300)), Some(1));
        assert_eq!(board.add(entry(200)), Some(2));
        assert_eq!(board.top_score(), Some(300));
        // Zero never ranks but is still the latest
        assert_eq!(board.add(entry(0)), None);
        assert_eq!(board.latest.as_ref().unwrap().score, 0);

        for s in 1..=20 {
            board.add(entry(1000 + s));
        }
        assert_eq!(board.entries.len(), MAX_LEADERBOARD_ENTRIES);
        assert!(!board.qualifies(5));
        assert!(board.entries.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_entry_json_shape() {
        let json = serde_json::to_value(entry(70)).unwrap();
        assert_eq!(json["score"], 70);
        assert_eq!(json["durationMs"], 12_000);
        let ts = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn test_json_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.submit(&key(), entry(450)).unwrap();
        }
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.high_score(&key()), 450);
        assert_eq!(store.leaderboard(&key()).unwrap().entries.len(), 1);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_json_store_tolerates_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        fs::write(&path, "{ broken").unwrap();
        let mut store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.high_score(&key()), 0);
        store.submit(&key(), entry(10)).unwrap();
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.high_score(&key()), 10);
    }
}

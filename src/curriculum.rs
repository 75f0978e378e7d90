//! Drill curriculum: category -> subcategory -> items
//!
//! Loaded from JSON. Selection is a pure lookup; nothing here holds session
//! state.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::fs;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::consts::*;

/// Failure to read or parse a curriculum file
#[derive(Debug, Error)]
pub enum CurriculumError {
    #[error("failed to read curriculum {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid curriculum JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Drill mode tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DrillMode {
    /// Spell a target string letter by letter
    #[default]
    #[serde(rename = "letter-rounds")]
    LetterRounds,
    /// Produce a sequence of words in order
    #[serde(rename = "word")]
    Word,
}

impl DrillMode {
    pub const ALL: [DrillMode; 2] = [DrillMode::LetterRounds, DrillMode::Word];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrillMode::LetterRounds => "letter-rounds",
            DrillMode::Word => "word",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "letter-rounds" | "letters" | "letter" => Some(DrillMode::LetterRounds),
            "word" | "words" => Some(DrillMode::Word),
            _ => None,
        }
    }
}

impl fmt::Display for DrillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One letter-mode round: spell `target`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LetterRound {
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub target: String,
}

/// One word-mode round: shoot `target_words` in order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordRound {
    #[serde(default)]
    pub hint: String,
    /// Display form of the whole sequence (preview only)
    #[serde(default)]
    pub sentence: Option<String>,
    #[serde(default)]
    pub target_words: Vec<String>,
    /// Plausible alternatives; the target words are used when empty
    #[serde(default)]
    pub word_bank: Vec<String>,
}

/// Configuration for one mode of one subcategory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillItem {
    /// Required in curriculum files; items without a known tag are skipped on load
    pub mode: DrillMode,
    #[serde(default, deserialize_with = "lenient_number")]
    pub row_size: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub row_step: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub bullet_speed: Option<f64>,
    /// Fall-speed scalar (scales projectile speed)
    #[serde(default, rename = "speed", deserialize_with = "lenient_number")]
    pub fall_speed: Option<f64>,
    #[serde(default)]
    pub alphabet: Option<String>,
    #[serde(default)]
    pub distractors: String,
    /// Lowercased character -> characters likely confused with it
    #[serde(default)]
    pub confusables: HashMap<String, String>,
    #[serde(default)]
    pub rounds: Vec<LetterRound>,
    #[serde(default)]
    pub word_rounds: Vec<WordRound>,
}

/// Accept numbers or numeric strings; anything else is treated as absent
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Zero, negative and non-finite tunables fall back to defaults
fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

impl DrillItem {
    /// Configured row size (defaults to 10, never below 1)
    pub fn row_size(&self) -> usize {
        positive(self.row_size)
            .map(|v| (v.floor() as usize).max(1))
            .unwrap_or(DEFAULT_ROW_SIZE)
    }

    pub fn row_step(&self) -> f32 {
        positive(self.row_step).map_or(DEFAULT_ROW_STEP, |v| v as f32)
    }

    pub fn bullet_speed(&self) -> f32 {
        positive(self.bullet_speed).map_or(DEFAULT_BULLET_SPEED, |v| v as f32)
    }

    pub fn fall_speed(&self) -> f32 {
        positive(self.fall_speed).map_or(DEFAULT_FALL_SPEED, |v| v as f32)
    }

    pub fn alphabet(&self) -> &str {
        self.alphabet
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or("ABCDEFGHIJKLMNOPQRSTUVWXYZ")
    }

    /// Confusables configured for a needed character (lookup is lowercased)
    pub fn confusables_for(&self, need: &str) -> &str {
        self.confusables
            .get(&need.to_lowercase())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Target sequences rendered for inspection, one line per round
    pub fn preview_lines(&self) -> Vec<String> {
        match self.mode {
            DrillMode::LetterRounds => {
                let seq: Vec<&str> = self.rounds.iter().map(|r| r.target.as_str()).collect();
                vec![seq.join(", ")]
            }
            DrillMode::Word => self
                .word_rounds
                .iter()
                .enumerate()
                .map(|(i, wr)| {
                    let label = wr
                        .sentence
                        .clone()
                        .filter(|s| !s.is_empty())
                        .unwrap_or_else(|| wr.target_words.join(" "));
                    format!("{}) {}", i + 1, label)
                })
                .collect(),
        }
    }
}

/// A category/subcategory/mode triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub category: String,
    pub subcategory: String,
    pub mode: DrillMode,
}

impl Selection {
    pub fn new(category: impl Into<String>, subcategory: impl Into<String>, mode: DrillMode) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.into(),
            mode,
        }
    }
}

/// Read-only inspection of every item matching a selection
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub title: String,
    /// One entry per matching item
    pub items: Vec<Vec<String>>,
}

impl Preview {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        if self.items.is_empty() {
            return writeln!(f, "No matching items.");
        }
        for (i, lines) in self.items.iter().enumerate() {
            match lines.as_slice() {
                [single] => writeln!(f, "{}. {}", i + 1, single)?,
                _ => {
                    writeln!(f, "{}.", i + 1)?;
                    for line in lines {
                        writeln!(f, "   {}", line)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// String-keyed map that keeps document order
#[derive(Debug, Clone, PartialEq)]
pub struct Ordered<V>(Vec<(String, V)>);

impl<V> Default for Ordered<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> Ordered<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace the value of an existing key in place, or append
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get_or_insert_default(&mut self, key: impl Into<String>) -> &mut V
    where
        V: Default,
    {
        let key = key.into();
        let i = match self.0.iter().position(|(k, _)| *k == key) {
            Some(i) => i,
            None => {
                self.0.push((key, V::default()));
                self.0.len() - 1
            }
        };
        &mut self.0[i].1
    }
}

impl<V: Serialize> Serialize for Ordered<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Ordered<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = Ordered<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = Ordered::default();
                // A repeated key keeps its first position and its last value
                while let Some((key, value)) = map.next_entry::<String, V>()? {
                    out.insert(key, value);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// Parse one raw item; `None` (logged) when its mode tag is missing or unknown
/// or its content does not fit the item shape
fn playable_item(category: &str, subcategory: &str, value: serde_json::Value) -> Option<DrillItem> {
    let tag = value.get("mode").cloned();
    let known = tag
        .clone()
        .and_then(|t| serde_json::from_value::<DrillMode>(t).ok())
        .is_some();
    if !known {
        log::warn!(
            "Skipping item in {} / {} with mode {:?}",
            category,
            subcategory,
            tag
        );
        return None;
    }
    match serde_json::from_value(value) {
        Ok(item) => Some(item),
        Err(e) => {
            log::warn!("Skipping malformed item in {} / {}: {}", category, subcategory, e);
            None
        }
    }
}

/// The whole curriculum document, in file order
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Curriculum {
    pub categories: Ordered<Ordered<Vec<DrillItem>>>,
}

impl<'de> Deserialize<'de> for Curriculum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Ordered::<Ordered<Vec<serde_json::Value>>>::deserialize(deserializer)?;
        let mut categories = Ordered::default();
        for (category, subs) in raw.0 {
            let mut playable = Ordered::default();
            for (subcategory, items) in subs.0 {
                let items: Vec<DrillItem> = items
                    .into_iter()
                    .filter_map(|v| playable_item(&category, &subcategory, v))
                    .collect();
                playable.insert(subcategory, items);
            }
            categories.insert(category, playable);
        }
        Ok(Self { categories })
    }
}

impl Curriculum {
    pub fn from_json(json: &str) -> Result<Self, CurriculumError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, CurriculumError> {
        let json = fs::read_to_string(path).map_err(|source| CurriculumError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let curriculum = Self::from_json(&json)?;
        log::info!(
            "Loaded curriculum from {} ({} categories)",
            path.display(),
            curriculum.categories.len()
        );
        Ok(curriculum)
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys()
    }

    pub fn subcategory_names(&self, category: &str) -> impl Iterator<Item = &str> {
        self.categories
            .get(category)
            .into_iter()
            .flat_map(|subs| subs.keys())
    }

    /// All items of a subcategory (empty when either key is unknown)
    pub fn items(&self, category: &str, subcategory: &str) -> &[DrillItem] {
        self.categories
            .get(category)
            .and_then(|subs| subs.get(subcategory))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Modes that have at least one item in the subcategory
    pub fn available_modes(&self, category: &str, subcategory: &str) -> Vec<DrillMode> {
        let items = self.items(category, subcategory);
        DrillMode::ALL
            .into_iter()
            .filter(|m| items.iter().any(|it| it.mode == *m))
            .collect()
    }

    /// Requested mode if available, else letter rounds, else word
    pub fn resolve_mode(&self, category: &str, subcategory: &str, requested: DrillMode) -> DrillMode {
        let modes = self.available_modes(category, subcategory);
        if modes.contains(&requested) {
            return requested;
        }
        modes.first().copied().unwrap_or(requested)
    }

    /// First item matching the selection's mode
    pub fn select_item(&self, selection: &Selection) -> Option<&DrillItem> {
        self.items(&selection.category, &selection.subcategory)
            .iter()
            .find(|it| it.mode == selection.mode)
    }

    pub fn preview(&self, selection: &Selection) -> Preview {
        let items = self
            .items(&selection.category, &selection.subcategory)
            .iter()
            .filter(|it| it.mode == selection.mode)
            .map(DrillItem::preview_lines)
            .collect();
        Preview {
            title: format!(
                "Shoot Preview - {} / {} ({})",
                selection.category, selection.subcategory, selection.mode
            ),
            items,
        }
    }
}

//! Generated crossword and word-search content.
//!
//! Only the word material is produced here. Laying words out on a grid is
//! the client's job; the `total` of a puzzle is what its round submissions
//! are checked against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Level, WordClue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosswordPuzzle {
    pub id: Uuid,
    pub subject: String,
    pub level: Level,
    pub entries: Vec<WordClue>,
    pub created_at: DateTime<Utc>,
}

impl CrosswordPuzzle {
    pub fn new(subject: impl Into<String>, level: Level, entries: Vec<WordClue>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            level,
            entries,
            created_at: Utc::now(),
        }
    }

    pub fn total(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Clues in entry order, without the answers.
    pub fn clues(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i + 1, e.clue.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSearchPuzzle {
    pub id: Uuid,
    pub subject: String,
    pub level: Level,
    pub words: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl WordSearchPuzzle {
    pub fn new(subject: impl Into<String>, level: Level, words: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            level,
            words,
            created_at: Utc::now(),
        }
    }

    pub fn total(&self) -> u32 {
        self.words.len() as u32
    }
}

//! Core data model types shared by every engine.
//!
//! Engine-specific records (quizzes, grading results, leaderboard rows) live
//! next to the engine that produces them; this module holds the vocabulary
//! they all share.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SchemaError, ValidationError};

/// Number of options on every multiple-choice question.
pub const OPTION_COUNT: usize = 4;

/// Smallest puzzle a caller may request or report a round for.
pub const MIN_PUZZLE_WORDS: usize = 1;
/// Largest puzzle a caller may request or report a round for.
pub const MAX_PUZZLE_WORDS: usize = 30;

/// Difficulty level of generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Easy => write!(f, "easy"),
            Level::Medium => write!(f, "medium"),
            Level::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Level {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "beginner" => Ok(Level::Easy),
            "medium" | "intermediate" => Ok(Level::Medium),
            "hard" | "advanced" => Ok(Level::Hard),
            other => Err(ValidationError::UnknownLevel(other.to_string())),
        }
    }
}

/// Rating bucket attached to a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Excellent,
    Good,
    NeedsImprovement,
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::Excellent => write!(f, "excellent"),
            Rating::Good => write!(f, "good"),
            Rating::NeedsImprovement => write!(f, "needs improvement"),
        }
    }
}

/// A validated multiple-choice question.
///
/// Construction goes through [`Question::new`], deserialization included, so
/// every value of this type has four distinct non-empty options and a correct
/// index in range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuestion")]
pub struct Question {
    prompt: String,
    options: [String; OPTION_COUNT],
    correct_index: usize,
    #[serde(default)]
    explanation: String,
}

impl Question {
    pub fn new(
        prompt: impl Into<String>,
        options: [String; OPTION_COUNT],
        correct_index: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let prompt = prompt.into().trim().to_string();
        if prompt.is_empty() {
            return Err(SchemaError::InvalidField {
                field: "question",
                reason: "empty prompt".into(),
            });
        }

        let options = options.map(|o| o.trim().to_string());
        let mut seen = HashSet::new();
        for option in &options {
            if option.is_empty() {
                return Err(SchemaError::InvalidField {
                    field: "options",
                    reason: "empty option".into(),
                });
            }
            if !seen.insert(option.to_lowercase()) {
                return Err(SchemaError::InvalidField {
                    field: "options",
                    reason: format!("duplicate option {option:?}"),
                });
            }
        }

        if correct_index >= OPTION_COUNT {
            return Err(SchemaError::InvalidField {
                field: "correct_index",
                reason: format!("{correct_index} is not in 0..{OPTION_COUNT}"),
            });
        }

        Ok(Self {
            prompt,
            options,
            correct_index,
            explanation: explanation.into().trim().to_string(),
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }
}

#[derive(Deserialize)]
struct RawQuestion {
    prompt: String,
    options: [String; OPTION_COUNT],
    correct_index: usize,
    #[serde(default)]
    explanation: String,
}

impl TryFrom<RawQuestion> for Question {
    type Error = SchemaError;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        Question::new(raw.prompt, raw.options, raw.correct_index, raw.explanation)
    }
}

/// A crossword answer with its clue. Words are stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordClue {
    pub word: String,
    pub clue: String,
}

/// The games that feed the leaderboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    TicTacToe,
    Crossword,
    WordSearch,
}

impl GameType {
    pub const ALL: [GameType; 3] = [GameType::TicTacToe, GameType::Crossword, GameType::WordSearch];
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::TicTacToe => write!(f, "tictactoe"),
            GameType::Crossword => write!(f, "crossword"),
            GameType::WordSearch => write!(f, "wordsearch"),
        }
    }
}

impl FromStr for GameType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tictactoe" | "tic-tac-toe" | "tic_tac_toe" => Ok(GameType::TicTacToe),
            "crossword" => Ok(GameType::Crossword),
            "wordsearch" | "word-search" | "word_search" => Ok(GameType::WordSearch),
            other => Err(ValidationError::UnknownGameType(other.to_string())),
        }
    }
}

/// Result of a tic-tac-toe game from the student's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl FromStr for Outcome {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "win" | "won" => Ok(Outcome::Win),
            "draw" | "tie" => Ok(Outcome::Draw),
            "loss" | "lose" | "lost" => Ok(Outcome::Loss),
            other => Err(ValidationError::UnknownOutcome(other.to_string())),
        }
    }
}

/// One finished round of a game, as reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum GameRound {
    TicTacToe {
        outcome: Outcome,
    },
    Crossword {
        correct_words: u32,
        total_words: u32,
        elapsed_secs: u32,
    },
    WordSearch {
        found_words: u32,
        total_words: u32,
        elapsed_secs: u32,
    },
}

impl GameRound {
    pub fn game_type(&self) -> GameType {
        match self {
            GameRound::TicTacToe { .. } => GameType::TicTacToe,
            GameRound::Crossword { .. } => GameType::Crossword,
            GameRound::WordSearch { .. } => GameType::WordSearch,
        }
    }

    /// Check the structural invariants of the round.
    ///
    /// A client claiming more solved words than the puzzle holds is rejected
    /// rather than clamped.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match *self {
            GameRound::TicTacToe { .. } => Ok(()),
            GameRound::Crossword {
                correct_words,
                total_words,
                ..
            } => check_counts("correct_words", correct_words, total_words),
            GameRound::WordSearch {
                found_words,
                total_words,
                ..
            } => check_counts("found_words", found_words, total_words),
        }
    }
}

/// A round's total must be a puzzle size the engine could have generated.
fn check_counts(field: &'static str, value: u32, total: u32) -> Result<(), ValidationError> {
    let total_in_range = usize::try_from(total)
        .map(|t| (MIN_PUZZLE_WORDS..=MAX_PUZZLE_WORDS).contains(&t))
        .unwrap_or(false);
    if !total_in_range {
        return Err(ValidationError::OutOfRange {
            field: "total_words",
            value: usize::try_from(total).unwrap_or(usize::MAX),
            min: MIN_PUZZLE_WORDS,
            max: MAX_PUZZLE_WORDS,
        });
    }
    if value > total {
        return Err(ValidationError::CountExceedsTotal {
            field,
            value,
            total,
        });
    }
    Ok(())
}

/// Immutable record of one scored round. The score log only ever appends
/// these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    id: Uuid,
    student_id: String,
    game: GameType,
    score: u32,
    recorded_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn new(
        student_id: impl Into<String>,
        game: GameType,
        score: u32,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            game,
            score,
            recorded_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn game(&self) -> GameType {
        self.game
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

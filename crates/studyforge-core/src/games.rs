//! Game scoring: turns a finished round into a single non-negative score.
//!
//! Scoring is pure. Tic-tac-toe uses fixed outcome points; crossword and
//! word search weight solved words by a [`TimeCurve`], so for a fixed word
//! count a faster round never scores lower, and for a fixed time one more
//! solved word always scores strictly higher.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::TimeCurve;
use crate::error::ValidationError;
use crate::model::{GameRound, Outcome, ScoreRecord};

pub const WIN_POINTS: u32 = 3;
pub const DRAW_POINTS: u32 = 1;
pub const LOSS_POINTS: u32 = 0;

pub fn outcome_points(outcome: Outcome) -> u32 {
    match outcome {
        Outcome::Win => WIN_POINTS,
        Outcome::Draw => DRAW_POINTS,
        Outcome::Loss => LOSS_POINTS,
    }
}

/// Scores game rounds with per-game time curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameScorer {
    crossword: TimeCurve,
    wordsearch: TimeCurve,
}

impl Default for GameScorer {
    fn default() -> Self {
        Self::new(TimeCurve::crossword(), TimeCurve::word_search())
    }
}

impl GameScorer {
    pub fn new(crossword: TimeCurve, wordsearch: TimeCurve) -> Self {
        Self {
            crossword,
            wordsearch,
        }
    }

    /// Score for an already validated round.
    pub fn points(&self, round: &GameRound) -> u32 {
        match *round {
            GameRound::TicTacToe { outcome } => outcome_points(outcome),
            GameRound::Crossword {
                correct_words,
                elapsed_secs,
                ..
            } => self.crossword.points(correct_words, elapsed_secs),
            GameRound::WordSearch {
                found_words,
                elapsed_secs,
                ..
            } => self.wordsearch.points(found_words, elapsed_secs),
        }
    }

    /// Validate and score a round, producing the record to append.
    pub fn score(
        &self,
        student_id: &str,
        round: &GameRound,
        recorded_at: DateTime<Utc>,
    ) -> Result<ScoreRecord, ValidationError> {
        if student_id.trim().is_empty() {
            return Err(ValidationError::Empty("student id"));
        }
        round.validate()?;

        let score = self.points(round);
        debug!(student_id, game = %round.game_type(), score, "round scored");
        Ok(ScoreRecord::new(
            student_id.trim(),
            round.game_type(),
            score,
            recorded_at,
        ))
    }
}

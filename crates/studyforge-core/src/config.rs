//! Scoring configuration.
//!
//! Every product constant the scoring laws depend on (rating thresholds,
//! time-factor curves, grading bounds, word length limits) lives here as a
//! named, serde-loadable value. [`ScoringConfig::validate`] rejects settings
//! that would break the monotonicity contracts, so a bad config file fails at
//! load time rather than producing inconsistent scores.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::model::{Rating, MAX_PUZZLE_WORDS};

/// All scoring-related settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub quiz: RatingThresholds,
    #[serde(default = "TimeCurve::crossword")]
    pub crossword: TimeCurve,
    #[serde(default = "TimeCurve::word_search")]
    pub wordsearch: TimeCurve,
    #[serde(default)]
    pub grading: GradingLimits,
    #[serde(default)]
    pub words: WordBounds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            quiz: RatingThresholds::default(),
            crossword: TimeCurve::crossword(),
            wordsearch: TimeCurve::word_search(),
            grading: GradingLimits::default(),
            words: WordBounds::default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        self.quiz.validate()?;
        self.crossword.validate("crossword")?;
        self.wordsearch.validate("wordsearch")?;
        self.grading.validate()?;
        self.words.validate()?;
        Ok(())
    }
}

/// Percentage thresholds for rating buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingThresholds {
    /// Minimum percentage for [`Rating::Excellent`].
    #[serde(default = "default_excellent")]
    pub excellent: u32,
    /// Minimum percentage for [`Rating::Good`].
    #[serde(default = "default_good")]
    pub good: u32,
}

fn default_excellent() -> u32 {
    80
}

fn default_good() -> u32 {
    50
}

impl Default for RatingThresholds {
    fn default() -> Self {
        Self {
            excellent: default_excellent(),
            good: default_good(),
        }
    }
}

impl RatingThresholds {
    /// Map a 0..=100 percentage onto a rating bucket.
    pub fn rate(&self, percent: u32) -> Rating {
        if percent >= self.excellent {
            Rating::Excellent
        } else if percent >= self.good {
            Rating::Good
        } else {
            Rating::NeedsImprovement
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.excellent <= 100,
            "quiz.excellent must be at most 100, got {}",
            self.excellent
        );
        ensure!(
            self.good <= self.excellent,
            "quiz.good ({}) must not exceed quiz.excellent ({})",
            self.good,
            self.excellent
        );
        Ok(())
    }
}

/// Time-weighting curve for the timed word games.
///
/// ```text
/// factor(t) = max_factor                                           t <= grace
///           = min_factor + (max_factor - min_factor)
///                          * decay / (decay + (t - grace))          t >  grace
/// ```
///
/// The factor never increases with time, never exceeds `max_factor` and
/// never drops below `min_factor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeCurve {
    /// Base points awarded per solved word before time weighting.
    pub points_per_word: u32,
    /// Multiplier for solves inside the grace window.
    pub max_factor: f64,
    /// Floor the multiplier approaches for very slow solves.
    pub min_factor: f64,
    /// Solves at or under this many seconds all get `max_factor`.
    pub grace_secs: u32,
    /// Seconds past the grace window at which the bonus above the floor halves.
    pub decay_secs: u32,
}

impl TimeCurve {
    pub fn crossword() -> Self {
        Self {
            points_per_word: 10,
            max_factor: 2.0,
            min_factor: 0.5,
            grace_secs: 10,
            decay_secs: 120,
        }
    }

    /// Word search grids are solved faster, so the curve is steeper.
    pub fn word_search() -> Self {
        Self {
            points_per_word: 10,
            max_factor: 2.0,
            min_factor: 0.5,
            grace_secs: 5,
            decay_secs: 60,
        }
    }

    pub fn factor(&self, elapsed_secs: u32) -> f64 {
        if elapsed_secs <= self.grace_secs {
            return self.max_factor;
        }
        let over = f64::from(elapsed_secs - self.grace_secs);
        let decay = f64::from(self.decay_secs);
        self.min_factor + (self.max_factor - self.min_factor) * decay / (decay + over)
    }

    /// Time-weighted points for `solved` words.
    pub fn points(&self, solved: u32, elapsed_secs: u32) -> u32 {
        let raw = f64::from(solved) * f64::from(self.points_per_word) * self.factor(elapsed_secs);
        raw.round() as u32
    }

    fn validate(&self, name: &str) -> Result<()> {
        ensure!(
            self.min_factor.is_finite() && self.max_factor.is_finite(),
            "{name}: factors must be finite"
        );
        ensure!(self.min_factor > 0.0, "{name}: min_factor must be positive");
        ensure!(
            self.max_factor >= self.min_factor,
            "{name}: max_factor ({}) must be at least min_factor ({})",
            self.max_factor,
            self.min_factor
        );
        ensure!(self.decay_secs > 0, "{name}: decay_secs must be positive");
        // One more solved word must still be worth at least one point after
        // rounding, or equal-time rounds could tie.
        ensure!(
            f64::from(self.points_per_word) * self.min_factor >= 1.0,
            "{name}: points_per_word * min_factor must be at least 1"
        );
        // The largest valid round must still fit in a score.
        let best = f64::from(self.points_per_word) * self.max_factor * MAX_PUZZLE_WORDS as f64;
        ensure!(
            best <= f64::from(u32::MAX),
            "{name}: points_per_word * max_factor is too large"
        );
        Ok(())
    }
}

/// Bounds applied to generator-produced grading output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingLimits {
    /// Max marks used when a rubric does not declare its own.
    #[serde(default = "default_max_marks")]
    pub default_max_marks: u32,
    /// Feedback longer than this many characters is truncated.
    #[serde(default = "default_feedback_chars")]
    pub max_feedback_chars: usize,
    /// Rating labels longer than this many characters are truncated.
    #[serde(default = "default_rating_chars")]
    pub max_rating_chars: usize,
}

fn default_max_marks() -> u32 {
    100
}

fn default_feedback_chars() -> usize {
    2000
}

fn default_rating_chars() -> usize {
    40
}

impl Default for GradingLimits {
    fn default() -> Self {
        Self {
            default_max_marks: default_max_marks(),
            max_feedback_chars: default_feedback_chars(),
            max_rating_chars: default_rating_chars(),
        }
    }
}

impl GradingLimits {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.default_max_marks > 0,
            "grading.default_max_marks must be positive"
        );
        ensure!(
            self.max_feedback_chars > 0,
            "grading.max_feedback_chars must be positive"
        );
        ensure!(
            self.max_rating_chars > 0,
            "grading.max_rating_chars must be positive"
        );
        Ok(())
    }
}

/// Length bounds for generated crossword and word-search words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordBounds {
    #[serde(default = "default_min_len")]
    pub min_len: usize,
    #[serde(default = "default_max_len")]
    pub max_len: usize,
}

fn default_min_len() -> usize {
    3
}

fn default_max_len() -> usize {
    12
}

impl Default for WordBounds {
    fn default() -> Self {
        Self {
            min_len: default_min_len(),
            max_len: default_max_len(),
        }
    }
}

impl WordBounds {
    pub fn contains(&self, len: usize) -> bool {
        (self.min_len..=self.max_len).contains(&len)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.min_len >= 1, "words.min_len must be at least 1");
        ensure!(
            self.min_len <= self.max_len,
            "words.min_len ({}) must not exceed words.max_len ({})",
            self.min_len,
            self.max_len
        );
        Ok(())
    }
}

//! Assignment grading engine.
//!
//! Sends free-text work plus a rubric through the generation adapter and
//! bounds whatever comes back: marks are clamped into `0..=max_marks`, the
//! rating label and feedback are length-limited. A reply whose marks are not
//! a number at all never reaches this module; the adapter treats it as a
//! schema failure and eventually reports a `GenerationError`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{GradingLimits, RatingThresholds};
use crate::error::{EngineError, ValidationError};
use crate::generation::{GenerationAdapter, RubricFeedback};

/// Grading criteria supplied with an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    /// Free-text criteria handed to the generator.
    pub criteria: String,
    /// Upper bound for marks; `None` uses the configured default.
    #[serde(default)]
    pub max_marks: Option<u32>,
}

/// A student's assignment submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSubmission {
    pub assignment_id: String,
    pub text: String,
    pub rubric: Rubric,
}

/// Bounded grading outcome, keyed by assignment id in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingResult {
    pub assignment_id: String,
    pub marks: u32,
    pub max_marks: u32,
    pub rating: String,
    pub feedback: String,
    pub graded_at: DateTime<Utc>,
}

/// Grades assignments through the generation adapter.
pub struct AssignmentGrader {
    adapter: Arc<GenerationAdapter>,
    limits: GradingLimits,
    thresholds: RatingThresholds,
}

impl AssignmentGrader {
    pub fn new(
        adapter: Arc<GenerationAdapter>,
        limits: GradingLimits,
        thresholds: RatingThresholds,
    ) -> Self {
        Self {
            adapter,
            limits,
            thresholds,
        }
    }

    /// Grade one submission. Failures are surfaced as-is; there is no retry
    /// beyond the adapter's own attempt budget.
    pub async fn grade(
        &self,
        submission: &AssignmentSubmission,
    ) -> Result<GradingResult, EngineError> {
        if submission.assignment_id.trim().is_empty() {
            return Err(ValidationError::Empty("assignment id").into());
        }
        if submission.text.trim().is_empty() {
            return Err(ValidationError::Empty("assignment text").into());
        }
        let max_marks = submission
            .rubric
            .max_marks
            .unwrap_or(self.limits.default_max_marks);
        if max_marks == 0 {
            return Err(ValidationError::NotPositive("max_marks").into());
        }

        let feedback = self
            .adapter
            .rubric_feedback(&submission.text, &submission.rubric.criteria, max_marks)
            .await?;

        let result = bound(
            &submission.assignment_id,
            feedback,
            max_marks,
            &self.limits,
            &self.thresholds,
            Utc::now(),
        );
        info!(
            assignment_id = %result.assignment_id,
            marks = result.marks,
            max_marks,
            "assignment graded"
        );
        Ok(result)
    }
}

/// Apply the bounds to raw generator feedback. Pure.
pub fn bound(
    assignment_id: &str,
    feedback: RubricFeedback,
    max_marks: u32,
    limits: &GradingLimits,
    thresholds: &RatingThresholds,
    graded_at: DateTime<Utc>,
) -> GradingResult {
    let clamped = feedback.marks.clamp(0.0, f64::from(max_marks));
    if clamped != feedback.marks {
        warn!(
            assignment_id,
            reported = feedback.marks,
            max_marks,
            "generator marks out of range, clamped"
        );
    }
    let marks = clamped.round() as u32;

    let rating = if feedback.rating.trim().is_empty() {
        let percent = (u64::from(marks) * 100 / u64::from(max_marks)) as u32;
        thresholds.rate(percent).to_string()
    } else {
        truncate_chars(feedback.rating.trim(), limits.max_rating_chars)
    };

    GradingResult {
        assignment_id: assignment_id.to_string(),
        marks,
        max_marks,
        rating,
        feedback: truncate_chars(&feedback.feedback, limits.max_feedback_chars),
        graded_at,
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fb(marks: f64, rating: &str, feedback: &str) -> RubricFeedback {
        RubricFeedback {
            marks,
            rating: rating.into(),
            feedback: feedback.into(),
        }
    }

    fn bound_default(feedback: RubricFeedback, max_marks: u32) -> GradingResult {
        bound(
            "a-1",
            feedback,
            max_marks,
            &GradingLimits::default(),
            &RatingThresholds::default(),
            Utc::now(),
        )
    }

    #[test]
    fn in_range_marks_pass_through() {
        let result = bound_default(fb(72.4, "Good", "Clear structure."), 100);
        assert_eq!(result.marks, 72);
        assert_eq!(result.max_marks, 100);
        assert_eq!(result.rating, "Good");
        assert_eq!(result.feedback, "Clear structure.");
    }

    #[test]
    fn marks_are_clamped() {
        assert_eq!(bound_default(fb(150.0, "x", "y"), 100).marks, 100);
        assert_eq!(bound_default(fb(-3.0, "x", "y"), 100).marks, 0);
        assert_eq!(bound_default(fb(10.6, "x", "y"), 10).marks, 10);
    }

    #[test]
    fn missing_rating_is_derived_from_percentage() {
        assert_eq!(bound_default(fb(9.0, "", "ok"), 10).rating, "excellent");
        assert_eq!(bound_default(fb(6.0, "  ", "ok"), 10).rating, "good");
        assert_eq!(bound_default(fb(2.0, "", "ok"), 10).rating, "needs improvement");
    }

    #[test]
    fn feedback_and_rating_are_length_bounded() {
        let limits = GradingLimits {
            max_feedback_chars: 5,
            max_rating_chars: 3,
            ..GradingLimits::default()
        };
        let result = bound(
            "a-1",
            fb(1.0, "Excellent", "héllo wörld"),
            10,
            &limits,
            &RatingThresholds::default(),
            Utc::now(),
        );
        assert_eq!(result.feedback, "héllo");
        assert_eq!(result.rating, "Exc");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}

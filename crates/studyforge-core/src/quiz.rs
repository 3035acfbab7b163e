//! Quiz engine: fixed-size MCQ quizzes and their deterministic grading.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RatingThresholds;
use crate::error::{GenerationError, ValidationError};
use crate::generation::GenerationAdapter;
use crate::model::{Level, Question, Rating, OPTION_COUNT};

/// Questions per quiz.
pub const QUIZ_LENGTH: usize = 10;

/// Marks awarded per correct answer; with [`QUIZ_LENGTH`] questions the mark
/// tops out at 100.
pub const MARKS_PER_QUESTION: u32 = 10;

/// A generated quiz. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    id: Uuid,
    subject: String,
    level: Level,
    questions: Vec<Question>,
    created_at: DateTime<Utc>,
}

impl Quiz {
    pub fn new(subject: impl Into<String>, level: Level, questions: Vec<Question>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            level,
            questions,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// What a student sees before answering: prompts and options only.
    pub fn student_view(&self) -> QuizView {
        QuizView {
            id: self.id,
            subject: self.subject.clone(),
            level: self.level,
            questions: self
                .questions
                .iter()
                .map(|q| QuestionView {
                    prompt: q.prompt().to_string(),
                    options: q.options().clone(),
                })
                .collect(),
        }
    }
}

/// Student-facing projection of a [`Quiz`]. Carries no answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizView {
    pub id: Uuid,
    pub subject: String,
    pub level: Level,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub prompt: String,
    pub options: [String; OPTION_COUNT],
}

/// A student's answers; `None` marks an unanswered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub quiz_id: Uuid,
    pub answers: Vec<Option<usize>>,
}

/// Outcome of grading a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub quiz_id: Uuid,
    /// Correctness per question, in quiz order.
    pub correct: Vec<bool>,
    /// Number of correct answers.
    pub raw_score: u32,
    /// `raw_score * MARKS_PER_QUESTION`, 0..=100.
    pub mark: u32,
    pub rating: Rating,
}

/// Post-grading walkthrough of one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub prompt: String,
    pub options: [String; OPTION_COUNT],
    pub correct_index: usize,
    pub student_answer: Option<usize>,
    pub is_correct: bool,
    pub explanation: String,
}

/// Mark for a raw score. Pure and monotonic.
pub fn mark_for(raw_score: u32) -> u32 {
    raw_score * MARKS_PER_QUESTION
}

/// Builds quizzes from the generation adapter and grades submissions.
pub struct QuizEngine {
    adapter: Arc<GenerationAdapter>,
    thresholds: RatingThresholds,
}

impl QuizEngine {
    pub fn new(adapter: Arc<GenerationAdapter>, thresholds: RatingThresholds) -> Self {
        Self {
            adapter,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> RatingThresholds {
        self.thresholds
    }

    /// Generate a fresh [`QUIZ_LENGTH`]-question quiz.
    pub async fn start_quiz(&self, subject: &str, level: Level) -> Result<Quiz, GenerationError> {
        let questions = self
            .adapter
            .questions(subject, level, QUIZ_LENGTH)
            .await?;
        let quiz = Quiz::new(subject, level, questions);
        tracing::info!(quiz_id = %quiz.id(), subject, %level, "quiz created");
        Ok(quiz)
    }

    /// Grade a submission. Never calls the generator, so grading the same
    /// submission twice yields the same result.
    pub fn grade_submission(
        &self,
        quiz: &Quiz,
        submission: &QuizSubmission,
    ) -> Result<QuizResult, ValidationError> {
        grade(quiz, submission, &self.thresholds)
    }
}

fn check_submission(quiz: &Quiz, submission: &QuizSubmission) -> Result<(), ValidationError> {
    if submission.quiz_id != quiz.id() {
        return Err(ValidationError::QuizMismatch {
            expected: quiz.id(),
            submitted: submission.quiz_id,
        });
    }
    if submission.answers.len() != quiz.questions().len() {
        return Err(ValidationError::AnswerCount {
            expected: quiz.questions().len(),
            actual: submission.answers.len(),
        });
    }
    for (index, answer) in submission.answers.iter().enumerate() {
        if let Some(selected) = *answer {
            if selected >= OPTION_COUNT {
                return Err(ValidationError::OptionOutOfRange {
                    index,
                    selected,
                    options: OPTION_COUNT,
                });
            }
        }
    }
    Ok(())
}

/// Grade `submission` against `quiz` with the given rating thresholds.
pub fn grade(
    quiz: &Quiz,
    submission: &QuizSubmission,
    thresholds: &RatingThresholds,
) -> Result<QuizResult, ValidationError> {
    check_submission(quiz, submission)?;

    let correct: Vec<bool> = quiz
        .questions()
        .iter()
        .zip(&submission.answers)
        .map(|(question, answer)| *answer == Some(question.correct_index()))
        .collect();
    let raw_score = correct.iter().filter(|c| **c).count() as u32;
    let mark = mark_for(raw_score);

    Ok(QuizResult {
        quiz_id: quiz.id(),
        correct,
        raw_score,
        mark,
        rating: thresholds.rate(mark),
    })
}

/// Per-question review with answers and explanations revealed.
pub fn review(
    quiz: &Quiz,
    submission: &QuizSubmission,
) -> Result<Vec<QuestionReview>, ValidationError> {
    check_submission(quiz, submission)?;

    Ok(quiz
        .questions()
        .iter()
        .zip(&submission.answers)
        .map(|(question, answer)| QuestionReview {
            prompt: question.prompt().to_string(),
            options: question.options().clone(),
            correct_index: question.correct_index(),
            student_answer: *answer,
            is_correct: *answer == Some(question.correct_index()),
            explanation: question.explanation().to_string(),
        })
        .collect())
}

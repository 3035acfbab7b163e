//! Assessment engine façade.
//!
//! Wires the generation adapter, the quiz/grading/game engines and the
//! stores together and exposes one method per student-facing operation.
//! Each call is independent; the only shared mutable state is the score log.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::error::{EngineError, ValidationError};
use crate::games::GameScorer;
use crate::generation::{AdapterConfig, GenerationAdapter};
use crate::grading::{AssignmentGrader, AssignmentSubmission, GradingResult};
use crate::leaderboard::{self, Anonymous, LeaderboardEntry, StudentDirectory};
use crate::model::{GameRound, GameType, Level, ScoreRecord};
use crate::puzzle::{CrosswordPuzzle, WordSearchPuzzle};
use crate::quiz::{self, QuestionReview, Quiz, QuizEngine, QuizResult, QuizSubmission};
use crate::store::MemoryStore;
use crate::traits::{GradingStore, QuizStore, ScoreLog, TextGenerator};

pub use crate::model::{MAX_PUZZLE_WORDS, MIN_PUZZLE_WORDS};

/// The persistence collaborators.
#[derive(Clone)]
pub struct Stores {
    pub scores: Arc<dyn ScoreLog>,
    pub quizzes: Arc<dyn QuizStore>,
    pub gradings: Arc<dyn GradingStore>,
}

impl Stores {
    /// Use one backend for all three collections.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: ScoreLog + QuizStore + GradingStore + 'static,
    {
        Self {
            scores: backend.clone(),
            quizzes: backend.clone(),
            gradings: backend,
        }
    }

    pub fn memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }
}

pub struct AssessmentEngine {
    adapter: Arc<GenerationAdapter>,
    quizzes: QuizEngine,
    grader: AssignmentGrader,
    scorer: GameScorer,
    stores: Stores,
    directory: Arc<dyn StudentDirectory>,
}

impl AssessmentEngine {
    /// Build an engine. Word-length bounds always come from `scoring`.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        mut adapter_config: AdapterConfig,
        scoring: &ScoringConfig,
        stores: Stores,
    ) -> Self {
        adapter_config.words = scoring.words;
        let adapter = Arc::new(GenerationAdapter::new(generator, adapter_config));
        Self {
            quizzes: QuizEngine::new(Arc::clone(&adapter), scoring.quiz),
            grader: AssignmentGrader::new(Arc::clone(&adapter), scoring.grading, scoring.quiz),
            scorer: GameScorer::new(scoring.crossword, scoring.wordsearch),
            adapter,
            stores,
            directory: Arc::new(Anonymous),
        }
    }

    /// Resolve leaderboard display names through `directory`.
    pub fn with_directory(mut self, directory: Arc<dyn StudentDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn adapter(&self) -> &GenerationAdapter {
        &self.adapter
    }

    // -- quizzes ------------------------------------------------------------

    /// Generate and persist a new quiz.
    pub async fn start_quiz(&self, subject: &str, level: Level) -> Result<Quiz, EngineError> {
        if subject.trim().is_empty() {
            return Err(ValidationError::Empty("subject").into());
        }
        let quiz = self.quizzes.start_quiz(subject.trim(), level).await?;
        self.stores.quizzes.save_quiz(&quiz).await?;
        Ok(quiz)
    }

    pub async fn quiz(&self, id: Uuid) -> Result<Quiz, EngineError> {
        self.stores
            .quizzes
            .load_quiz(id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                kind: "quiz",
                id: id.to_string(),
            })
    }

    /// Grade answers against the stored quiz.
    pub async fn submit_quiz(&self, submission: &QuizSubmission) -> Result<QuizResult, EngineError> {
        let quiz = self.quiz(submission.quiz_id).await?;
        let result = self.quizzes.grade_submission(&quiz, submission)?;
        info!(
            quiz_id = %quiz.id(),
            raw_score = result.raw_score,
            mark = result.mark,
            rating = %result.rating,
            "quiz graded"
        );
        Ok(result)
    }

    pub async fn review_quiz(
        &self,
        submission: &QuizSubmission,
    ) -> Result<Vec<QuestionReview>, EngineError> {
        let quiz = self.quiz(submission.quiz_id).await?;
        Ok(quiz::review(&quiz, submission)?)
    }

    // -- assignments --------------------------------------------------------

    /// Grade an assignment and store the result under its assignment id.
    pub async fn grade_assignment(
        &self,
        submission: &AssignmentSubmission,
    ) -> Result<GradingResult, EngineError> {
        let result = self.grader.grade(submission).await?;
        self.stores.gradings.save_grading(&result).await?;
        Ok(result)
    }

    pub async fn grading(&self, assignment_id: &str) -> Result<GradingResult, EngineError> {
        self.stores
            .gradings
            .load_grading(assignment_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                kind: "grading",
                id: assignment_id.to_string(),
            })
    }

    // -- games --------------------------------------------------------------

    /// Score a round and append it to the log. Invalid rounds leave no record.
    pub async fn record_game_round(
        &self,
        student_id: &str,
        round: &GameRound,
    ) -> Result<ScoreRecord, EngineError> {
        let record = self.scorer.score(student_id, round, Utc::now())?;
        self.stores.scores.append(&record).await?;
        info!(
            game = %record.game(),
            score = record.score(),
            record_id = %record.id(),
            "score recorded"
        );
        Ok(record)
    }

    pub async fn leaderboard(
        &self,
        game: GameType,
        n: usize,
    ) -> Result<Vec<LeaderboardEntry>, EngineError> {
        let entries = leaderboard::leaderboard(
            self.stores.scores.as_ref(),
            game,
            n,
            self.directory.as_ref(),
        )
        .await?;
        Ok(entries)
    }

    // -- puzzles ------------------------------------------------------------

    pub async fn new_crossword(
        &self,
        subject: &str,
        level: Level,
        count: usize,
    ) -> Result<CrosswordPuzzle, EngineError> {
        check_puzzle_request(subject, count)?;
        let entries = self
            .adapter
            .crossword_clues(subject.trim(), level, count)
            .await?;
        let puzzle = CrosswordPuzzle::new(subject.trim(), level, entries);
        info!(puzzle_id = %puzzle.id, total = puzzle.total(), "crossword created");
        Ok(puzzle)
    }

    pub async fn new_word_search(
        &self,
        subject: &str,
        level: Level,
        count: usize,
    ) -> Result<WordSearchPuzzle, EngineError> {
        check_puzzle_request(subject, count)?;
        let words = self
            .adapter
            .wordsearch_words(subject.trim(), level, count)
            .await?;
        let puzzle = WordSearchPuzzle::new(subject.trim(), level, words);
        info!(puzzle_id = %puzzle.id, total = puzzle.total(), "word search created");
        Ok(puzzle)
    }
}

fn check_puzzle_request(subject: &str, count: usize) -> Result<(), ValidationError> {
    if subject.trim().is_empty() {
        return Err(ValidationError::Empty("subject"));
    }
    if !(MIN_PUZZLE_WORDS..=MAX_PUZZLE_WORDS).contains(&count) {
        return Err(ValidationError::OutOfRange {
            field: "word count",
            value: count,
            min: MIN_PUZZLE_WORDS,
            max: MAX_PUZZLE_WORDS,
        });
    }
    Ok(())
}

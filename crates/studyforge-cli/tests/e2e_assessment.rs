//! End-to-end engine flows against a scripted generator.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use studyforge_core::config::ScoringConfig;
use studyforge_core::generation::AdapterConfig;
use studyforge_core::grading::{AssignmentSubmission, Rubric};
use studyforge_core::leaderboard::Roster;
use studyforge_core::model::{GameRound, GameType, Level, Outcome, Rating};
use studyforge_core::quiz::QuizSubmission;
use studyforge_core::store::FileStore;
use studyforge_core::{AssessmentEngine, EngineError, GenerationError, Stores};
use studyforge_providers::mock::{MockGenerator, MockReply};

fn engine(mock: &Arc<MockGenerator>, stores: Stores) -> AssessmentEngine {
    AssessmentEngine::new(
        mock.clone(),
        AdapterConfig {
            retry_delay: Duration::ZERO,
            ..AdapterConfig::default()
        },
        &ScoringConfig::default(),
        stores,
    )
}

fn questions_json() -> String {
    let questions: Vec<serde_json::Value> = (0..10)
        .map(|i| {
            serde_json::json!({
                "question": format!("Which year came {i} after 1900?"),
                "options": [
                    format!("{}", 1899 + i),
                    format!("{}", 1900 + i),
                    format!("{}", 1901 + i),
                    format!("{}", 1902 + i)
                ],
                "correct_index": 1,
                "explanation": "add the offset to 1900"
            })
        })
        .collect();
    serde_json::json!({ "questions": questions }).to_string()
}

fn essay() -> AssignmentSubmission {
    AssignmentSubmission {
        assignment_id: "hw-1".into(),
        text: "Photosynthesis turns light into chemical energy.".into(),
        rubric: Rubric {
            criteria: "accuracy and clarity".into(),
            max_marks: None,
        },
    }
}

#[tokio::test]
async fn quiz_is_marked_ten_per_correct_answer() {
    let mock = Arc::new(MockGenerator::with_fixed_response(&questions_json()));
    let engine = engine(&mock, Stores::memory());

    let quiz = engine.start_quiz("math", Level::Easy).await.unwrap();
    assert_eq!(quiz.questions().len(), 10);
    for question in quiz.questions() {
        let distinct: std::collections::HashSet<&String> = question.options().iter().collect();
        assert_eq!(distinct.len(), 4);
        assert!(question.correct_index() < 4);
    }
    assert!(!serde_json::to_string(&quiz.student_view())
        .unwrap()
        .contains("correct_index"));

    let mut answers = vec![Some(1); 7];
    answers.extend([Some(0), None, Some(3)]);
    let submission = QuizSubmission {
        quiz_id: quiz.id(),
        answers,
    };

    let first = engine.submit_quiz(&submission).await.unwrap();
    assert_eq!(first.raw_score, 7);
    assert_eq!(first.mark, 70);
    assert_eq!(first.rating, Rating::Good);

    // grading is deterministic and never goes back to the generator
    let second = engine.submit_quiz(&submission).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(mock.call_count(), 1);

    let review = engine.review_quiz(&submission).await.unwrap();
    assert!(review[0].is_correct);
    assert_eq!(review[8].student_answer, None);
    assert_eq!(review[9].explanation, "add the offset to 1900");
}

#[tokio::test]
async fn malformed_output_is_retried() {
    let mock = Arc::new(MockGenerator::with_responses([
        "Sure! Here are your questions:".to_string(),
        questions_json(),
    ]));
    let engine = engine(&mock, Stores::memory());

    let quiz = engine.start_quiz("history", Level::Medium).await.unwrap();
    assert_eq!(quiz.level(), Level::Medium);
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn persistent_garbage_asks_the_student_to_retry() {
    let mock = Arc::new(MockGenerator::with_fixed_response("{\"questions\": []}"));
    let engine = engine(&mock, Stores::memory());

    let err = engine.start_quiz("history", Level::Easy).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Generation(GenerationError::Exhausted { attempts: 2, .. })
    ));
    assert!(err.is_retryable());
    assert_eq!(err.user_message(), "please try again");
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn missing_model_is_not_retried() {
    let mock = Arc::new(MockGenerator::new(vec![MockReply::ModelNotFound]));
    let engine = engine(&mock, Stores::memory());

    let err = engine.start_quiz("history", Level::Easy).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Generation(GenerationError::Rejected(_))
    ));
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn network_blip_is_absorbed() {
    let mock = Arc::new(MockGenerator::new(vec![
        MockReply::NetworkError("connection reset".into()),
        MockReply::Text(r#"{"words": ["cell", "atom", "proton"]}"#.into()),
    ]));
    let engine = engine(&mock, Stores::memory());

    let puzzle = engine
        .new_word_search("science", Level::Easy, 3)
        .await
        .unwrap();
    assert_eq!(puzzle.words, vec!["CELL", "ATOM", "PROTON"]);
    assert_eq!(puzzle.total(), 3);
}

#[tokio::test]
async fn grading_clamps_marks_and_is_stored() {
    let mock = Arc::new(MockGenerator::with_fixed_response(
        r#"{"marks": 150, "feedback": "Thorough and clear."}"#,
    ));
    let engine = engine(&mock, Stores::memory());

    let result = engine.grade_assignment(&essay()).await.unwrap();
    assert_eq!(result.marks, 100);
    assert_eq!(result.max_marks, 100);
    assert_eq!(result.rating, "excellent");
    assert_eq!(result.feedback, "Thorough and clear.");

    assert_eq!(engine.grading("hw-1").await.unwrap(), result);
}

#[tokio::test]
async fn unparseable_marks_fail_the_grading() {
    let mock = Arc::new(MockGenerator::with_fixed_response(
        r#"{"marks": "very good", "feedback": "Nice."}"#,
    ));
    let engine = engine(&mock, Stores::memory());

    let err = engine.grade_assignment(&essay()).await.unwrap_err();
    assert!(matches!(err, EngineError::Generation(_)));
    assert!(matches!(
        engine.grading("hw-1").await,
        Err(EngineError::NotFound { .. })
    ));
}

#[tokio::test]
async fn crossword_play_through() {
    let mock = Arc::new(MockGenerator::with_fixed_response(
        r#"{"words": [
            {"word": "nucleus", "clue": "Control centre of the cell"},
            {"word": "ribosome", "clue": "Where proteins are made"},
            {"word": "membrane", "clue": "The cell's outer layer"}
        ]}"#,
    ));
    let roster = Roster::new()
        .with_student("fast", "Ada")
        .with_student("slow", "Bo");
    let engine = engine(&mock, Stores::memory()).with_directory(Arc::new(roster));

    let puzzle = engine
        .new_crossword("biology", Level::Hard, 3)
        .await
        .unwrap();
    let clues: Vec<(usize, &str)> = puzzle.clues().collect();
    assert_eq!(clues[1], (2, "Where proteins are made"));

    let round = |elapsed_secs| GameRound::Crossword {
        correct_words: puzzle.total(),
        total_words: puzzle.total(),
        elapsed_secs,
    };
    let fast = engine.record_game_round("fast", &round(15)).await.unwrap();
    let slow = engine.record_game_round("slow", &round(30)).await.unwrap();
    assert!(fast.score() >= slow.score());

    let board = engine.leaderboard(GameType::Crossword, 10).await.unwrap();
    assert_eq!(board[0].display_name, "Ada");
    assert_eq!(board[1].display_name, "Bo");
    assert!(engine
        .leaderboard(GameType::WordSearch, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn puzzle_size_is_checked_before_generating() {
    let mock = Arc::new(MockGenerator::with_fixed_response("{}"));
    let engine = engine(&mock, Stores::memory());

    let err = engine
        .new_crossword("biology", Level::Easy, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn file_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let mock = Arc::new(MockGenerator::with_fixed_response(&questions_json()));

    let quiz_id = {
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let engine = engine(&mock, Stores::from_backend(store));
        for outcome in [Outcome::Win, Outcome::Draw] {
            engine
                .record_game_round("s-1", &GameRound::TicTacToe { outcome })
                .await
                .unwrap();
        }
        engine
            .record_game_round(
                "s-2",
                &GameRound::TicTacToe {
                    outcome: Outcome::Loss,
                },
            )
            .await
            .unwrap();
        engine.start_quiz("history", Level::Easy).await.unwrap().id()
    };

    let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let engine = engine(&mock, Stores::from_backend(store));

    let board = engine.leaderboard(GameType::TicTacToe, 10).await.unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].aggregate_score, 4);
    assert_eq!(board[1].aggregate_score, 0);

    let result = engine
        .submit_quiz(&QuizSubmission {
            quiz_id,
            answers: vec![Some(1); 10],
        })
        .await
        .unwrap();
    assert_eq!(result.mark, 100);
    assert_eq!(result.rating, Rating::Excellent);
}

//! Storage backends for score records, quizzes and grading results.
//!
//! [`MemoryStore`] keeps everything in process and is what tests use.
//! [`FileStore`] lays data out under one directory:
//!
//! ```text
//! <data_dir>/scores.jsonl          one ScoreRecord per line, append-only
//! <data_dir>/quizzes/<id>.json     one Quiz per file
//! <data_dir>/gradings/<id>.json    latest GradingResult per assignment
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::grading::GradingResult;
use crate::model::{GameType, ScoreRecord};
use crate::quiz::Quiz;
use crate::traits::{GradingStore, QuizStore, ScoreLog};

const SCORES_FILE: &str = "scores.jsonl";
const QUIZZES_DIR: &str = "quizzes";
const GRADINGS_DIR: &str = "gradings";

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    scores: RwLock<Vec<ScoreRecord>>,
    quizzes: RwLock<HashMap<Uuid, Quiz>>,
    gradings: RwLock<HashMap<String, GradingResult>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of score records across all games.
    pub async fn score_count(&self) -> usize {
        self.scores.read().await.len()
    }
}

#[async_trait]
impl ScoreLog for MemoryStore {
    async fn append(&self, record: &ScoreRecord) -> Result<()> {
        self.scores.write().await.push(record.clone());
        Ok(())
    }

    async fn records_for(&self, game: GameType) -> Result<Vec<ScoreRecord>> {
        Ok(self
            .scores
            .read()
            .await
            .iter()
            .filter(|r| r.game() == game)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn save_quiz(&self, quiz: &Quiz) -> Result<()> {
        self.quizzes.write().await.insert(quiz.id(), quiz.clone());
        Ok(())
    }

    async fn load_quiz(&self, id: Uuid) -> Result<Option<Quiz>> {
        Ok(self.quizzes.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl GradingStore for MemoryStore {
    async fn save_grading(&self, result: &GradingResult) -> Result<()> {
        self.gradings
            .write()
            .await
            .insert(result.assignment_id.clone(), result.clone());
        Ok(())
    }

    async fn load_grading(&self, assignment_id: &str) -> Result<Option<GradingResult>> {
        Ok(self.gradings.read().await.get(assignment_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// File-backed
// ---------------------------------------------------------------------------

/// Directory-backed store.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    // Serializes appends so concurrent writers never interleave lines.
    append_lock: Mutex<()>,
}

impl FileStore {
    /// Open (and create if needed) a data directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [root.clone(), root.join(QUIZZES_DIR), root.join(GRADINGS_DIR)] {
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(Self {
            root,
            append_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scores_path(&self) -> PathBuf {
        self.root.join(SCORES_FILE)
    }

    fn quiz_path(&self, id: Uuid) -> PathBuf {
        self.root.join(QUIZZES_DIR).join(format!("{id}.json"))
    }

    fn grading_path(&self, assignment_id: &str) -> Result<PathBuf> {
        if assignment_id.is_empty()
            || !assignment_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            || assignment_id.starts_with('.')
        {
            bail!("assignment id {assignment_id:?} cannot be used as a file name");
        }
        Ok(self
            .root
            .join(GRADINGS_DIR)
            .join(format!("{assignment_id}.json")))
    }
}

async fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize record")?;
    // Write to a sibling file first so readers never see a half-written record.
    // The temp name is unique per save; concurrent writers of one record race
    // only on the final rename.
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", Uuid::new_v4()));
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to move record into {}", path.display()))?;
    Ok(())
}

async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(value))
}

#[async_trait]
impl ScoreLog for FileStore {
    async fn append(&self, record: &ScoreRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("failed to serialize score")?;
        line.push('\n');

        let path = self.scores_path();
        let _guard = self.append_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("failed to append to {}", path.display()))?;
        file.flush().await?;
        debug!(record_id = %record.id(), path = %path.display(), "score appended");
        Ok(())
    }

    async fn records_for(&self, game: GameType) -> Result<Vec<ScoreRecord>> {
        let path = self.scores_path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        let mut records = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: ScoreRecord = serde_json::from_str(line)
                .with_context(|| format!("{}:{}: malformed score record", path.display(), i + 1))?;
            if record.game() == game {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl QuizStore for FileStore {
    async fn save_quiz(&self, quiz: &Quiz) -> Result<()> {
        save_json(&self.quiz_path(quiz.id()), quiz).await
    }

    async fn load_quiz(&self, id: Uuid) -> Result<Option<Quiz>> {
        load_json(&self.quiz_path(id)).await
    }
}

#[async_trait]
impl GradingStore for FileStore {
    async fn save_grading(&self, result: &GradingResult) -> Result<()> {
        save_json(&self.grading_path(&result.assignment_id)?, result).await
    }

    async fn load_grading(&self, assignment_id: &str) -> Result<Option<GradingResult>> {
        load_json(&self.grading_path(assignment_id)?).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::model::{Level, Question};

    fn quiz() -> Quiz {
        let q = Question::new(
            "Largest planet?",
            [
                "Mars".into(),
                "Jupiter".into(),
                "Venus".into(),
                "Earth".into(),
            ],
            1,
            "Jupiter is the largest.",
        )
        .unwrap();
        Quiz::new("astronomy", Level::Easy, vec![q])
    }

    fn grading(id: &str, marks: u32) -> GradingResult {
        GradingResult {
            assignment_id: id.into(),
            marks,
            max_marks: 100,
            rating: "good".into(),
            feedback: "ok".into(),
            graded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn memory_store_filters_by_game() {
        let store = MemoryStore::new();
        store
            .append(&ScoreRecord::new("a", GameType::TicTacToe, 3, Utc::now()))
            .await
            .unwrap();
        store
            .append(&ScoreRecord::new("a", GameType::Crossword, 40, Utc::now()))
            .await
            .unwrap();

        assert_eq!(store.score_count().await, 2);
        let ttt = store.records_for(GameType::TicTacToe).await.unwrap();
        assert_eq!(ttt.len(), 1);
        assert_eq!(ttt[0].score(), 3);
    }

    #[tokio::test]
    async fn file_store_round_trips_quiz_and_grading() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let quiz = quiz();
        store.save_quiz(&quiz).await.unwrap();
        assert_eq!(store.load_quiz(quiz.id()).await.unwrap(), Some(quiz));
        assert_eq!(store.load_quiz(Uuid::new_v4()).await.unwrap(), None);

        store.save_grading(&grading("hw-1", 40)).await.unwrap();
        store.save_grading(&grading("hw-1", 75)).await.unwrap();
        let latest = store.load_grading("hw-1").await.unwrap().unwrap();
        assert_eq!(latest.marks, 75);
        assert!(store.load_grading("hw-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_rejects_path_like_assignment_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.save_grading(&grading("../escape", 1)).await.is_err());
        assert!(store.load_grading("a/b").await.is_err());
    }

    #[tokio::test]
    async fn file_store_log_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).await.unwrap();
            assert!(store.records_for(GameType::WordSearch).await.unwrap().is_empty());
            store
                .append(&ScoreRecord::new("a", GameType::WordSearch, 90, Utc::now()))
                .await
                .unwrap();
        }
        let store = FileStore::open(dir.path()).await.unwrap();
        let records = store.records_for(GameType::WordSearch).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].student_id(), "a");
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..50u32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let record = ScoreRecord::new(format!("s{}", i % 5), GameType::TicTacToe, i % 4, Utc::now());
                store.append(&record).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let records = store.records_for(GameType::TicTacToe).await.unwrap();
        assert_eq!(records.len(), 50);
        let total: u32 = records.iter().map(|r| r.score()).sum();
        assert_eq!(total, (0..50u32).map(|i| i % 4).sum::<u32>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_gradings_of_one_assignment_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());

        let mut handles = Vec::new();
        for marks in 0..64u32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.save_grading(&grading("hw-1", marks)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let loaded = store.load_grading("hw-1").await.unwrap().unwrap();
        assert!(loaded.marks < 64);

        let mut entries = tokio::fs::read_dir(dir.path().join(GRADINGS_DIR)).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["hw-1.json"]);
    }

    #[tokio::test]
    async fn malformed_log_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join(SCORES_FILE), "{not json}\n")
            .await
            .unwrap();
        let err = store.records_for(GameType::Crossword).await.unwrap_err();
        assert!(format!("{err:#}").contains("malformed score record"));
    }
}

//! Leaderboard aggregation over the score log.
//!
//! Nothing is cached: every call reads the records for one game and sums them
//! per student. Output rows carry a display name only, never the student id.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{GameType, ScoreRecord};
use crate::traits::ScoreLog;

/// Resolves student ids to names safe for public display.
pub trait StudentDirectory: Send + Sync {
    fn display_name(&self, student_id: &str) -> Option<String>;
}

/// Directory that knows no one; every row falls back to `Student #<rank>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl StudentDirectory for Anonymous {
    fn display_name(&self, _student_id: &str) -> Option<String> {
        None
    }
}

/// Display names loaded from a roster file.
///
/// ```toml
/// [students]
/// s-1 = "Ada L."
/// s-2 = "Grace H."
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    students: HashMap<String, String>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_student(mut self, student_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.students.insert(student_id.into(), name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Load a roster from a TOML file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read roster from {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("failed to parse roster {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let roster: Roster = toml::from_str(content)?;
        Ok(roster)
    }
}

impl StudentDirectory for Roster {
    fn display_name(&self, student_id: &str) -> Option<String> {
        self.students
            .get(student_id)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    }
}

/// One ranked leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    pub display_name: String,
    pub game: GameType,
    pub aggregate_score: u64,
    /// Number of rounds summed into the aggregate.
    pub rounds: u32,
}

struct Tally<'a> {
    student_id: &'a str,
    total: u64,
    rounds: u32,
    reached_at: DateTime<Utc>,
}

/// Rank students for `game` by summed score.
///
/// Records for other games are ignored. Ties on the aggregate go to the
/// student whose latest counted round is earliest (they reached the total
/// first), then to student id order so the output is stable.
pub fn top_n(
    records: &[ScoreRecord],
    game: GameType,
    n: usize,
    directory: &dyn StudentDirectory,
) -> Vec<LeaderboardEntry> {
    let mut tallies: HashMap<&str, Tally<'_>> = HashMap::new();
    for record in records.iter().filter(|r| r.game() == game) {
        let tally = tallies.entry(record.student_id()).or_insert(Tally {
            student_id: record.student_id(),
            total: 0,
            rounds: 0,
            reached_at: record.recorded_at(),
        });
        tally.total += u64::from(record.score());
        tally.rounds += 1;
        tally.reached_at = tally.reached_at.max(record.recorded_at());
    }

    let mut ranked: Vec<Tally<'_>> = tallies.into_values().collect();
    ranked.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.reached_at.cmp(&b.reached_at))
            .then_with(|| a.student_id.cmp(b.student_id))
    });
    ranked.truncate(n);

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, tally)| {
            let rank = i + 1;
            LeaderboardEntry {
                rank,
                display_name: directory
                    .display_name(tally.student_id)
                    .unwrap_or_else(|| format!("Student #{rank}")),
                game,
                aggregate_score: tally.total,
                rounds: tally.rounds,
            }
        })
        .collect()
}

/// Read the log and rank in one step.
pub async fn leaderboard(
    log: &dyn ScoreLog,
    game: GameType,
    n: usize,
    directory: &dyn StudentDirectory,
) -> Result<Vec<LeaderboardEntry>> {
    let records = log
        .records_for(game)
        .await
        .with_context(|| format!("failed to read {game} scores"))?;
    Ok(top_n(&records, game, n, directory))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn rec(student: &str, game: GameType, score: u32, secs: i64) -> ScoreRecord {
        ScoreRecord::new(student, game, score, at(secs))
    }

    #[test]
    fn sums_and_sorts_descending() {
        let records = vec![
            rec("a", GameType::TicTacToe, 3, 1),
            rec("b", GameType::TicTacToe, 0, 2),
            rec("a", GameType::TicTacToe, 1, 3),
            rec("c", GameType::TicTacToe, 3, 4),
            rec("a", GameType::Crossword, 500, 5),
        ];
        let board = top_n(&records, GameType::TicTacToe, 10, &Anonymous);

        let scores: Vec<u64> = board.iter().map(|e| e.aggregate_score).collect();
        assert_eq!(scores, vec![4, 3, 0]);
        assert_eq!(board[0].rounds, 2);
        assert!(board.iter().all(|e| e.game == GameType::TicTacToe));
        assert_eq!(
            board.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn truncates_to_n() {
        let records: Vec<ScoreRecord> = (0..8)
            .map(|i| rec(&format!("s{i}"), GameType::Crossword, i * 10, i64::from(i)))
            .collect();
        assert_eq!(top_n(&records, GameType::Crossword, 3, &Anonymous).len(), 3);
        assert_eq!(top_n(&records, GameType::Crossword, 50, &Anonymous).len(), 8);
        assert!(top_n(&records, GameType::Crossword, 0, &Anonymous).is_empty());
        assert!(top_n(&records, GameType::WordSearch, 5, &Anonymous).is_empty());
    }

    #[test]
    fn ties_go_to_whoever_got_there_first() {
        let records = vec![
            rec("late", GameType::WordSearch, 50, 100),
            rec("early", GameType::WordSearch, 50, 10),
            rec("zed", GameType::WordSearch, 20, 5),
            rec("amy", GameType::WordSearch, 20, 5),
        ];
        let roster = Roster::new()
            .with_student("late", "Late")
            .with_student("early", "Early")
            .with_student("zed", "Zed")
            .with_student("amy", "Amy");
        let names: Vec<String> = top_n(&records, GameType::WordSearch, 10, &roster)
            .into_iter()
            .map(|e| e.display_name)
            .collect();
        assert_eq!(names, vec!["Early", "Late", "Amy", "Zed"]);
    }

    #[test]
    fn output_never_leaks_student_ids() {
        let records = vec![
            rec("student-4711@school.example", GameType::TicTacToe, 3, 1),
            rec("student-0815@school.example", GameType::TicTacToe, 1, 2),
        ];
        let roster = Roster::new().with_student("student-0815@school.example", "Bo");
        let board = top_n(&records, GameType::TicTacToe, 5, &roster);

        assert_eq!(board[0].display_name, "Student #1");
        assert_eq!(board[1].display_name, "Bo");
        let json = serde_json::to_string(&board).unwrap();
        assert!(!json.contains("school.example"));
    }

    #[test]
    fn roster_parse() {
        let roster = Roster::parse(
            r#"
[students]
s-1 = "Ada"
s-2 = "  "
"#,
        )
        .unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.display_name("s-1").as_deref(), Some("Ada"));
        assert_eq!(roster.display_name("s-2"), None);
        assert_eq!(roster.display_name("s-3"), None);

        assert!(Roster::parse("").unwrap().is_empty());
        assert!(Roster::parse("students = 3").is_err());
    }

    #[tokio::test]
    async fn roster_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Roster::load(&dir.path().join("roster.toml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read roster"));
    }

    #[tokio::test]
    async fn roster_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.toml");
        tokio::fs::write(&path, "[students]\ns-1 = \"Ada\"\n")
            .await
            .unwrap();
        let roster = Roster::load(&path).await.unwrap();
        assert_eq!(roster.display_name("s-1").as_deref(), Some("Ada"));
    }
}

//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Points at a port nothing listens on, so no test ever reaches a real model.
const TEST_CONFIG: &str = r#"
default_provider = "ollama"
default_model = "llama3.2"
timeout_secs = 2
max_attempts = 1

[providers.ollama]
type = "ollama"
base_url = "http://127.0.0.1:9"
"#;

fn studyforge() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("studyforge").unwrap();
    cmd.env_remove("STUDYFORGE_OLLAMA_URL")
        .env_remove("STUDYFORGE_OPENAI_KEY")
        .env_remove("RUST_LOG");
    cmd
}

/// A command run against a private config and data dir.
fn in_workspace(dir: &Path) -> Command {
    let config = dir.join("studyforge.toml");
    if !config.exists() {
        std::fs::write(&config, TEST_CONFIG).unwrap();
    }
    let mut cmd = studyforge();
    cmd.current_dir(dir)
        .arg("--config")
        .arg(&config)
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn record(dir: &Path, args: &[&str]) {
    in_workspace(dir)
        .arg("score")
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded"));
}

fn leaderboard_json(dir: &Path, game: &str) -> serde_json::Value {
    let output = in_workspace(dir)
        .args(["leaderboard", "--game", game, "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn help_output() {
    studyforge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Assessment and scoring engine"));
}

#[test]
fn version_output() {
    studyforge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("studyforge"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    studyforge()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created studyforge.toml"))
        .stdout(predicate::str::contains(
            "Created studyforge-data/roster.toml",
        ));

    assert!(dir.path().join("studyforge.toml").exists());
    assert!(dir.path().join("studyforge-data/roster.toml").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    studyforge()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    studyforge()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn generated_config_loads() {
    let dir = TempDir::new().unwrap();
    studyforge()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    // empty leaderboard, but the config and roster both parse
    studyforge()
        .current_dir(dir.path())
        .args(["leaderboard", "--game", "crossword"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No crossword scores recorded yet"));
}

#[test]
fn tictactoe_rounds_rank_students() {
    let dir = TempDir::new().unwrap();
    record(dir.path(), &["--student", "s-1", "--game", "tictactoe", "--outcome", "win"]);
    record(dir.path(), &["--student", "s-1", "--game", "tictactoe", "--outcome", "draw"]);
    record(dir.path(), &["--student", "s-2", "--game", "tictactoe", "--outcome", "loss"]);

    let board = leaderboard_json(dir.path(), "tictactoe");
    let rows = board.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["rank"], 1);
    assert_eq!(rows[0]["aggregate_score"], 4);
    assert_eq!(rows[0]["rounds"], 2);
    assert_eq!(rows[0]["display_name"], "Student #1");
    assert_eq!(rows[1]["aggregate_score"], 0);
}

#[test]
fn roster_supplies_display_names() {
    let dir = TempDir::new().unwrap();
    record(dir.path(), &["--student", "s-1", "--game", "tictactoe", "--outcome", "win"]);

    let roster = dir.path().join("roster.toml");
    std::fs::write(&roster, "[students]\n\"s-1\" = \"Ada\"\n").unwrap();

    in_workspace(dir.path())
        .args(["leaderboard", "--game", "tictactoe", "--roster"])
        .arg(&roster)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada"))
        .stdout(predicate::str::contains("Rank"));
}

#[test]
fn crossword_round_is_time_weighted() {
    let dir = TempDir::new().unwrap();
    in_workspace(dir.path())
        .args(["score", "--student", "s-1", "--game", "crossword"])
        .args(["--solved", "8", "--total", "10", "--elapsed", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded 143 points"));
}

#[test]
fn overclaimed_round_is_rejected_and_not_recorded() {
    let dir = TempDir::new().unwrap();
    in_workspace(dir.path())
        .args(["score", "--student", "s-1", "--game", "wordsearch"])
        .args(["--solved", "9", "--total", "8", "--elapsed", "20"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds total"));

    let board = leaderboard_json(dir.path(), "wordsearch");
    assert!(board.as_array().unwrap().is_empty());
}

#[test]
fn unknown_game_is_rejected() {
    let dir = TempDir::new().unwrap();
    in_workspace(dir.path())
        .args(["leaderboard", "--game", "chess"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown game type: chess"));
}

#[test]
fn tictactoe_needs_an_outcome() {
    let dir = TempDir::new().unwrap();
    in_workspace(dir.path())
        .args(["score", "--student", "s-1", "--game", "tictactoe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--outcome"));
}

#[test]
fn unknown_quiz_is_reported() {
    let dir = TempDir::new().unwrap();
    in_workspace(dir.path())
        .args(["quiz", "submit", "--quiz-id", "00000000-0000-0000-0000-000000000000"])
        .args(["--answers", "A,B,C,D,A,B,C,D,A,B"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quiz not found"));

    in_workspace(dir.path())
        .args(["quiz", "submit", "--quiz-id", "not-a-uuid", "--answers", "A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid quiz id"));
}

#[test]
fn unreachable_generator_asks_to_retry() {
    let dir = TempDir::new().unwrap();
    in_workspace(dir.path())
        .args(["quiz", "start", "--subject", "history"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("please try again"));
}

#[test]
fn status_reports_unreachable_generator() {
    let dir = TempDir::new().unwrap();
    in_workspace(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Provider: ollama"))
        .stdout(predicate::str::contains("unreachable"));
}

#[test]
fn missing_config_file() {
    studyforge()
        .args(["--config", "no_such_config.toml", "leaderboard", "--game", "crossword"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

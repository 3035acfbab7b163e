//! The `studyforge score` command.

use anyhow::{Context, Result};

use studyforge_core::model::{GameRound, GameType, Outcome};

use super::{open_engine, report, Global};

pub async fn execute(
    global: &Global,
    student: String,
    game: String,
    outcome: Option<String>,
    solved: Option<u32>,
    total: Option<u32>,
    elapsed: Option<u32>,
) -> Result<()> {
    let game: GameType = game.parse()?;
    let round = build_round(game, outcome.as_deref(), solved, total, elapsed)?;

    let config = global.load_config()?;
    let engine = open_engine(&config, None).await?;

    let record = engine
        .record_game_round(&student, &round)
        .await
        .map_err(report)?;
    println!(
        "Recorded {} points for {} ({})",
        record.score(),
        record.student_id(),
        record.game()
    );
    Ok(())
}

fn build_round(
    game: GameType,
    outcome: Option<&str>,
    solved: Option<u32>,
    total: Option<u32>,
    elapsed: Option<u32>,
) -> Result<GameRound> {
    let timed = |solved: Option<u32>| -> Result<(u32, u32, u32)> {
        Ok((
            solved.with_context(|| format!("{game} rounds need --solved"))?,
            total.with_context(|| format!("{game} rounds need --total"))?,
            elapsed.with_context(|| format!("{game} rounds need --elapsed"))?,
        ))
    };

    Ok(match game {
        GameType::TicTacToe => {
            let outcome: Outcome = outcome
                .context("tictactoe rounds need --outcome (win, draw, loss)")?
                .parse()?;
            GameRound::TicTacToe { outcome }
        }
        GameType::Crossword => {
            let (correct_words, total_words, elapsed_secs) = timed(solved)?;
            GameRound::Crossword {
                correct_words,
                total_words,
                elapsed_secs,
            }
        }
        GameType::WordSearch => {
            let (found_words, total_words, elapsed_secs) = timed(solved)?;
            GameRound::WordSearch {
                found_words,
                total_words,
                elapsed_secs,
            }
        }
    })
}

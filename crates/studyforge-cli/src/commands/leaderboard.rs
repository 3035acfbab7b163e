//! The `studyforge leaderboard` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use comfy_table::{Cell, Table};

use studyforge_core::leaderboard::{LeaderboardEntry, StudentDirectory};
use studyforge_core::model::GameType;

use super::{load_roster, open_engine, report, Global};

pub async fn execute(
    global: &Global,
    game: String,
    top: usize,
    roster: Option<PathBuf>,
    format: String,
) -> Result<()> {
    let game: GameType = game.parse()?;
    if !matches!(format.as_str(), "table" | "json") {
        bail!("unknown format '{format}' (expected table or json)");
    }

    let config = global.load_config()?;
    let directory = load_roster(roster.as_deref(), &config.data_dir)
        .await?
        .map(|r| Arc::new(r) as Arc<dyn StudentDirectory>);
    let engine = open_engine(&config, directory).await?;

    let entries = engine.leaderboard(game, top).await.map_err(report)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No {game} scores recorded yet.");
    } else {
        println!("{}", render_table(&entries));
    }
    Ok(())
}

fn render_table(entries: &[LeaderboardEntry]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Rank", "Student", "Score", "Rounds"]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.rank),
            Cell::new(&entry.display_name),
            Cell::new(entry.aggregate_score),
            Cell::new(entry.rounds),
        ]);
    }
    table
}

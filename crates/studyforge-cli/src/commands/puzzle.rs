//! The `studyforge puzzle` commands.

use anyhow::Result;

use studyforge_core::model::Level;

use super::{open_engine, report, Global};

pub async fn crossword(
    global: &Global,
    subject: String,
    level: String,
    count: usize,
    json: bool,
) -> Result<()> {
    let level: Level = level.parse()?;
    let config = global.load_config()?;
    let engine = open_engine(&config, None).await?;

    let puzzle = engine
        .new_crossword(&subject, level, count)
        .await
        .map_err(report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&puzzle)?);
        return Ok(());
    }
    println!(
        "Crossword {} ({}, {}): {} words",
        puzzle.id,
        puzzle.subject,
        puzzle.level,
        puzzle.total()
    );
    for (number, clue) in puzzle.clues() {
        println!("  {number:>2}. {clue}");
    }
    let answers: Vec<&str> = puzzle.entries.iter().map(|e| e.word.as_str()).collect();
    println!("\nAnswers: {}", answers.join(", "));
    Ok(())
}

pub async fn wordsearch(
    global: &Global,
    subject: String,
    level: String,
    count: usize,
    json: bool,
) -> Result<()> {
    let level: Level = level.parse()?;
    let config = global.load_config()?;
    let engine = open_engine(&config, None).await?;

    let puzzle = engine
        .new_word_search(&subject, level, count)
        .await
        .map_err(report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&puzzle)?);
        return Ok(());
    }
    println!(
        "Word search {} ({}, {}): {} words",
        puzzle.id,
        puzzle.subject,
        puzzle.level,
        puzzle.total()
    );
    println!("  {}", puzzle.words.join(" "));
    Ok(())
}

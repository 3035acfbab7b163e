//! The `studyforge grade` command.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use studyforge_core::grading::{AssignmentSubmission, Rubric};

use super::{open_engine, report, Global};

pub async fn execute(
    global: &Global,
    assignment_id: String,
    file: Option<PathBuf>,
    text: Option<String>,
    rubric: String,
    max_marks: Option<u32>,
    json: bool,
) -> Result<()> {
    let text = match (file, text) {
        (Some(path), _) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, Some(text)) => text,
        (None, None) => bail!("provide the assignment with --file or --text"),
    };

    let config = global.load_config()?;
    let engine = open_engine(&config, None).await?;

    let submission = AssignmentSubmission {
        assignment_id,
        text,
        rubric: Rubric {
            criteria: rubric,
            max_marks,
        },
    };
    let result = engine.grade_assignment(&submission).await.map_err(report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "{}: {}/{} ({})",
            result.assignment_id, result.marks, result.max_marks, result.rating
        );
        if !result.feedback.is_empty() {
            println!("\n{}", result.feedback);
        }
    }
    Ok(())
}

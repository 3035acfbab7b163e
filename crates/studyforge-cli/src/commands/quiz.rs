//! The `studyforge quiz` commands.

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use studyforge_core::model::{Level, OPTION_COUNT};
use studyforge_core::quiz::QuizSubmission;

use super::{open_engine, report, Global};

const LETTERS: [char; OPTION_COUNT] = ['A', 'B', 'C', 'D'];

pub async fn start(global: &Global, subject: String, level: String, json: bool) -> Result<()> {
    let level: Level = level.parse()?;
    let config = global.load_config()?;
    let engine = open_engine(&config, None).await?;

    let quiz = engine.start_quiz(&subject, level).await.map_err(report)?;
    let view = quiz.student_view();

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Quiz {} ({}, {})", view.id, view.subject, view.level);
    for (i, question) in view.questions.iter().enumerate() {
        println!("\n{}. {}", i + 1, question.prompt);
        for (letter, option) in LETTERS.iter().zip(&question.options) {
            println!("   {letter}) {option}");
        }
    }
    println!("\nSubmit with: studyforge quiz submit --quiz-id {} --answers A,B,...", view.id);
    Ok(())
}

pub async fn submit(
    global: &Global,
    quiz_id: String,
    answers: String,
    review: bool,
    json: bool,
) -> Result<()> {
    let quiz_id = Uuid::parse_str(quiz_id.trim())
        .with_context(|| format!("invalid quiz id '{quiz_id}'"))?;
    let submission = QuizSubmission {
        quiz_id,
        answers: parse_answers(&answers)?,
    };

    let config = global.load_config()?;
    let engine = open_engine(&config, None).await?;

    let result = engine.submit_quiz(&submission).await.map_err(report)?;
    let walkthrough = if review {
        Some(engine.review_quiz(&submission).await.map_err(report)?)
    } else {
        None
    };

    if json {
        let body = serde_json::json!({ "result": result, "review": walkthrough });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!(
        "Mark: {}/100 ({} of {} correct), rating: {}",
        result.mark,
        result.raw_score,
        result.correct.len(),
        result.rating
    );
    match walkthrough {
        Some(items) => {
            for (i, item) in items.iter().enumerate() {
                let given = item
                    .student_answer
                    .and_then(|a| LETTERS.get(a))
                    .map(char::to_string)
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "\n{}. [{}] {}",
                    i + 1,
                    if item.is_correct { "correct" } else { "wrong" },
                    item.prompt
                );
                println!(
                    "   your answer: {given}, correct: {}) {}",
                    LETTERS[item.correct_index], item.options[item.correct_index]
                );
                if !item.explanation.is_empty() {
                    println!("   {}", item.explanation);
                }
            }
        }
        None => {
            let marks: Vec<&str> = result
                .correct
                .iter()
                .map(|&ok| if ok { "ok" } else { "x" })
                .collect();
            println!("Per question: {}", marks.join(" "));
        }
    }
    Ok(())
}

/// Parse `A,b,-,3,` into option indices. Letters and digits are both
/// accepted; `-` or an empty slot leaves the question unanswered.
fn parse_answers(raw: &str) -> Result<Vec<Option<usize>>> {
    raw.split(',')
        .enumerate()
        .map(|(i, token)| {
            let token = token.trim();
            if token.is_empty() || token == "-" {
                return Ok(None);
            }
            if let Ok(index) = token.parse::<usize>() {
                return Ok(Some(index));
            }
            let upper = token.to_ascii_uppercase();
            match LETTERS.iter().position(|l| upper == l.to_string()) {
                Some(index) => Ok(Some(index)),
                None => bail!("answer {} is not one of A-D: '{token}'", i + 1),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_digits_and_blanks() {
        assert_eq!(
            parse_answers("A,b, -,3,,D").unwrap(),
            vec![Some(0), Some(1), None, Some(3), None, Some(3)]
        );
    }

    #[test]
    fn digits_pass_through_unchecked() {
        // range checks happen when grading
        assert_eq!(parse_answers("7").unwrap(), vec![Some(7)]);
    }

    #[test]
    fn unknown_letter_is_an_error() {
        let err = parse_answers("A,E").unwrap_err();
        assert!(err.to_string().contains("answer 2"));
    }
}

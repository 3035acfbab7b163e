//! Generation adapter: the validation boundary around the text generator.
//!
//! Builds a deterministic prompt per content kind, calls the generator under
//! a per-attempt deadline, and turns the untrusted response into typed,
//! schema-checked records. A response that fails the schema is retried with
//! the same parameters; after the attempt budget the caller gets a terminal
//! [`GenerationError`]. Nothing here persists anything.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::WordBounds;
use crate::error::{GenerationError, ProviderError, SchemaError};
use crate::model::{Level, Question, WordClue, OPTION_COUNT};
use crate::traits::{extract_json_payload, GenerateRequest, TextGenerator};

/// System prompt shared by every content kind.
pub const SYSTEM_PROMPT: &str = "You are an assessment content generator for a student learning platform. Respond ONLY with a single JSON value that matches the requested schema. Do not add commentary, markdown, or extra keys.";

const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Settings for the adapter.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Model identifier passed to the generator.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Max tokens per completion.
    pub max_tokens: u32,
    /// Deadline for a single generator call.
    pub timeout: Duration,
    /// Total attempts (first try included) before giving up.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each further failure.
    pub retry_delay: Duration,
    /// Accepted length range for generated words.
    pub words: WordBounds,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout: Duration::from_secs(60),
            max_attempts: 2,
            retry_delay: Duration::from_millis(500),
            words: WordBounds::default(),
        }
    }
}

/// The kinds of content the adapter knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    QuizBatch,
    CrosswordWords,
    WordsearchWords,
    GradingRubric,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::QuizBatch => write!(f, "quiz-batch"),
            ContentKind::CrosswordWords => write!(f, "crossword-words"),
            ContentKind::WordsearchWords => write!(f, "wordsearch-words"),
            ContentKind::GradingRubric => write!(f, "grading-rubric"),
        }
    }
}

/// A request for generated content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GenerationRequest {
    QuizBatch {
        subject: String,
        level: Level,
        count: usize,
    },
    CrosswordWords {
        subject: String,
        level: Level,
        count: usize,
    },
    WordsearchWords {
        subject: String,
        level: Level,
        count: usize,
    },
    GradingRubric {
        assignment_text: String,
        rubric: String,
        max_marks: u32,
    },
}

impl GenerationRequest {
    pub fn kind(&self) -> ContentKind {
        match self {
            GenerationRequest::QuizBatch { .. } => ContentKind::QuizBatch,
            GenerationRequest::CrosswordWords { .. } => ContentKind::CrosswordWords,
            GenerationRequest::WordsearchWords { .. } => ContentKind::WordsearchWords,
            GenerationRequest::GradingRubric { .. } => ContentKind::GradingRubric,
        }
    }
}

/// Validated output of a generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Questions(Vec<Question>),
    Clues(Vec<WordClue>),
    Words(Vec<String>),
    Feedback(RubricFeedback),
}

/// Structured grading feedback as returned by the generator.
///
/// `marks` is guaranteed finite but not yet clamped; bounding it is the
/// grader's job.
#[derive(Debug, Clone, PartialEq)]
pub struct RubricFeedback {
    pub marks: f64,
    pub rating: String,
    pub feedback: String,
}

/// Wraps a [`TextGenerator`] with prompting, deadlines, retries and schema
/// validation.
pub struct GenerationAdapter {
    generator: Arc<dyn TextGenerator>,
    config: AdapterConfig,
}

impl GenerationAdapter {
    pub fn new(generator: Arc<dyn TextGenerator>, config: AdapterConfig) -> Self {
        Self { generator, config }
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Generate and validate content for any request kind.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        match request {
            GenerationRequest::QuizBatch {
                subject,
                level,
                count,
            } => self
                .questions(subject, *level, *count)
                .await
                .map(GenerationResult::Questions),
            GenerationRequest::CrosswordWords {
                subject,
                level,
                count,
            } => self
                .crossword_clues(subject, *level, *count)
                .await
                .map(GenerationResult::Clues),
            GenerationRequest::WordsearchWords {
                subject,
                level,
                count,
            } => self
                .wordsearch_words(subject, *level, *count)
                .await
                .map(GenerationResult::Words),
            GenerationRequest::GradingRubric {
                assignment_text,
                rubric,
                max_marks,
            } => self
                .rubric_feedback(assignment_text, rubric, *max_marks)
                .await
                .map(GenerationResult::Feedback),
        }
    }

    pub async fn questions(
        &self,
        subject: &str,
        level: Level,
        count: usize,
    ) -> Result<Vec<Question>, GenerationError> {
        let prompt = quiz_prompt(subject, level, count);
        self.run(ContentKind::QuizBatch, &prompt, |raw| {
            parse_questions(raw, count)
        })
        .await
    }

    pub async fn crossword_clues(
        &self,
        subject: &str,
        level: Level,
        count: usize,
    ) -> Result<Vec<WordClue>, GenerationError> {
        let bounds = self.config.words;
        let prompt = crossword_prompt(subject, level, count, bounds);
        self.run(ContentKind::CrosswordWords, &prompt, |raw| {
            parse_clues(raw, count, bounds)
        })
        .await
    }

    pub async fn wordsearch_words(
        &self,
        subject: &str,
        level: Level,
        count: usize,
    ) -> Result<Vec<String>, GenerationError> {
        let bounds = self.config.words;
        let prompt = wordsearch_prompt(subject, level, count, bounds);
        self.run(ContentKind::WordsearchWords, &prompt, |raw| {
            parse_words(raw, count, bounds)
        })
        .await
    }

    pub async fn rubric_feedback(
        &self,
        assignment_text: &str,
        rubric: &str,
        max_marks: u32,
    ) -> Result<RubricFeedback, GenerationError> {
        let prompt = rubric_prompt(assignment_text, rubric, max_marks);
        self.run(ContentKind::GradingRubric, &prompt, parse_feedback)
            .await
    }

    /// Call the generator until `parse` accepts a response or the attempt
    /// budget runs out.
    async fn run<T, F>(
        &self,
        kind: ContentKind,
        prompt: &str,
        parse: F,
    ) -> Result<T, GenerationError>
    where
        F: Fn(&str) -> Result<T, SchemaError>,
    {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            prompt: prompt.to_string(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            json_mode: true,
        };

        let max_attempts = self.config.max_attempts.max(1);
        let mut retry_delay = self.config.retry_delay;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
            }
            debug!(%kind, attempt, generator = self.generator.name(), "requesting content");

            let response =
                match tokio::time::timeout(self.config.timeout, self.generator.generate(&request))
                    .await
                {
                    Ok(Ok(response)) => response,
                    Ok(Err(e)) => {
                        if let Some(provider_err) = e.downcast_ref::<ProviderError>() {
                            if provider_err.is_permanent() {
                                return Err(GenerationError::Rejected(provider_err.to_string()));
                            }
                            if let Some(ms) = provider_err.retry_after_ms() {
                                retry_delay = Duration::from_millis(ms).min(MAX_RETRY_DELAY);
                            }
                        }
                        warn!(%kind, attempt, "generator call failed: {e:#}");
                        last_error = format!("{e:#}");
                        continue;
                    }
                    Err(_) => {
                        warn!(%kind, attempt, "generator call timed out");
                        last_error =
                            format!("timed out after {}s", self.config.timeout.as_secs_f64());
                        continue;
                    }
                };

            match parse(&response.content) {
                Ok(value) => {
                    debug!(%kind, attempt, latency_ms = response.latency_ms, "content accepted");
                    return Ok(value);
                }
                Err(schema_err) => {
                    warn!(%kind, attempt, "generator output rejected: {schema_err}");
                    last_error = schema_err.to_string();
                }
            }
        }

        Err(GenerationError::Exhausted {
            attempts: max_attempts,
            last: last_error,
        })
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

fn quiz_prompt(subject: &str, level: Level, count: usize) -> String {
    format!(
        "Create exactly {count} multiple-choice questions about {subject} for {level} level students.\n\
         Each question must have exactly {OPTION_COUNT} distinct options and exactly one correct answer.\n\
         Respond with JSON of the form:\n\
         {{\"questions\": [{{\"question\": \"...\", \"options\": [\"...\", \"...\", \"...\", \"...\"], \"correct_index\": 0, \"explanation\": \"...\"}}]}}\n\
         correct_index is the 0-based position of the correct option."
    )
}

fn crossword_prompt(subject: &str, level: Level, count: usize, bounds: WordBounds) -> String {
    format!(
        "Create exactly {count} crossword entries about {subject} for {level} level students.\n\
         Each word must be a single word of letters only, {min} to {max} letters long, with no repeats.\n\
         Respond with JSON of the form:\n\
         {{\"words\": [{{\"word\": \"...\", \"clue\": \"...\"}}]}}",
        min = bounds.min_len,
        max = bounds.max_len,
    )
}

fn wordsearch_prompt(subject: &str, level: Level, count: usize, bounds: WordBounds) -> String {
    format!(
        "List exactly {count} words related to {subject} for a {level} level word search.\n\
         Each word must be a single word of letters only, {min} to {max} letters long, with no repeats.\n\
         Respond with JSON of the form:\n\
         {{\"words\": [\"...\", \"...\"]}}",
        min = bounds.min_len,
        max = bounds.max_len,
    )
}

fn rubric_prompt(assignment_text: &str, rubric: &str, max_marks: u32) -> String {
    format!(
        "Grade the student assignment below out of {max_marks} marks using the rubric.\n\n\
         Rubric:\n{rubric}\n\n\
         Assignment:\n\"\"\"\n{assignment_text}\n\"\"\"\n\n\
         Respond with JSON of the form:\n\
         {{\"marks\": <number from 0 to {max_marks}>, \"rating\": \"<short label>\", \"feedback\": \"<constructive feedback>\"}}"
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Pull the item array out of `{"<key>": [...]}` or a bare `[...]`.
fn item_array(raw: &str, key: &'static str) -> Result<Vec<Value>, SchemaError> {
    let payload = extract_json_payload(raw);
    let value: Value =
        serde_json::from_str(&payload).map_err(|e| SchemaError::Malformed(e.to_string()))?;
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(SchemaError::InvalidField {
                field: key,
                reason: "missing or not an array".into(),
            }),
        },
        _ => Err(SchemaError::Malformed(format!(
            "expected an object with `{key}` or an array"
        ))),
    }
}

fn expect_count(items: &[Value], expected: usize) -> Result<(), SchemaError> {
    if items.len() != expected {
        return Err(SchemaError::ItemCount {
            expected,
            actual: items.len(),
        });
    }
    Ok(())
}

fn item<T: DeserializeOwned>(index: usize, value: Value) -> Result<T, SchemaError> {
    serde_json::from_value(value).map_err(|e| SchemaError::InvalidItem {
        index,
        reason: e.to_string(),
    })
}

#[derive(Deserialize)]
struct RawQuestion {
    #[serde(alias = "prompt")]
    question: String,
    options: Vec<String>,
    #[serde(alias = "answer_index", alias = "answer")]
    correct_index: Value,
    #[serde(default)]
    explanation: String,
}

/// Accepts `2`, `"2"` and `"C"` style answer positions.
fn option_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                return Some(n);
            }
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => {
                    Some(i64::from(c.to_ascii_uppercase() as u8 - b'A'))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

pub(crate) fn parse_questions(raw: &str, count: usize) -> Result<Vec<Question>, SchemaError> {
    let items = item_array(raw, "questions")?;
    expect_count(&items, count)?;

    items
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let raw: RawQuestion = item(index, value)?;
            let options: [String; OPTION_COUNT] =
                raw.options
                    .try_into()
                    .map_err(|opts: Vec<String>| SchemaError::InvalidItem {
                        index,
                        reason: format!("expected {OPTION_COUNT} options, got {}", opts.len()),
                    })?;
            let correct_index = option_index(&raw.correct_index)
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| SchemaError::InvalidItem {
                    index,
                    reason: format!("unusable correct_index {}", raw.correct_index),
                })?;
            Question::new(raw.question, options, correct_index, raw.explanation).map_err(|e| {
                SchemaError::InvalidItem {
                    index,
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}

/// Normalize a generated word to upper case and check it against `bounds`.
fn checked_word(
    index: usize,
    word: &str,
    bounds: WordBounds,
    seen: &mut HashSet<String>,
) -> Result<String, SchemaError> {
    let word = word.trim().to_uppercase();
    let invalid = |reason: String| SchemaError::InvalidItem { index, reason };

    if word.is_empty() || !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid(format!("{word:?} is not alphabetic")));
    }
    if !bounds.contains(word.len()) {
        return Err(invalid(format!(
            "{word:?} has {} letters, expected {}..={}",
            word.len(),
            bounds.min_len,
            bounds.max_len
        )));
    }
    if !seen.insert(word.clone()) {
        return Err(invalid(format!("{word:?} is repeated")));
    }
    Ok(word)
}

#[derive(Deserialize)]
struct RawClue {
    word: String,
    clue: String,
}

pub(crate) fn parse_clues(
    raw: &str,
    count: usize,
    bounds: WordBounds,
) -> Result<Vec<WordClue>, SchemaError> {
    let items = item_array(raw, "words")?;
    expect_count(&items, count)?;

    let mut seen = HashSet::new();
    items
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let raw: RawClue = item(index, value)?;
            let word = checked_word(index, &raw.word, bounds, &mut seen)?;
            let clue = raw.clue.trim().to_string();
            if clue.is_empty() {
                return Err(SchemaError::InvalidItem {
                    index,
                    reason: "empty clue".into(),
                });
            }
            Ok(WordClue { word, clue })
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawWord {
    Plain(String),
    Entry { word: String },
}

pub(crate) fn parse_words(
    raw: &str,
    count: usize,
    bounds: WordBounds,
) -> Result<Vec<String>, SchemaError> {
    let items = item_array(raw, "words")?;
    expect_count(&items, count)?;

    let mut seen = HashSet::new();
    items
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let word = match item::<RawWord>(index, value)? {
                RawWord::Plain(w) | RawWord::Entry { word: w } => w,
            };
            checked_word(index, &word, bounds, &mut seen)
        })
        .collect()
}

#[derive(Deserialize)]
struct RawFeedback {
    marks: Option<Value>,
    #[serde(default)]
    rating: Option<String>,
    feedback: String,
}

fn marks_value(value: &Value) -> Option<f64> {
    let marks = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    marks.is_finite().then_some(marks)
}

pub(crate) fn parse_feedback(raw: &str) -> Result<RubricFeedback, SchemaError> {
    let payload = extract_json_payload(raw);
    let parsed: RawFeedback =
        serde_json::from_str(&payload).map_err(|e| SchemaError::Malformed(e.to_string()))?;

    let marks_raw = parsed.marks.ok_or(SchemaError::InvalidField {
        field: "marks",
        reason: "missing".into(),
    })?;
    let marks = marks_value(&marks_raw).ok_or_else(|| SchemaError::InvalidField {
        field: "marks",
        reason: format!("not a number: {marks_raw}"),
    })?;

    Ok(RubricFeedback {
        marks,
        rating: parsed.rating.unwrap_or_default().trim().to_string(),
        feedback: parsed.feedback.trim().to_string(),
    })
}

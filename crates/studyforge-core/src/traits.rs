//! Core trait definitions for text-generation backends and persistence.
//!
//! The generator trait is implemented by the `studyforge-providers` crate;
//! the storage traits are implemented by [`crate::store`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grading::GradingResult;
use crate::model::{GameType, ScoreRecord};
use crate::quiz::Quiz;

// ---------------------------------------------------------------------------
// Text generator trait
// ---------------------------------------------------------------------------

/// A backend that turns a prompt into text.
///
/// Errors returned from [`TextGenerator::generate`] should wrap a
/// [`ProviderError`](crate::error::ProviderError) where possible so the
/// generation adapter can tell permanent failures from transient ones.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable backend name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Generate a completion for a prompt.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// List models the backend can serve.
    async fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>>;
}

/// Request to generate text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "llama3.2").
    pub model: String,
    /// System prompt describing the output contract.
    pub system_prompt: String,
    /// The task prompt.
    pub prompt: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Ask the backend to constrain output to JSON when it supports it.
    #[serde(default)]
    pub json_mode: bool,
}

/// Response from a text generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response content.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Backend name.
    pub provider: String,
    /// Size on disk in bytes, when the backend reports it.
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

// ---------------------------------------------------------------------------
// Storage traits
// ---------------------------------------------------------------------------

/// Append-only log of score records.
#[async_trait]
pub trait ScoreLog: Send + Sync {
    /// Append one record. Records are never updated or removed.
    async fn append(&self, record: &ScoreRecord) -> anyhow::Result<()>;

    /// All records for one game, in append order.
    async fn records_for(&self, game: GameType) -> anyhow::Result<Vec<ScoreRecord>>;
}

/// Quiz definitions keyed by id.
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn save_quiz(&self, quiz: &Quiz) -> anyhow::Result<()>;

    async fn load_quiz(&self, id: Uuid) -> anyhow::Result<Option<Quiz>>;
}

/// Grading results keyed by assignment id.
#[async_trait]
pub trait GradingStore: Send + Sync {
    /// Store a result, replacing any earlier grading of the same assignment.
    async fn save_grading(&self, result: &GradingResult) -> anyhow::Result<()>;

    async fn load_grading(&self, assignment_id: &str) -> anyhow::Result<Option<GradingResult>>;
}

// ---------------------------------------------------------------------------
// JSON payload extraction
// ---------------------------------------------------------------------------

/// Extract the JSON payload from an LLM response.
///
/// Handles:
/// - ```json fenced blocks (first one wins)
/// - Generic ``` blocks (if no json-specific block found)
/// - Prose around a bare object or array (outermost brackets are kept)
/// - Raw JSON with no decoration (returned trimmed)
pub fn extract_json_payload(response: &str) -> String {
    let mut json_block = None;
    let mut generic_block = None;
    let mut in_block = false;
    let mut is_json_block = false;
    let mut is_generic_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            is_generic_block = lang.is_empty();
            current_block.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block && json_block.is_none() {
                json_block = Some(current_block.clone());
            } else if is_generic_block && generic_block.is_none() {
                generic_block = Some(current_block.clone());
            }
            current_block.clear();
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    // Truncated (unclosed) block: keep what we have
    if in_block && !current_block.is_empty() {
        if is_json_block && json_block.is_none() {
            json_block = Some(current_block);
        } else if is_generic_block && generic_block.is_none() {
            generic_block = Some(current_block);
        }
    }

    if let Some(block) = json_block.or(generic_block) {
        return block.trim().to_string();
    }

    let trimmed = response.trim();
    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(s), Some(e)) if s < e => trimmed[s..=e].to_string(),
        _ => trimmed.to_string(),
    }
}

//! Error taxonomy for the assessment engine.
//!
//! Four families, each with its own propagation rule:
//!
//! - [`ProviderError`]: transport-level failure talking to a text generator.
//!   Classified by [`ProviderError::is_permanent`] so the generation adapter
//!   can decide whether another attempt is worthwhile.
//! - [`SchemaError`]: the generator answered, but the answer does not match
//!   the structured contract for the requested content kind. Retried inside
//!   the adapter, never seen by callers directly.
//! - [`GenerationError`]: terminal failure of a generation request. Callers
//!   surface it as "please try again".
//! - [`ValidationError`]: caller-submitted data breaks a structural rule.
//!   Never retried and never silently corrected.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when interacting with a text-generation backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Generator output that parsed (or failed to parse) but breaks the schema
/// of the requested content kind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("response is not valid JSON: {0}")]
    Malformed(String),

    #[error("expected {expected} items, got {actual}")]
    ItemCount { expected: usize, actual: usize },

    #[error("item {index}: {reason}")]
    InvalidItem { index: usize, reason: String },

    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Terminal failure of a generation request.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Every attempt failed; `last` describes the final failure.
    #[error("generation failed after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: String },

    /// The backend refused the request in a way another attempt cannot fix.
    #[error("generator rejected the request: {0}")]
    Rejected(String),
}

/// Caller-submitted data that violates a structural rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("submission has {actual} answers but the quiz has {expected} questions")]
    AnswerCount { expected: usize, actual: usize },

    #[error("answer {index} selects option {selected}, but questions have {options} options")]
    OptionOutOfRange {
        index: usize,
        selected: usize,
        options: usize,
    },

    #[error("submission is for quiz {submitted}, not quiz {expected}")]
    QuizMismatch { expected: Uuid, submitted: Uuid },

    #[error("{field} ({value}) exceeds total ({total})")]
    CountExceedsTotal {
        field: &'static str,
        value: u32,
        total: u32,
    },

    #[error("unknown game type: {0}")]
    UnknownGameType(String),

    #[error("unknown level: {0}")]
    UnknownLevel(String),

    #[error("unknown outcome: {0}")]
    UnknownOutcome(String),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be positive")]
    NotPositive(&'static str),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },
}

/// Errors surfaced by the [`AssessmentEngine`](crate::engine::AssessmentEngine)
/// façade, which combines generation, validation and storage.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    /// Whether a user may simply re-issue the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Generation(_))
    }

    /// Short message suitable for showing to a student.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Generation(_) => "please try again".to_string(),
            EngineError::Validation(e) => format!("submission rejected: {e}"),
            EngineError::NotFound { kind, .. } => format!("{kind} not found"),
            EngineError::Storage(_) => "internal error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_provider_errors() {
        assert!(ProviderError::AuthenticationFailed("bad key".into()).is_permanent());
        assert!(ProviderError::ModelNotFound("llama9".into()).is_permanent());
        assert!(!ProviderError::Timeout(60).is_permanent());
        assert!(!ProviderError::RateLimited { retry_after_ms: 10 }.is_permanent());
        assert_eq!(
            ProviderError::RateLimited {
                retry_after_ms: 250
            }
            .retry_after_ms(),
            Some(250)
        );
    }

    #[test]
    fn validation_message_names_constraint() {
        let err = ValidationError::CountExceedsTotal {
            field: "correct_words",
            value: 11,
            total: 10,
        };
        assert_eq!(err.to_string(), "correct_words (11) exceeds total (10)");
    }

    #[test]
    fn user_messages() {
        let gen: EngineError = GenerationError::Exhausted {
            attempts: 2,
            last: "timeout".into(),
        }
        .into();
        assert!(gen.is_retryable());
        assert_eq!(gen.user_message(), "please try again");

        let val: EngineError = ValidationError::UnknownGameType("chess".into()).into();
        assert!(!val.is_retryable());
        assert!(val.user_message().contains("unknown game type: chess"));
    }
}

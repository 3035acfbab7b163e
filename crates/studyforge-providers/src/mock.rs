//! Mock generator for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use studyforge_core::error::ProviderError;
use studyforge_core::traits::{
    GenerateRequest, GenerateResponse, ModelInfo, TextGenerator, TokenUsage,
};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text as the completion.
    Text(String),
    /// Fail the call with a network error.
    NetworkError(String),
    /// Fail the call as if the model did not exist.
    ModelNotFound,
}

/// A generator that replays scripted replies without any network calls.
///
/// Replies are consumed in order. Once only one remains it is repeated for
/// every further call, so a single-reply mock answers forever.
pub struct MockGenerator {
    script: Mutex<VecDeque<MockReply>>,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockGenerator {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same text.
    pub fn with_fixed_response(response: &str) -> Self {
        Self::new(vec![MockReply::Text(response.to_string())])
    }

    /// Create a mock that returns each text once, in order.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            responses
                .into_iter()
                .map(|r| MockReply::Text(r.into()))
                .collect(),
        )
    }

    /// Get the number of calls made to this generator.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this generator.
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_reply(&self) -> Option<MockReply> {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let content = match self.next_reply() {
            Some(MockReply::Text(text)) => text,
            Some(MockReply::NetworkError(message)) => {
                return Err(ProviderError::NetworkError(message).into())
            }
            Some(MockReply::ModelNotFound) => {
                return Err(ProviderError::ModelNotFound(request.model.clone()).into())
            }
            None => anyhow::bail!("mock generator has no scripted replies"),
        };

        // Rough estimate
        let prompt_tokens = (request.prompt.len() / 4) as u32;
        let completion_tokens = (content.len() / 4) as u32;

        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: 1,
        })
    }

    async fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "mock-model".into(),
            provider: "mock".into(),
            size_bytes: None,
        }])
    }
}

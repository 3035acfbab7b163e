//! studyforge-providers: text-generation backends.
//!
//! Implements the `TextGenerator` trait for a local Ollama server and for
//! OpenAI-compatible APIs, plus a scripted mock for tests, and loads the
//! `studyforge.toml` configuration that selects between them.

pub mod config;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{create_generator, load_config, load_config_from, ProviderConfig, StudyforgeConfig};
pub use studyforge_core::error::ProviderError;

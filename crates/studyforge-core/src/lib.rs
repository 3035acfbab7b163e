//! studyforge-core: assessment and scoring engine.
//!
//! This crate holds everything that decides a mark or a score: the
//! generation adapter that turns untrusted generator output into typed
//! content, the quiz and assignment graders, the game scorer, and the
//! leaderboard aggregator, plus the stores they persist into.

pub mod config;
pub mod engine;
pub mod error;
pub mod games;
pub mod generation;
pub mod grading;
pub mod leaderboard;
pub mod model;
pub mod puzzle;
pub mod quiz;
pub mod store;
pub mod traits;

pub use engine::{AssessmentEngine, Stores};
pub use error::{EngineError, GenerationError, ProviderError, SchemaError, ValidationError};

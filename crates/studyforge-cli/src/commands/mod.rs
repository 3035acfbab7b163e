//! Subcommand implementations and the setup they share.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use studyforge_core::leaderboard::{Roster, StudentDirectory};
use studyforge_core::store::FileStore;
use studyforge_core::{AssessmentEngine, EngineError, Stores};
use studyforge_providers::{create_generator, load_config_from, StudyforgeConfig};

pub mod grade;
pub mod init;
pub mod leaderboard;
pub mod puzzle;
pub mod quiz;
pub mod score;
pub mod status;

/// Options accepted by every subcommand.
pub struct Global {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl Global {
    pub fn load_config(&self) -> Result<StudyforgeConfig> {
        let mut config = load_config_from(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        Ok(config)
    }
}

/// Build an engine over the configured generator and the file store.
pub async fn open_engine(
    config: &StudyforgeConfig,
    directory: Option<Arc<dyn StudentDirectory>>,
) -> Result<AssessmentEngine> {
    let provider = config.provider(&config.default_provider)?;
    let generator = create_generator(&provider, config.timeout_secs)?;
    let store = FileStore::open(&config.data_dir).await?;
    tracing::debug!(
        generator = generator.name(),
        data_dir = %config.data_dir.display(),
        "engine ready"
    );

    let engine = AssessmentEngine::new(
        generator,
        config.adapter_config(),
        &config.scoring,
        Stores::from_backend(Arc::new(store)),
    );
    Ok(match directory {
        Some(directory) => engine.with_directory(directory),
        None => engine,
    })
}

/// Roster from an explicit path, else `<data_dir>/roster.toml` when present.
pub async fn load_roster(explicit: Option<&Path>, data_dir: &Path) -> Result<Option<Roster>> {
    if let Some(path) = explicit {
        return Ok(Some(Roster::load(path).await?));
    }
    let default = data_dir.join("roster.toml");
    let present = tokio::fs::try_exists(&default)
        .await
        .with_context(|| format!("failed to check {}", default.display()))?;
    if present {
        Ok(Some(Roster::load(&default).await?))
    } else {
        Ok(None)
    }
}

/// Turn an engine failure into the message a student should see.
pub fn report(e: EngineError) -> anyhow::Error {
    match &e {
        EngineError::Generation(_) => anyhow!("{}: {e}", e.user_message()),
        EngineError::Validation(_) => anyhow!(e.user_message()),
        _ => anyhow::Error::new(e),
    }
}

//! The `studyforge status` command.

use anyhow::Result;

use studyforge_providers::create_generator;

use super::Global;

pub async fn execute(global: &Global, provider: Option<String>) -> Result<()> {
    let config = global.load_config()?;
    let name = provider.unwrap_or_else(|| config.default_provider.clone());
    let generator = create_generator(&config.provider(&name)?, config.timeout_secs)?;

    println!("Provider: {name} ({})", generator.name());
    println!("Model:    {}", config.default_model);
    println!("Data dir: {}", config.data_dir.display());

    match generator.list_models().await {
        Ok(models) => {
            println!("Generator reachable, {} model(s)", models.len());
            for model in &models {
                match model.size_bytes {
                    Some(bytes) => println!("  {} ({:.1} GB)", model.id, bytes as f64 / 1e9),
                    None => println!("  {}", model.id),
                }
            }
            if !models.iter().any(|m| m.id.starts_with(&config.default_model)) {
                println!("Warning: model '{}' is not listed", config.default_model);
            }
        }
        Err(e) => println!("Generator unreachable: {e:#}"),
    }

    Ok(())
}

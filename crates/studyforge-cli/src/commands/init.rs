//! The `studyforge init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_once("studyforge.toml", SAMPLE_CONFIG)?;

    std::fs::create_dir_all("studyforge-data")?;
    write_once("studyforge-data/roster.toml", SAMPLE_ROSTER)?;

    println!("\nNext steps:");
    println!("  1. Edit studyforge.toml to pick a generator (ollama runs locally)");
    println!("  2. Run: studyforge status");
    println!("  3. Run: studyforge quiz start --subject history --level easy");

    Ok(())
}

fn write_once(path: &str, content: &str) -> Result<()> {
    if Path::new(path).exists() {
        println!("{path} already exists, skipping.");
    } else {
        std::fs::write(path, content)?;
        println!("Created {path}");
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# studyforge configuration

default_provider = "ollama"
default_model = "llama3.2"
temperature = 0.7
max_tokens = 2048
timeout_secs = 60
max_attempts = 2
data_dir = "./studyforge-data"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[scoring.quiz]
excellent = 80
good = 50

[scoring.crossword]
points_per_word = 10
max_factor = 2.0
min_factor = 0.5
grace_secs = 10
decay_secs = 120

[scoring.wordsearch]
points_per_word = 10
max_factor = 2.0
min_factor = 0.5
grace_secs = 5
decay_secs = 60

[scoring.grading]
default_max_marks = 100
"#;

const SAMPLE_ROSTER: &str = r#"# Display names shown on leaderboards, keyed by student id.

[students]
"student-001" = "Ada"
"student-002" = "Grace"
"#;

//! Command-line arguments.
//!
//! Every flag falls back to the environment variable `Config::from_env`
//! reads, so flags and environment can be mixed. Flags win.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{parse_max_steps, Config, ConfigError};

#[derive(Debug, Parser)]
#[command(name = "review-agent")]
#[command(about = "Review uncommitted git changes with an LLM")]
#[command(version)]
pub struct Cli {
    /// Directory whose changes are reviewed
    #[arg(env = "REVIEW_TARGET_DIR")]
    pub target: Option<PathBuf>,

    /// Instruction sent to the model instead of the default review request
    #[arg(short, long, env = "REVIEW_INSTRUCTION")]
    pub instruction: Option<String>,

    /// Maximum number of model steps
    #[arg(short, long, env = "MAX_STEPS", value_parser = parse_max_steps)]
    pub max_steps: Option<usize>,

    /// Review filename used when the model does not name one
    #[arg(short, long, env = "REVIEW_OUTPUT_FILE")]
    pub output: Option<String>,
}

impl Cli {
    /// Layer the parsed flags over `config`.
    pub fn apply(self, mut config: Config) -> Result<Config, ConfigError> {
        if let Some(target) = self.target {
            config = config.with_target_directory(target);
        }
        if let Some(instruction) = self.instruction.filter(|s| !s.trim().is_empty()) {
            config.instruction = instruction;
        }
        if let Some(max_steps) = self.max_steps {
            config.max_steps = max_steps;
        }
        if let Some(output) = self.output {
            if output.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "--output".to_string(),
                    "filename must not be empty".to_string(),
                ));
            }
            config.output_filename = output;
        }
        Ok(config)
    }
}

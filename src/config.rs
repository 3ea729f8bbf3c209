//! Configuration management for the review agent.
//!
//! Configuration can be set via environment variables:
//! - `OPENROUTER_API_KEY` - Required. API key for the OpenAI-compatible provider.
//! - `DEFAULT_MODEL` - Optional. The LLM model to use. Defaults to `google/gemini-2.5-flash`.
//! - `LLM_BASE_URL` - Optional. Provider base URL. Defaults to `https://openrouter.ai/api/v1`.
//! - `WORKSPACE_PATH` - Optional. Base directory for relative paths. Defaults to current directory.
//! - `REVIEW_TARGET_DIR` - Optional. Directory whose changes are reviewed. Defaults to `.`.
//! - `REVIEW_INSTRUCTION` - Optional. Instruction given to the model. Built from the target directory when unset.
//! - `MAX_STEPS` - Optional. Maximum model steps per session. Defaults to `10`.
//! - `REVIEW_OUTPUT_FILE` - Optional. Default review filename. Defaults to `review.md`.
//! - `REVIEW_EXCLUDE_FILES` - Optional. Comma-separated file names skipped when collecting diffs.

use std::path::PathBuf;
use thiserror::Error;

/// Default model identifier (OpenRouter format).
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default step cap for one session.
pub const DEFAULT_MAX_STEPS: usize = 10;

/// Default review output filename.
pub const DEFAULT_OUTPUT_FILE: &str = "review.md";

/// File names that are never diffed (build output, lockfiles).
pub const DEFAULT_EXCLUDE_FILES: &[&str] = &["dist", "bun.lock"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider API key
    pub api_key: String,

    /// LLM model identifier
    pub model: String,

    /// Base URL of the chat-completions API
    pub base_url: String,

    /// Base directory that relative tool paths resolve against
    pub workspace_path: PathBuf,

    /// Directory whose changes are reviewed
    pub target_directory: PathBuf,

    /// Instruction sent to the model as the user prompt
    pub instruction: String,

    /// Maximum number of model steps per session
    pub max_steps: usize,

    /// Filename used when the model does not name one
    pub output_filename: String,

    /// Changed files skipped entirely by diff collection
    pub exclude_files: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENROUTER_API_KEY` is not set,
    /// and `ConfigError::InvalidValue` for unparsable or empty values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?;

        let model = std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let base_url = std::env::var("LLM_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let workspace_path = std::env::var("WORKSPACE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let target_directory = std::env::var("REVIEW_TARGET_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let max_steps = match std::env::var("MAX_STEPS") {
            Ok(raw) => parse_max_steps(&raw)?,
            Err(_) => DEFAULT_MAX_STEPS,
        };

        let output_filename = std::env::var("REVIEW_OUTPUT_FILE")
            .unwrap_or_else(|_| DEFAULT_OUTPUT_FILE.to_string());
        if output_filename.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "REVIEW_OUTPUT_FILE".to_string(),
                "filename must not be empty".to_string(),
            ));
        }

        let exclude_files = std::env::var("REVIEW_EXCLUDE_FILES")
            .map(|raw| parse_list(&raw))
            .unwrap_or_else(|_| default_exclude_files());

        let mut config = Self {
            api_key,
            model,
            base_url,
            workspace_path,
            target_directory,
            instruction: String::new(),
            max_steps,
            output_filename,
            exclude_files,
        };
        config.instruction = std::env::var("REVIEW_INSTRUCTION")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| config.default_instruction());

        Ok(config)
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, workspace_path: PathBuf, target_directory: PathBuf) -> Self {
        let mut config = Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            workspace_path,
            target_directory,
            instruction: String::new(),
            max_steps: DEFAULT_MAX_STEPS,
            output_filename: DEFAULT_OUTPUT_FILE.to_string(),
            exclude_files: default_exclude_files(),
        };
        config.instruction = config.default_instruction();
        config
    }

    /// Point the session at another directory, rebuilding the default
    /// instruction unless a custom one was set.
    pub fn with_target_directory(mut self, target: impl Into<PathBuf>) -> Self {
        let rebuild = self.instruction == self.default_instruction();
        self.target_directory = target.into();
        if rebuild {
            self.instruction = self.default_instruction();
        }
        self
    }

    /// The instruction used when `REVIEW_INSTRUCTION` is not set.
    pub fn default_instruction(&self) -> String {
        format!(
            "Review the code changes in '{}' directory, make your reviews and suggestions \
             file by file, give a commit message, and write the review into a file",
            self.target_directory.display()
        )
    }
}

fn default_exclude_files() -> Vec<String> {
    DEFAULT_EXCLUDE_FILES.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn parse_max_steps(raw: &str) -> Result<usize, ConfigError> {
    let steps: usize = raw
        .trim()
        .parse()
        .map_err(|e| ConfigError::InvalidValue("MAX_STEPS".to_string(), format!("{}", e)))?;
    if steps == 0 {
        return Err(ConfigError::InvalidValue(
            "MAX_STEPS".to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(steps)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_defaults() {
        let config = Config::new("key".into(), PathBuf::from("/work"), PathBuf::from("../app"));
        assert_eq!(config.max_steps, 10);
        assert_eq!(config.output_filename, "review.md");
        assert_eq!(config.exclude_files, vec!["dist", "bun.lock"]);
        assert!(config.instruction.contains("'../app'"));
    }

    #[test]
    fn target_override_rebuilds_default_instruction() {
        let config = Config::new("key".into(), PathBuf::from("."), PathBuf::from("."))
            .with_target_directory("../other");
        assert!(config.instruction.contains("'../other'"));
    }

    #[test]
    fn target_override_keeps_custom_instruction() {
        let mut config = Config::new("key".into(), PathBuf::from("."), PathBuf::from("."));
        config.instruction = "Only look at tests".to_string();
        let config = config.with_target_directory("../other");
        assert_eq!(config.instruction, "Only look at tests");
    }

    #[test]
    fn max_steps_must_be_positive() {
        assert_eq!(parse_max_steps(" 4 ").unwrap(), 4);
        assert!(matches!(parse_max_steps("0"), Err(ConfigError::InvalidValue(..))));
        assert!(matches!(parse_max_steps("ten"), Err(ConfigError::InvalidValue(..))));
    }

    #[test]
    fn exclude_list_skips_blank_entries() {
        assert_eq!(parse_list("dist, bun.lock,,target "), vec!["dist", "bun.lock", "target"]);
    }
}

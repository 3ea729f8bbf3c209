//! Tool system for the review agent.
//!
//! Tools are named actions the model may request. Each tool advertises a JSON
//! schema; its input is deserialized into a typed struct and validated before
//! the action runs, so malformed calls come back to the model as a
//! [`ToolError::Validation`] instead of reaching the implementation.

mod commit;
mod changes;
mod review;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::git::GitError;
use crate::llm::{FunctionSchema, ToolSchema};

pub use commit::{synthesize_commit_message, CommitMessageInput, GenerateCommitMessage};
pub use changes::{collect_changes, DiffRecord, FileChangesInput, GetFileChangesInDirectory};
pub use review::{render_review, WriteReviewInput, WriteReviewToFile};

/// Errors produced while dispatching or running a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid input for `{field}`: {reason}")]
    Validation { field: String, reason: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize tool output: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ToolError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the session must stop instead of reporting this to the model.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Settings shared by every tool invocation in a session.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Base directory for relative paths.
    pub workspace: PathBuf,
    /// Changed files skipped by diff collection (exact path match).
    pub exclude_files: Vec<String>,
    /// Review filename used when the model omits one.
    pub default_output_file: String,
}

impl ToolContext {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            exclude_files: crate::config::DEFAULT_EXCLUDE_FILES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_output_file: crate::config::DEFAULT_OUTPUT_FILE.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            workspace: config.workspace_path.clone(),
            exclude_files: config.exclude_files.clone(),
            default_output_file: config.output_filename.clone(),
        }
    }

    /// Resolve a model-supplied path against the workspace.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.workspace.join(path)
    }
}

/// Information about a tool for display purposes.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Trait for implementing tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get the tool description shown to the model.
    fn description(&self) -> &str;

    /// Get the JSON schema for the tool parameters.
    fn parameters_schema(&self) -> Value;

    /// Validate `args` and run the tool.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}

/// A tool with a typed input and output.
///
/// Every `TypedTool` is a [`Tool`]: the blanket impl deserializes the
/// arguments, calls [`TypedTool::validate`], and only then calls
/// [`TypedTool::run`].
#[async_trait]
pub trait TypedTool: Send + Sync {
    type Input: DeserializeOwned + Send;
    type Output: Serialize + Send;

    const NAME: &'static str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Value;

    /// Checks serde cannot express (non-empty strings and the like).
    fn validate(&self, _input: &Self::Input) -> Result<(), ToolError> {
        Ok(())
    }

    async fn run(&self, input: Self::Input, ctx: &ToolContext) -> Result<Self::Output, ToolError>;
}

#[async_trait]
impl<T: TypedTool> Tool for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn description(&self) -> &str {
        TypedTool::description(self)
    }

    fn parameters_schema(&self) -> Value {
        TypedTool::parameters_schema(self)
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let input: T::Input = parse_input(args)?;
        self.validate(&input)?;
        let output = self.run(input, ctx).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Parse the raw argument string the model produced. Blank means no arguments.
pub fn parse_arguments(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
        .map_err(|e| ToolError::validation("arguments", format!("not valid JSON: {}", e)))
}

fn parse_input<I: DeserializeOwned>(args: Value) -> Result<I, ToolError> {
    serde_path_to_error::deserialize(args).map_err(|e| {
        let path = e.path().to_string();
        let reason = e.into_inner().to_string();
        let field = field_name(&path, &reason);
        ToolError::Validation { field, reason }
    })
}

/// Dotted path of the failing field. A missing field is reported at its
/// parent's path, so the name serde puts in backticks is appended.
fn field_name(path: &str, reason: &str) -> String {
    let missing = reason
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
        .filter(|f| !f.is_empty());
    match (path, missing) {
        (".", Some(field)) => field.to_string(),
        (".", None) => "arguments".to_string(),
        (parent, Some(field)) => format!("{}.{}", parent, field),
        (path, None) => path.to_string(),
    }
}

/// Registry of available tools, keyed by name.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a registry with the diff, commit-message and review tools.
    pub fn new() -> Self {
        let mut tools: BTreeMap<String, Arc<dyn Tool>> = BTreeMap::new();

        tools.insert(
            GetFileChangesInDirectory::NAME.to_string(),
            Arc::new(GetFileChangesInDirectory),
        );
        tools.insert(
            GenerateCommitMessage::NAME.to_string(),
            Arc::new(GenerateCommitMessage),
        );
        tools.insert(
            WriteReviewToFile::NAME.to_string(),
            Arc::new(WriteReviewToFile),
        );

        Self { tools }
    }

    /// Create a registry with no tools.
    pub fn empty() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// List all available tools.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Get tool schemas in OpenAI function calling format.
    pub fn get_tool_schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .values()
            .map(|t| ToolSchema {
                tool_type: "function".to_string(),
                function: FunctionSchema {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.parameters_schema(),
                },
            })
            .collect()
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tool.execute(args, ctx).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records how often its action actually ran.
    struct Echo {
        runs: Arc<AtomicUsize>,
    }

    #[derive(Deserialize)]
    struct EchoInput {
        label: String,
    }

    #[async_trait]
    impl TypedTool for Echo {
        type Input = EchoInput;
        type Output = String;

        const NAME: &'static str = "echo";

        fn description(&self) -> &str {
            "Echoes its label"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"label": {"type": "string"}}})
        }

        fn validate(&self, input: &EchoInput) -> Result<(), ToolError> {
            if input.label.is_empty() {
                return Err(ToolError::validation("label", "must not be empty"));
            }
            Ok(())
        }

        async fn run(&self, input: EchoInput, _ctx: &ToolContext) -> Result<String, ToolError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(input.label)
        }
    }

    fn echo_registry() -> (ToolRegistry, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::empty();
        registry.register(Echo { runs: runs.clone() }).unwrap();
        (registry, runs)
    }

    #[test]
    fn default_registry_exposes_three_tools() {
        let registry = ToolRegistry::new();
        let names: Vec<String> = registry.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "generate_commit_message",
                "get_file_changes_in_directory",
                "write_review_to_file"
            ]
        );
        let schemas = registry.get_tool_schemas();
        assert!(schemas.iter().all(|s| s.tool_type == "function"));
        assert!(schemas.iter().all(|s| s.function.parameters["type"] == "object"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let (mut registry, runs) = echo_registry();
        let err = registry.register(Echo { runs }).unwrap_err();
        assert!(matches!(err, ToolError::DuplicateTool(name) if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn valid_input_reaches_the_action() {
        let (registry, runs) = echo_registry();
        let ctx = ToolContext::new(".");
        let out = registry
            .execute("echo", json!({"label": "hi"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, json!("hi"));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_action() {
        let (registry, runs) = echo_registry();
        let ctx = ToolContext::new(".");

        let cases = [
            (json!({"label": ""}), "label"),
            (json!({}), "label"),
            (json!({"label": 7}), "label"),
            (json!({"label": null}), "label"),
            (json!("hi"), "arguments"),
        ];
        for (args, expected) in cases {
            match registry.execute("echo", args.clone(), &ctx).await {
                Err(ToolError::Validation { field, .. }) => assert_eq!(field, expected, "{}", args),
                other => panic!("{} should fail validation, got {:?}", args, other),
            }
        }

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("rm_rf", json!({}), &ToolContext::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "rm_rf"));
        assert!(!ToolError::UnknownTool("x".into()).is_fatal());
    }

    #[test]
    fn arguments_are_parsed_leniently_when_blank() {
        assert_eq!(parse_arguments("  ").unwrap(), json!({}));
        assert_eq!(parse_arguments("{\"a\":1}").unwrap(), json!({"a": 1}));
        assert!(matches!(
            parse_arguments("{oops"),
            Err(ToolError::Validation { ref field, .. }) if field == "arguments"
        ));
    }

    #[test]
    fn field_names_follow_the_input_path() {
        assert_eq!(field_name(".", "missing field `rootDir`"), "rootDir");
        assert_eq!(field_name("diffs[0]", "missing field `diff`"), "diffs[0].diff");
        assert_eq!(field_name("rootDir", "invalid type: null, expected a string"), "rootDir");
        assert_eq!(field_name(".", "invalid type: sequence, expected struct"), "arguments");
    }
}

//! Commit message synthesis tool.
//!
//! The message is built locally from the file list; no model call is made.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{DiffRecord, ToolContext, ToolError, TypedTool};

/// Marker looked for inside file names to classify a file as new.
///
/// File names from a diff summary rarely contain it, so in practice the
/// message almost always reads "Update existing code".
const NEW_FILE_MARKER: &str = "new file";

/// Up to this many files are listed under the summary line.
const MAX_LISTED_FILES: usize = 5;

#[derive(Debug, Deserialize)]
pub struct CommitMessageInput {
    pub diffs: Vec<DiffRecord>,
}

/// Generate a conventional commit message from collected diffs.
pub struct GenerateCommitMessage;

#[async_trait]
impl TypedTool for GenerateCommitMessage {
    type Input = CommitMessageInput;
    type Output = String;

    const NAME: &'static str = "generate_commit_message";

    fn description(&self) -> &str {
        "Generates a conventional commit message based on the code changes"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "diffs": {
                    "type": "array",
                    "description": "The changes returned by get_file_changes_in_directory",
                    "items": {
                        "type": "object",
                        "properties": {
                            "file": { "type": "string" },
                            "diff": { "type": "string" }
                        },
                        "required": ["file", "diff"]
                    }
                }
            },
            "required": ["diffs"]
        })
    }

    async fn run(&self, input: CommitMessageInput, _ctx: &ToolContext) -> Result<String, ToolError> {
        Ok(synthesize_commit_message(&input.diffs))
    }
}

/// Build `feat: <summary> (<n> files)` plus a file list for small change sets.
pub fn synthesize_commit_message(diffs: &[DiffRecord]) -> String {
    let files: Vec<&str> = diffs.iter().map(|d| d.file.as_str()).collect();
    let has_new = files.iter().any(|f| f.contains(NEW_FILE_MARKER));
    let has_modified = files.iter().any(|f| !f.contains(NEW_FILE_MARKER));

    let summary = match (has_new, has_modified) {
        (true, true) => "Add new features and update existing code",
        (true, false) => "Add new features",
        _ => "Update existing code",
    };

    let noun = if files.len() == 1 { "file" } else { "files" };
    let mut message = format!("feat: {} ({} {})", summary, files.len(), noun);

    if !files.is_empty() && files.len() <= MAX_LISTED_FILES {
        message.push_str("\n\nFiles changed:\n");
        let list = files
            .iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n");
        message.push_str(&list);
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;

    fn records(names: &[&str]) -> Vec<DiffRecord> {
        names
            .iter()
            .map(|name| DiffRecord {
                file: name.to_string(),
                diff: format!("diff --git a/{name} b/{name}\n"),
            })
            .collect()
    }

    #[test]
    fn small_change_sets_list_every_file() {
        let message = synthesize_commit_message(&records(&["a.ts", "b.ts", "c.ts"]));
        assert_eq!(
            message,
            "feat: Update existing code (3 files)\n\nFiles changed:\n- a.ts\n- b.ts\n- c.ts"
        );
    }

    #[test]
    fn six_files_report_count_without_list() {
        let message = synthesize_commit_message(&records(&["a", "b", "c", "d", "e", "f"]));
        assert_eq!(message, "feat: Update existing code (6 files)");
    }

    #[test]
    fn single_file_is_singular() {
        let message = synthesize_commit_message(&records(&["main.rs"]));
        assert!(message.starts_with("feat: Update existing code (1 file)\n"));
    }

    #[test]
    fn empty_change_set_reports_zero_files() {
        assert_eq!(synthesize_commit_message(&[]), "feat: Update existing code (0 files)");
    }

    #[test]
    fn new_file_marker_drives_classification() {
        assert!(synthesize_commit_message(&records(&["new file: a.rs"]))
            .starts_with("feat: Add new features (1 file)"));
        assert!(synthesize_commit_message(&records(&["new file: a.rs", "b.rs"]))
            .starts_with("feat: Add new features and update existing code (2 files)"));
    }

    #[test]
    fn output_is_deterministic() {
        let diffs = records(&["x.rs", "y.rs"]);
        assert_eq!(synthesize_commit_message(&diffs), synthesize_commit_message(&diffs));
    }

    #[tokio::test]
    async fn tool_returns_message_as_string() {
        let out = ToolRegistry::new()
            .execute(
                GenerateCommitMessage::NAME,
                json!({"diffs": [{"file": "a.ts", "diff": "+1"}]}),
                &ToolContext::new("."),
            )
            .await
            .unwrap();
        assert_eq!(out, json!("feat: Update existing code (1 file)\n\nFiles changed:\n- a.ts"));
    }

    #[tokio::test]
    async fn malformed_diff_entries_are_rejected() {
        let err = ToolRegistry::new()
            .execute(
                GenerateCommitMessage::NAME,
                json!({"diffs": [{"file": "a.ts"}]}),
                &ToolContext::new("."),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation { ref field, .. } if field == "diffs[0].diff"));
    }
}

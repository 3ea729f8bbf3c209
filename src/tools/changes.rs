//! Diff collection tool.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ToolContext, ToolError, TypedTool};
use crate::git::{GitError, Repository};

/// The patch for one changed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub file: String,
    pub diff: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChangesInput {
    pub root_dir: String,
}

/// Collect per-file diffs for a directory.
pub struct GetFileChangesInDirectory;

#[async_trait]
impl TypedTool for GetFileChangesInDirectory {
    type Input = FileChangesInput;
    type Output = Vec<DiffRecord>;

    const NAME: &'static str = "get_file_changes_in_directory";

    fn description(&self) -> &str {
        "Gets the code changes made in given directory. Returns a list of {file, diff} entries, one per changed file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "rootDir": {
                    "type": "string",
                    "minLength": 1,
                    "description": "The root directory"
                }
            },
            "required": ["rootDir"]
        })
    }

    fn validate(&self, input: &FileChangesInput) -> Result<(), ToolError> {
        if input.root_dir.trim().is_empty() {
            return Err(ToolError::validation("rootDir", "must not be empty"));
        }
        Ok(())
    }

    async fn run(
        &self,
        input: FileChangesInput,
        ctx: &ToolContext,
    ) -> Result<Vec<DiffRecord>, ToolError> {
        let dir = ctx.resolve(&input.root_dir);
        Ok(collect_changes(&dir, &ctx.exclude_files).await?)
    }
}

/// Diff every changed file under `dir`, in summary order, skipping any file
/// whose path is exactly one of `exclude`.
pub async fn collect_changes(dir: &Path, exclude: &[String]) -> Result<Vec<DiffRecord>, GitError> {
    let repo = Repository::open(dir).await?;
    let changes = repo.changed_files().await?;

    let mut diffs = Vec::with_capacity(changes.len());
    let (mut added, mut removed) = (0u64, 0u64);
    for change in changes {
        if exclude.iter().any(|name| *name == change.path) {
            tracing::debug!(file = %change.path, "Skipping excluded file");
            continue;
        }
        // Binary files report no line counts.
        added += change.added.unwrap_or(0);
        removed += change.removed.unwrap_or(0);
        let diff = repo.diff(&change.path).await?;
        diffs.push(DiffRecord {
            file: change.path,
            diff,
        });
    }

    tracing::info!(
        dir = %repo.path().display(),
        files = diffs.len(),
        added,
        removed,
        "Collected file changes"
    );
    Ok(diffs)
}

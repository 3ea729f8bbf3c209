//! Review output tool.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ToolContext, ToolError, TypedTool};

#[derive(Debug, Deserialize)]
pub struct WriteReviewInput {
    pub review: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Write the review as a Markdown document.
pub struct WriteReviewToFile;

#[async_trait]
impl TypedTool for WriteReviewToFile {
    type Input = WriteReviewInput;
    type Output = String;

    const NAME: &'static str = "write_review_to_file";

    fn description(&self) -> &str {
        "Writes a code review to a markdown file"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "review": {
                    "type": "string",
                    "minLength": 1,
                    "description": "The review"
                },
                "filename": {
                    "type": "string",
                    "description": "The output filename (defaults to 'review.md')"
                }
            },
            "required": ["review"]
        })
    }

    fn validate(&self, input: &WriteReviewInput) -> Result<(), ToolError> {
        if input.review.is_empty() {
            return Err(ToolError::validation("review", "must not be empty"));
        }
        if matches!(&input.filename, Some(name) if name.trim().is_empty()) {
            return Err(ToolError::validation("filename", "must not be blank when given"));
        }
        Ok(())
    }

    async fn run(&self, input: WriteReviewInput, ctx: &ToolContext) -> Result<String, ToolError> {
        let filename = input
            .filename
            .unwrap_or_else(|| ctx.default_output_file.clone());
        let path = ctx.resolve(&filename);

        tokio::fs::write(&path, render_review(&input.review))
            .await
            .map_err(|source| ToolError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), bytes = input.review.len(), "Review written");
        Ok(format!("Review written to {}", filename))
    }
}

/// The Markdown document stored on disk.
pub fn render_review(review: &str) -> String {
    format!("# Code Review\n\n{}", review)
}

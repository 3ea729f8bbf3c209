//! Version-control boundary.
//!
//! A thin handle over the `git` executable: open a working copy, list the
//! files changed between index and working tree, and fetch the patch for a
//! single file. Everything is read-only; nothing here mutates the repository.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("{} is not a git working copy: {reason}", path.display())]
    NotARepository { path: PathBuf, reason: String },

    #[error("Failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git {args} failed: {message}")]
    CommandFailed { args: String, message: String },

    #[error("Unexpected git output: {0}")]
    UnexpectedOutput(String),
}

/// One entry of the changed-file summary.
///
/// Line counts are `None` for binary files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub added: Option<u64>,
    pub removed: Option<u64>,
}

/// An opened git working copy.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    /// Open `path` as a working copy. Fails if it is not inside one.
    pub async fn open(path: &Path) -> Result<Self, GitError> {
        if !path.is_dir() {
            return Err(GitError::NotARepository {
                path: path.to_path_buf(),
                reason: "no such directory".to_string(),
            });
        }

        let inside = run_git_command(&["rev-parse", "--is-inside-work-tree"], path)
            .await
            .map_err(|e| match e {
                GitError::CommandFailed { message, .. } => GitError::NotARepository {
                    path: path.to_path_buf(),
                    reason: message,
                },
                other => other,
            })?;

        if inside.trim() != "true" {
            return Err(GitError::NotARepository {
                path: path.to_path_buf(),
                reason: "directory is not inside a work tree".to_string(),
            });
        }

        Ok(Self {
            root: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Files with unstaged changes, in the order git reports them.
    ///
    /// Paths are relative to the opened directory, so they can be passed
    /// straight back to [`Repository::diff`].
    pub async fn changed_files(&self) -> Result<Vec<FileChange>, GitError> {
        let output = run_git_command(
            &["diff", "--numstat", "--no-renames", "--relative", "-z"],
            &self.root,
        )
        .await?;
        parse_numstat(&output)
    }

    /// Unified diff for a single file.
    ///
    /// `file` is matched literally, so names such as `[id].ts` never expand
    /// to other paths.
    pub async fn diff(&self, file: &str) -> Result<String, GitError> {
        let pathspec = format!(":(literal){}", file);
        run_git_command(
            &["diff", "--no-color", "--no-ext-diff", "--relative", "--", &pathspec],
            &self.root,
        )
        .await
    }
}

/// Parse `git diff --numstat -z` output (`added\tremoved\tpath\0` records).
fn parse_numstat(output: &str) -> Result<Vec<FileChange>, GitError> {
    output
        .split('\0')
        .map(|record| record.trim_start_matches('\n'))
        .filter(|record| !record.is_empty())
        .map(|record| {
            let mut fields = record.splitn(3, '\t');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(added), Some(removed), Some(path)) if !path.is_empty() => Ok(FileChange {
                    path: path.to_string(),
                    added: added.parse().ok(),
                    removed: removed.parse().ok(),
                }),
                _ => Err(GitError::UnexpectedOutput(record.to_string())),
            }
        })
        .collect()
}

/// Run a git command and return its output.
async fn run_git_command(args: &[&str], dir: &Path) -> Result<String, GitError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(GitError::Spawn)?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        let message = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(GitError::CommandFailed {
            args: args.join(" "),
            message,
        });
    }

    Ok(stdout.into_owned())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::process::Command;

    /// Run git synchronously inside a test fixture, panicking on failure.
    pub fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .expect("git must be installed to run these tests");
        assert!(
            status.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&status.stderr)
        );
    }

    /// Initialise an empty repository in `dir`.
    pub fn init_repo(dir: &Path) {
        git(dir, &["init", "-q"]);
    }

    /// Track `name` with `before` in the index, then change it on disk to `after`.
    pub fn modify_tracked(dir: &Path, name: &str, before: &str, after: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, before).unwrap();
        git(dir, &["--literal-pathspecs", "add", name]);
        std::fs::write(&path, after).unwrap();
    }
}

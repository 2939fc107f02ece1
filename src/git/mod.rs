use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

use crate::parser::{parse_blame, parse_rev_list};
use crate::{AnnotatedLine, RevisionId};

#[derive(Debug, Error)]
pub enum GitError {
    #[error("{} has no history on this branch", .0.display())]
    PathNotTracked(PathBuf),
    #[error("git is not available: {0}")]
    ToolUnavailable(String),
    #[error("unexpected git output: {0}")]
    MalformedOutput(String),
    #[error("not in a git repository")]
    NotARepo,
    #[error("invalid git ref: {0}")]
    InvalidRef(String),
    #[error("git command failed: {0}")]
    CommandFailed(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, GitError>;

/// Read-only queries against a file's version history.
///
/// Every call is independent; implementations do not cache.
pub trait History {
    /// Revisions that touched `path`, oldest first.
    fn revisions(&self, path: &Path) -> Result<Vec<RevisionId>>;

    /// Lines of `path` as of `revision`, each tagged with its introducing revision.
    fn blame(&self, path: &Path, revision: &str) -> Result<Vec<AnnotatedLine>>;

    /// Human-readable metadata and message of `revision`.
    fn describe(&self, path: &Path, revision: &str) -> Result<String>;
}

/// `History` backed by the `git` command line.
///
/// Commands run with `-C` set to the file's directory so files from any
/// repository can be opened regardless of the working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    branch: String,
}

impl GitCli {
    /// Walk the history reachable from `branch` (e.g. `HEAD`, `main`).
    pub fn new(branch: impl Into<String>) -> Result<Self> {
        let branch = branch.into();
        validate_git_ref(&branch)?;
        Ok(Self { branch })
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Run git in the directory of `path` and return stdout. When `pathspec`
    /// is set the file name is appended after `--`.
    ///
    /// Output is decoded lossily: file contents and commit messages need not
    /// be UTF-8.
    fn run(&self, path: &Path, args: &[&str], pathspec: bool) -> Result<String> {
        let (dir, file) = split_path(path);
        let started = Instant::now();

        let mut command = Command::new("git");
        command.arg("-C").arg(dir).args(args);
        if pathspec {
            command.arg("--").arg(file);
        }

        let output = command
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => GitError::ToolUnavailable(e.to_string()),
                _ => GitError::Io(e),
            })?;

        debug!(
            ?args,
            path = %path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "git invocation finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(path, args, &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl History for GitCli {
    fn revisions(&self, path: &Path) -> Result<Vec<RevisionId>> {
        let stdout = self.run(path, &["rev-list", "--reverse", &self.branch], true)?;
        let revisions = parse_rev_list(&stdout);
        if revisions.is_empty() {
            return Err(GitError::PathNotTracked(path.to_path_buf()));
        }
        Ok(revisions)
    }

    fn blame(&self, path: &Path, revision: &str) -> Result<Vec<AnnotatedLine>> {
        let stdout = self.run(path, &["blame", "--porcelain", "--root", revision], true)?;
        let parsed = parse_blame(&stdout);
        if parsed.lines.is_empty() && parsed.skipped > 0 {
            return Err(GitError::MalformedOutput(format!(
                "no usable blame records for {} at {}",
                path.display(),
                crate::abbrev(revision)
            )));
        }
        if parsed.skipped > 0 {
            warn!(
                skipped = parsed.skipped,
                revision = crate::abbrev(revision),
                "dropped malformed blame records"
            );
        }
        Ok(parsed.lines)
    }

    fn describe(&self, path: &Path, revision: &str) -> Result<String> {
        self.run(path, &["show", "--quiet", "--no-color", revision], false)
    }
}

/// Split a file path into the directory git should run in and the file name.
fn split_path(path: &Path) -> (PathBuf, PathBuf) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf());
    (dir, file)
}

/// Map git's stderr to the error kinds the front end distinguishes.
fn classify_failure(path: &Path, args: &[&str], stderr: &str) -> GitError {
    let lower = stderr.to_lowercase();
    if lower.contains("not a git repository") {
        GitError::NotARepo
    } else if lower.contains("no such path")
        || lower.contains("cannot change to")
        || lower.contains("does not exist")
    {
        GitError::PathNotTracked(path.to_path_buf())
    } else {
        GitError::CommandFailed(format!(
            "git {} failed: {}",
            args.first().copied().unwrap_or_default(),
            stderr.trim()
        ))
    }
}

/// Validate a git ref to prevent shell injection (only for user-supplied refs).
pub fn validate_git_ref(ref_str: &str) -> Result<()> {
    if ref_str.is_empty() {
        return Err(GitError::InvalidRef("Empty git ref".to_string()));
    }

    // Leading dash would be parsed as an option
    if ref_str.starts_with('-') {
        return Err(GitError::InvalidRef(format!(
            "git ref may not start with '-': {}",
            ref_str
        )));
    }

    for ch in ref_str.chars() {
        if !ch.is_alphanumeric()
            && !matches!(ch, '-' | '_' | '/' | '.' | '~' | '^' | '@' | '{' | '}')
        {
            return Err(GitError::InvalidRef(format!(
                "Invalid character in git ref: '{}'",
                ch
            )));
        }
    }

    Ok(())
}

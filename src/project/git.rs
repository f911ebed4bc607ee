//! Git collaborator: status, diff summary and log via the `git` binary.
//!
//! Every call is bounded by the configured timeout. Failures come back as
//! [`GitUnavailable`] for the caller to phrase; nothing here panics or hangs.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::process::{run_with_timeout, RunError};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GitUnavailable {
    #[error("git is not installed")]
    Missing,
    #[error("not a git repository")]
    NotARepository,
    #[error("git timed out after {} seconds", .0.as_secs())]
    TimedOut(Duration),
    #[error("git failed: {0}")]
    Failed(String),
}

/// Working-tree changes from `git status --porcelain`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitStatus {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub deleted: Vec<String>,
    pub untracked: Vec<String>,
}

impl GitStatus {
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.deleted.is_empty() && self.untracked.is_empty()
    }

    /// "`2 modified, 1 untracked`"
    pub fn counts(&self) -> String {
        let parts: Vec<String> = [
            (self.modified.len(), "modified"),
            (self.added.len(), "added"),
            (self.deleted.len(), "deleted"),
            (self.untracked.len(), "untracked"),
        ]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{n} {label}"))
        .collect();
        parts.join(", ")
    }
}

impl fmt::Display for GitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "Working tree clean.");
        }
        for (marker, label, paths) in [
            ('M', "Modified", &self.modified),
            ('A', "Added", &self.added),
            ('D', "Deleted", &self.deleted),
            ('?', "Untracked", &self.untracked),
        ] {
            if paths.is_empty() {
                continue;
            }
            writeln!(f, "{label} ({}):", paths.len())?;
            for path in paths.iter().take(10) {
                writeln!(f, "  {marker} {path}")?;
            }
            if paths.len() > 10 {
                writeln!(f, "  ... and {} more", paths.len() - 10)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub summary: String,
}

/// Runs git in the project root with a timeout.
#[derive(Debug, Clone)]
pub struct GitCollaborator {
    root: PathBuf,
    timeout: Duration,
    program: String,
    prefix_args: Vec<String>,
}

impl GitCollaborator {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { root: root.into(), timeout, program: "git".to_string(), prefix_args: Vec::new() }
    }

    /// Replace the executable (and leading arguments) used in place of `git`.
    pub fn with_program(mut self, program: impl Into<String>, prefix_args: &[&str]) -> Self {
        self.program = program.into();
        self.prefix_args = prefix_args.iter().map(|s| s.to_string()).collect();
        self
    }

    async fn run(&self, args: &[&str]) -> Result<String, GitUnavailable> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix_args).args(args).current_dir(&self.root);
        debug!(?args, root = %self.root.display(), "running git");

        let output = run_with_timeout(cmd, self.timeout).await.map_err(|e| match e {
            RunError::NotFound(_) => GitUnavailable::Missing,
            RunError::TimedOut(t) => GitUnavailable::TimedOut(t),
            RunError::Io(e) => GitUnavailable::Failed(e.to_string()),
        })?;

        if output.success() {
            return Ok(output.stdout);
        }
        let stderr = output.stderr.trim();
        if stderr.contains("not a git repository") {
            Err(GitUnavailable::NotARepository)
        } else {
            Err(GitUnavailable::Failed(stderr.lines().next().unwrap_or("unknown error").to_string()))
        }
    }

    /// Whether git runs and the root is inside a work tree.
    pub async fn is_available(&self) -> bool {
        matches!(self.run(&["rev-parse", "--is-inside-work-tree"]).await, Ok(out) if out.trim() == "true")
    }

    pub async fn status(&self) -> Result<GitStatus, GitUnavailable> {
        self.run(&["status", "--porcelain"]).await.map(|out| parse_porcelain(&out))
    }

    /// `git diff --stat`, optionally limited to one path.
    pub async fn diff_summary(&self, path: Option<&str>) -> Result<String, GitUnavailable> {
        let mut args = vec!["diff", "--stat"];
        if let Some(p) = path {
            args.push("--");
            args.push(p);
        }
        self.run(&args).await.map(|out| out.trim_end().to_string())
    }

    pub async fn log(&self, limit: usize) -> Result<Vec<Commit>, GitUnavailable> {
        let n = format!("-{limit}");
        self.run(&["log", "--oneline", &n]).await.map(|out| parse_oneline_log(&out))
    }
}

pub fn parse_porcelain(output: &str) -> GitStatus {
    let mut status = GitStatus::default();
    for line in output.lines() {
        if line.len() < 4 {
            continue;
        }
        let (code, path) = (&line[..2], line[3..].to_string());
        if code.contains('?') {
            status.untracked.push(path);
        } else if code.contains('M') || code.contains('R') {
            status.modified.push(path);
        } else if code.contains('A') {
            status.added.push(path);
        } else if code.contains('D') {
            status.deleted.push(path);
        }
    }
    status
}

pub fn parse_oneline_log(output: &str) -> Vec<Commit> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| match line.split_once(' ') {
            Some((hash, summary)) => Commit { hash: hash.to_string(), summary: summary.to_string() },
            None => Commit { hash: line.to_string(), summary: String::new() },
        })
        .collect()
}

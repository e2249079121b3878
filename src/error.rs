// src/error.rs

//! Crate-wide error types
//!
//! Every pipeline stage maps its failures onto one variant here. Per-file
//! rewrite failures inside the relocation stage are collected into
//! [`Error::Relocation`] rather than aborting the pass they belong to, so
//! a partially relocated tree still carries a full diagnostic trail.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A single failed rewrite or relink, collected during a relocation pass
#[derive(Debug, Clone)]
pub struct RewriteFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for RewriteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Errors that can occur while building, relocating, or packaging an
/// environment
#[derive(Debug, Error)]
pub enum Error {
    /// Build directory already exists and overwrite was not requested
    #[error("build directory already exists: {0} (pass --force to replace it)")]
    AlreadyExists(PathBuf),

    /// The external installer returned a non-zero exit status
    #[error("dependency installation failed: {0}")]
    InstallationFailed(String),

    /// A specific path-sensitive artifact could not be rewritten
    #[error("failed to rewrite '{path}': {reason}")]
    Rewrite { path: PathBuf, reason: String },

    /// One or more rewrite/relink operations failed during relocation
    #[error("relocation failed for {} path(s): {}", .0.len(), join_failures(.0))]
    Relocation(Vec<RewriteFailure>),

    /// An entry-point hook symlink could not be created
    #[error("hook generation failed: {0}")]
    HookGeneration(String),

    /// The external packaging tool returned a non-zero exit status
    #[error("packaging failed with exit code {code}:\n{output}")]
    PackagingFailed { code: i32, output: String },

    /// An external tool exceeded its configured timeout
    #[error("'{tool}' timed out after {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    /// An external tool could not be spawned
    #[error("failed to run '{tool}': {source}")]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_failures(failures: &[RewriteFailure]) -> String {
    failures
        .iter()
        .map(|f| f.path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

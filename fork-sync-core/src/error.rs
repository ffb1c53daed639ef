//! Error taxonomy for the synchronisation pipeline.
//!
//! Every fatal condition aborts the remaining pipeline steps; nothing is
//! auto-recovered. The CLI maps any of these to a non-zero exit.

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by git plumbing calls.
#[derive(Debug, Error)]
pub enum GitError {
    /// The merge produced conflicting hunks. The repository has already been
    /// restored to its pre-merge state when this is returned.
    #[error("merge conflict merging upstream into the local branch; manual resolution required")]
    MergeConflict,

    /// A git invocation exited non-zero for any other reason. stderr is
    /// surfaced verbatim.
    #[error("git {command} failed: {stderr}")]
    Tool { command: String, stderr: String },

    /// The git binary could not be launched at all.
    #[error("failed to launch git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote refused the push (e.g. non-fast-forward). No retry or
    /// rebase is attempted.
    #[error("push to {remote}/{branch} rejected: {stderr}")]
    PushRejected {
        remote: String,
        branch: String,
        stderr: String,
    },
}

/// Top-level pipeline error.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Git(#[from] GitError),

    /// The checkout was not in a mergeable state before the run started
    /// (wrong branch checked out, or uncommitted local changes).
    #[error("checkout precondition failed: {0}")]
    Precondition(String),

    /// One or more files failed to upload. The batch ran to completion; the
    /// run as a whole still fails and the push step is skipped.
    #[error("{} file(s) failed to upload", failed.len())]
    Upload { failed: Vec<FailedUpload> },
}

/// A single file the object store rejected.
#[derive(Debug)]
pub struct FailedUpload {
    pub path: PathBuf,
    pub reason: String,
}

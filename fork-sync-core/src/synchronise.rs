//! High-level pipeline: orchestrates fetch → merge → detect → upload → push.
//!
//! This module provides the top-level orchestration logic for synchronising
//! a fork checkout with its upstream, as described in the loaded config. It
//! implements a coordinated pipeline that:
//!   - Fetches the upstream branch and merges it into the local branch
//!   - Detects which matching files the merge added or modified
//!   - Publishes those files to a remote bucket via [`contract::ObjectStore`]
//!   - Pushes the merge commit back to origin when new commits were merged
//!   - Returns a report of what happened for downstream audit/logging.
//!
//! # Major Types
//! - [`SyncStatus`]: explicit in-process outcome of the detect step
//!   (`NoChange` or `Changed(files)`), passed directly between steps instead
//!   of stringly-typed flags
//! - [`SyncReport`]: output report with commit ids, uploaded keys and push
//!   outcome
//!
//! # Error Handling
//! Every fatal condition (merge conflict, git tool failure, push rejection)
//! aborts the remaining pipeline steps immediately. Per-file upload failures
//! do not abort the batch, but any recorded failure fails the run as a whole
//! and skips the push.
//!
//! # Callable From
//! - Used by both the CLI crate and the integration tests
//! - Expects a concrete (async) [`ObjectStore`] implementation for uploads

use std::path::PathBuf;

use tracing::{error, info};

use crate::config::SyncConfig;
use crate::contract::{ObjectStore, PutRequest};
use crate::error::{FailedUpload, SyncError};
use crate::git::{CommitId, Repository};

/// Outcome of the change-detection step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// The merge brought in no new commits; nothing was diffed, uploaded or
    /// pushed.
    NoChange,
    /// New commits were merged; holds the matching added/modified files.
    Changed(Vec<PathBuf>),
}

/// Report of one full pipeline run.
#[derive(Debug)]
pub struct SyncReport {
    pub before: CommitId,
    pub after: CommitId,
    pub status: SyncStatus,
    /// Destination keys of all successfully stored files, in diff order.
    pub uploaded: Vec<String>,
    pub pushed: bool,
}

/// Entrypoint: run the whole pipeline once against the configured checkout.
///
/// State machine: `START → SYNCED → {NO_CHANGE | MERGE_CONFLICT(fatal) |
/// CHANGED} → {UPLOAD_SKIPPED | UPLOADED} → {PUSH_SKIPPED | PUSHED} → END`.
pub async fn synchronise<S>(config: &SyncConfig, store: &S) -> Result<SyncReport, SyncError>
where
    S: ObjectStore,
{
    info!("[SYNC] Starting fork synchronisation pipeline");
    let repo = Repository::open(&config.repository.path);

    // --- Step 0: checkout preconditions ---
    // Merging into the wrong branch or over uncommitted changes would leave
    // the checkout in a state no later step can recover from.
    let current = repo.current_branch()?;
    if current != config.repository.branch {
        return Err(SyncError::Precondition(format!(
            "expected branch {:?} checked out, found {:?}",
            config.repository.branch, current
        )));
    }
    if !repo.is_clean()? {
        return Err(SyncError::Precondition(
            "working tree has uncommitted changes".to_string(),
        ));
    }

    // --- Step 1: capture pre-merge state and merge upstream ---
    let before = repo.head_commit()?;
    info!(before = %before, "[SYNC] Captured pre-merge HEAD");

    repo.fetch(&config.repository.upstream_url, &config.repository.branch)?;
    if let Err(e) = repo.merge_fetched() {
        error!(error = %e, "[SYNC][ERROR] Merge step failed");
        return Err(e.into());
    }

    let after = repo.head_commit()?;

    // --- Step 2: detect changed files ---
    // A self-diff is skipped inside changed_files; reporting NoChange here
    // also skips the upload and push steps entirely.
    if before == after {
        info!(head = %after, "[SYNC] No new commits merged, nothing to do");
        return Ok(SyncReport {
            before,
            after,
            status: SyncStatus::NoChange,
            uploaded: Vec::new(),
            pushed: false,
        });
    }

    let changed = repo.changed_files(&before, &after, &config.detect.suffix)?;
    if changed.is_empty() {
        info!(
            before = %before,
            after = %after,
            "[SYNC] New commits merged but no matching files changed, skipping upload"
        );
    }

    // --- Step 3: upload each matching file ---
    // A per-file failure does not abort the batch; remaining files still get
    // their at-least-once attempt. Any failure fails the run afterwards and
    // the push is skipped.
    let mut uploaded: Vec<String> = Vec::new();
    let mut failed: Vec<FailedUpload> = Vec::new();

    for rel_path in &changed {
        // Keys come from git's diff output, so they are already
        // '/'-separated repo-relative paths.
        let key = rel_path.to_string_lossy().into_owned();
        let local_path = config.repository.path.join(rel_path);
        info!(key = %key, "[SYNC][UPLOAD] Storing file in bucket");
        match store
            .put_file(PutRequest {
                local_path: &local_path,
                key: &key,
            })
            .await
        {
            Ok(()) => {
                info!(key = %key, "[SYNC][UPLOAD] put_file succeeded");
                uploaded.push(key);
            }
            Err(e) => {
                error!(key = %key, error = %e, "[SYNC][ERROR][UPLOAD] put_file failed");
                failed.push(FailedUpload {
                    path: rel_path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if !failed.is_empty() {
        error!(
            failed = failed.len(),
            succeeded = uploaded.len(),
            "[SYNC][ERROR] Upload batch completed with failures, skipping push"
        );
        return Err(SyncError::Upload { failed });
    }

    // --- Step 4: publish the merge commit back to origin ---
    repo.push(&config.repository.origin_remote, &config.repository.branch)?;
    info!(
        remote = %config.repository.origin_remote,
        branch = %config.repository.branch,
        head = %after,
        "[SYNC] Pushed merge commit to origin"
    );

    Ok(SyncReport {
        before,
        after,
        status: SyncStatus::Changed(changed),
        uploaded,
        pushed: true,
    })
}

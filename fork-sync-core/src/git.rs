//! Git plumbing for the sync pipeline.
//!
//! All operations shell out to the `git` binary and act on an explicit
//! [`Repository`] handle holding the working-tree path, so no step depends
//! on the process-wide current directory. The handle assumes exclusive
//! single-writer access to the checkout for the duration of a run; the
//! caller's scheduler must not start two runs against the same path.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::GitError;

/// Opaque identifier for a point in repository history. Two are held per
/// run (pre-merge, post-merge); equality is the only comparison that
/// matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitId(String);

impl CommitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to a local checkout. Every git invocation runs with `-C` against
/// this path.
#[derive(Debug, Clone)]
pub struct Repository {
    workdir: PathBuf,
}

/// Captured result of a git invocation that exited zero.
struct GitOutput {
    stdout: String,
}

impl Repository {
    pub fn open(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Runs `git <args>` in the working tree, mapping launch failures and
    /// non-zero exits to [`GitError`].
    fn run(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.workdir)
            .args(args)
            .output()
            .map_err(|e| GitError::Spawn {
                command: args.join(" "),
                source: e,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(GitError::Tool {
                command: args.join(" "),
                stderr,
            });
        }
        Ok(GitOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }

    /// Resolves the current HEAD commit.
    pub fn head_commit(&self) -> Result<CommitId, GitError> {
        let out = self.run(&["rev-parse", "HEAD"])?;
        let id = CommitId(out.stdout.trim().to_string());
        debug!(commit = %id, path = %self.workdir.display(), "Resolved HEAD");
        Ok(id)
    }

    /// Name of the currently checked-out branch.
    pub fn current_branch(&self) -> Result<String, GitError> {
        let out = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(out.stdout.trim().to_string())
    }

    /// True when the working tree has no staged or unstaged changes.
    pub fn is_clean(&self) -> Result<bool, GitError> {
        let out = self.run(&["status", "--porcelain"])?;
        Ok(out.stdout.trim().is_empty())
    }

    /// Fetches `branch` from the upstream URL into `FETCH_HEAD`.
    pub fn fetch(&self, remote_url: &str, branch: &str) -> Result<(), GitError> {
        info!(
            remote_url = remote_url,
            branch = branch,
            path = %self.workdir.display(),
            "Fetching upstream branch"
        );
        self.run(&["fetch", remote_url, branch])?;
        Ok(())
    }

    /// Merges the previously fetched `FETCH_HEAD` into the current branch.
    ///
    /// Fast-forwards and trivial three-way merges succeed silently; a
    /// trivial no-op leaves HEAD unchanged. On conflicting hunks the merge
    /// is aborted so the checkout is back at its pre-merge state, and
    /// [`GitError::MergeConflict`] is returned. Conflicts are terminal and
    /// require human intervention, never auto-resolution.
    pub fn merge_fetched(&self) -> Result<(), GitError> {
        match self.run(&["merge", "--no-edit", "FETCH_HEAD"]) {
            Ok(out) => {
                info!(path = %self.workdir.display(), "Merged FETCH_HEAD");
                debug!(output = %out.stdout.trim(), "git merge output");
                Ok(())
            }
            Err(merge_err) => {
                if self.has_unmerged_paths()? {
                    warn!(
                        path = %self.workdir.display(),
                        "Merge conflict detected, aborting merge to restore pre-merge state"
                    );
                    self.run(&["merge", "--abort"])?;
                    Err(GitError::MergeConflict)
                } else {
                    Err(merge_err)
                }
            }
        }
    }

    fn has_unmerged_paths(&self) -> Result<bool, GitError> {
        let out = self.run(&["ls-files", "--unmerged"])?;
        Ok(!out.stdout.trim().is_empty())
    }

    /// Lists files added or modified between two commits, restricted to
    /// paths ending in `suffix`. Deletions and renames are excluded by the
    /// `--diff-filter`. Order is git's path-sorted diff order.
    ///
    /// Precondition: when `before == after` this returns empty without
    /// invoking git at all; a self-diff is semantically meaningless and
    /// wastes a tool invocation.
    pub fn changed_files(
        &self,
        before: &CommitId,
        after: &CommitId,
        suffix: &str,
    ) -> Result<Vec<PathBuf>, GitError> {
        if before == after {
            return Ok(Vec::new());
        }

        let out = self.run(&[
            "diff",
            "--name-only",
            "--diff-filter=AM",
            before.as_str(),
            after.as_str(),
        ])?;

        let files: Vec<PathBuf> = out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && line.ends_with(suffix))
            .map(PathBuf::from)
            .collect();

        info!(
            before = %before,
            after = %after,
            suffix = suffix,
            count = files.len(),
            "Computed changed-file set"
        );
        Ok(files)
    }

    /// Pushes the local branch to `remote`. Rejection (e.g. non-fast-forward)
    /// is fatal; no retry or rebase is attempted. Other push failures
    /// (unreachable remote, auth) stay [`GitError::Tool`] so the error text
    /// names the actual cause.
    pub fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        info!(remote = remote, branch = branch, "Pushing merged branch");
        match self.run(&["push", remote, branch]) {
            Ok(_) => Ok(()),
            Err(GitError::Tool { stderr, .. }) if is_push_rejection(&stderr) => {
                Err(GitError::PushRejected {
                    remote: remote.to_string(),
                    branch: branch.to_string(),
                    stderr,
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// True when git's push stderr indicates the remote refused the ref update,
/// as opposed to a transport or auth failure.
fn is_push_rejection(stderr: &str) -> bool {
    stderr.contains("[rejected]")
        || stderr.contains("[remote rejected]")
        || stderr.contains("non-fast-forward")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_diff_short_circuits_without_running_git() {
        // The path does not exist, so any git invocation would fail; the
        // equal-commit precondition must return before reaching git.
        let repo = Repository::open("/nonexistent/checkout");
        let id = CommitId("0123456789abcdef0123456789abcdef01234567".to_string());
        let files = repo
            .changed_files(&id, &id.clone(), ".pdf")
            .expect("self-diff must not touch git");
        assert!(files.is_empty());
    }

    #[test]
    fn push_stderr_classification_separates_rejection_from_other_failures() {
        assert!(is_push_rejection(
            "! [rejected]        main -> main (fetch first)"
        ));
        assert!(is_push_rejection(
            "! [remote rejected] main -> main (pre-receive hook declined)"
        ));
        assert!(is_push_rejection(
            "Updates were rejected: non-fast-forward"
        ));
        assert!(!is_push_rejection(
            "fatal: 'no-such-remote' does not appear to be a git repository"
        ));
        assert!(!is_push_rejection(
            "fatal: Authentication failed for 'https://example.com/repo.git'"
        ));
    }

    #[test]
    fn commit_ids_compare_by_value() {
        let a = CommitId("aaaa".to_string());
        let b = CommitId("aaaa".to_string());
        let c = CommitId("cccc".to_string());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

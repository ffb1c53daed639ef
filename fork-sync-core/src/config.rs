use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Top-level pipeline configuration: which checkout to sync and what to
/// detect. Bucket credentials are not part of this struct; they belong to
/// the concrete object-store client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub detect: DetectConfig,
}

/// Describes the local checkout and the remotes it syncs between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Path to the working tree of the fork checkout.
    pub path: PathBuf,
    /// Branch to merge into and push (e.g. "main").
    pub branch: String,
    /// Git URL of the upstream repository this fork tracks.
    pub upstream_url: String,
    /// Remote the merge commit is pushed back to.
    #[serde(default = "default_origin")]
    pub origin_remote: String,
}

/// Suffix filter applied to the changed-file set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectConfig {
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

fn default_origin() -> String {
    "origin".to_string()
}

fn default_suffix() -> String {
    ".pdf".to_string()
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
        }
    }
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        info!(
            repo_path = %self.repository.path.display(),
            branch = %self.repository.branch,
            upstream = %self.repository.upstream_url,
            suffix = %self.detect.suffix,
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

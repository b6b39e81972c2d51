use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Which version-control reference point change detection compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Baseline {
    /// Last commit vs working tree (staged and unstaged changes).
    #[default]
    WorkingTree,
    /// Second-to-last commit vs last commit.
    LastCommit,
}

/// Run-wide switches for one publish invocation.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Directory content paths are resolved against (the repository root).
    pub root: PathBuf,
    /// Build payloads but never call the remote or touch the state file.
    pub dry_run: bool,
    /// Force `published = false` regardless of the file's own draft flag.
    pub draft_override: bool,
    /// Disable the basename fallback when matching index entries to changed paths.
    pub strict_paths: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            dry_run: false,
            draft_override: false,
            strict_paths: false,
        }
    }
}

impl PublishOptions {
    pub fn trace_loaded(&self) {
        info!(
            root = %self.root.display(),
            dry_run = self.dry_run,
            draft_override = self.draft_override,
            strict_paths = self.strict_paths,
            "Loaded publish options"
        );
        debug!(?self, "Publish options (full debug)");
    }
}

//! Change detection: which indexed files need publishing.
//!
//! The git side ([`GitChangeSource`]) shells out to `git` and reports changed paths for a
//! [`Baseline`]. [`select`] intersects those with the index. A missing baseline (not a
//! repository, no commits yet, git not installed) selects the whole index with a warning.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Baseline;
use crate::contract::ChangeSource;
use crate::error::PublishError;

/// How targets are chosen for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    /// Publish exactly these files; index and change detection are bypassed.
    ExplicitFiles(Vec<String>),
    /// Publish every indexed file.
    Force,
    /// Publish indexed files changed relative to the baseline.
    Auto(Baseline),
}

/// Normalizes a path to the form used as state key and for matching:
/// forward slashes, no leading `./`.
pub fn normalize_path(path: &str) -> String {
    let mut p = path.trim().replace('\\', "/");
    while let Some(rest) = p.strip_prefix("./") {
        p = rest.to_string();
    }
    p
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Returns the ordered, de-duplicated set of paths to publish.
pub fn select(
    indexed: &[String],
    mode: &SelectionMode,
    changes: &dyn ChangeSource,
    strict_paths: bool,
) -> Vec<String> {
    let baseline = match mode {
        SelectionMode::ExplicitFiles(files) => {
            info!(count = files.len(), "Explicit files given, skipping change detection");
            return dedup(files.iter().map(|f| normalize_path(f)));
        }
        SelectionMode::Force => {
            info!(count = indexed.len(), "Force mode, selecting whole index");
            return dedup(indexed.iter().map(|f| normalize_path(f)));
        }
        SelectionMode::Auto(baseline) => *baseline,
    };

    let Some(changed) = changes.changed_paths(baseline) else {
        warn!("No version-control baseline available, selecting every indexed file");
        return dedup(indexed.iter().map(|f| normalize_path(f)));
    };
    let selected = match_changed(indexed, &changed, strict_paths);
    info!(
        indexed = indexed.len(),
        selected = selected.len(),
        ?baseline,
        "Change detection complete"
    );
    selected
}

/// Indexed paths present in `changed`, in index order.
///
/// A path matches on exact relative-path equality, or (unless `strict_paths`) on basename
/// equality. The basename fallback tolerates the index and git reporting paths from
/// different roots, at the cost of false positives when two indexed files share a name.
pub fn match_changed(
    indexed: &[String],
    changed: &BTreeSet<String>,
    strict_paths: bool,
) -> Vec<String> {
    let changed: BTreeSet<String> = changed.iter().map(|c| normalize_path(c)).collect();
    let changed_basenames: HashSet<&str> = changed.iter().map(|c| basename(c)).collect();
    debug!(changed = changed.len(), strict_paths, "Matching index against changed-set");

    dedup(indexed.iter().map(|f| normalize_path(f)).filter(|path| {
        if changed.contains(path) {
            return true;
        }
        if strict_paths {
            return false;
        }
        let hit = changed_basenames.contains(basename(path));
        if hit {
            warn!(path = %path, "Matched changed file by basename only");
        }
        hit
    }))
}

fn dedup(paths: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    paths.filter(|p| seen.insert(p.clone())).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IndexDocument {
    List(Vec<String>),
    Structured { files: Vec<String> },
}

/// Reads the index of tracked files (YAML: a list, or `files: [...]`).
pub fn load_index(path: &Path) -> Result<Vec<String>, PublishError> {
    if !path.exists() {
        return Err(PublishError::MissingIndex(path.to_path_buf()));
    }
    let invalid = |message: String| PublishError::InvalidIndex {
        path: path.to_path_buf(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let doc: IndexDocument = serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?;
    let files = match doc {
        IndexDocument::List(files) | IndexDocument::Structured { files } => files,
    };
    let files: Vec<String> = files
        .iter()
        .map(|f| normalize_path(f))
        .filter(|f| !f.is_empty())
        .collect();
    info!(path = %path.display(), count = files.len(), "Loaded index");
    Ok(files)
}

/// [`ChangeSource`] backed by the `git` command line in `repo_dir`.
pub struct GitChangeSource {
    repo_dir: PathBuf,
}

impl GitChangeSource {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    /// Runs `git -C <repo> <args>`; `None` on launch failure or non-zero exit.
    ///
    /// `core.quotePath` is off so non-ASCII paths come back verbatim, not octal-escaped.
    fn git(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(["-c", "core.quotePath=false"])
            .args(args)
            .output();
        match output {
            Ok(out) if out.status.success() => Some(String::from_utf8_lossy(&out.stdout).into_owned()),
            Ok(out) => {
                debug!(
                    ?args,
                    status = %out.status,
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "git exited with non-zero code"
                );
                None
            }
            Err(e) => {
                warn!(error = ?e, "Failed to launch git");
                None
            }
        }
    }

    fn has_commit(&self, rev: &str) -> bool {
        self.git(&["rev-parse", "--verify", "--quiet", &format!("{rev}^{{commit}}")])
            .is_some()
    }

    fn name_only(&self, args: &[&str]) -> Option<BTreeSet<String>> {
        self.git(args).map(|out| {
            out.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

impl ChangeSource for GitChangeSource {
    fn changed_paths(&self, baseline: Baseline) -> Option<BTreeSet<String>> {
        if !self.has_commit("HEAD") {
            debug!(repo = %self.repo_dir.display(), "No HEAD commit");
            return None;
        }
        match baseline {
            Baseline::WorkingTree => {
                let mut staged = self.name_only(&["diff", "--name-only", "--cached", "HEAD"])?;
                let unstaged = self.name_only(&["diff", "--name-only"])?;
                staged.extend(unstaged);
                Some(staged)
            }
            Baseline::LastCommit => {
                if self.has_commit("HEAD~1") {
                    self.name_only(&["diff", "--name-only", "HEAD~1", "HEAD"])
                } else {
                    info!("Only one commit in history, using every path it touched");
                    self.name_only(&[
                        "diff-tree",
                        "--root",
                        "--no-commit-id",
                        "--name-only",
                        "-r",
                        "HEAD",
                    ])
                }
            }
        }
    }
}

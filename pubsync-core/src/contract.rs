//! # contract: data shared across the pipeline and the three collaborator seams
//!
//! The publish pipeline talks to the outside world through exactly three traits:
//!
//! - [`Publisher`]: the remote article API (create / update).
//! - [`Converter`]: turns a source dialect into canonical markdown (pandoc in production).
//! - [`ChangeSource`]: answers "which paths changed since the baseline" (git in production).
//!
//! All three are annotated for `mockall` so the orchestrator can be driven end to end in
//! tests without a network, a pandoc install or a git checkout.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::Baseline;
use crate::error::PublishError;
use crate::payload::ArticlePayload;

/// The two supported content formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Keyword-annotated outline (`#+TITLE: ...`), i.e. Org mode.
    Org,
    /// Markdown with a `---` delimited YAML front-matter block.
    Markdown,
}

impl Dialect {
    /// Picks the dialect from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "org" => Some(Dialect::Org),
            "md" | "markdown" => Some(Dialect::Markdown),
            _ => None,
        }
    }
}

/// One content file as read for this run.
#[derive(Debug, Clone)]
pub struct ContentFile {
    /// Repo-relative path; the key in the state store.
    pub path: String,
    pub dialect: Dialect,
    pub raw: Vec<u8>,
}

/// Tags as found in the source, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RawTags {
    #[default]
    Absent,
    Text(String),
    List(Vec<String>),
}

/// Everything extracted from one content file.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleMetadata {
    pub title: String,
    pub description: Option<String>,
    pub tags: RawTags,
    pub canonical_url: Option<String>,
    pub draft: bool,
    pub body: String,
}

/// What the remote API hands back after a successful create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArticle {
    pub id: u64,
    pub url: String,
}

/// Remote article API.
///
/// Implementors own transport concerns (auth header, retries). A returned `Ok` means the
/// remote confirmed the article; the orchestrator persists state only in that case.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Create a new article.
    async fn create(&self, payload: &ArticlePayload) -> Result<RemoteArticle, PublishError>;

    /// Replace the article with the given id.
    async fn update(
        &self,
        article_id: u64,
        payload: &ArticlePayload,
    ) -> Result<RemoteArticle, PublishError>;
}

/// Converts a source document into canonical markdown.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Converter: Send + Sync {
    /// Fails with [`PublishError::MissingDependency`] when the backing tool is missing.
    fn ensure_available(&self) -> Result<(), PublishError>;

    /// Convert the full document text; `path` is used for diagnostics only.
    fn to_markdown(
        &self,
        path: &Path,
        dialect: Dialect,
        source: &str,
    ) -> Result<String, PublishError>;
}

/// Version-control query used by change detection.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ChangeSource: Send + Sync {
    /// Paths changed relative to `baseline`, or `None` when no baseline exists
    /// (no repository, no commits, git not installed).
    fn changed_paths(&self, baseline: Baseline) -> Option<BTreeSet<String>>;
}

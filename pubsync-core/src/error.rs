//! Error taxonomy for the publish pipeline.
//!
//! Configuration errors stop a run before (or instead of) any file is processed.
//! Everything else is scoped to the file being published; the orchestrator records
//! it in the report and moves on to the next target.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    /// No API credential was provided.
    #[error("missing API credential: set {0}")]
    MissingCredential(&'static str),

    /// The index document does not exist.
    #[error("index file not found: {}", .0.display())]
    MissingIndex(PathBuf),

    #[error("invalid index file {}: {message}", path.display())]
    InvalidIndex { path: PathBuf, message: String },

    #[error("invalid state file {}: {message}", path.display())]
    InvalidState { path: PathBuf, message: String },

    /// A required external tool (e.g. pandoc) is not installed.
    #[error("required tool `{0}` was not found on PATH")]
    MissingDependency(String),

    #[error("unsupported content format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("no title found in {}", .0.display())]
    MissingTitle(PathBuf),

    #[error("invalid front matter in {}: {message}", path.display())]
    InvalidFrontMatter { path: PathBuf, message: String },

    #[error("conversion of {} failed: {message}", path.display())]
    Conversion { path: PathBuf, message: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote API refused the request, or it could not be reached after all retries.
    #[error("remote rejected request{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    RemoteRejected { status: Option<u16>, message: String },

    /// The remote API answered with success but no usable article id.
    #[error("malformed response from remote: {0}")]
    MalformedResponse(String),

    #[error("failed to write state file {}: {message}", path.display())]
    StateWrite { path: PathBuf, message: String },
}

impl PublishError {
    /// True for errors that indicate a usage or setup problem rather than a problem
    /// with one particular file.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PublishError::MissingCredential(_)
                | PublishError::MissingIndex(_)
                | PublishError::InvalidIndex { .. }
                | PublishError::InvalidState { .. }
                | PublishError::MissingDependency(_)
                | PublishError::UnsupportedFormat(_)
        )
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PublishError {
    PublishError::Io {
        path: path.into(),
        source,
    }
}

//! Pandoc-backed [`Converter`].
//!
//! Each converter owns a temporary working directory for the lifetime of the run. Inputs
//! and converted bodies are staged there and the whole directory is removed on drop,
//! whichever way the run ends.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, error, info};

use crate::contract::{Converter, Dialect};
use crate::error::{io_err, PublishError};

pub const DEFAULT_PANDOC: &str = "pandoc";

pub struct PandocConverter {
    program: PathBuf,
    workdir: TempDir,
}

impl PandocConverter {
    /// Creates the run's working area. `program` is the pandoc executable name or path.
    pub fn new(program: impl Into<PathBuf>) -> Result<Self, PublishError> {
        let workdir = tempfile::Builder::new()
            .prefix("pubsync-")
            .tempdir()
            .map_err(|e| io_err(std::env::temp_dir(), e))?;
        debug!(workdir = %workdir.path().display(), "Created conversion work area");
        Ok(Self {
            program: program.into(),
            workdir,
        })
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    fn source_format(dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::Org => "org",
            Dialect::Markdown => "markdown",
        }
    }
}

impl Converter for PandocConverter {
    fn ensure_available(&self) -> Result<(), PublishError> {
        match which::which(&self.program) {
            Ok(found) => {
                info!(pandoc = %found.display(), "Found document converter");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, program = %self.program.display(), "Document converter not found");
                Err(PublishError::MissingDependency(
                    self.program.display().to_string(),
                ))
            }
        }
    }

    fn to_markdown(
        &self,
        path: &Path,
        dialect: Dialect,
        source: &str,
    ) -> Result<String, PublishError> {
        let conversion_err = |message: String| PublishError::Conversion {
            path: path.to_path_buf(),
            message,
        };

        let mut input = tempfile::Builder::new()
            .prefix("src-")
            .suffix(&format!(".{}", Self::source_format(dialect)))
            .tempfile_in(self.workdir.path())
            .map_err(|e| io_err(self.workdir.path(), e))?;
        input
            .write_all(source.as_bytes())
            .map_err(|e| io_err(input.path(), e))?;
        let output = input.path().with_extension("md");

        let result = Command::new(&self.program)
            .arg("--from")
            .arg(Self::source_format(dialect))
            .arg("--to")
            .arg("gfm")
            .arg("--wrap=none")
            .arg("--output")
            .arg(&output)
            .arg(input.path())
            .output();

        match result {
            Ok(out) if out.status.success() => {
                let body = std::fs::read_to_string(&output).map_err(|e| io_err(&output, e))?;
                debug!(path = %path.display(), body_len = body.len(), "Converted document to markdown");
                Ok(body)
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
                error!(path = %path.display(), status = %out.status, stderr = %stderr, "pandoc exited with non-zero code");
                Err(conversion_err(format!("pandoc exited with {}: {stderr}", out.status)))
            }
            Err(e) => {
                error!(error = ?e, path = %path.display(), "Failed to launch pandoc");
                Err(conversion_err(format!("failed to launch pandoc: {e}")))
            }
        }
    }
}

//! Publish state: which remote article each local file maps to.
//!
//! Persisted as a pretty-printed JSON document meant to be committed next to the content:
//!
//! ```json
//! { "files": { "posts/hello.md": { "article_id": 42, "url": "...", "published_at": "..." } } }
//! ```
//!
//! Every [`StateStore::set`] is written straight to disk (`.tmp` + rename). Nothing is
//! buffered across files. The store never creates the file until the first write, so a
//! dry run leaves the tree untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PublishError;

/// One file's link to its remote article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRecord {
    pub article_id: u64,
    pub url: String,
    pub published_at: DateTime<Utc>,
}

/// On-disk shape. `null` entries are tolerated and read as "never published".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub files: BTreeMap<String, Option<PublishRecord>>,
}

#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: StateFile,
}

impl StateStore {
    /// Loads the store from `path`, or starts empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PublishError> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "State file absent, starting empty");
            return Ok(Self {
                path,
                state: StateFile::default(),
            });
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| PublishError::InvalidState {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let state = if contents.trim().is_empty() {
            StateFile::default()
        } else {
            serde_json::from_str(&contents).map_err(|e| PublishError::InvalidState {
                path: path.clone(),
                message: e.to_string(),
            })?
        };
        info!(path = %path.display(), entries = state.files.len(), "Loaded publish state");
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The remote article id for `file`, if it was ever published.
    pub fn get(&self, file: &str) -> Option<u64> {
        self.record(file).map(|r| r.article_id)
    }

    pub fn record(&self, file: &str) -> Option<&PublishRecord> {
        self.state.files.get(file).and_then(Option::as_ref)
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, &PublishRecord)> {
        self.state
            .files
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|r| (k.as_str(), r)))
    }

    /// Records a confirmed publish and writes the whole document to disk.
    pub fn set(
        &mut self,
        file: &str,
        article_id: u64,
        url: &str,
        published_at: DateTime<Utc>,
    ) -> Result<(), PublishError> {
        self.state.files.insert(
            file.to_string(),
            Some(PublishRecord {
                article_id,
                url: url.to_string(),
                published_at,
            }),
        );
        self.save()
    }

    fn save(&self) -> Result<(), PublishError> {
        let write_err = |message: String| PublishError::StateWrite {
            path: self.path.clone(),
            message,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| write_err(e.to_string()))?;
        }

        let mut json =
            serde_json::to_string_pretty(&self.state).map_err(|e| write_err(e.to_string()))?;
        json.push('\n');

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json).map_err(|e| write_err(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| write_err(e.to_string()))?;
        debug!(path = %self.path.display(), "Publish state written");
        Ok(())
    }
}

//! High-level pipeline: select → extract → build → upsert → record.
//!
//! For every selected file the pipeline runs to completion before the next one starts:
//!
//! 1. read the file and extract its metadata ([`extract`])
//! 2. normalize tags and build the request ([`payload::build`])
//! 3. look up the file's article id in the [`StateStore`]
//! 4. create or update the remote article ([`Publisher`])
//! 5. record the confirmed id/url in the state file
//!
//! A failure in any step abandons that file only and is kept in the [`PublishReport`].
//! Configuration problems (unsupported format among explicitly named files, missing
//! converter) and a missing title in a single-file run stop the whole run instead.
//!
//! State is written only after the remote confirmed the article, and always when it did.
//! A process killed between the two leaves an orphaned remote article; that gap is not
//! papered over with a write-before-call.

use std::fmt;
use std::path::Path;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::{Baseline, PublishOptions};
use crate::contract::{ChangeSource, Converter, Dialect, Publisher, RemoteArticle};
use crate::detect::{self, SelectionMode};
use crate::error::PublishError;
use crate::extract;
use crate::payload::{self, ArticlePayload};
use crate::state::{PublishRecord, StateStore};

/// The external collaborators one run talks to.
pub struct Collaborators<'a> {
    pub publisher: &'a dyn Publisher,
    pub converter: &'a dyn Converter,
    pub changes: &'a dyn ChangeSource,
}

/// What a dry run would have done with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedAction {
    Create,
    Update(u64),
}

#[derive(Debug)]
pub enum FileStatus {
    Created { article_id: u64, url: String },
    Updated { article_id: u64, url: String },
    DryRun {
        action: PlannedAction,
        payload: ArticlePayload,
    },
    Failed(PublishError),
}

#[derive(Debug)]
pub struct FileOutcome {
    pub path: String,
    pub status: FileStatus,
}

#[derive(Debug, Default)]
pub struct PublishReport {
    pub outcomes: Vec<FileOutcome>,
}

impl PublishReport {
    /// Files whose remote article was created or updated in this run.
    pub fn published(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, FileStatus::Created { .. } | FileStatus::Updated { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, FileStatus::Failed(_)))
            .count()
    }

    /// Files a dry run would have created or updated.
    pub fn planned(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, FileStatus::DryRun { .. }))
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let published = self.published();
        let failed = self.failed();
        let planned = self.planned();
        write!(f, "Published {published} file(s)")?;
        if planned > 0 {
            write!(f, ", {planned} planned (dry run)")?;
        }
        if failed > 0 {
            write!(f, ", {failed} failed")?;
        }
        if published == 0 && failed == 0 && planned == 0 {
            write!(
                f,
                ". Nothing to publish; use --force or pass files directly to publish unchanged files"
            )?;
        }
        Ok(())
    }
}

/// Runs the publish pipeline over the files chosen by `mode`.
///
/// `indexed` is ignored for [`SelectionMode::ExplicitFiles`]. Returns `Err` only for
/// whole-run fatal conditions; per-file failures are in the report.
pub async fn synchronise(
    options: &PublishOptions,
    mode: &SelectionMode,
    indexed: &[String],
    services: &Collaborators<'_>,
    state: &mut StateStore,
) -> Result<PublishReport, PublishError> {
    info!(dry_run = options.dry_run, ?mode, "[SYNC] Starting publish pipeline");

    let targets = detect::select(indexed, mode, services.changes, options.strict_paths);
    let explicit = matches!(mode, SelectionMode::ExplicitFiles(_));
    let single_file = explicit && targets.len() == 1;

    if explicit {
        if let Some(bad) = targets.iter().find(|t| Dialect::from_path(Path::new(t)).is_none()) {
            error!(path = %bad, "[SYNC][ERROR] Unsupported content format");
            return Err(PublishError::UnsupportedFormat(bad.into()));
        }
    }

    if targets
        .iter()
        .any(|t| Dialect::from_path(Path::new(t)) == Some(Dialect::Org))
    {
        services.converter.ensure_available()?;
    }

    let mut report = PublishReport::default();
    for path in &targets {
        info!(path = %path, "[SYNC] Processing file");
        let status = match publish_one(path, options, services, state).await {
            Ok(status) => status,
            Err(e @ PublishError::MissingTitle(_)) if single_file => {
                error!(path = %path, error = %e, "[SYNC][ERROR] Aborting single-file run");
                return Err(e);
            }
            Err(e) => {
                error!(path = %path, error = %e, "[SYNC][ERROR] File not published");
                FileStatus::Failed(e)
            }
        };
        report.outcomes.push(FileOutcome {
            path: path.clone(),
            status,
        });
    }

    info!(
        selected = targets.len(),
        published = report.published(),
        failed = report.failed(),
        "[SYNC] Publish pipeline finished"
    );
    Ok(report)
}

async fn publish_one(
    path: &str,
    options: &PublishOptions,
    services: &Collaborators<'_>,
    state: &mut StateStore,
) -> Result<FileStatus, PublishError> {
    let file = extract::load(&options.root, path)?;
    let metadata = extract::extract(&file, services.converter)?;
    let published = !(options.draft_override || metadata.draft);
    let payload = payload::build(&metadata, published);
    debug!(path, tags = ?payload.article.tags, published, "Built article payload");

    let existing = state.get(path);

    if options.dry_run {
        let action = existing.map_or(PlannedAction::Create, PlannedAction::Update);
        info!(path, ?action, "[SYNC][DRY-RUN] Skipping remote call and state write");
        return Ok(FileStatus::DryRun { action, payload });
    }

    let (remote, article_id) = match existing {
        Some(id) => {
            let remote = services.publisher.update(id, &payload).await?;
            if remote.id != id {
                warn!(path, stored = id, returned = remote.id, "Remote returned a different article id on update, keeping stored id");
            }
            (remote, id)
        }
        None => {
            let remote = services.publisher.create(&payload).await?;
            let id = remote.id;
            (remote, id)
        }
    };

    record(state, path, article_id, &remote)?;

    let url = remote.url;
    Ok(match existing {
        Some(_) => FileStatus::Updated { article_id, url },
        None => FileStatus::Created { article_id, url },
    })
}

/// Persists a confirmed publish. Called unconditionally once the remote call succeeded.
fn record(
    state: &mut StateStore,
    path: &str,
    article_id: u64,
    remote: &RemoteArticle,
) -> Result<(), PublishError> {
    state
        .set(path, article_id, &remote.url, Utc::now())
        .map_err(|e| {
            error!(
                path,
                article_id,
                url = %remote.url,
                error = %e,
                "[SYNC][ERROR] Remote article published but state could not be recorded"
            );
            match e {
                PublishError::StateWrite { path: state_path, message } => PublishError::StateWrite {
                    path: state_path,
                    message: format!(
                        "{message}; article {article_id} ({}) is live but unrecorded, add it to the state file by hand",
                        remote.url
                    ),
                },
                other => other,
            }
        })?;
    info!(path, article_id, url = %remote.url, "[SYNC] Recorded publish state");
    Ok(())
}

/// One row of the read-only status view.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub path: String,
    /// `None` when there is no baseline to compare against.
    pub changed: Option<bool>,
    pub record: Option<PublishRecord>,
}

/// Reports, for every indexed file, whether it changed and what it is linked to.
pub fn status(
    indexed: &[String],
    baseline: Baseline,
    changes: &dyn ChangeSource,
    strict_paths: bool,
    state: &StateStore,
) -> Vec<StatusEntry> {
    let changed = changes
        .changed_paths(baseline)
        .map(|set| detect::match_changed(indexed, &set, strict_paths));
    indexed
        .iter()
        .map(|raw| {
            let path = detect::normalize_path(raw);
            StatusEntry {
                changed: changed.as_ref().map(|c| c.contains(&path)),
                record: state.record(&path).cloned(),
                path,
            }
        })
        .collect()
}

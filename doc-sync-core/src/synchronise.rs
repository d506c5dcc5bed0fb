//! Run executor: applies a planned [`DiffSet`] to the destination tree.
//!
//! A run goes through these steps:
//! 1. plan every entry with [`FileOperationPlanner`];
//! 2. execute direct operations (remove, move, plain copy) in plan order;
//! 3. submit the upserts that need new content to the
//!    [`TranslationOrchestrator`], bounded by the configured concurrency;
//! 4. re-key every outcome to its diff entry and, on a clean run, write the
//!    revision record.
//!
//! Per-entry failures never abort the run; they are collected in the
//! [`SynchroniseReport`]. Only configuration problems and the revision
//! record write are fatal ([`SyncError`]).

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::contract::CompletionProvider;
use crate::diff::{DiffEntry, DiffSet};
use crate::error::{JobError, SyncError};
use crate::gate::ConcurrencyGate;
use crate::persist;
use crate::plan::{FileOperation, FileOperationPlanner};
use crate::transform::MarkdownTransformer;
use crate::translate::{Instructions, TranslatedFile, TranslationJob, TranslationOrchestrator};

/// What a successful operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Removed,
    Moved,
    Copied,
    Translated(TranslatedFile),
}

#[derive(Debug)]
pub struct OperationReport {
    /// `None` when the entry could not be planned at all.
    pub operation: Option<FileOperation>,
    pub outcome: Result<Applied, JobError>,
}

#[derive(Debug)]
pub struct EntryReport {
    /// Position of the entry in the change-list.
    pub index: usize,
    pub entry: DiffEntry,
    pub operations: Vec<OperationReport>,
}

impl EntryReport {
    pub fn is_success(&self) -> bool {
        self.operations.iter().all(|op| op.outcome.is_ok())
    }
}

#[derive(Debug)]
pub struct SynchroniseReport {
    pub run_id: Uuid,
    /// One report per diff entry, in change-list order.
    pub entries: Vec<EntryReport>,
    pub revision_written: bool,
}

impl SynchroniseReport {
    pub fn is_success(&self) -> bool {
        self.entries.iter().all(EntryReport::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobError> {
        self.entries
            .iter()
            .flat_map(|e| e.operations.iter())
            .filter_map(|op| op.outcome.as_ref().err())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn translated_count(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|e| e.operations.iter())
            .filter(|op| matches!(op.outcome, Ok(Applied::Translated(_))))
            .count()
    }
}

/// Persisted after a clean run so the next run knows which reference revision
/// the destination reflects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionRecord {
    pub submodule: Option<String>,
    pub previous: Option<String>,
    pub current: String,
}

/// Applies `set` to `config.dest_dir`.
///
/// `language` overrides `config.language`; with neither set every upsert is a
/// plain copy and `provider` is never called.
pub async fn synchronise<P>(
    config: &SyncConfig,
    set: &DiffSet,
    language: Option<&str>,
    provider: P,
) -> Result<SynchroniseReport, SyncError>
where
    P: CompletionProvider,
{
    let run_id = Uuid::new_v4();
    let span = info_span!("sync", run_id = %run_id);
    run(config, set, language, provider, run_id).instrument(span).await
}

async fn run<P>(
    config: &SyncConfig,
    set: &DiffSet,
    language: Option<&str>,
    provider: P,
    run_id: Uuid,
) -> Result<SynchroniseReport, SyncError>
where
    P: CompletionProvider,
{
    let language = language.or(config.language.as_deref());
    info!(
        entries = set.entries.len(),
        language = language.unwrap_or("none"),
        repository = set.repository.as_deref().unwrap_or("unknown"),
        "Starting synchronisation"
    );

    // Configuration problems surface before the destination tree is touched.
    let gate = ConcurrencyGate::new(config.concurrency)?;
    let orchestrator = match language {
        Some(language) => {
            let instructions = Instructions::load(&config.provider, language)?;
            instructions.for_language(language)?;
            let orchestrator =
                TranslationOrchestrator::new(provider, gate, instructions, &config.provider)?;
            Some(if config.transform.enabled {
                orchestrator.with_transformer(MarkdownTransformer::new(&config.transform)?)
            } else {
                orchestrator
            })
        }
        None => None,
    };

    let planned = FileOperationPlanner::new(config.move_similarity_threshold).plan(set);

    let mut entries = Vec::with_capacity(planned.len());
    // (position in `entries`, upsert) for every queued translation, in plan order.
    let mut queued: Vec<(usize, FileOperation)> = Vec::new();
    let mut jobs = Vec::new();

    for planned_entry in planned {
        let mut report = EntryReport {
            index: planned_entry.index,
            entry: planned_entry.entry,
            operations: Vec::new(),
        };
        match planned_entry.operations {
            Err(unsupported) => report.operations.push(OperationReport {
                operation: None,
                outcome: Err(unsupported.into()),
            }),
            Ok(operations) => {
                for operation in operations {
                    let translate_into = match &operation {
                        FileOperation::Upsert { path }
                            if orchestrator.is_some() && config.needs_translation(path) =>
                        {
                            language.map(|language| TranslationJob {
                                source: resolve(&config.source_dir, path),
                                destination: resolve(&config.dest_dir, path),
                                language: language.to_string(),
                            })
                        }
                        _ => None,
                    };
                    if let Some(job) = translate_into {
                        jobs.push(job);
                        queued.push((entries.len(), operation));
                        continue;
                    }
                    let outcome = apply_direct(config, &operation).await;
                    if let Err(e) = &outcome {
                        error!(index = report.index, operation = %operation, error = %e, "File operation failed");
                    }
                    report.operations.push(OperationReport {
                        operation: Some(operation),
                        outcome,
                    });
                }
            }
        }
        entries.push(report);
    }

    if let Some(orchestrator) = &orchestrator {
        if !jobs.is_empty() {
            let outcomes = orchestrator.translate_all(jobs).await;
            // An entry holds at most one upsert and it is always its last operation.
            for ((position, operation), outcome) in queued.into_iter().zip(outcomes) {
                entries[position].operations.push(OperationReport {
                    operation: Some(operation),
                    outcome: outcome.map(Applied::Translated),
                });
            }
        }
    }

    let mut report = SynchroniseReport {
        run_id,
        entries,
        revision_written: false,
    };

    if report.is_success() {
        if let (Some(path), Some(revision)) = (&config.revision_file, &set.revision) {
            let record = RevisionRecord {
                submodule: set.repository.clone(),
                previous: revision.previous.clone(),
                current: revision.current.clone(),
            };
            write_revision_record(path, &record).await?;
            report.revision_written = true;
        }
    }

    info!(
        entries = report.entries.len(),
        translated = report.translated_count(),
        failed = report.failure_count(),
        revision_written = report.revision_written,
        "Synchronisation finished"
    );
    Ok(report)
}

async fn apply_direct(config: &SyncConfig, operation: &FileOperation) -> Result<Applied, JobError> {
    match operation {
        FileOperation::Remove { path } => {
            persist::remove_idempotent(&resolve(&config.dest_dir, path)).await?;
            Ok(Applied::Removed)
        }
        FileOperation::Move { from, to } => {
            persist::move_file(&resolve(&config.dest_dir, from), &resolve(&config.dest_dir, to))
                .await?;
            Ok(Applied::Moved)
        }
        FileOperation::Upsert { path } => {
            persist::copy_file(&resolve(&config.source_dir, path), &resolve(&config.dest_dir, path))
                .await?;
            Ok(Applied::Copied)
        }
    }
}

fn resolve(root: &Path, path: &str) -> PathBuf {
    root.join(path)
}

async fn write_revision_record(path: &Path, record: &RevisionRecord) -> Result<(), SyncError> {
    let fail = |source| SyncError::Revision {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_vec_pretty(record).map_err(|e| fail(e.into()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }
    tokio::fs::write(path, json).await.map_err(fail)?;
    info!(path = %path.display(), current = %record.current, "Wrote revision record");
    Ok(())
}

//! Classifies diff entries into concrete file operations. No I/O happens here.

use tracing::{error, info};

use crate::diff::{DiffEntry, DiffSet};
use crate::error::UnsupportedOperationError;

/// A concrete, idempotent action against the destination tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOperation {
    /// (Re)create the file from the reference tree.
    Upsert { path: String },
    /// Delete the file from the destination tree.
    Remove { path: String },
    /// Rename in place; content is not read.
    Move { from: String, to: String },
}

impl FileOperation {
    /// Path this operation produces or removes in the destination tree.
    pub fn target(&self) -> &str {
        match self {
            FileOperation::Upsert { path } | FileOperation::Remove { path } => path,
            FileOperation::Move { to, .. } => to,
        }
    }
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Upsert { path } => write!(f, "upsert {path}"),
            FileOperation::Remove { path } => write!(f, "remove {path}"),
            FileOperation::Move { from, to } => write!(f, "move {from} -> {to}"),
        }
    }
}

/// The planning result for one diff entry, tagged with its position in the change-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub index: usize,
    pub entry: DiffEntry,
    pub operations: Result<Vec<FileOperation>, UnsupportedOperationError>,
}

/// Maps [`DiffEntry`] values to [`FileOperation`]s.
///
/// A rename or copy becomes a [`FileOperation::Move`] only when its similarity
/// score reaches `move_similarity_threshold`; otherwise it lowers to a remove of
/// the old path followed by an upsert of the new one. With no threshold every
/// rename is rewritten from scratch.
#[derive(Debug, Clone)]
pub struct FileOperationPlanner {
    move_similarity_threshold: Option<u8>,
}

impl Default for FileOperationPlanner {
    fn default() -> Self {
        Self::new(Some(100))
    }
}

impl FileOperationPlanner {
    pub fn new(move_similarity_threshold: Option<u8>) -> Self {
        Self {
            move_similarity_threshold,
        }
    }

    pub fn plan_entry(
        &self,
        entry: &DiffEntry,
    ) -> Result<Vec<FileOperation>, UnsupportedOperationError> {
        match entry {
            DiffEntry::Added { path } | DiffEntry::Modified { path } => {
                Ok(vec![FileOperation::Upsert { path: path.clone() }])
            }
            DiffEntry::Deleted { path } => Ok(vec![FileOperation::Remove { path: path.clone() }]),
            DiffEntry::Renamed { from, to, score } | DiffEntry::Copied { from, to, score } => {
                if self.is_pure_move(*score) {
                    Ok(vec![FileOperation::Move {
                        from: from.clone(),
                        to: to.clone(),
                    }])
                } else {
                    Ok(vec![
                        FileOperation::Remove { path: from.clone() },
                        FileOperation::Upsert { path: to.clone() },
                    ])
                }
            }
            DiffEntry::Opaque { status, raw } => Err(UnsupportedOperationError {
                status: status.clone(),
                raw: raw.clone(),
            }),
        }
    }

    /// Plans every entry of `set`, keeping change-list order. Unsupported
    /// entries are reported in place rather than dropped.
    pub fn plan(&self, set: &DiffSet) -> Vec<PlannedEntry> {
        let planned: Vec<PlannedEntry> = set
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let operations = self.plan_entry(entry);
                if let Err(e) = &operations {
                    error!(index, status = %e.status, raw = %e.raw, "Unsupported diff status reached the planner");
                }
                PlannedEntry {
                    index,
                    entry: entry.clone(),
                    operations,
                }
            })
            .collect();
        info!(
            entries = planned.len(),
            unsupported = planned.iter().filter(|p| p.operations.is_err()).count(),
            "Planned file operations"
        );
        planned
    }

    fn is_pure_move(&self, score: Option<u8>) -> bool {
        match (self.move_similarity_threshold, score) {
            (Some(threshold), Some(score)) => score >= threshold,
            _ => false,
        }
    }
}

//! Destination tree mutations. Every function creates missing parent directories
//! and reports failures as [`JobError::Io`] carrying the offending path.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::JobError;

async fn ensure_parent(path: &Path) -> Result<(), JobError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| JobError::io("create directory for", parent, e))?;
    }
    Ok(())
}

/// Replaces `path` with `content` through a temporary sibling file, so readers
/// never observe a half-written file.
pub async fn write_atomic(path: &Path, content: Vec<u8>) -> Result<(), JobError> {
    ensure_parent(path).await?;
    let target: PathBuf = path.to_path_buf();
    let len = content.len();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = target.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&content)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| JobError::io("write", path, std::io::Error::new(std::io::ErrorKind::Other, e)))?
    .map_err(|e| JobError::io("write", path, e))?;
    debug!(path = %path.display(), bytes = len, "Wrote file");
    Ok(())
}

/// Deletes `path`. A file that is already gone counts as removed.
pub async fn remove_idempotent(path: &Path) -> Result<(), JobError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "File to remove was already absent");
            Ok(())
        }
        Err(e) => Err(JobError::io("remove", path, e)),
    }
}

pub async fn move_file(from: &Path, to: &Path) -> Result<(), JobError> {
    ensure_parent(to).await?;
    tokio::fs::rename(from, to)
        .await
        .map_err(|e| JobError::io("move", from, e))?;
    debug!(from = %from.display(), to = %to.display(), "Moved file");
    Ok(())
}

pub async fn copy_file(from: &Path, to: &Path) -> Result<(), JobError> {
    let content = tokio::fs::read(from)
        .await
        .map_err(|e| JobError::io("read", from, e))?;
    write_atomic(to, content).await
}

//! Checkpoint traversal: deciding which suffix of a directory's files a
//! fresh environment must replay.

use crate::error::{EngineError, Result};
use crate::file::File;

/// Filter `files` down to those tagged as checkpoints, preserving order.
pub fn checkpoint_files(files: &[File]) -> Vec<File> {
    files.iter().filter(|f| f.is_checkpoint()).cloned().collect()
}

/// Find the last file named `name` that is also a checkpoint, and return the
/// slice from that point to the end (inclusive).
pub fn files_from_checkpoint(files: &[File], name: &str) -> Result<Vec<File>> {
    let idx = files
        .iter()
        .enumerate()
        .rev()
        .find(|(_, f)| f.name() == name && f.is_checkpoint())
        .map(|(idx, _)| idx)
        .ok_or_else(|| EngineError::CheckpointNotFound {
            name: name.to_string(),
        })?;

    Ok(files[idx..].to_vec())
}

/// The minimal suffix a fresh database must execute: everything from (and
/// including) the most recent checkpoint, or the whole list if there are no
/// checkpoints, or if the directory doesn't support them at all.
///
/// `supports_checkpoints` models §9's capability check — callers backed by a
/// directory that isn't a `CheckpointDir` pass `false` and get the full list
/// back unconditionally.
pub fn files_from_last_checkpoint(files: &[File], supports_checkpoints: bool) -> Result<Vec<File>> {
    if !supports_checkpoints {
        return Ok(files.to_vec());
    }

    let checkpoints = checkpoint_files(files);
    match checkpoints.last() {
        None => Ok(files.to_vec()),
        Some(last) => files_from_checkpoint(files, last.name()),
    }
}

/// Remove checkpoint files, keeping only the incremental migrations.
pub fn skip_checkpoint_files(files: &[File]) -> Vec<File> {
    files.iter().filter(|f| !f.is_checkpoint()).cloned().collect()
}

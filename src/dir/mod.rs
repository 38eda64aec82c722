//! The `Dir`/`CheckpointDir` capability contract, shared by every backend.
//!
//! `Dir` and `CheckpointDir` are capability sets, not a class hierarchy:
//! [`supports_checkpoints`] is the one sanctioned downcast, implemented via
//! [`Dir::as_checkpoint_dir`] rather than `Any`-based type inspection.

pub mod archive;
pub mod local;
pub mod memory;
pub mod registry;

pub use archive::{archive, unarchive};
pub use local::LocalDir;
pub use memory::MemoryDir;
pub use registry::NamedRegistry;

use crate::checkpoint;
use crate::constants::HASH_FILE_NAME;
use crate::error::{EngineError, Result};
use crate::file::File;
use crate::manifest::{self, Manifest};

/// The uniform contract every directory backend satisfies.
pub trait Dir: std::fmt::Debug {
    /// Read one entry's bytes, or [`EngineError::NotFound`] if it doesn't
    /// exist.
    fn open(&self, name: &str) -> Result<Vec<u8>>;

    /// Create or overwrite `name` with `bytes`.
    fn write_file(&mut self, name: &str, bytes: Vec<u8>) -> Result<()>;

    /// Every `.sql` entry, ordered by ascending name (byte-lexicographic).
    fn files(&self) -> Result<Vec<File>>;

    /// Compute the manifest for the current file set; equivalent to
    /// `build_manifest(files())`.
    fn checksum(&self) -> Result<Manifest> {
        Ok(manifest::build_manifest(&self.files()?))
    }

    /// Downcast to [`CheckpointDir`] when this backend supports it. The
    /// default (`None`) means "no", matching any `Dir` that hasn't opted in.
    fn as_checkpoint_dir(&self) -> Option<&dyn CheckpointDir> {
        None
    }
}

/// The additional capability of a directory that can persist checkpoint
/// files and answer checkpoint-relative traversal queries.
pub trait CheckpointDir: Dir {
    /// Write `bytes` as `name`, tagging it as a checkpoint (prepending an
    /// `atlas:checkpoint` directive if the bytes don't already carry one).
    fn write_checkpoint(&mut self, name: &str, bytes: Vec<u8>, tag: Option<&str>) -> Result<()>;
}

/// Whether `dir` supports the [`CheckpointDir`] capability.
pub fn supports_checkpoints(dir: &dyn Dir) -> bool {
    dir.as_checkpoint_dir().is_some()
}

/// Read `atlas.sum` (if present) and validate it against the directory's
/// live files, producing a structured mismatch on divergence.
pub fn validate(dir: &dyn Dir) -> Result<()> {
    let stored = match dir.open(HASH_FILE_NAME) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(EngineError::NotFound(_)) => None,
        Err(other) => return Err(other),
    };
    let files = dir.files()?;
    manifest::validate(stored.as_deref(), &files)
}

/// Recompute the manifest from the directory's live files and persist it as
/// `atlas.sum`, replacing whatever was there before.
pub fn write_manifest(dir: &mut dyn Dir) -> Result<()> {
    let files = dir.files()?;
    let computed = manifest::build_manifest(&files);
    dir.write_file(HASH_FILE_NAME, computed.marshal().into_bytes())
}

/// Every checkpoint file in `dir`, in order.
pub fn checkpoint_files(dir: &dyn Dir) -> Result<Vec<File>> {
    Ok(checkpoint::checkpoint_files(&dir.files()?))
}

/// The minimal suffix of files a fresh environment must execute: from the
/// most recent checkpoint onward, or everything if `dir` doesn't support
/// checkpoints or has none.
pub fn files_from_last_checkpoint(dir: &dyn Dir) -> Result<Vec<File>> {
    let files = dir.files()?;
    checkpoint::files_from_last_checkpoint(&files, supports_checkpoints(dir))
}

/// Copy `files` into `dir`, writing each one, then recomputing and writing
/// the manifest. If a write fails partway through, every prior file is left
/// persisted and `atlas.sum` is left untouched (not yet recomputed).
pub fn copy_files(dir: &mut dyn Dir, files: &[File]) -> Result<()> {
    for file in files {
        dir.write_file(file.name(), file.bytes().to_vec())?;
    }
    write_manifest(dir)
}

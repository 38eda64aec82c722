//! The in-memory backend: a name-to-`File` map with optional write-through
//! sinks, usable standalone or as the landing spot for [`crate::dir::archive::unarchive`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::constants::{DIRECTIVE_CHECKPOINT, SQL_EXTENSION};
use crate::dir::{CheckpointDir, Dir};
use crate::error::{EngineError, Result};
use crate::file::File;

/// A write-through callback invoked synchronously on every `write_file`.
/// Sinks already invoked before a failing one retain their effects — that's
/// documented behavior, not a bug to paper over with a rollback.
pub type SyncSink = Box<dyn Fn(&str, &[u8]) -> Result<()> + Send + Sync>;

/// A directory held entirely in memory.
pub struct MemoryDir {
    files: BTreeMap<String, Vec<u8>>,
    sinks: Vec<SyncSink>,
    /// Purely cosmetic label, e.g. for display in a CLI; no semantic effect.
    path: Option<String>,
}

impl std::fmt::Debug for MemoryDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDir")
            .field("path", &self.path)
            .field("entries", &self.files.keys().collect::<Vec<_>>())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Default for MemoryDir {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDir {
    /// An empty in-memory directory with no display label.
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            sinks: Vec::new(),
            path: None,
        }
    }

    /// An empty in-memory directory carrying a cosmetic path label.
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::new()
        }
    }

    /// The cosmetic path label, if any.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Register a write-through sink. Append-only: there is no removal API,
    /// matching the contract's observer-list model.
    pub fn add_sync_sink(&mut self, sink: SyncSink) {
        self.sinks.push(sink);
    }

    /// Write every file in `files`, then recompute and write `atlas.sum`.
    pub fn copy_files(&mut self, files: &[File]) -> Result<()> {
        crate::dir::copy_files(self, files)
    }
}

impl Dir for MemoryDir {
    fn open(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(name.into()))
    }

    fn write_file(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        debug!(name, sinks = self.sinks.len(), "writing in-memory file");
        for sink in &self.sinks {
            sink(name, &bytes)?;
        }
        self.files.insert(name.to_string(), bytes);
        Ok(())
    }

    fn files(&self) -> Result<Vec<File>> {
        Ok(self
            .files
            .iter()
            .filter(|(name, _)| name.ends_with(&format!(".{SQL_EXTENSION}")))
            .map(|(name, bytes)| File::new(name.clone(), bytes.clone()))
            .collect())
    }

    fn as_checkpoint_dir(&self) -> Option<&dyn CheckpointDir> {
        Some(self)
    }
}

impl CheckpointDir for MemoryDir {
    fn write_checkpoint(&mut self, name: &str, bytes: Vec<u8>, tag: Option<&str>) -> Result<()> {
        let already_tagged = crate::directive::header_directives(
            &String::from_utf8_lossy(&bytes),
            DIRECTIVE_CHECKPOINT,
        )
        .first()
        .is_some();

        let bytes = if already_tagged {
            bytes
        } else {
            let args: Vec<&str> = tag.into_iter().collect();
            crate::directive::prepend(&bytes, DIRECTIVE_CHECKPOINT, &args)
        };

        self.write_file(name, bytes)
    }
}

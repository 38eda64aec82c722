//! The engine's unified error type.
//!
//! Every fallible public function returns [`Result<T>`], a crate-level alias
//! over [`EngineError`]. Unlike an `anyhow`-based call chain, each named
//! failure category from the manifest/checkpoint contract is its own variant
//! so a downstream caller (a CLI, a test) can `match` on it instead of
//! re-parsing a message string.

use std::path::PathBuf;

use crate::constants::VERSION_LAYOUT;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Why a stored manifest entry no longer matches the live directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MismatchReason {
    /// The stored file no longer appears anywhere in the live directory.
    Removed,
    /// The stored file is still at the same position but its hash changed.
    Edited,
    /// A file appears in the live directory that wasn't in the stored manifest.
    Added,
}

impl std::fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MismatchReason::Removed => "removed",
            MismatchReason::Edited => "edited",
            MismatchReason::Added => "added",
        };
        f.write_str(s)
    }
}

/// Structured diagnostic for a manifest/directory mismatch, precise enough
/// for a caller to render a pointer-under-offset error against `atlas.sum`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChecksumMismatch {
    /// The offending file's name (the stored name, unless `reason == Added`).
    pub file: String,
    /// 1-indexed line in the sum file where the divergence appears.
    pub line: usize,
    /// Byte offset into the sum file where the divergence begins.
    pub pos: usize,
    /// What kind of divergence this is.
    pub reason: MismatchReason,
}

impl std::fmt::Display for ChecksumMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "checksum mismatch: file {:?} {} (atlas.sum:{}:{})",
            self.file, self.reason, self.line, self.pos
        )
    }
}

/// The engine's unified failure type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `checkpoint_tag` (or any checkpoint-only accessor) called on a file
    /// whose header has no `atlas:checkpoint` directive.
    #[error("file {file:?} is not a checkpoint")]
    NotCheckpoint { file: String },

    /// `files_from_checkpoint` was asked for a name that either doesn't
    /// exist or isn't tagged as a checkpoint.
    #[error("no checkpoint named {name:?} in directory")]
    CheckpointNotFound { name: String },

    /// A manifest line did not split into exactly `name h1:hash`.
    #[error("malformed atlas.sum at line {line}: {detail}")]
    ChecksumFormat { line: usize, detail: String },

    /// The live directory's summary hash does not match the stored one.
    #[error("{0}")]
    ChecksumMismatch(#[from] Box<ChecksumMismatch>),

    /// `atlas.sum` is missing but the directory is non-empty.
    #[error("atlas.sum not found")]
    ChecksumNotFound,

    /// A version string does not parse as `YYYYMMDDhhmmss`.
    #[error("invalid version {value:?}, expected format {expected}")]
    InvalidVersion {
        value: String,
        expected: &'static str,
    },

    /// The named in-memory registry refuses to close a directory that is
    /// still registered under more than one name.
    #[error("directory {name:?} is registered under multiple names")]
    MultiNamedDirectory { name: String },

    /// A tar stream is structurally invalid (corrupt header, non-UTF-8 entry
    /// name) and cannot be unpacked into a directory.
    #[error("malformed archive: {0}")]
    Archive(String),

    /// A `Plan` could not be rendered: a directive line failed to parse, or
    /// the delimiter directive was specified more than once.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// The requested entry does not exist in the directory.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Propagated verbatim from the filesystem or tar layer.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Propagated verbatim from JSON (de)serialization of a manifest, e.g.
    /// for a `--json` output mode in a consuming CLI.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn invalid_version(value: impl Into<String>) -> Self {
        EngineError::InvalidVersion {
            value: value.into(),
            expected: VERSION_LAYOUT,
        }
    }

    pub(crate) fn checksum_mismatch(mismatch: ChecksumMismatch) -> Self {
        EngineError::ChecksumMismatch(Box::new(mismatch))
    }
}

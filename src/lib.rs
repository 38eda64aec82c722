//! A tamper-evident migration directory engine.
//!
//! This crate models a directory of versioned SQL migration files as a
//! pluggable [`dir::Dir`] backend, parses the `atlas:` directive
//! mini-language embedded in their leading comments, maintains a chained
//! integrity manifest (`atlas.sum`) over the directory's contents, and
//! computes which files a fresh environment must replay given the most
//! recent checkpoint.
//!
//! It does not execute SQL, tokenize statements, or talk to a database —
//! those are the concerns of the application consuming this crate's
//! [`file::File`] and [`dir::Dir`] values.

pub mod checkpoint;
pub mod constants;
pub mod dir;
pub mod directive;
pub mod error;
pub mod file;
pub mod manifest;
pub mod plan;
pub mod version;

pub use dir::{CheckpointDir, Dir, LocalDir, MemoryDir, NamedRegistry};
pub use error::{ChecksumMismatch, EngineError, MismatchReason, Result};
pub use file::File;
pub use manifest::{Entry, Manifest};
pub use plan::{Change, Formatter, Plan};

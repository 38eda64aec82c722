//! The local filesystem backend.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::{LOCAL_FILE_MODE, SQL_EXTENSION};
use crate::dir::Dir;
use crate::error::{EngineError, Result};
use crate::file::File;

/// A directory backed by a real path on disk. The path must exist and be a
/// directory at construction time.
#[derive(Debug, Clone)]
pub struct LocalDir {
    path: PathBuf,
}

impl LocalDir {
    /// Open an existing directory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path)?;
        if !metadata.is_dir() {
            return Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a directory", path.display()),
            )));
        }
        Ok(Self { path })
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Write `bytes` to `path` atomically: write to a sibling temp file,
    /// then rename over the destination. A subsequent `open` always sees
    /// either the old bytes or the new ones, never a partial write.
    fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);
        fs::write(&tmp_path, bytes)?;
        set_mode(&tmp_path)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn set_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(LOCAL_FILE_MODE);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path) -> Result<()> {
    Ok(())
}

impl Dir for LocalDir {
    fn open(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.entry_path(name);
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::NotFound(path.clone())
            } else {
                EngineError::Io(e)
            }
        })
    }

    fn write_file(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.entry_path(name);
        debug!(path = %path.display(), "writing local file");
        Self::atomic_write(&path, &bytes)
    }

    fn files(&self) -> Result<Vec<File>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == SQL_EXTENSION)
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
            {
                names.push(name.to_string());
            }
        }
        names.sort();

        let mut files = Vec::with_capacity(names.len());
        for name in names {
            let bytes = fs::read(self.entry_path(&name))?;
            files.push(File::new(name, bytes));
        }
        Ok(files)
    }
}

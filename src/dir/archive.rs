//! Tar packing/unpacking: turn a directory into a portable byte stream and
//! back.

use std::io::Read;

use tracing::debug;

use crate::constants::{HASH_FILE_NAME, TAR_ENTRY_MODE};
use crate::dir::{Dir, MemoryDir};
use crate::error::{EngineError, Result};

/// Pack `dir` into a tar byte stream: `atlas.sum` first (if present), then
/// every `.sql` entry in `files()` order. Every entry is written with mode
/// `0600` and an exact size; no directory entries, no symlinks.
pub fn archive(dir: &dyn Dir) -> Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());

    if let Ok(sum) = dir.open(HASH_FILE_NAME) {
        debug!(bytes = sum.len(), "archiving atlas.sum");
        append_entry(&mut builder, HASH_FILE_NAME, &sum)?;
    }

    for file in dir.files()? {
        debug!(name = file.name(), bytes = file.bytes().len(), "archiving file");
        append_entry(&mut builder, file.name(), file.bytes())?;
    }

    builder.into_inner().map_err(EngineError::Io)
}

fn append_entry(builder: &mut tar::Builder<Vec<u8>>, name: &str, bytes: &[u8]) -> Result<()> {
    let mut header = tar::Header::new_ustar();
    header.set_path(name).map_err(|e| {
        EngineError::Archive(format!("entry name {name:?} is not representable in ustar: {e}"))
    })?;
    header.set_size(bytes.len() as u64);
    header.set_mode(TAR_ENTRY_MODE);
    header.set_cksum();
    builder.append(&header, bytes)?;
    Ok(())
}

/// Unpack a tar byte stream into a fresh in-memory directory. Entries are
/// written verbatim via `write_file` in the order they appear in the
/// stream; `files()` on the result re-sorts lexicographically regardless of
/// tar order, per contract.
pub fn unarchive(bytes: &[u8]) -> Result<MemoryDir> {
    let mut archive = tar::Archive::new(bytes);
    let mut dir = MemoryDir::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path().map_err(|e| {
            EngineError::Archive(format!("non-UTF-8 entry path: {e}"))
        })?;
        let name = path
            .to_str()
            .ok_or_else(|| EngineError::Archive("non-UTF-8 entry path".to_string()))?
            .to_string();

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        debug!(name, bytes = bytes.len(), "unarchiving entry");
        dir.write_file(&name, bytes)?;
    }

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir::write_manifest;

    #[test]
    fn round_trips_files_and_manifest() {
        let mut dir = MemoryDir::new();
        dir.write_file("20240101000000_a.sql", b"SELECT 1;\n".to_vec()).unwrap();
        dir.write_file("20240102000000_b.sql", b"SELECT 2;\n".to_vec()).unwrap();
        write_manifest(&mut dir).unwrap();

        let packed = archive(&dir).unwrap();
        let unpacked = unarchive(&packed).unwrap();

        assert_eq!(unpacked.files().unwrap(), dir.files().unwrap());
        assert_eq!(
            unpacked.open(HASH_FILE_NAME).unwrap(),
            dir.open(HASH_FILE_NAME).unwrap()
        );
        assert_eq!(unpacked.checksum().unwrap().sum(), dir.checksum().unwrap().sum());
    }

    #[test]
    fn archive_without_manifest_omits_sum_entry() {
        let mut dir = MemoryDir::new();
        dir.write_file("a.sql", b"A".to_vec()).unwrap();

        let packed = archive(&dir).unwrap();
        let unpacked = unarchive(&packed).unwrap();
        assert!(unpacked.open(HASH_FILE_NAME).is_err());
    }

    #[test]
    fn unarchive_rejects_corrupt_stream() {
        let err = unarchive(b"not a tar stream at all, just garbage bytes").unwrap_err();
        assert!(matches!(err, EngineError::Io(_) | EngineError::Archive(_)));
    }

    #[test]
    fn entry_order_in_tar_does_not_determine_files_order() {
        let mut dir = MemoryDir::new();
        dir.write_file("20240102000000_b.sql", b"B".to_vec()).unwrap();
        dir.write_file("20240101000000_a.sql", b"A".to_vec()).unwrap();

        let packed = archive(&dir).unwrap();
        let unpacked = unarchive(&packed).unwrap();
        let names: Vec<_> = unpacked.files().unwrap().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["20240101000000_a.sql", "20240102000000_b.sql"]);
    }
}

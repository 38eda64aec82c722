//! The `atlas.sum` integrity manifest: construction, wire format, and
//! structured mismatch diagnostics.
//!
//! The chained hash construction here is deliberate and should not be
//! "optimized" into independent per-file hashes: each entry's hash encodes
//! both its own content and the entire tail of history before it, which is
//! exactly what lets [`validate`] localize the *first* divergence instead of
//! just reporting "something changed".

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};

use crate::constants::{HASH_TOKEN_LEN, HASH_VERSION};
use crate::error::{ChecksumMismatch, EngineError, MismatchReason, Result};
use crate::file::File;

const HEADER_LINE_LEN: usize = HASH_TOKEN_LEN + 1; // "h1:<sum>\n"

/// A single manifest entry: a file name and its per-file cumulative hash.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Entry {
    pub name: String,
    pub hash: String,
}

/// The parsed/constructed `atlas.sum` contents.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Manifest {
    pub entries: Vec<Entry>,
}

impl Manifest {
    /// The summary hash: SHA-256 over the concatenation, for each entry in
    /// order, of `name || hash`, base64-encoded.
    pub fn sum(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in &self.entries {
            hasher.update(entry.name.as_bytes());
            hasher.update(entry.hash.as_bytes());
        }
        BASE64.encode(hasher.finalize())
    }

    /// Serialize to the `atlas.sum` wire format.
    pub fn marshal(&self) -> String {
        let mut out = format!("{HASH_VERSION}{}\n", self.sum());
        for entry in &self.entries {
            out.push_str(&entry.name);
            out.push(' ');
            out.push_str(HASH_VERSION);
            out.push_str(&entry.hash);
            out.push('\n');
        }
        out
    }

    /// Parse the `atlas.sum` wire format, verifying the stored summary hash
    /// against the one recomputed from the parsed entries.
    pub fn parse(text: &str) -> Result<Manifest> {
        let mut lines = text.lines();

        let header = lines.next().unwrap_or("");
        let expected_sum = header.strip_prefix(HASH_VERSION).ok_or_else(|| {
            EngineError::ChecksumFormat {
                line: 1,
                detail: format!("header line must start with {HASH_VERSION:?}"),
            }
        })?;

        let mut entries = Vec::new();
        for (idx, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_no = idx + 2;
            let parts: Vec<&str> = line.split(HASH_VERSION).collect();
            if parts.len() != 2 {
                return Err(EngineError::ChecksumFormat {
                    line: line_no,
                    detail: format!("expected exactly one {HASH_VERSION:?} separator"),
                });
            }
            entries.push(Entry {
                name: parts[0].trim().to_string(),
                hash: parts[1].to_string(),
            });
        }

        let manifest = Manifest { entries };
        if manifest.sum() != expected_sum {
            return Err(EngineError::ChecksumFormat {
                line: 1,
                detail: "summary hash does not match recomputed entries".to_string(),
            });
        }
        Ok(manifest)
    }

    /// Render as pretty-printed JSON, for a consuming CLI's `--json` output
    /// mode. Not the wire format `atlas.sum` itself uses — see [`Manifest::marshal`]
    /// for that.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse the JSON form produced by [`Manifest::to_json_pretty`].
    pub fn from_json(text: &str) -> Result<Manifest> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Build a manifest from an ordered, already-sorted file list, per the
/// running-hash chain described in the module docs.
pub fn build_manifest(files: &[File]) -> Manifest {
    let mut hasher = Sha256::new();
    let mut entries = Vec::with_capacity(files.len());

    for file in files {
        hasher.update(file.name().as_bytes());
        if !file.sum_ignored() {
            hasher.update(file.bytes());
        }
        let digest = hasher.clone().finalize();
        entries.push(Entry {
            name: file.name().to_string(),
            hash: BASE64.encode(digest),
        });
    }

    Manifest { entries }
}

/// Validate a directory's live files against its stored `atlas.sum`
/// contents (`None` if the file doesn't exist).
pub fn validate(stored_text: Option<&str>, live_files: &[File]) -> Result<()> {
    let stored = match stored_text {
        None if live_files.is_empty() => return Ok(()),
        None => return Err(EngineError::ChecksumNotFound),
        Some(text) => Manifest::parse(text)?,
    };

    let live = build_manifest(live_files);
    if stored.sum() == live.sum() {
        return Ok(());
    }

    Err(EngineError::checksum_mismatch(locate_mismatch(
        &stored, &live,
    )))
}

/// Walk the stored manifest against the live one and localize the first
/// divergence, per the three-way classification in the module docs.
fn locate_mismatch(stored: &Manifest, live: &Manifest) -> ChecksumMismatch {
    let mut pos = HEADER_LINE_LEN;

    for (i, stored_entry) in stored.entries.iter().enumerate() {
        let matches_at_i = live
            .entries
            .get(i)
            .is_some_and(|e| e.name == stored_entry.name && e.hash == stored_entry.hash);

        if !matches_at_i {
            let found_anywhere = live.entries.iter().position(|e| e.name == stored_entry.name);
            let (file, reason) = match found_anywhere {
                None => (stored_entry.name.clone(), MismatchReason::Removed),
                Some(j) if j == i => (stored_entry.name.clone(), MismatchReason::Edited),
                Some(_) => (
                    live.entries
                        .get(i)
                        .map(|e| e.name.clone())
                        .unwrap_or_else(|| stored_entry.name.clone()),
                    MismatchReason::Added,
                ),
            };
            return ChecksumMismatch {
                file,
                line: i + 2,
                pos,
                reason,
            };
        }

        pos += entry_line_len(stored_entry);
    }

    // Stored is a strict prefix of live: the divergence is the first extra
    // live entry.
    let extra = &live.entries[stored.entries.len()];
    ChecksumMismatch {
        file: extra.name.clone(),
        line: stored.entries.len() + 2,
        pos,
        reason: MismatchReason::Added,
    }
}

fn entry_line_len(entry: &Entry) -> usize {
    entry.name.len() + 1 + HASH_TOKEN_LEN + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(name: &str, content: &str) -> File {
        File::new(name, content.as_bytes().to_vec())
    }

    #[test]
    fn sum_is_deterministic_and_round_trips_through_marshal() {
        let files = vec![f("20240101000000_a.sql", "A"), f("20240102000000_b.sql", "B")];
        let manifest = build_manifest(&files);
        let wire = manifest.marshal();
        let parsed = Manifest::parse(&wire).unwrap();
        assert_eq!(parsed, manifest);
        assert_eq!(parsed.sum(), manifest.sum());
    }

    #[test]
    fn validate_succeeds_on_matching_directory() {
        let files = vec![f("20240101000000_a.sql", "A"), f("20240102000000_b.sql", "B")];
        let manifest = build_manifest(&files);
        let wire = manifest.marshal();
        validate(Some(&wire), &files).unwrap();
    }

    #[test]
    fn validate_succeeds_when_absent_and_empty() {
        validate(None, &[]).unwrap();
    }

    #[test]
    fn validate_fails_not_found_when_absent_and_nonempty() {
        let files = vec![f("20240101000000_a.sql", "A")];
        assert!(matches!(
            validate(None, &files),
            Err(EngineError::ChecksumNotFound)
        ));
    }

    // Scenario S1: editing a file's content localizes to `edited`.
    #[test]
    fn s1_edited_file_is_localized() {
        let original = vec![f("20240101000000_a.sql", "A"), f("20240102000000_b.sql", "B")];
        let wire = build_manifest(&original).marshal();

        let edited = vec![f("20240101000000_a.sql", "C"), f("20240102000000_b.sql", "B")];
        let err = validate(Some(&wire), &edited).unwrap_err();
        let EngineError::ChecksumMismatch(m) = err else {
            panic!("expected ChecksumMismatch, got {err:?}");
        };
        assert_eq!(m.reason, MismatchReason::Edited);
        assert_eq!(m.file, "20240101000000_a.sql");
        assert_eq!(m.line, 2);
    }

    // Scenario S2: an inserted file localizes to `added`.
    #[test]
    fn s2_added_file_is_localized() {
        let original = vec![f("20240101000000_a.sql", "A"), f("20240102000000_b.sql", "B")];
        let wire = build_manifest(&original).marshal();

        let with_insert = vec![
            f("20240101000000_a.sql", "A"),
            f("20240102000000_b.sql", "B"),
            f("20240103000000_c.sql", "C"),
        ];
        let err = validate(Some(&wire), &with_insert).unwrap_err();
        let EngineError::ChecksumMismatch(m) = err else {
            panic!("expected ChecksumMismatch, got {err:?}");
        };
        assert_eq!(m.reason, MismatchReason::Added);
        assert_eq!(m.file, "20240103000000_c.sql");
        assert_eq!(m.line, 4);
    }

    // Scenario S3: a removed file localizes to `removed`.
    #[test]
    fn s3_removed_file_is_localized() {
        let original = vec![f("20240101000000_a.sql", "A"), f("20240102000000_b.sql", "B")];
        let wire = build_manifest(&original).marshal();

        let with_removal = vec![f("20240101000000_a.sql", "A")];
        let err = validate(Some(&wire), &with_removal).unwrap_err();
        let EngineError::ChecksumMismatch(m) = err else {
            panic!("expected ChecksumMismatch, got {err:?}");
        };
        assert_eq!(m.reason, MismatchReason::Removed);
        assert_eq!(m.file, "20240102000000_b.sql");
        assert_eq!(m.line, 3);
    }

    // Scenario S4: sum-ignore means content mutation doesn't break validation.
    #[test]
    fn s4_sum_ignore_excludes_bytes_from_hash() {
        let original = vec![File::new(
            "20240101000000_a.sql",
            b"-- atlas:sum ignore\n\nSELECT 1;\n".to_vec(),
        )];
        let wire = build_manifest(&original).marshal();

        let mutated = vec![File::new(
            "20240101000000_a.sql",
            b"-- atlas:sum ignore\n\nSELECT 2; -- totally different body\n".to_vec(),
        )];
        validate(Some(&wire), &mutated).unwrap();
    }

    #[test]
    fn parse_rejects_malformed_entry_line() {
        let text = "h1:deadbeef\nsomefile.sql no-separator-here\n";
        let err = Manifest::parse(text).unwrap_err();
        assert!(matches!(err, EngineError::ChecksumFormat { line: 2, .. }));
    }

    #[test]
    fn parse_rejects_missing_header_prefix() {
        let text = "deadbeef\n";
        let err = Manifest::parse(text).unwrap_err();
        assert!(matches!(err, EngineError::ChecksumFormat { line: 1, .. }));
    }

    #[test]
    fn json_round_trips() {
        let files = vec![f("20240101000000_a.sql", "A"), f("20240102000000_b.sql", "B")];
        let manifest = build_manifest(&files);
        let json = manifest.to_json_pretty().unwrap();
        assert_eq!(Manifest::from_json(&json).unwrap(), manifest);
    }
}

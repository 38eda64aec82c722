//! The `File` model: a name plus its raw bytes, with version/description and
//! directive accessors derived on demand.

use crate::constants::{DIRECTIVE_CHECKPOINT, DIRECTIVE_SUM, SQL_EXTENSION, SUM_IGNORE};
use crate::directive::{header_directives, prepend};
use crate::error::{EngineError, Result};

/// A single migration (or manifest, or arbitrary) file: a name and its
/// verbatim bytes. Immutable once constructed, except via [`File::with_directive`]
/// which returns a new `File` with a directive line prepended.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct File {
    name: String,
    bytes: Vec<u8>,
}

impl File {
    /// Construct a file from its name and content.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// The file's name, as it appears in its directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file's raw bytes, verbatim.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether this entry is a `.sql` migration file (as opposed to, say,
    /// `atlas.sum`).
    pub fn is_sql(&self) -> bool {
        self.name.ends_with(&format!(".{SQL_EXTENSION}"))
    }

    /// The version component of the name: the prefix up to the first `_`,
    /// with a trailing `.sql` stripped if there is no `_` at all.
    pub fn version(&self) -> &str {
        let stem = self.name_stem();
        match stem.find('_') {
            Some(idx) => &stem[..idx],
            None => stem,
        }
    }

    /// The description component of the name: everything after the first
    /// `_`, or empty if there is none.
    pub fn description(&self) -> &str {
        let stem = self.name_stem();
        match stem.find('_') {
            Some(idx) => &stem[idx + 1..],
            None => "",
        }
    }

    fn name_stem(&self) -> &str {
        self.name
            .strip_suffix(&format!(".{SQL_EXTENSION}"))
            .unwrap_or(&self.name)
    }

    /// Decode `bytes` as UTF-8 for directive scanning, falling back to a
    /// lossy decode so malformed content never panics a read-only query.
    fn content(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Collect the argument lists of every file-global directive named
    /// `name`, in order. Empty if the file has no header block, or no
    /// matching directives.
    pub fn header_directives(&self, name: &str) -> Vec<Vec<String>> {
        header_directives(&self.content(), name)
    }

    /// Whether this file's header carries an `atlas:checkpoint` directive.
    pub fn is_checkpoint(&self) -> bool {
        !self.header_directives(DIRECTIVE_CHECKPOINT).is_empty()
    }

    /// The checkpoint's tag argument, if any. Fails with
    /// [`EngineError::NotCheckpoint`] if this file isn't a checkpoint at all.
    pub fn checkpoint_tag(&self) -> Result<Option<String>> {
        let directives = self.header_directives(DIRECTIVE_CHECKPOINT);
        let Some(first) = directives.first() else {
            return Err(EngineError::NotCheckpoint {
                file: self.name.clone(),
            });
        };
        Ok(first.first().cloned())
    }

    /// Whether this file opts its bytes out of the manifest's chained hash
    /// via `atlas:sum ignore`.
    pub fn sum_ignored(&self) -> bool {
        self.header_directives(DIRECTIVE_SUM)
            .iter()
            .any(|args| args.first().map(String::as_str) == Some(SUM_IGNORE))
    }

    /// Return a new `File` with an `atlas:<name> [args...]` directive
    /// prepended to its bytes.
    pub fn with_directive(&self, name: &str, args: &[&str]) -> File {
        File {
            name: self.name.clone(),
            bytes: prepend(&self.bytes, name, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_and_description_split_on_first_underscore() {
        let f = File::new("20240101000000_add_user_index.sql", b"".to_vec());
        assert_eq!(f.version(), "20240101000000");
        assert_eq!(f.description(), "add_user_index");
    }

    #[test]
    fn description_empty_without_underscore() {
        let f = File::new("20240101000000.sql", b"".to_vec());
        assert_eq!(f.version(), "20240101000000");
        assert_eq!(f.description(), "");
    }

    #[test]
    fn is_sql_checks_extension() {
        assert!(File::new("a.sql", b"".to_vec()).is_sql());
        assert!(!File::new("atlas.sum", b"".to_vec()).is_sql());
    }

    #[test]
    fn checkpoint_detection_and_tag() {
        let f = File::new(
            "chk.sql",
            b"-- atlas:checkpoint v1\n\nSELECT 1;\n".to_vec(),
        );
        assert!(f.is_checkpoint());
        assert_eq!(f.checkpoint_tag().unwrap(), Some("v1".to_string()));
    }

    #[test]
    fn checkpoint_tag_fails_on_non_checkpoint() {
        let f = File::new("a.sql", b"SELECT 1;\n".to_vec());
        assert!(!f.is_checkpoint());
        assert!(matches!(
            f.checkpoint_tag(),
            Err(EngineError::NotCheckpoint { .. })
        ));
    }

    #[test]
    fn sum_ignore_detection() {
        let f = File::new(
            "a.sql",
            b"-- atlas:sum ignore\n\nSELECT 1;\n".to_vec(),
        );
        assert!(f.sum_ignored());

        let g = File::new("b.sql", b"SELECT 1;\n".to_vec());
        assert!(!g.sum_ignored());
    }

    #[test]
    fn with_directive_round_trips() {
        let f = File::new("a.sql", b"SELECT 1;\n".to_vec());
        let tagged = f.with_directive("checkpoint", &["v1"]);
        assert!(tagged.is_checkpoint());
        assert_eq!(tagged.checkpoint_tag().unwrap(), Some("v1".to_string()));
    }
}

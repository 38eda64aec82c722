//! Fixed names and magic numbers used across the engine.

/// Directive names recognized by the mini-language.
pub const DIRECTIVE_SUM: &str = "sum";
pub const DIRECTIVE_DELIMITER: &str = "delimiter";
pub const DIRECTIVE_CHECKPOINT: &str = "checkpoint";

/// Argument that opts a file's bytes out of the chained manifest hash.
pub const SUM_IGNORE: &str = "ignore";

/// Name of the manifest file written alongside migrations.
pub const HASH_FILE_NAME: &str = "atlas.sum";

/// Hash scheme version tag, prefixed onto the summary line and every entry.
pub const HASH_VERSION: &str = "h1:";

/// Extension required of every migration file.
pub const SQL_EXTENSION: &str = "sql";

/// Base64-encoded SHA-256 digest length, standard alphabet with padding (44 chars).
pub const BASE64_SHA256_LEN: usize = 44;

/// `HASH_VERSION` plus `BASE64_SHA256_LEN`, the fixed width of a hash token on the wire.
pub const HASH_TOKEN_LEN: usize = HASH_VERSION.len() + BASE64_SHA256_LEN;

/// Expected layout description for version strings, echoed in `invalid-version` errors.
pub const VERSION_LAYOUT: &str = "YYYYMMDDhhmmss";

/// strftime/strptime-compatible format string for the version layout above.
pub const VERSION_FORMAT: &str = "%Y%m%d%H%M%S";

/// Unix file mode used when the local backend writes a migration file.
pub const LOCAL_FILE_MODE: u32 = 0o644;

/// Unix file mode stamped on every tar entry written by the archive codec.
pub const TAR_ENTRY_MODE: u32 = 0o600;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_token_len_matches_scheme() {
        assert_eq!(HASH_TOKEN_LEN, 3 + 44);
    }

    #[test]
    fn version_format_has_fourteen_digit_layout() {
        assert_eq!(VERSION_LAYOUT.len(), 14);
    }
}

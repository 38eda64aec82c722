//! Timestamp-based migration versions: `YYYYMMDDhhmmss`.

use chrono::Utc;

use crate::constants::VERSION_FORMAT;
use crate::error::{EngineError, Result};

/// Mint a new version string from the current UTC time.
pub fn new_version() -> String {
    Utc::now().format(VERSION_FORMAT).to_string()
}

/// Validate that `value` is exactly a `YYYYMMDDhhmmss` timestamp.
///
/// Rejects anything chrono would otherwise parse loosely (e.g. a value with
/// trailing garbage) by checking the round-tripped length in addition to a
/// successful parse.
pub fn check_version(value: &str) -> Result<()> {
    if value.len() != VERSION_FORMAT_LEN
        || !value.bytes().all(|b| b.is_ascii_digit())
        || chrono::NaiveDateTime::parse_from_str(value, VERSION_FORMAT).is_err()
    {
        return Err(EngineError::invalid_version(value));
    }
    Ok(())
}

const VERSION_FORMAT_LEN: usize = 14;

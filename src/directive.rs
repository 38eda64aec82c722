//! The `atlas:<name> [args...]` mini-language embedded in SQL comments.
//!
//! Keep the matching regex verbatim; it is the single source of truth for
//! what counts as a directive. A richer parser (quoting, escapes inside
//! arguments, etc.) is a behavior change, not a refactor.

use once_cell::sync::Lazy;
use regex::Regex;

/// `^([ -~]*)atlas:(\w+)(?: +([ -~]*))*`
///
/// Group 3's character class already includes the space character, so the
/// outer `*` repetition collapses to a single greedy capture of the entire
/// trailing text — there is no second iteration left to repeat over. That
/// capture is the raw, space-preserved argument string.
static DIRECTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ -~]*)atlas:(\w+)(?: +([ -~]*))*").expect("static regex"));

/// The result of matching a single line against the directive grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLine {
    /// The comment prefix preceding `atlas:`, e.g. `"-- "`. Empty if the line
    /// doesn't match at all, or if `atlas:` opens the line directly.
    pub prefix: String,
    /// The directive name, e.g. `"checkpoint"`. Empty when the line isn't a
    /// directive.
    pub name: String,
    /// Whitespace-split arguments following the name, in order.
    pub args: Vec<String>,
}

impl ParsedLine {
    fn is_directive(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Match `line` against the directive grammar. Returns an empty `ParsedLine`
/// (empty `name`, empty `args`) when the line isn't a directive — callers
/// test `name.is_empty()` or use [`ParsedLine::is_directive`] rather than
/// matching on `Option`, mirroring the two-return-value shape of the
/// original contract.
pub fn parse(line: &str) -> ParsedLine {
    let Some(caps) = DIRECTIVE_RE.captures(line) else {
        return ParsedLine::default();
    };

    let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
    let name = caps.get(2).map(|m| m.as_str()).unwrap_or("").to_string();
    let args = caps
        .get(3)
        .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    ParsedLine { prefix, name, args }
}

/// Whether `line` is a directive named `name`, optionally also requiring an
/// exact comment prefix.
pub fn has(line: &str, name: &str, prefix: Option<&str>) -> bool {
    let parsed = parse(line);
    if !parsed.is_directive() || parsed.name != name {
        return false;
    }
    match prefix {
        Some(expected) => parsed.prefix == expected,
        None => true,
    }
}

/// Split `bytes` into lines, normalizing `\r\n` to `\n` for the purposes of
/// header-block detection. Returns `(line_without_terminator, had_crlf)`
/// pairs; the underlying bytes are never rewritten, this is scanning only.
fn lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect()
}

/// Identify the header comment block of a file: the run of leading lines
/// starting with `#` or `--`, provided it is followed by a blank-line
/// separator (or the file contains nothing else). Returns `None` if the
/// leading comments are attached to the first statement instead.
fn header_block_lines(content: &str) -> Option<Vec<&str>> {
    let all_lines = lines(content);
    let mut header_end = 0;
    for line in &all_lines {
        if line.starts_with('#') || line.starts_with("--") {
            header_end += 1;
        } else {
            break;
        }
    }

    if header_end == all_lines.len() {
        // Nothing follows the comments at all: the whole file is a header.
        return Some(all_lines);
    }

    // Re-derive the raw remainder (post comment-run) directly from `content`
    // rather than rejoining `all_lines`, so we don't need to guess back
    // whether the separator was `\n` or `\r\n`.
    let remainder = remainder_after_lines(content, header_end);
    let after_ws = remainder.trim_start_matches([' ', '\t']);
    if after_ws.starts_with('\n') || after_ws.starts_with("\r\n") || after_ws.is_empty() {
        Some(all_lines[..header_end].to_vec())
    } else {
        None
    }
}

/// Byte offset (in `content`) immediately after the `n`-th `\n`-terminated
/// line (CRLF-aware).
fn remainder_after_lines(content: &str, n: usize) -> &str {
    let mut rest = content;
    for _ in 0..n {
        match rest.find('\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => return "",
        }
    }
    rest
}

/// Collect the argument lists of every header-block directive named `name`,
/// in order. Empty if the file has no header block, or none of its
/// directives match.
pub fn header_directives(content: &str, name: &str) -> Vec<Vec<String>> {
    let Some(header_lines) = header_block_lines(content) else {
        return Vec::new();
    };

    header_lines
        .into_iter()
        .map(parse)
        .filter(|p| p.is_directive() && p.name == name)
        .map(|p| p.args)
        .collect()
}

/// Prepend an `atlas:<name> [args...]` directive line to `bytes`, inserting
/// an extra blank line afterward when the file doesn't already have a
/// header comment block (establishing the separator required for the new
/// directive to actually be recognized as file-global next time around).
pub fn prepend(content: &[u8], name: &str, args: &[&str]) -> Vec<u8> {
    let mut line = format!("-- atlas:{name}");
    if !args.is_empty() {
        line.push(' ');
        line.push_str(&args.join(" "));
    }
    line.push('\n');

    let had_header = std::str::from_utf8(content)
        .ok()
        .is_some_and(|s| header_block_lines(s).is_some());

    let mut out = Vec::with_capacity(line.len() + 1 + content.len());
    out.extend_from_slice(line.as_bytes());
    if !had_header {
        out.push(b'\n');
    }
    out.extend_from_slice(content);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sum_ignore() {
        let p = parse("-- atlas:sum ignore");
        assert_eq!(p.prefix, "-- ");
        assert_eq!(p.name, "sum");
        assert_eq!(p.args, vec!["ignore".to_string()]);
    }

    #[test]
    fn parses_checkpoint_with_tag() {
        let p = parse("-- atlas:checkpoint v1");
        assert_eq!(p.name, "checkpoint");
        assert_eq!(p.args, vec!["v1".to_string()]);
    }

    #[test]
    fn parses_checkpoint_without_tag() {
        let p = parse("-- atlas:checkpoint");
        assert_eq!(p.name, "checkpoint");
        assert!(p.args.is_empty());
    }

    #[test]
    fn non_directive_line_is_empty() {
        let p = parse("SELECT 1;");
        assert!(p.name.is_empty());
        assert!(p.prefix.is_empty());
        assert!(p.args.is_empty());
    }

    #[test]
    fn has_checks_name_and_optional_prefix() {
        assert!(has("-- atlas:sum ignore", "sum", None));
        assert!(has("-- atlas:sum ignore", "sum", Some("-- ")));
        assert!(!has("-- atlas:sum ignore", "sum", Some("# ")));
        assert!(!has("-- atlas:sum ignore", "delimiter", None));
    }

    #[test]
    fn header_directives_only_in_header_block() {
        let content = "-- atlas:checkpoint v1\n-- atlas:sum ignore\n\nSELECT 1;\n";
        assert_eq!(
            header_directives(content, "checkpoint"),
            vec![vec!["v1".to_string()]]
        );
        assert_eq!(
            header_directives(content, "sum"),
            vec![vec!["ignore".to_string()]]
        );
    }

    #[test]
    fn header_directives_empty_without_blank_separator() {
        // Comment is attached to the statement, not file-global.
        let content = "-- atlas:checkpoint v1\nSELECT 1;\n";
        assert!(header_directives(content, "checkpoint").is_empty());
    }

    #[test]
    fn header_directives_whole_file_is_comments() {
        let content = "-- atlas:sum ignore";
        assert_eq!(
            header_directives(content, "sum"),
            vec![vec!["ignore".to_string()]]
        );
    }

    #[test]
    fn prepend_adds_separator_when_no_header_exists() {
        let out = prepend(b"SELECT 1;\n", "checkpoint", &["v1"]);
        assert_eq!(out, b"-- atlas:checkpoint v1\n\nSELECT 1;\n".to_vec());
    }

    #[test]
    fn prepend_reuses_existing_header_separator() {
        let existing = b"-- atlas:sum ignore\n\nSELECT 1;\n";
        let out = prepend(existing, "checkpoint", &["v1"]);
        assert_eq!(
            out,
            b"-- atlas:checkpoint v1\n-- atlas:sum ignore\n\nSELECT 1;\n".to_vec()
        );
    }

    #[test]
    fn prepend_then_read_back_round_trips() {
        let out = prepend(b"SELECT 1;\n", "checkpoint", &["v1"]);
        let content = std::str::from_utf8(&out).unwrap();
        assert_eq!(
            header_directives(content, "checkpoint"),
            vec![vec!["v1".to_string()]]
        );
    }
}

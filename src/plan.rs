//! The plan formatter boundary: rendering a caller-supplied [`Plan`] into
//! one or more [`File`]s.
//!
//! The planner that decides *what* SQL to emit is an external collaborator;
//! this module only turns its output into bytes on disk. There is no
//! embedded template language here — a `Formatter` is just an ordered list
//! of (name, content) closure pairs, with [`upper`], [`now`], and
//! [`directives`] provided as the building blocks a caller composes those
//! closures from, matching the contract's three built-in template functions.

use crate::constants::DIRECTIVE_DELIMITER;
use crate::directive;
use crate::error::{EngineError, Result};
use crate::file::File;
use crate::version;

/// One SQL change within a plan: an optional human-readable comment and the
/// command text itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub comment: Option<String>,
    pub cmd: String,
}

/// The planner's output: everything a formatter needs to render one or more
/// files. Supplied by an external caller; this crate never constructs one
/// except in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub version: Option<String>,
    pub name: Option<String>,
    pub delimiter: Option<String>,
    pub directives: Vec<String>,
    pub changes: Vec<Change>,
}

type NameTemplate = Box<dyn Fn(&Plan) -> Result<String> + Send + Sync>;
type ContentTemplate = Box<dyn Fn(&Plan) -> Result<String> + Send + Sync>;

/// An ordered list of (name-template, content-template) pairs. `format`
/// renders one `File` per pair.
#[derive(Default)]
pub struct Formatter {
    templates: Vec<(NameTemplate, ContentTemplate)>,
}

impl Formatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a (name-template, content-template) pair.
    pub fn with(mut self, name: NameTemplate, content: ContentTemplate) -> Self {
        self.templates.push((name, content));
        self
    }

    /// Render every registered template pair against `plan`.
    pub fn format(&self, plan: &Plan) -> Result<Vec<File>> {
        self.templates
            .iter()
            .map(|(name, content)| Ok(File::new(name(plan)?, content(plan)?.into_bytes())))
            .collect()
    }
}

/// The default formatter: one file per plan, named
/// `{version-or-now}{_name-if-present}.sql`, whose content is the rendered
/// directive block followed by each change as a `cmd<delimiter>` line
/// (optionally preceded by a capitalized comment).
pub fn default_formatter() -> Formatter {
    Formatter::new().with(Box::new(default_name_template), Box::new(default_content_template))
}

fn default_name_template(plan: &Plan) -> Result<String> {
    let version = match &plan.version {
        Some(v) => v.clone(),
        None => now(),
    };
    let suffix = plan.name.as_deref().map(|n| format!("_{n}")).unwrap_or_default();
    Ok(format!("{version}{suffix}.sql"))
}

fn default_content_template(plan: &Plan) -> Result<String> {
    let mut out = directives(plan)?;
    let delimiter = plan.delimiter.as_deref().unwrap_or(";");

    for change in &plan.changes {
        if let Some(comment) = &change.comment {
            out.push_str("-- ");
            out.push_str(&capitalize(comment));
            out.push('\n');
        }
        out.push_str(&change.cmd);
        out.push_str(delimiter);
        out.push('\n');
    }
    Ok(out)
}

/// Uppercase a string. A built-in template function.
pub fn upper(s: &str) -> String {
    s.to_uppercase()
}

/// The current UTC time formatted as a version string (`YYYYMMDDhhmmss`). A
/// built-in template function.
pub fn now() -> String {
    version::new_version()
}

/// Render `plan`'s directive block: the delimiter directive (if
/// `plan.delimiter` is non-empty) followed by each entry of
/// `plan.directives`, each validated as a parseable directive line and with
/// at most one `delimiter` directive across the two sources. Concatenated
/// with newlines and terminated by a blank line; empty if there is nothing
/// to emit. A built-in template function.
pub fn directives(plan: &Plan) -> Result<String> {
    let mut lines = Vec::new();
    let mut delimiter_count = 0usize;

    if let Some(delimiter) = plan.delimiter.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("-- atlas:delimiter {}", escape_delimiter(delimiter)));
        delimiter_count += 1;
    }

    for raw in &plan.directives {
        let parsed = directive::parse(raw);
        if parsed.name.is_empty() {
            return Err(EngineError::InvalidPlan(format!(
                "{raw:?} does not parse as a directive line"
            )));
        }
        if parsed.name == DIRECTIVE_DELIMITER {
            delimiter_count += 1;
            if delimiter_count > 1 {
                return Err(EngineError::InvalidPlan(
                    "delimiter directive specified more than once".to_string(),
                ));
            }
        }
        lines.push(raw.clone());
    }

    if lines.is_empty() {
        return Ok(String::new());
    }

    let mut out = String::new();
    for line in &lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    Ok(out)
}

fn escape_delimiter(raw: &str) -> String {
    raw.replace('\t', "\\t").replace('\r', "\\r").replace('\n', "\\n")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

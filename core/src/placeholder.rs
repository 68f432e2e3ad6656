//! Placeholder grammar shared by the builder and the validators.
//!
//! Three forms are recognised inside a command template:
//!
//! - `{{name}}`: required substitution.
//! - `{{name?}}`: optional, substitutes to nothing when no value is given.
//! - `{{name:default}}`: optional with an inline default.
//!
//! Names match `[a-zA-Z][a-zA-Z0-9_-]*`.
//!
//! # Examples
//!
//! ```
//! use command_template_core::placeholder::{self, PlaceholderKind};
//!
//! let found = placeholder::scan("curl -p {{port:8080}} {{url}}");
//! assert_eq!(found.len(), 2);
//! assert_eq!(found[0].name, "port");
//! assert_eq!(found[0].kind, PlaceholderKind::Default("8080".into()));
//! assert_eq!(found[1].kind, PlaceholderKind::Required);
//! ```

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([a-zA-Z][a-zA-Z0-9_-]*)(\?|:([^}]*))?\}\}")
        .expect("static regex must compile")
});

static BRACED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^}]*\}\}").expect("static regex must compile"));

/// How a placeholder behaves when no value is supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    Required,
    Optional,
    Default(String),
}

/// One placeholder occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub name: String,
    pub kind: PlaceholderKind,
    /// Byte range of the whole `{{...}}` in the scanned text.
    pub span: Range<usize>,
}

impl Placeholder {
    pub fn is_required(&self) -> bool {
        self.kind == PlaceholderKind::Required
    }

    pub fn inline_default(&self) -> Option<&str> {
        match &self.kind {
            PlaceholderKind::Default(value) => Some(value),
            _ => None,
        }
    }
}

/// Finds every well-formed placeholder in `text`, in order.
pub fn scan(text: &str) -> Vec<Placeholder> {
    PLACEHOLDER_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str().to_string();
            let kind = match caps.get(2).map(|m| m.as_str()) {
                None => PlaceholderKind::Required,
                Some("?") => PlaceholderKind::Optional,
                Some(_) => PlaceholderKind::Default(
                    caps.get(3).map(|m| m.as_str()).unwrap_or_default().to_string(),
                ),
            };
            Some(Placeholder {
                name,
                kind,
                span: whole.range(),
            })
        })
        .collect()
}

/// Parses `text` when it is exactly one placeholder.
pub fn parse_exact(text: &str) -> Option<Placeholder> {
    let mut found = scan(text);
    if found.len() == 1 && found[0].span == (0..text.len()) {
        found.pop()
    } else {
        None
    }
}

/// Unique placeholder names in order of first appearance.
pub fn names(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for placeholder in scan(text) {
        if !out.contains(&placeholder.name) {
            out.push(placeholder.name);
        }
    }
    out
}

/// `{{...}}` runs that do not follow the placeholder grammar.
pub fn malformed(text: &str) -> Vec<String> {
    malformed_spans(text)
        .into_iter()
        .map(|span| text[span].to_string())
        .collect()
}

/// Byte ranges of the runs [`malformed`] returns.
pub fn malformed_spans(text: &str) -> Vec<Range<usize>> {
    BRACED_RE
        .find_iter(text)
        .filter(|m| parse_exact(m.as_str()).is_none())
        .map(|m| m.range())
        .collect()
}

/// Renders a placeholder for template output: `{{name}}` or `[{{name}}]`.
pub fn render_template(name: &str, required: bool) -> String {
    if required {
        format!("{{{{{name}}}}}")
    } else {
        format!("[{{{{{name}}}}}]")
    }
}

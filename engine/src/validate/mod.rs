//! Rule engines for structures, definitions and build selections.
//!
//! All validators return a [`ValidationResult`]. Only the build validator can
//! fail outright, and only when the caller references something the
//! definition never declared.

pub mod build;
pub mod creation;
pub mod security;
pub mod structural;

use std::sync::LazyLock;

use command_template_core::{DataType, Issue, ValidationResult, placeholder};
use regex::Regex;

use crate::builder::{QuoteContext, quote_context};

pub use build::{validate_build, validate_build_with};
pub use creation::{CreationContext, validate_definition};
pub use security::{RiskLevel, SecurityReport};
pub use structural::{StructuralOptions, validate_structure};

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d*\.?\d+$").expect("static regex must compile"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex must compile")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^\s/?#]+\S*$").expect("static regex must compile")
});

const BOOLEAN_VALUES: &[&str] = &["true", "false", "1", "0", "yes", "no", "on", "off"];

const PATH_FORBIDDEN: &[char] = &['<', '>', '"', '|', '?', '*', '\0'];

/// Malformed `{{...}}` runs of `text` outside single quotes.
///
/// Single-quoted braces are literal text for another tool (`docker ps
/// --format '{{.Names}}'`), not placeholders gone wrong.
pub(crate) fn stray_placeholders(text: &str) -> Vec<String> {
    placeholder::malformed_spans(text)
        .into_iter()
        .filter(|span| quote_context(text, span.start) != QuoteContext::Single)
        .map(|span| text[span].to_string())
        .collect()
}

/// Type-checks a supplied value.
///
/// # Examples
///
/// ```
/// use command_template_core::{DataType, ValidationResult};
/// use command_template_engine::validate::check_value;
///
/// let mut result = ValidationResult::new();
/// check_value("port", DataType::Number, &[], "8080", &mut result);
/// check_value("verbose", DataType::Boolean, &[], "YES", &mut result);
/// assert!(result.is_valid());
///
/// check_value("to", DataType::Email, &[], "not-an-email", &mut result);
/// assert!(!result.is_valid());
/// ```
pub fn check_value(
    name: &str,
    data_type: DataType,
    enum_values: &[String],
    value: &str,
    result: &mut ValidationResult,
) {
    let invalid = |result: &mut ValidationResult| {
        result.error(
            Issue::InvalidValue {
                name: name.to_string(),
                expected: data_type,
                value: value.to_string(),
            },
            Some(name),
        );
    };

    match data_type {
        DataType::String => {}
        DataType::Number => {
            if !NUMBER_RE.is_match(value) {
                invalid(result);
            }
        }
        DataType::Url => {
            if !URL_RE.is_match(value) {
                invalid(result);
            }
        }
        DataType::Email => {
            if !EMAIL_RE.is_match(value) {
                invalid(result);
            }
        }
        DataType::Boolean => {
            if !BOOLEAN_VALUES.contains(&value.to_ascii_lowercase().as_str()) {
                invalid(result);
            }
        }
        DataType::File | DataType::Directory => {
            if value.contains(PATH_FORBIDDEN) {
                invalid(result);
            } else if value.contains("..") || value.contains("//") {
                result.warn(
                    Issue::SuspiciousPath {
                        name: name.to_string(),
                        value: value.to_string(),
                    },
                    Some(name),
                );
            }
        }
        DataType::Enum => {
            if !enum_values.is_empty() && !enum_values.iter().any(|v| v == value) {
                result.error(
                    Issue::NotInEnum {
                        name: name.to_string(),
                        value: value.to_string(),
                        allowed: enum_values.join(", "),
                    },
                    Some(name),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(data_type: DataType, value: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        check_value("v", data_type, &[], value, &mut result);
        result
    }

    #[test]
    fn test_numbers() {
        for ok in ["0", "42", "-7", "3.14", ".5"] {
            assert!(check(DataType::Number, ok).is_valid(), "{ok}");
        }
        for bad in ["", "1e3", "12a", "--1"] {
            assert!(!check(DataType::Number, bad).is_valid(), "{bad}");
        }
    }

    #[test]
    fn test_urls() {
        assert!(check(DataType::Url, "https://x.git").is_valid());
        assert!(check(DataType::Url, "ssh://git@host/repo").is_valid());
        assert!(!check(DataType::Url, "x.git").is_valid());
        assert!(!check(DataType::Url, "http://").is_valid());
    }

    #[test]
    fn test_booleans_accept_on_off() {
        assert!(check(DataType::Boolean, "off").is_valid());
        assert!(!check(DataType::Boolean, "maybe").is_valid());
    }

    #[test]
    fn test_paths() {
        assert!(check(DataType::File, "./src/main.rs").is_valid());
        assert!(!check(DataType::File, "a|b").is_valid());
        let suspicious = check(DataType::Directory, "../../etc");
        assert!(suspicious.is_valid());
        assert!(suspicious.has_warning(|i| matches!(i, Issue::SuspiciousPath { .. })));
    }

    #[test]
    fn test_enum_membership() {
        let allowed = vec!["json".to_string(), "yaml".to_string()];
        let mut result = ValidationResult::new();
        check_value("format", DataType::Enum, &allowed, "toml", &mut result);
        assert!(result.has_error(|i| matches!(i, Issue::NotInEnum { .. })));
    }
}

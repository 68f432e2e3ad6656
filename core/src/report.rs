//! Diagnostics shared by every validator.
//!
//! Validators never fail on bad user data. They collect [`Diagnostic`]s into
//! a [`ValidationResult`], split by severity. Each diagnostic carries an
//! [`Issue`] (machine-readable code plus `Display` message) and the
//! [`IssueCategory`] it belongs to.
//!
//! # Examples
//!
//! ```
//! use command_template_core::{Issue, IssueCategory, ValidationResult};
//!
//! let mut result = ValidationResult::new();
//! result.warn(Issue::UnusedParameter("tag".into()), Some("parameters"));
//! assert!(result.is_valid());
//!
//! result.error(Issue::UndefinedPlaceholder("url".into()), Some("command"));
//! assert!(!result.is_valid());
//! assert_eq!(result.errors[0].category, IssueCategory::Semantic);
//! assert!(result.errors[0].message.contains("url"));
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::DataType;

/// Top-level taxonomy of problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    /// Malformed tokens or operator placement.
    Syntax,
    /// Well-formed input that does not make sense.
    Semantic,
    /// Potentially dangerous content. Advisory only.
    Security,
    /// Edits the caller is not allowed to make.
    Permission,
    /// Caller contract violations.
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
}

/// Every problem a validator can report.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum Issue {
    // Syntax
    #[error("command is empty")]
    EmptyCommand,
    #[error("component {0} has no base command")]
    MissingBaseCommand(usize),
    #[error("malformed option: {0}")]
    MalformedOption(String),
    #[error("malformed placeholder: {0}")]
    MalformedPlaceholder(String),
    #[error("command cannot start with separator '{0}'")]
    LeadingSeparator(String),
    #[error("consecutive separators '{first}' and '{second}'")]
    ConsecutiveSeparators { first: String, second: String },
    #[error("separator '{0}' expects a command after it")]
    DanglingSeparator(String),
    #[error("redirect '{0}' has no target")]
    MissingRedirectTarget(String),
    #[error("background operator '&' must end its command")]
    BackgroundNotTerminal,
    #[error("unterminated quote in {0}")]
    UnterminatedQuote(String),
    #[error("operator '{0}' is repeated within one command")]
    RepeatedOperator(String),
    #[error("mixing '&&' and '||' relies on left-to-right evaluation; consider grouping")]
    MixedLogicChain,
    #[error("option {0} appears more than once")]
    DuplicateOptionToken(String),

    // Semantic: definition fields
    #[error("{0} is required")]
    MissingField(String),
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
    #[error("{field} contains invalid characters")]
    InvalidCharacters { field: String },
    #[error("at most {max} {field} are allowed")]
    TooMany { field: String, max: usize },
    #[error("category does not exist: {0}")]
    UnknownCategory(String),
    #[error("commands cannot be placed in category {0}")]
    ForbiddenCategory(String),
    #[error("category {category} is nested too deeply (level {level})")]
    CategoryTooDeep { category: String, level: u8 },
    #[error("invalid tag: {0}")]
    InvalidTag(String),
    #[error("duplicate tag: {0}")]
    DuplicateTag(String),

    // Semantic: parameters
    #[error("invalid parameter name: {0}")]
    InvalidParameterName(String),
    #[error("duplicate parameter: {0}")]
    DuplicateParameter(String),
    #[error("required parameter {0} follows an optional parameter")]
    RequiredAfterOptional(String),
    #[error("required parameter {0} declares a default value")]
    RequiredWithDefault(String),
    #[error("parameter {0} has no description")]
    MissingDescription(String),
    #[error("parameter {0} has an unrecognised classification")]
    UnknownClassification(String),
    #[error("{source_name} references undeclared {target}")]
    DanglingReference { source_name: String, target: String },
    #[error("placeholder {{{{{0}}}}} has no parameter definition")]
    UndefinedPlaceholder(String),
    #[error("parameter {0} is not used in the command")]
    UnusedParameter(String),

    // Semantic: options
    #[error("option has no flag")]
    MissingFlag,
    #[error("invalid option flag: {0}")]
    InvalidFlag(String),
    #[error("duplicate option flag: {0}")]
    DuplicateFlag(String),
    #[error("option {0} takes a value but declares no value type")]
    MissingValueType(String),

    // Semantic: duplicates against existing commands
    #[error("a command named {0} already exists")]
    DuplicateName(String),
    #[error("an identical command already exists: {0}")]
    DuplicateCommand(String),

    // Semantic: build
    #[error("missing required value for parameter '{0}'")]
    MissingRequiredValue(String),
    #[error("value '{value}' for {name} is not a valid {expected}")]
    InvalidValue {
        name: String,
        expected: DataType,
        value: String,
    },
    #[error("value '{value}' for {name} is not one of: {allowed}")]
    NotInEnum {
        name: String,
        value: String,
        allowed: String,
    },
    #[error("path value for {name} looks suspicious: {value}")]
    SuspiciousPath { name: String, value: String },
    #[error("required option {0} is not selected")]
    RequiredOptionNotSelected(String),
    #[error("option {0} requires a value")]
    MissingOptionValue(String),
    #[error("option {option} conflicts with {conflicts_with}")]
    OptionConflict {
        option: String,
        conflicts_with: String,
    },
    #[error("option {option} depends on {requires}, which is not selected")]
    MissingDependency { option: String, requires: String },
    #[error("placeholder {0} was not substituted")]
    UnsubstitutedPlaceholder(String),

    // Security
    #[error("possible command injection: {0}")]
    InjectionPattern(String),
    #[error("destructive command: {0}")]
    DestructiveCommand(String),
    #[error("privilege escalation: {0}")]
    PrivilegeEscalation(String),

    // Permission
    #[error("system command {0} cannot be modified")]
    SystemCommand(String),
    #[error("field {0} is protected")]
    ProtectedField(String),
    #[error("field {0} cannot be updated")]
    NonUpdatableField(String),

    // System
    #[error("command not found: {0}")]
    CommandNotFound(String),
    #[error("{0}")]
    System(String),

    /// Free-form advice.
    #[error("{0}")]
    Hint(String),
}

impl Issue {
    pub fn category(&self) -> IssueCategory {
        use Issue::*;
        match self {
            EmptyCommand
            | MissingBaseCommand(_)
            | MalformedOption(_)
            | MalformedPlaceholder(_)
            | LeadingSeparator(_)
            | ConsecutiveSeparators { .. }
            | DanglingSeparator(_)
            | MissingRedirectTarget(_)
            | BackgroundNotTerminal
            | UnterminatedQuote(_)
            | RepeatedOperator(_)
            | MixedLogicChain
            | DuplicateOptionToken(_) => IssueCategory::Syntax,
            InjectionPattern(_) | DestructiveCommand(_) | PrivilegeEscalation(_) => {
                IssueCategory::Security
            }
            SystemCommand(_) | ProtectedField(_) | NonUpdatableField(_) => {
                IssueCategory::Permission
            }
            CommandNotFound(_) | System(_) => IssueCategory::System,
            _ => IssueCategory::Semantic,
        }
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: IssueCategory,
    /// Definition field or structural location the issue refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub issue: Issue,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, issue: Issue, field: Option<&str>) -> Self {
        Self {
            severity,
            category: issue.category(),
            field: field.map(str::to_string),
            message: issue.to_string(),
            issue,
        }
    }
}

/// Output contract of every validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub suggestions: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, issue: Issue, field: Option<&str>) {
        self.errors
            .push(Diagnostic::new(Severity::Error, issue, field));
    }

    pub fn warn(&mut self, issue: Issue, field: Option<&str>) {
        self.warnings
            .push(Diagnostic::new(Severity::Warning, issue, field));
    }

    pub fn suggest(&mut self, issue: Issue, field: Option<&str>) {
        self.suggestions
            .push(Diagnostic::new(Severity::Suggestion, issue, field));
    }

    /// Appends all diagnostics of `other`.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.suggestions.extend(other.suggestions);
    }

    /// All diagnostics, errors first.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors
            .iter()
            .chain(&self.warnings)
            .chain(&self.suggestions)
    }

    pub fn has_error(&self, predicate: impl Fn(&Issue) -> bool) -> bool {
        self.errors.iter().any(|d| predicate(&d.issue))
    }

    pub fn has_warning(&self, predicate: impl Fn(&Issue) -> bool) -> bool {
        self.warnings.iter().any(|d| predicate(&d.issue))
    }

    /// Moves every warning into the error list.
    pub fn escalate_warnings(&mut self) {
        for mut diagnostic in self.warnings.drain(..) {
            diagnostic.severity = Severity::Error;
            self.errors.push(diagnostic);
        }
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|d| d.message.clone()).collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(|d| d.message.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_categories() {
        assert_eq!(
            Issue::ConsecutiveSeparators {
                first: "|".into(),
                second: "|".into()
            }
            .category(),
            IssueCategory::Syntax
        );
        assert_eq!(
            Issue::DestructiveCommand("rm".into()).category(),
            IssueCategory::Security
        );
        assert_eq!(
            Issue::ProtectedField("id".into()).category(),
            IssueCategory::Permission
        );
        assert_eq!(
            Issue::OptionConflict {
                option: "-q".into(),
                conflicts_with: "-v".into()
            }
            .category(),
            IssueCategory::Semantic
        );
    }

    #[test]
    fn test_undefined_placeholder_message_shows_braces() {
        let message = Issue::UndefinedPlaceholder("url".into()).to_string();
        assert_eq!(message, "placeholder {{url}} has no parameter definition");
    }

    #[test]
    fn test_escalate_warnings() {
        let mut result = ValidationResult::new();
        result.warn(Issue::UnusedParameter("x".into()), None);
        result.escalate_warnings();
        assert!(result.warnings.is_empty());
        assert_eq!(result.errors[0].severity, Severity::Error);
    }

    #[test]
    fn test_issue_serializes_with_code() {
        let json = serde_json::to_value(Issue::MissingRequiredValue("url".into())).unwrap();
        assert_eq!(json["code"], "missing_required_value");
        assert_eq!(json["detail"], "url");
    }
}

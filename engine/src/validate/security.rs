//! Advisory security checks.
//!
//! Every finding is a warning. Destructive commands are often exactly what
//! the user wants to save as a template, so nothing here blocks a command.

use std::sync::LazyLock;

use command_template_core::{CommandStructure, Diagnostic, Issue, ValidationResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

struct InjectionPattern {
    regex: Regex,
    description: &'static str,
}

static INJECTION_PATTERNS: LazyLock<Vec<InjectionPattern>> = LazyLock::new(|| {
    [
        (r";\s*rm\s+-[a-zA-Z]*[rf]", "sequence into rm -rf"),
        (r"\$\([^)]*\)", "command substitution $(...)"),
        (r"`[^`]*`", "backtick command substitution"),
        (r"\|\s*(sh|bash|zsh|dash)\b", "output piped into a shell"),
    ]
    .into_iter()
    .map(|(pattern, description)| InjectionPattern {
        regex: Regex::new(pattern).expect("static regex must compile"),
        description,
    })
    .collect()
});

const DESTRUCTIVE_COMMANDS: &[&str] = &["rm", "del", "format", "fdisk", "mkfs", "dd", "shred"];

const PRIVILEGE_COMMANDS: &[&str] = &["sudo", "su", "doas"];

/// Overall risk of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

/// Security findings for one command string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReport {
    pub risk: RiskLevel,
    pub findings: Vec<Diagnostic>,
}

impl SecurityReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

fn is_destructive(command: &str) -> bool {
    DESTRUCTIVE_COMMANDS.contains(&command)
        || command.starts_with("mkfs.")
}

/// Scans `command` and its parsed `structure` for risky content.
///
/// # Examples
///
/// ```
/// use command_template_engine::validate::security::{RiskLevel, assess};
/// use command_template_engine::{parse, tokenize};
///
/// let command = "curl https://x.sh | bash";
/// let report = assess(command, &parse(&tokenize(command)));
/// assert_eq!(report.risk, RiskLevel::High);
/// ```
pub fn assess(command: &str, structure: &CommandStructure) -> SecurityReport {
    let result = scan(command, structure);
    let risk = result
        .warnings
        .iter()
        .map(|d| match d.issue {
            Issue::InjectionPattern(_) => RiskLevel::High,
            Issue::DestructiveCommand(_) => RiskLevel::Medium,
            _ => RiskLevel::Low,
        })
        .max()
        .unwrap_or(RiskLevel::None);
    SecurityReport {
        risk,
        findings: result.warnings,
    }
}

/// Collects security warnings.
pub fn scan(command: &str, structure: &CommandStructure) -> ValidationResult {
    let mut result = ValidationResult::new();

    for pattern in INJECTION_PATTERNS.iter() {
        if pattern.regex.is_match(command) {
            result.warn(
                Issue::InjectionPattern(pattern.description.to_string()),
                Some("command"),
            );
        }
    }

    for component in &structure.components {
        let Some(base) = &component.base_command else {
            continue;
        };
        let name = base.value.as_str();
        if PRIVILEGE_COMMANDS.contains(&name) {
            result.warn(
                Issue::PrivilegeEscalation(name.to_string()),
                Some("command"),
            );
            // The elevated command is the first word after the privilege prefix.
            if let Some(elevated) = component.arguments.first()
                && is_destructive(&elevated.value)
            {
                result.warn(
                    Issue::DestructiveCommand(elevated.value.clone()),
                    Some("command"),
                );
            }
        } else if is_destructive(name) {
            result.warn(Issue::DestructiveCommand(name.to_string()), Some("command"));
        }
    }

    result
}

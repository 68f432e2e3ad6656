//! One-call analysis of a raw command string.

use command_template_core::{CommandStructure, Token, ValidationResult, placeholder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::validate::security::{self, SecurityReport};
use crate::validate::structural::{StructuralOptions, validate_structure};
use crate::{parse, tokenize};

/// Which checks [`analyze`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    pub check_security: bool,
    pub check_precedence: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            check_security: true,
            check_precedence: true,
        }
    }
}

impl AnalyzerOptions {
    fn structural(&self) -> StructuralOptions {
        StructuralOptions {
            // Findings are reported once, through the security report.
            check_security: false,
            check_precedence: self.check_precedence,
        }
    }
}

/// Token stream, structure and findings for one command string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub command: String,
    pub tokens: Vec<Token>,
    pub structure: CommandStructure,
    pub validation: ValidationResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityReport>,
    /// Unique placeholder names in order of appearance.
    pub placeholders: Vec<String>,
}

impl Analysis {
    pub fn is_valid(&self) -> bool {
        self.validation.is_valid()
    }

    /// Human-readable hints drawn from warnings, suggestions and security
    /// findings.
    pub fn improvement_hints(&self) -> Vec<String> {
        let findings = self.security.iter().flat_map(|r| &r.findings);
        let mut hints: Vec<String> = Vec::new();
        for diagnostic in self
            .validation
            .warnings
            .iter()
            .chain(&self.validation.suggestions)
            .chain(findings)
        {
            if !hints.contains(&diagnostic.message) {
                hints.push(diagnostic.message.clone());
            }
        }
        hints
    }
}

/// Tokenizes, parses and validates `command`.
///
/// # Examples
///
/// ```
/// use command_template_engine::analyzer::{AnalyzerOptions, analyze};
///
/// let analysis = analyze("sudo rm -rf {{dir}} && echo done", &AnalyzerOptions::default());
/// assert!(analysis.is_valid());
/// assert_eq!(analysis.structure.components.len(), 2);
/// assert_eq!(analysis.placeholders, vec!["dir"]);
/// assert!(!analysis.security.unwrap().is_clean());
/// ```
pub fn analyze(command: &str, options: &AnalyzerOptions) -> Analysis {
    let tokens = tokenize(command);
    let structure = parse(&tokens);
    let validation = validate_structure(&structure, &options.structural());
    let security = options
        .check_security
        .then(|| security::assess(command, &structure));

    debug!(
        tokens = tokens.len(),
        components = structure.components.len(),
        valid = validation.is_valid(),
        risk = ?security.as_ref().map(|r| r.risk),
        "Analyzed command"
    );

    Analysis {
        command: command.to_string(),
        placeholders: placeholder::names(command),
        tokens,
        structure,
        validation,
        security,
    }
}

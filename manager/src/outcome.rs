//! Results returned by [`CommandManager`](crate::CommandManager).
//!
//! Every outcome carries `success` and a [`ValidationResult`]; failures never
//! surface as `Err`.

use command_template_core::{BuildMode, CommandDefinition, Issue, ValidationResult};
use command_template_engine::Analysis;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandDefinition>,
    pub validation: ValidationResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
}

impl CreateOutcome {
    pub(crate) fn rejected(validation: ValidationResult, analysis: Option<Analysis>) -> Self {
        Self {
            success: false,
            command: None,
            validation,
            analysis,
        }
    }
}

/// A top-level field whose JSON value differs between two versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub from: serde_json::Value,
    pub to: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandDefinition>,
    pub validation: ValidationResult,
    pub changes: Vec<FieldChange>,
}

impl UpdateOutcome {
    pub(crate) fn rejected(validation: ValidationResult) -> Self {
        Self {
            success: false,
            command: None,
            validation,
            changes: Vec::new(),
        }
    }

    pub(crate) fn failed(issue: Issue, field: &str) -> Self {
        let mut validation = ValidationResult::new();
        validation.error(issue, Some(field));
        Self::rejected(validation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    /// RFC 3339.
    pub build_time: String,
    pub build_mode: BuildMode,
    /// Number of explicit parameter values supplied.
    pub parameter_count: usize,
    pub option_count: usize,
    pub has_required_params: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub success: bool,
    /// Output in the requested mode. `None` in validation mode or when the
    /// build could not complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_command: Option<String>,
    /// Template rendering of the same selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub validation: ValidationResult,
    pub metadata: BuildMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub success: bool,
    pub analysis: Analysis,
    /// Creation validation, when a definition was analyzed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<ValidationResult>,
    pub suggestions: Vec<String>,
}

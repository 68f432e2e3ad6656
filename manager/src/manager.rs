//! Command lifecycle orchestration.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use command_template_core::{
    BuildConfig, BuildMode, CategoryInfo, CommandDefinition, Issue, PROTECTED_FIELDS,
    UPDATABLE_FIELDS, ValidationResult,
};
use command_template_engine::validate::{CreationContext, validate_build_with, validate_definition};
use command_template_engine::{
    AnalyzerOptions, BuildSuggestions, Classifier, analyze, build, build_suggestions,
};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ManagerConfig;
use crate::error::Result;
use crate::history::{
    BuildRecord, HistoryKind, HistoryStatistics, HistoryStore, VersionAction, VersionRecord,
};
use crate::observer::{CommandEvent, CommandObserver};
use crate::outcome::{
    AnalysisOutcome, BuildMetadata, BuildOutcome, CreateOutcome, FieldChange, UpdateOutcome,
};
use crate::preprocess::preprocess;

/// Read-only inputs supplied per call by the storage collaborator.
#[derive(Clone, Copy, Default)]
pub struct ManagerContext<'a> {
    /// Known categories. `None` skips category existence checks.
    pub categories: Option<&'a [CategoryInfo]>,
    /// Commands to check for duplicate names and command lines.
    pub existing_commands: &'a [CommandDefinition],
    /// Current stored version for updates. Falls back to the latest history
    /// snapshot when absent.
    pub original_command: Option<&'a CommandDefinition>,
    /// Permit updating system commands for this call.
    pub allow_system_modification: bool,
    pub observer: Option<&'a dyn CommandObserver>,
}

impl<'a> ManagerContext<'a> {
    fn creation(&self) -> CreationContext<'a> {
        CreationContext {
            categories: self.categories,
            existing_commands: self.existing_commands,
        }
    }

    fn notify(&self, event: CommandEvent<'_>) {
        if let Some(observer) = self.observer {
            observer.on_event(&event);
        }
    }
}

/// What [`CommandManager::analyze_command_comprehensive`] looks at.
#[derive(Debug, Clone, Copy)]
pub enum AnalysisInput<'a> {
    Raw(&'a str),
    Definition(&'a CommandDefinition),
}

/// Façade over the template engine with history and notifications.
///
/// A manager is `Send + Sync`; history and the classifier cache sit behind
/// mutexes.
///
/// # Examples
///
/// ```
/// use command_template_core::{BuildConfig, BuildMode, CommandDefinition, ParameterDefinition};
/// use command_template_manager::{CommandManager, ManagerContext};
///
/// let manager = CommandManager::default();
/// let def = CommandDefinition::new("Clone repository", "git clone {{url}}")
///     .with_description("Clone a remote repository")
///     .with_category("vcs")
///     .with_parameter(ParameterDefinition::required("url").with_description("Remote URL"));
///
/// let created = manager.create_command(def, &ManagerContext::default());
/// assert!(created.success);
///
/// let command = created.command.unwrap();
/// let config = BuildConfig::new(BuildMode::Executable).with_value("url", "https://x.git");
/// let built = manager.build_command(&command, &config);
/// assert_eq!(built.built_command.as_deref(), Some("git clone https://x.git"));
/// ```
#[derive(Debug)]
pub struct CommandManager {
    config: ManagerConfig,
    classifier: Classifier,
    history: Mutex<HistoryStore>,
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl CommandManager {
    pub fn new(config: ManagerConfig) -> Self {
        let history = HistoryStore::new(config.max_history_versions);
        Self {
            config,
            classifier: Classifier::new(),
            history: Mutex::new(history),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    fn history(&self) -> MutexGuard<'_, HistoryStore> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn analyzer_options(&self, requested: &AnalyzerOptions) -> AnalyzerOptions {
        AnalyzerOptions {
            check_security: requested.check_security && self.config.enable_security,
            check_precedence: requested.check_precedence,
        }
    }

    /// Validates, stamps and records a new definition.
    pub fn create_command(
        &self,
        data: CommandDefinition,
        ctx: &ManagerContext<'_>,
    ) -> CreateOutcome {
        let def = preprocess(data);

        let mut validation = if self.config.enable_validation {
            validate_definition(&def, &ctx.creation())
        } else {
            ValidationResult::new()
        };

        let analysis = analyze(&def.command, &self.analyzer_options(&AnalyzerOptions::default()));
        validation.merge(analysis.validation.clone());
        if self.config.strict_mode {
            validation.escalate_warnings();
        }
        if let Some(report) = &analysis.security {
            validation.warnings.extend(report.findings.iter().cloned());
        }

        if !validation.is_valid() {
            warn!(
                name = %def.name,
                errors = validation.errors.len(),
                "Rejected command definition"
            );
            return CreateOutcome::rejected(validation, Some(analysis));
        }

        let command = finalize(def, false);
        if self.config.auto_save
            && let Some(id) = &command.id
        {
            self.history().record_version(
                id,
                VersionRecord {
                    command: command.clone(),
                    action: VersionAction::Created,
                    timestamp: now(),
                },
            );
        }

        ctx.notify(CommandEvent::Created { command: &command });
        info!(id = ?command.id, name = %command.name, "Created command");

        CreateOutcome {
            success: true,
            command: Some(command),
            validation,
            analysis: Some(analysis),
        }
    }

    /// Applies a partial update given as camelCase JSON fields.
    ///
    /// Only fields in [`UPDATABLE_FIELDS`] are merged; changing a field in
    /// [`PROTECTED_FIELDS`] rejects the update, other unknown fields are
    /// ignored with a warning.
    pub fn update_command(
        &self,
        id: &str,
        updates: &Map<String, Value>,
        ctx: &ManagerContext<'_>,
    ) -> UpdateOutcome {
        let original = match ctx.original_command {
            Some(command) => command.clone(),
            None => match self.history().latest_command(id) {
                Some(command) => command,
                None => return UpdateOutcome::failed(Issue::CommandNotFound(id.to_string()), "id"),
            },
        };

        let allow_system = self.config.allow_system_modification || ctx.allow_system_modification;
        if original.is_system() && !allow_system {
            return UpdateOutcome::failed(Issue::SystemCommand(id.to_string()), "isUserCreated");
        }

        let original_fields = match to_fields(&original) {
            Ok(fields) => fields,
            Err(err) => return UpdateOutcome::failed(Issue::System(err.to_string()), "general"),
        };

        let mut validation = ValidationResult::new();
        for (field, value) in updates {
            let unchanged = original_fields.get(field).unwrap_or(&Value::Null) == value;
            if PROTECTED_FIELDS.contains(&field.as_str()) && !unchanged {
                validation.error(Issue::ProtectedField(field.clone()), Some(field));
            }
        }
        if !validation.is_valid() {
            return UpdateOutcome::rejected(validation);
        }

        let mut merged_fields = original_fields.clone();
        for (field, value) in updates {
            if UPDATABLE_FIELDS.contains(&field.as_str()) {
                merged_fields.insert(field.clone(), value.clone());
            } else if !PROTECTED_FIELDS.contains(&field.as_str()) {
                validation.warn(Issue::NonUpdatableField(field.clone()), Some(field));
            }
        }

        let merged: CommandDefinition =
            match serde_json::from_value(Value::Object(merged_fields)) {
                Ok(merged) => merged,
                Err(err) => {
                    validation.error(Issue::System(err.to_string()), Some("general"));
                    return UpdateOutcome::rejected(validation);
                }
            };
        let merged = preprocess(merged);

        if self.config.enable_validation {
            let mut creation = validate_definition(&merged, &ctx.creation());
            if self.config.strict_mode {
                creation.escalate_warnings();
            }
            validation.merge(creation);
            if !validation.is_valid() {
                warn!(id, errors = validation.errors.len(), "Rejected command update");
                return UpdateOutcome::rejected(validation);
            }
        }

        let changes = match to_fields(&merged) {
            Ok(fields) => detect_changes(&original_fields, &fields),
            Err(err) => {
                validation.error(Issue::System(err.to_string()), Some("general"));
                return UpdateOutcome::rejected(validation);
            }
        };

        let updated = finalize(merged, true);
        {
            let mut history = self.history();
            history.record_version(
                id,
                VersionRecord {
                    command: original.clone(),
                    action: VersionAction::BeforeUpdate,
                    timestamp: now(),
                },
            );
            if self.config.auto_save {
                history.record_version(
                    id,
                    VersionRecord {
                        command: updated.clone(),
                        action: VersionAction::Updated,
                        timestamp: now(),
                    },
                );
            }
        }

        ctx.notify(CommandEvent::Updated {
            original: &original,
            updated: &updated,
            changes: &changes,
        });
        info!(id, version = updated.version, changed = changes.len(), "Updated command");

        UpdateOutcome {
            success: true,
            command: Some(updated),
            validation,
            changes,
        }
    }

    pub fn build_command(&self, def: &CommandDefinition, config: &BuildConfig) -> BuildOutcome {
        self.build_command_with_context(def, config, &ManagerContext::default())
    }

    /// Validates the selection and builds the command in the requested mode.
    ///
    /// The template rendering is always produced alongside.
    pub fn build_command_with_context(
        &self,
        def: &CommandDefinition,
        config: &BuildConfig,
        ctx: &ManagerContext<'_>,
    ) -> BuildOutcome {
        let mut validation = ValidationResult::new();
        if self.config.enable_validation {
            match validate_build_with(&self.classifier, def, config) {
                Ok(result) => validation.merge(result),
                Err(err) => validation.error(Issue::System(err.to_string()), Some("general")),
            }
        }

        let template_config = config.clone().with_mode(BuildMode::Template);
        let template = match build(def, &template_config) {
            Ok(template) => template,
            Err(err) => {
                if validation.is_valid() {
                    validation.error(Issue::System(err.to_string()), Some("general"));
                }
                None
            }
        };

        let built_command = match config.mode {
            BuildMode::Template => template.clone(),
            BuildMode::Validation => None,
            BuildMode::Executable => match build(def, config) {
                Ok(built) => built,
                Err(err) => {
                    // Validation has already said why when it found errors.
                    if validation.is_valid() {
                        validation.error(Issue::System(err.to_string()), Some("general"));
                    }
                    None
                }
            },
        };

        let success = validation.is_valid();
        let metadata = BuildMetadata {
            build_time: now(),
            build_mode: config.mode,
            parameter_count: config.parameter_values.len(),
            option_count: config.selected_options.len(),
            has_required_params: def.parameters.iter().any(|p| p.is_required()),
        };

        if let Some(id) = &def.id {
            self.history().record_build(
                id,
                BuildRecord {
                    config: config.clone(),
                    result: built_command.clone(),
                    success,
                    timestamp: metadata.build_time.clone(),
                },
            );
        }

        ctx.notify(CommandEvent::Built {
            command: def,
            mode: config.mode,
            result: built_command.as_deref(),
            success,
        });
        debug!(
            id = ?def.id,
            mode = %config.mode,
            success,
            errors = validation.errors.len(),
            "Built command"
        );

        BuildOutcome {
            success,
            built_command,
            template,
            validation,
            metadata,
        }
    }

    /// Read-only analysis of a raw command string or a whole definition.
    pub fn analyze_command_comprehensive(
        &self,
        input: AnalysisInput<'_>,
        options: &AnalyzerOptions,
        ctx: &ManagerContext<'_>,
    ) -> AnalysisOutcome {
        let (command, definition) = match input {
            AnalysisInput::Raw(command) => (command, None),
            AnalysisInput::Definition(def) => (def.command.as_str(), Some(def)),
        };

        let analysis = analyze(command, &self.analyzer_options(options));

        let definition = definition
            .filter(|_| self.config.enable_validation)
            .map(|def| validate_definition(def, &ctx.creation()));

        let mut suggestions = Vec::new();
        if self.config.enable_suggestions {
            let definition_hints = definition.iter().flat_map(|v| {
                v.warnings
                    .iter()
                    .chain(&v.suggestions)
                    .map(|d| d.message.clone())
            });
            for hint in analysis.improvement_hints().into_iter().chain(definition_hints) {
                if !suggestions.contains(&hint) {
                    suggestions.push(hint);
                }
            }
        }

        AnalysisOutcome {
            success: true,
            analysis,
            definition,
            suggestions,
        }
    }

    pub fn build_suggestions(
        &self,
        def: &CommandDefinition,
        partial: &BuildConfig,
    ) -> BuildSuggestions {
        build_suggestions(def, partial)
    }

    /// Recorded versions of a command, oldest first.
    pub fn command_history(&self, id: &str) -> Vec<VersionRecord> {
        self.history().versions(id)
    }

    /// Recorded builds of a command, oldest first.
    pub fn build_history(&self, id: &str) -> Vec<BuildRecord> {
        self.history().builds(id)
    }

    /// Clears history for one command, or for all commands when `id` is `None`.
    /// Clears history; clearing everything also empties the classifier cache.
    pub fn clear_history(&self, id: Option<&str>, kind: HistoryKind) {
        self.history().clear(id, kind);
        if id.is_none() && kind == HistoryKind::All {
            self.classifier.clear();
        }
        debug!(id = ?id, ?kind, "Cleared history");
    }

    pub fn statistics(&self) -> HistoryStatistics {
        self.history().statistics()
    }
}

/// Reads a JSON command definition from disk.
///
/// # Errors
///
/// Returns [`IoError`](crate::ManagerError::IoError) if the file cannot be
/// read or [`JsonError`](crate::ManagerError::JsonError) if it is not a
/// definition.
pub fn load_definition(path: impl AsRef<Path>) -> Result<CommandDefinition> {
    let reader = BufReader::new(File::open(path)?);
    let def = serde_json::from_reader(reader)?;
    Ok(def)
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn new_command_id() -> String {
    format!("cmd_{}", Uuid::new_v4().simple())
}

/// Stamps id, timestamps, version and authorship.
fn finalize(mut def: CommandDefinition, is_update: bool) -> CommandDefinition {
    let now = now();
    if def.id.as_deref().is_none_or(str::is_empty) {
        def.id = Some(new_command_id());
    }
    if !is_update {
        def.is_user_created = Some(true);
    }
    if def.created_at.is_none() {
        def.created_at = Some(now.clone());
    }
    def.updated_at = Some(now);
    def.version += 1;
    def
}

fn to_fields(def: &CommandDefinition) -> serde_json::Result<Map<String, Value>> {
    match serde_json::to_value(def)? {
        Value::Object(fields) => Ok(fields),
        _ => Ok(Map::new()),
    }
}

/// Top-level fields whose JSON values differ.
fn detect_changes(original: &Map<String, Value>, updated: &Map<String, Value>) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for (field, to) in updated {
        let from = original.get(field).unwrap_or(&Value::Null);
        if from != to {
            changes.push(FieldChange {
                field: field.clone(),
                from: from.clone(),
                to: to.clone(),
            });
        }
    }
    for (field, from) in original {
        if !updated.contains_key(field) {
            changes.push(FieldChange {
                field: field.clone(),
                from: from.clone(),
                to: Value::Null,
            });
        }
    }
    changes
}

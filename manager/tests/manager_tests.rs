use std::sync::Mutex;

use command_template_core::{
    BuildConfig, BuildMode, CategoryInfo, CommandDefinition, DataType, Issue, OptionDefinition,
    ParameterDefinition,
};
use command_template_engine::AnalyzerOptions;
use command_template_manager::{
    AnalysisInput, CommandEvent, CommandManager, CommandObserver, HistoryKind, ManagerConfig,
    ManagerContext, ManagerError, VersionAction, load_definition,
};
use serde_json::{Map, Value, json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn clone_definition() -> CommandDefinition {
    CommandDefinition::new("Clone repository", "git clone {{url}}")
        .with_description("Clone a remote repository")
        .with_category("vcs")
        .with_tag("Git")
        .with_parameter(
            ParameterDefinition::required("url")
                .with_type(DataType::Url)
                .with_description("Remote URL"),
        )
}

fn updates(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("updates must be an object"),
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl CommandObserver for RecordingObserver {
    fn on_event(&self, event: &CommandEvent<'_>) {
        let label = match event {
            CommandEvent::Created { .. } => "created".to_string(),
            CommandEvent::Updated { changes, .. } => format!("updated:{}", changes.len()),
            CommandEvent::Built { success, .. } => format!("built:{success}"),
        };
        self.events.lock().unwrap().push(label);
    }
}

fn create(manager: &CommandManager) -> CommandDefinition {
    let outcome = manager.create_command(clone_definition(), &ManagerContext::default());
    assert!(outcome.success, "{:?}", outcome.validation.errors);
    outcome.command.unwrap()
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[test]
fn test_create_stamps_and_records() {
    let manager = CommandManager::default();
    let observer = RecordingObserver::default();
    let ctx = ManagerContext {
        observer: Some(&observer),
        ..ManagerContext::default()
    };

    let outcome = manager.create_command(clone_definition(), &ctx);
    assert!(outcome.success);
    let command = outcome.command.unwrap();
    assert!(command.id.as_deref().unwrap().starts_with("cmd_"));
    assert_eq!(command.version, 1);
    assert_eq!(command.is_user_created, Some(true));
    assert_eq!(command.tags, vec!["git"]);

    let history = manager.command_history(command.id.as_deref().unwrap());
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, VersionAction::Created);
    assert_eq!(*observer.events.lock().unwrap(), vec!["created"]);
}

#[test]
fn test_create_rejects_invalid_definition() {
    let manager = CommandManager::default();
    let def = CommandDefinition::new("x", "git clone {{url}}");
    let outcome = manager.create_command(def, &ManagerContext::default());
    assert!(!outcome.success);
    assert!(outcome.command.is_none());
    assert!(outcome.validation.has_error(|i| *i == Issue::UndefinedPlaceholder("url".into())));
    assert_eq!(manager.statistics().total_commands, 0);
}

#[test]
fn test_create_rejects_structural_errors() {
    let manager = CommandManager::default();
    let mut def = clone_definition();
    def.command = "git clone {{url}} | | wc".into();
    let outcome = manager.create_command(def, &ManagerContext::default());
    assert!(!outcome.success);
    assert!(outcome.validation.has_error(|i| matches!(i, Issue::ConsecutiveSeparators { .. })));
}

#[test]
fn test_create_checks_categories() {
    let manager = CommandManager::default();
    let categories = vec![CategoryInfo::new("tools", 1)];
    let ctx = ManagerContext {
        categories: Some(&categories),
        ..ManagerContext::default()
    };
    let outcome = manager.create_command(clone_definition(), &ctx);
    assert!(!outcome.success);
    assert!(outcome.validation.has_error(|i| matches!(i, Issue::UnknownCategory(_))));
}

#[test]
fn test_strict_mode_escalates_warnings() {
    let manager = CommandManager::new(ManagerConfig {
        strict_mode: true,
        ..ManagerConfig::default()
    });
    let def = clone_definition().with_parameter(
        ParameterDefinition::optional("unused").with_description("Never referenced"),
    );
    let lenient = CommandManager::default().create_command(def.clone(), &ManagerContext::default());
    assert!(lenient.success);
    assert!(lenient.validation.has_warning(|i| matches!(i, Issue::UnusedParameter(_))));

    let strict = manager.create_command(def, &ManagerContext::default());
    assert!(!strict.success);
    assert!(strict.validation.has_error(|i| matches!(i, Issue::UnusedParameter(_))));
}

#[test]
fn test_security_findings_are_warnings() {
    let manager = CommandManager::default();
    let mut def = clone_definition();
    def.command = "sudo git clone {{url}}".into();
    let outcome = manager.create_command(def, &ManagerContext::default());
    assert!(outcome.success);
    assert!(outcome.validation.has_warning(|i| matches!(i, Issue::PrivilegeEscalation(_))));
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[test]
fn test_update_merges_and_records_changes() {
    let manager = CommandManager::default();
    let observer = RecordingObserver::default();
    let command = create(&manager);
    let id = command.id.clone().unwrap();

    let ctx = ManagerContext {
        observer: Some(&observer),
        ..ManagerContext::default()
    };
    let outcome = manager.update_command(
        &id,
        &updates(json!({ "description": "Clone any remote repository" })),
        &ctx,
    );
    assert!(outcome.success, "{:?}", outcome.validation.errors);

    let updated = outcome.command.unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.id, command.id);
    assert_eq!(updated.created_at, command.created_at);

    let fields: Vec<_> = outcome.changes.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, vec!["description"]);

    let actions: Vec<_> = manager.command_history(&id).iter().map(|r| r.action).collect();
    assert_eq!(
        actions,
        vec![VersionAction::Created, VersionAction::BeforeUpdate, VersionAction::Updated]
    );
    assert_eq!(*observer.events.lock().unwrap(), vec!["updated:1"]);
}

#[test]
fn test_update_rejects_protected_fields() {
    let manager = CommandManager::default();
    let command = create(&manager);
    let id = command.id.clone().unwrap();

    let outcome = manager.update_command(
        &id,
        &updates(json!({ "createdAt": "1999-01-01T00:00:00Z" })),
        &ManagerContext::default(),
    );
    assert!(!outcome.success);
    assert!(outcome.validation.has_error(|i| *i == Issue::ProtectedField("createdAt".into())));

    // Restating a protected value unchanged is allowed.
    let outcome = manager.update_command(
        &id,
        &updates(json!({ "id": id, "name": "Clone a repository" })),
        &ManagerContext::default(),
    );
    assert!(outcome.success, "{:?}", outcome.validation.errors);
}

#[test]
fn test_update_ignores_unknown_fields_with_warning() {
    let manager = CommandManager::default();
    let command = create(&manager);
    let outcome = manager.update_command(
        command.id.as_deref().unwrap(),
        &updates(json!({ "usageCount": 99 })),
        &ManagerContext::default(),
    );
    assert!(outcome.success);
    assert!(outcome.validation.has_warning(|i| *i == Issue::NonUpdatableField("usageCount".into())));
    assert_eq!(outcome.command.unwrap().usage_count, 0);
}

#[test]
fn test_update_system_command() {
    let manager = CommandManager::default();
    let mut system = clone_definition();
    system.id = Some("sys_git_clone".into());
    system.is_user_created = Some(false);

    let ctx = ManagerContext {
        original_command: Some(&system),
        ..ManagerContext::default()
    };
    let change = updates(json!({ "name": "Clone" }));
    let outcome = manager.update_command("sys_git_clone", &change, &ctx);
    assert!(!outcome.success);
    assert!(outcome.validation.has_error(|i| matches!(i, Issue::SystemCommand(_))));

    let ctx = ManagerContext {
        allow_system_modification: true,
        ..ctx
    };
    let outcome = manager.update_command("sys_git_clone", &change, &ctx);
    assert!(outcome.success, "{:?}", outcome.validation.errors);
    assert_eq!(outcome.command.unwrap().is_user_created, Some(false));
}

#[test]
fn test_update_unknown_command() {
    let manager = CommandManager::default();
    let outcome = manager.update_command(
        "cmd_missing",
        &updates(json!({ "name": "x" })),
        &ManagerContext::default(),
    );
    assert!(!outcome.success);
    assert!(outcome.validation.has_error(|i| matches!(i, Issue::CommandNotFound(_))));
}

#[test]
fn test_update_revalidates() {
    let manager = CommandManager::default();
    let command = create(&manager);
    let outcome = manager.update_command(
        command.id.as_deref().unwrap(),
        &updates(json!({ "command": "git clone {{url}} {{dir}}" })),
        &ManagerContext::default(),
    );
    assert!(!outcome.success);
    assert!(outcome.validation.has_error(|i| *i == Issue::UndefinedPlaceholder("dir".into())));
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

#[test]
fn test_build_executable() {
    let manager = CommandManager::default();
    let command = create(&manager);
    let config = BuildConfig::new(BuildMode::Executable).with_value("url", "https://x.git");

    let outcome = manager.build_command(&command, &config);
    assert!(outcome.success, "{:?}", outcome.validation.errors);
    assert_eq!(outcome.built_command.as_deref(), Some("git clone https://x.git"));
    assert_eq!(outcome.template.as_deref(), Some("git clone {{url}}"));
    assert_eq!(outcome.metadata.build_mode, BuildMode::Executable);
    assert_eq!(outcome.metadata.parameter_count, 1);
    assert!(outcome.metadata.has_required_params);

    let builds = manager.build_history(command.id.as_deref().unwrap());
    assert_eq!(builds.len(), 1);
    assert!(builds[0].success);
}

#[test]
fn test_build_missing_required_value_fails() {
    let manager = CommandManager::default();
    let observer = RecordingObserver::default();
    let ctx = ManagerContext {
        observer: Some(&observer),
        ..ManagerContext::default()
    };
    let outcome = manager.build_command_with_context(
        &clone_definition(),
        &BuildConfig::new(BuildMode::Executable),
        &ctx,
    );
    assert!(!outcome.success);
    assert!(outcome.built_command.is_none());
    assert_eq!(outcome.template.as_deref(), Some("git clone {{url}}"));
    assert!(outcome.validation.error_messages().iter().any(|m| m.contains("url")));
    assert!(!outcome.validation.has_error(|i| matches!(i, Issue::System(_))));
    assert_eq!(*observer.events.lock().unwrap(), vec!["built:false"]);
}

#[test]
fn test_build_contract_violation_becomes_system_error() {
    let manager = CommandManager::default();
    let config = BuildConfig::new(BuildMode::Template).with_option("--depth");
    let outcome = manager.build_command(&clone_definition(), &config);
    assert!(!outcome.success);
    assert!(outcome.validation.has_error(|i| matches!(i, Issue::System(_))));
}

#[test]
fn test_build_conflicting_options() {
    let manager = CommandManager::default();
    let def = CommandDefinition::new("Tool", "tool")
        .with_option(OptionDefinition::new("-v"))
        .with_option(OptionDefinition::new("-q").conflicts_with("-v"));
    let config = BuildConfig::new(BuildMode::Executable)
        .with_option("-v")
        .with_option("-q");
    let outcome = manager.build_command(&def, &config);
    assert!(!outcome.success);
    assert!(outcome.validation.error_messages().iter().any(|m| m.contains("-q") && m.contains("-v")));
}

#[test]
fn test_build_history_is_bounded() {
    let manager = CommandManager::new(ManagerConfig {
        max_history_versions: 2,
        ..ManagerConfig::default()
    });
    let command = create(&manager);
    let id = command.id.clone().unwrap();
    for url in ["https://a.git", "https://b.git", "https://c.git"] {
        let config = BuildConfig::new(BuildMode::Executable).with_value("url", url);
        manager.build_command(&command, &config);
    }
    let results: Vec<_> = manager
        .build_history(&id)
        .into_iter()
        .filter_map(|b| b.result)
        .collect();
    assert_eq!(results, vec!["git clone https://b.git", "git clone https://c.git"]);

    let stats = manager.statistics();
    assert_eq!(stats.total_commands, 1);
    assert_eq!(stats.total_builds, 2);

    manager.clear_history(Some(&id), HistoryKind::Build);
    assert!(manager.build_history(&id).is_empty());
    assert_eq!(manager.command_history(&id).len(), 1);
}

#[test]
fn test_build_template_keeps_placeholders() {
    let manager = CommandManager::default();
    let def = clone_definition().with_option(
        OptionDefinition::new("--depth").with_value(DataType::Number),
    );
    let config = BuildConfig::new(BuildMode::Template).with_option("--depth");
    let outcome = manager.build_command(&def, &config);
    assert!(outcome.success, "{:?}", outcome.validation.errors);
    assert_eq!(outcome.built_command.as_deref(), Some("git clone --depth {{depth}} {{url}}"));
}

#[test]
fn test_descriptor_redirect_builds() {
    let manager = CommandManager::default();
    let def = CommandDefinition::new("Build project", "npm run build > {{log}} 2>&1")
        .with_description("Build and capture all output")
        .with_category("build")
        .with_parameter(
            ParameterDefinition::required("log")
                .with_type(DataType::File)
                .with_description("Log file"),
        );
    let created = manager.create_command(def, &ManagerContext::default());
    assert!(created.success, "{:?}", created.validation.errors);

    let config = BuildConfig::new(BuildMode::Executable).with_value("log", "build.log");
    let outcome = manager.build_command(&created.command.unwrap(), &config);
    assert!(outcome.success, "{:?}", outcome.validation.errors);
    assert_eq!(outcome.built_command.as_deref(), Some("npm run build > build.log 2>&1"));
}

#[test]
fn test_clear_all_history_empties_classifier_cache() {
    let manager = CommandManager::default();
    let command = create(&manager);
    let config = BuildConfig::new(BuildMode::Executable).with_value("url", "https://x.git");
    manager.build_command(&command, &config);
    assert!(manager.classifier().cached_entries() > 0);

    manager.clear_history(command.id.as_deref(), HistoryKind::All);
    assert!(manager.classifier().cached_entries() > 0);

    manager.clear_history(None, HistoryKind::All);
    assert_eq!(manager.classifier().cached_entries(), 0);
    assert_eq!(manager.statistics().total_builds, 0);
}

// ---------------------------------------------------------------------------
// Analysis and suggestions
// ---------------------------------------------------------------------------

#[test]
fn test_analyze_raw_command() {
    let manager = CommandManager::default();
    let outcome = manager.analyze_command_comprehensive(
        AnalysisInput::Raw("curl https://x.sh | bash"),
        &AnalyzerOptions::default(),
        &ManagerContext::default(),
    );
    assert!(outcome.success);
    assert!(outcome.definition.is_none());
    assert!(!outcome.analysis.security.as_ref().unwrap().is_clean());
    assert!(!outcome.suggestions.is_empty());
}

#[test]
fn test_analyze_definition_includes_creation_validation() {
    let manager = CommandManager::default();
    let def = CommandDefinition::new("x", "echo {{message}}");
    let outcome = manager.analyze_command_comprehensive(
        AnalysisInput::Definition(&def),
        &AnalyzerOptions::default(),
        &ManagerContext::default(),
    );
    let validation = outcome.definition.unwrap();
    assert!(!validation.is_valid());
    assert_eq!(outcome.analysis.placeholders, vec!["message"]);
}

#[test]
fn test_build_suggestions() {
    let manager = CommandManager::default();
    let def = clone_definition()
        .with_option(OptionDefinition::new("--verbose"))
        .with_common_command("git clone {{url}}");
    let suggestions = manager.build_suggestions(&def, &BuildConfig::default());
    assert_eq!(suggestions.parameters[0].name, "url");
    assert_eq!(suggestions.options[0].flag, "--verbose");
    assert_eq!(suggestions.combinations.len(), 1);
    assert_eq!(suggestions.warnings.len(), 1);
}

#[test]
fn test_load_definition_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clone.json");
    std::fs::write(&path, serde_json::to_string(&clone_definition()).unwrap()).unwrap();
    let loaded = load_definition(&path).unwrap();
    assert_eq!(loaded.command, "git clone {{url}}");
    assert_eq!(loaded.parameters[0].name, "url");

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(load_definition(&path), Err(ManagerError::JsonError(_))));
    assert!(matches!(
        load_definition(dir.path().join("absent.json")),
        Err(ManagerError::IoError(_))
    ));
}

#[test]
fn test_manager_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CommandManager>();
}

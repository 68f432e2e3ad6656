//! Validation of a build selection against its definition.

use command_template_core::{
    BuildConfig, BuildMode, CommandDefinition, Condition, Issue, OptionDefinition,
    ParameterDefinition, ValidationResult, ValuePolicy, placeholder, separators,
};
use tracing::debug;

use super::check_value;
use super::structural::{StructuralOptions, validate_structure};
use crate::builder::{self, check_references, occurrence_required, requires_value};
use crate::classify::{ClassificationContext, Classifier};
use crate::error::Result;
use crate::{parse, tokenize};

/// Validates `config` against `def` with a throwaway classifier.
///
/// # Examples
///
/// ```
/// use command_template_core::{BuildConfig, BuildMode, CommandDefinition, Issue, ParameterDefinition};
/// use command_template_engine::validate::validate_build;
///
/// let def = CommandDefinition::new("Clone", "git clone {{url}}")
///     .with_parameter(ParameterDefinition::required("url"));
/// let result = validate_build(&def, &BuildConfig::new(BuildMode::Executable)).unwrap();
/// assert!(result.has_error(|i| *i == Issue::MissingRequiredValue("url".into())));
/// ```
pub fn validate_build(def: &CommandDefinition, config: &BuildConfig) -> Result<ValidationResult> {
    validate_build_with(&Classifier::new(), def, config)
}

/// Validates `config` against `def`, classifying through `classifier`.
///
/// Fails only when `config` references options, parameters or operators
/// that `def` does not declare.
pub fn validate_build_with(
    classifier: &Classifier,
    def: &CommandDefinition,
    config: &BuildConfig,
) -> Result<ValidationResult> {
    check_references(def, config)?;
    let mut result = ValidationResult::new();

    for name in placeholder::names(&def.command) {
        if def.find_parameter(&name).is_none() {
            result.error(Issue::UndefinedPlaceholder(name), Some("command"));
        }
    }

    let ctx = ClassificationContext::default();
    for param in &def.parameters {
        check_parameter(classifier, def, config, param, &ctx, &mut result);
    }

    for option in &def.options {
        check_option(def, config, option, &mut result);
    }

    if config.mode == BuildMode::Executable {
        check_executable(def, config, &mut result)?;
    }

    debug!(
        command = %def.name,
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "Validated build"
    );
    Ok(result)
}

fn check_parameter(
    classifier: &Classifier,
    def: &CommandDefinition,
    config: &BuildConfig,
    param: &ParameterDefinition,
    ctx: &ClassificationContext,
    result: &mut ValidationResult,
) {
    let active = param
        .conditional_on
        .as_ref()
        .is_some_and(|c| condition_active(def, config, c));
    let value = resolved_value(def, config, param);

    if let Some(parent) = &param.parent_option {
        if is_selected(def, config, parent) && let Some(value) = value.as_deref() {
            result.merge(classifier.validate_value(param, Some(value), ctx, active));
        }
        return;
    }

    let classification = classifier.classify(param, ctx);
    let needs_value = requires_value(def, param)
        || match classification.rules.must_have_value {
            ValuePolicy::Always => true,
            ValuePolicy::Conditional => active,
            ValuePolicy::Never => false,
        };

    match value.as_deref() {
        Some(value) => result.merge(classifier.validate_value(param, Some(value), ctx, active)),
        None if needs_value && config.validate_required && config.mode != BuildMode::Template => {
            result.error(
                Issue::MissingRequiredValue(param.name.clone()),
                Some(&param.name),
            );
        }
        None => {}
    }
}

/// Explicit value, else an inline or declared default when defaults apply.
fn resolved_value(
    def: &CommandDefinition,
    config: &BuildConfig,
    param: &ParameterDefinition,
) -> Option<String> {
    if let Some(value) = config.value(&param.name) {
        return Some(value.to_string());
    }
    if !config.use_defaults {
        return None;
    }
    placeholder::scan(&def.command)
        .into_iter()
        .filter(|p| p.name == param.name)
        .find_map(|p| p.inline_default().filter(|d| !d.is_empty()).map(str::to_string))
        .or_else(|| param.fallback().map(str::to_string))
}

fn condition_active(def: &CommandDefinition, config: &BuildConfig, condition: &Condition) -> bool {
    match condition {
        Condition::Option(flag) => is_selected(def, config, flag),
        Condition::Parameter(name) => config.value(name).is_some(),
    }
}

fn check_option(
    def: &CommandDefinition,
    config: &BuildConfig,
    option: &OptionDefinition,
    result: &mut ValidationResult,
) {
    let Some(spelling) = config.selected_spelling(option) else {
        if option.required {
            let flag = option.primary_flag().unwrap_or_default();
            result.error(Issue::RequiredOptionNotSelected(flag.to_string()), Some("options"));
        }
        return;
    };

    if option.has_value {
        let bound = def.option_parameter(option);
        let value = config.option_value(option).or_else(|| {
            bound.and_then(|p| {
                config
                    .value(&p.name)
                    .or_else(|| config.use_defaults.then(|| p.fallback()).flatten())
            })
        });
        match value {
            Some(value) => {
                if let Some(value_type) = option.value_type {
                    let allowed = bound.map(|p| p.enum_values.as_slice()).unwrap_or_default();
                    check_value(spelling, value_type, allowed, value, result);
                }
            }
            None if config.validate_required && config.mode != BuildMode::Template => {
                result.error(Issue::MissingOptionValue(spelling.to_string()), Some("options"));
            }
            None => {}
        }
    }

    for target in &option.conflicts_with {
        if is_selected(def, config, target) {
            result.error(
                Issue::OptionConflict {
                    option: spelling.to_string(),
                    conflicts_with: target.clone(),
                },
                Some("options"),
            );
        }
    }

    for requires in &option.depends_on {
        if !is_selected(def, config, requires) {
            result.error(
                Issue::MissingDependency {
                    option: spelling.to_string(),
                    requires: requires.clone(),
                },
                Some("options"),
            );
        }
    }
}

/// Whether `flag` is selected under any spelling of its declaring option.
fn is_selected(def: &CommandDefinition, config: &BuildConfig, flag: &str) -> bool {
    def.find_option(flag)
        .map_or(config.is_selected(flag), |o| config.selected_spelling(o).is_some())
}

/// Builds without enforcement and checks what comes out.
fn check_executable(
    def: &CommandDefinition,
    config: &BuildConfig,
    result: &mut ValidationResult,
) -> Result<()> {
    let mut relaxed = config.clone();
    relaxed.validate_required = false;
    let Some(built) = builder::build(def, &relaxed)? else {
        return Ok(());
    };

    let reported: Vec<String> = result
        .errors
        .iter()
        .filter_map(|d| match &d.issue {
            Issue::MissingRequiredValue(name) | Issue::UndefinedPlaceholder(name) => {
                Some(name.clone())
            }
            Issue::MissingOptionValue(flag) => def.find_option(flag).map(|o| {
                def.option_parameter(o)
                    .map_or_else(|| o.value_name(), |p| p.name.clone())
            }),
            _ => None,
        })
        .collect();

    for run in leftover_placeholders(def, config) {
        let already_reported =
            placeholder::parse_exact(&run).is_some_and(|p| reported.contains(&p.name));
        if !already_reported {
            result.error(Issue::UnsubstitutedPlaceholder(run), Some("command"));
        }
    }

    let structure = parse(&tokenize(&built));
    result.merge(validate_structure(&structure, &StructuralOptions::default()));
    Ok(())
}

/// Placeholders the builder keeps verbatim for lack of a value.
///
/// Worked out from the template rather than the built string, so values that
/// contain `{{...}}` text are never mistaken for leftovers.
fn leftover_placeholders(def: &CommandDefinition, config: &BuildConfig) -> Vec<String> {
    let mut leftovers: Vec<String> = Vec::new();
    let mut keep = |run: String| {
        if !leftovers.contains(&run) {
            leftovers.push(run);
        }
    };

    for occurrence in placeholder::scan(&def.command) {
        let param = def.find_parameter(&occurrence.name);
        let defaulted = config.use_defaults
            && (occurrence.inline_default().is_some() || param.and_then(|p| p.fallback()).is_some());
        let resolved = config.value(&occurrence.name).is_some() || defaulted;
        if !resolved && occurrence_required(&occurrence, param) {
            keep(def.command[occurrence.span.clone()].to_string());
        }
    }

    let tokens = tokenize(&def.command);
    let head = tokens
        .iter()
        .take_while(|t| {
            !(t.is_separator() && separators::lookup(&t.value).is_some_and(|s| s.is_control()))
        })
        .collect::<Vec<_>>();
    for option in def.options.iter().filter(|o| o.has_value) {
        if config.selected_spelling(option).is_none()
            || head.iter().any(|t| t.is_option() && option.matches(t.flag()))
        {
            continue;
        }
        let bound = def.option_parameter(option);
        let resolved = config.option_value(option).is_some()
            || bound.is_some_and(|p| {
                config.value(&p.name).is_some() || (config.use_defaults && p.fallback().is_some())
            });
        if !resolved {
            let name = bound.map_or_else(|| option.value_name(), |p| p.name.clone());
            keep(placeholder::render_template(&name, true));
        }
    }

    let referenced = placeholder::names(&def.command);
    for param in &def.parameters {
        if param.parent_option.is_some()
            || referenced.contains(&param.name)
            || !param.is_required()
        {
            continue;
        }
        let resolved = config.value(&param.name).is_some()
            || (config.use_defaults && param.fallback().is_some());
        if !resolved {
            keep(placeholder::render_template(&param.name, true));
        }
    }

    leftovers
}

#[cfg(test)]
mod tests {
    use command_template_core::DataType;

    use super::*;
    use crate::error::EngineError;

    fn exec() -> BuildConfig {
        BuildConfig::new(BuildMode::Executable)
    }

    fn docker() -> CommandDefinition {
        CommandDefinition::new("Run", "docker run {{image}}")
            .with_parameter(ParameterDefinition::required("image").with_description("Image"))
            .with_option(OptionDefinition::new("-d").conflicts_with("-it"))
            .with_option(OptionDefinition::new("-it"))
            .with_option(OptionDefinition::new("--rm").depends_on("-it"))
            .with_option(
                OptionDefinition::new("--publish")
                    .with_short("-p")
                    .with_value(DataType::String),
            )
    }

    #[test]
    fn test_complete_selection_is_valid() {
        let config = exec().with_value("image", "nginx").with_option("-it").with_option("--rm");
        let result = validate_build(&docker(), &config).unwrap();
        assert!(result.is_valid(), "{:?}", result.errors);
    }

    #[test]
    fn test_missing_required_value() {
        let result = validate_build(&docker(), &exec()).unwrap();
        assert!(result.has_error(|i| *i == Issue::MissingRequiredValue("image".into())));
        assert!(!result.has_error(|i| matches!(i, Issue::UnsubstitutedPlaceholder(_))));
    }

    #[test]
    fn test_required_check_can_be_disabled() {
        let mut config = BuildConfig::new(BuildMode::Template);
        config.validate_required = false;
        let result = validate_build(&docker(), &config).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_template_mode_does_not_need_values() {
        let config = BuildConfig::new(BuildMode::Template).with_option("-p");
        let result = validate_build(&docker(), &config).unwrap();
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(!result.has_error(|i| matches!(i, Issue::MissingOptionValue(_))));
    }

    #[test]
    fn test_relaxed_executable_reports_leftover_placeholder() {
        let mut config = exec();
        config.validate_required = false;
        let result = validate_build(&docker(), &config).unwrap();
        assert!(!result.has_error(|i| matches!(i, Issue::MissingRequiredValue(_))));
        assert!(result.has_error(|i| *i == Issue::UnsubstitutedPlaceholder("{{image}}".into())));
    }

    #[test]
    fn test_braces_inside_value_are_not_leftovers() {
        let def = CommandDefinition::new("Echo", "echo {{message}}")
            .with_parameter(ParameterDefinition::required("message"));
        let result = validate_build(&def, &exec().with_value("message", "{{name}}")).unwrap();
        assert!(result.is_valid(), "{:?}", result.errors);

        let result = validate_build(&def, &exec().with_value("message", "{{.Names}}")).unwrap();
        assert!(result.is_valid(), "{:?}", result.errors);
    }

    #[test]
    fn test_conflict_is_directional() {
        let config = exec().with_value("image", "nginx").with_option("-d").with_option("-it");
        let result = validate_build(&docker(), &config).unwrap();
        let conflicts: Vec<_> = result
            .errors
            .iter()
            .filter(|d| matches!(d.issue, Issue::OptionConflict { .. }))
            .collect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].message, "option -d conflicts with -it");
    }

    #[test]
    fn test_missing_dependency() {
        let config = exec().with_value("image", "nginx").with_option("--rm");
        let result = validate_build(&docker(), &config).unwrap();
        assert!(result.has_error(|i| *i
            == Issue::MissingDependency {
                option: "--rm".into(),
                requires: "-it".into(),
            }));
    }

    #[test]
    fn test_option_value_required_when_selected() {
        let config = exec().with_value("image", "nginx").with_option("-p");
        let result = validate_build(&docker(), &config).unwrap();
        assert!(result.has_error(|i| *i == Issue::MissingOptionValue("-p".into())));

        let config = config.with_option_value("-p", "8080:80");
        assert!(validate_build(&docker(), &config).unwrap().is_valid());
    }

    #[test]
    fn test_required_option_must_be_selected() {
        let def = CommandDefinition::new("Tar", "tar {{archive}}")
            .with_parameter(ParameterDefinition::required("archive"))
            .with_option(OptionDefinition::new("-f").mark_required());
        let result = validate_build(&def, &exec().with_value("archive", "a.tar")).unwrap();
        assert!(result.has_error(|i| *i == Issue::RequiredOptionNotSelected("-f".into())));
    }

    #[test]
    fn test_type_checks_values() {
        let def = CommandDefinition::new("Serve", "serve --port {{port}}")
            .with_parameter(ParameterDefinition::required("port").with_type(DataType::Number));
        let result = validate_build(&def, &exec().with_value("port", "eighty")).unwrap();
        assert!(result.has_error(|i| matches!(i, Issue::InvalidValue { .. })));
    }

    #[test]
    fn test_conditional_parameter() {
        let def = CommandDefinition::new("Ssh", "ssh {{host}}")
            .with_parameter(ParameterDefinition::required("host"))
            .with_parameter(
                ParameterDefinition::optional("key")
                    .when(Condition::Option("-i".into())),
            )
            .with_option(OptionDefinition::new("-i"));
        let base = exec().with_value("host", "server");
        assert!(validate_build(&def, &base).unwrap().is_valid());

        let active = base.with_option("-i");
        let result = validate_build(&def, &active).unwrap();
        assert!(result.has_error(|i| *i == Issue::MissingRequiredValue("key".into())));
    }

    #[test]
    fn test_inline_default_satisfies_requirement() {
        let def = CommandDefinition::new("Serve", "serve {{port:8080}}")
            .with_parameter(ParameterDefinition::required("port").with_type(DataType::Number));
        assert!(validate_build(&def, &exec()).unwrap().is_valid());
    }

    #[test]
    fn test_undefined_placeholder() {
        let def = CommandDefinition::new("Echo", "echo {{message}}");
        let result = validate_build(&def, &exec()).unwrap();
        assert!(result.has_error(|i| *i == Issue::UndefinedPlaceholder("message".into())));
        assert!(!result.has_error(|i| matches!(i, Issue::UnsubstitutedPlaceholder(_))));
    }

    #[test]
    fn test_contract_violation_is_error() {
        let err = validate_build(&docker(), &exec().with_option("--nope")).unwrap_err();
        assert_eq!(err, EngineError::UndeclaredOption("--nope".into()));
    }

    #[test]
    fn test_executable_output_is_structurally_checked() {
        let def = CommandDefinition::new("Filter", "cat {{file}}")
            .with_parameter(ParameterDefinition::required("file"));
        let config = exec().with_value("file", "a.txt").with_trailing(">", None);
        let result = validate_build(&def, &config).unwrap();
        assert!(result.has_error(|i| *i == Issue::MissingRedirectTarget(">".into())));
    }
}

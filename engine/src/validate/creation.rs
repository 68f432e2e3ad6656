//! Validation of authored command definitions.

use std::collections::HashSet;
use std::sync::LazyLock;

use command_template_core::{
    Category, CategoryInfo, CommandDefinition, Condition, DataType, Issue, ValidationResult,
    placeholder,
};
use regex::Regex;

use super::stray_placeholders;
use crate::classify::{ClassificationContext, classify};

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 100;
pub const DESCRIPTION_MIN: usize = 5;
pub const DESCRIPTION_MAX: usize = 500;
pub const COMMAND_MAX: usize = 2000;
pub const CATEGORY_MAX_LEVEL: u8 = 4;
pub const MAX_TAGS: usize = 10;
pub const TAG_MAX: usize = 20;
pub const MAX_PARAMETERS: usize = 20;
pub const PARAMETER_DESCRIPTION_MAX: usize = 200;
pub const MAX_OPTIONS: usize = 50;

/// Category reserved for deleted commands.
pub const RECYCLE_BIN: &str = "recycle-bin";

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\x{4e00}-\x{9fa5}a-zA-Z0-9\s\-_()]+$").expect("static regex must compile")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\x{4e00}-\x{9fa5}a-zA-Z0-9\-_]+$").expect("static regex must compile")
});

static PARAMETER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").expect("static regex must compile")
});

static FLAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-{1,2}[a-zA-Z][a-zA-Z0-9-]*$").expect("static regex must compile")
});

/// Read-only data supplied by the storage collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreationContext<'a> {
    /// Known categories. `None` skips the existence and depth checks.
    pub categories: Option<&'a [CategoryInfo]>,
    /// Commands to check for duplicates. Entries sharing the validated
    /// definition's id are ignored.
    pub existing_commands: &'a [CommandDefinition],
}

/// Validates an authored definition.
///
/// # Examples
///
/// ```
/// use command_template_core::{CommandDefinition, Issue, ParameterDefinition};
/// use command_template_engine::validate::{CreationContext, validate_definition};
///
/// let def = CommandDefinition::new("Clone repository", "git clone {{url}} {{dir}}")
///     .with_description("Clone a git repository")
///     .with_category("git")
///     .with_parameter(ParameterDefinition::required("url").with_description("Remote"));
///
/// let result = validate_definition(&def, &CreationContext::default());
/// assert!(result.has_error(|i| *i == Issue::UndefinedPlaceholder("dir".into())));
/// ```
pub fn validate_definition(def: &CommandDefinition, ctx: &CreationContext<'_>) -> ValidationResult {
    let mut result = ValidationResult::new();

    check_name(def, &mut result);
    check_description(def, &mut result);
    check_command(def, &mut result);
    check_category(def, ctx, &mut result);
    check_tags(def, &mut result);
    check_parameters(def, &mut result);
    check_options(def, &mut result);
    check_placeholders(def, &mut result);
    check_duplicates(def, ctx, &mut result);

    result
}

fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
    result: &mut ValidationResult,
) -> bool {
    let len = value.chars().count();
    if len == 0 {
        result.error(Issue::MissingField(field.to_string()), Some(field));
        false
    } else if len < min {
        result.error(
            Issue::TooShort {
                field: field.to_string(),
                min,
            },
            Some(field),
        );
        false
    } else if len > max {
        result.error(
            Issue::TooLong {
                field: field.to_string(),
                max,
            },
            Some(field),
        );
        false
    } else {
        true
    }
}

fn check_name(def: &CommandDefinition, result: &mut ValidationResult) {
    let name = def.name.trim();
    if check_length("name", name, NAME_MIN, NAME_MAX, result) && !NAME_RE.is_match(name) {
        result.error(
            Issue::InvalidCharacters {
                field: "name".to_string(),
            },
            Some("name"),
        );
    }
}

fn check_description(def: &CommandDefinition, result: &mut ValidationResult) {
    check_length(
        "description",
        def.description.trim(),
        DESCRIPTION_MIN,
        DESCRIPTION_MAX,
        result,
    );
}

fn check_command(def: &CommandDefinition, result: &mut ValidationResult) {
    check_length("command", def.command.trim(), 1, COMMAND_MAX, result);
}

fn check_category(def: &CommandDefinition, ctx: &CreationContext<'_>, result: &mut ValidationResult) {
    let Some(category) = def.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
        result.error(Issue::MissingField("category".to_string()), Some("category"));
        return;
    };

    if category == RECYCLE_BIN {
        result.error(Issue::ForbiddenCategory(category.to_string()), Some("category"));
        return;
    }

    let Some(categories) = ctx.categories else {
        return;
    };
    match categories.iter().find(|c| c.id == category || c.name == category) {
        None => result.error(Issue::UnknownCategory(category.to_string()), Some("category")),
        Some(info) if info.level >= CATEGORY_MAX_LEVEL => result.error(
            Issue::CategoryTooDeep {
                category: category.to_string(),
                level: info.level,
            },
            Some("category"),
        ),
        Some(_) => {}
    }
}

fn check_tags(def: &CommandDefinition, result: &mut ValidationResult) {
    if def.tags.len() > MAX_TAGS {
        result.error(
            Issue::TooMany {
                field: "tags".to_string(),
                max: MAX_TAGS,
            },
            Some("tags"),
        );
    }

    let mut seen = HashSet::new();
    for tag in &def.tags {
        if tag.chars().count() > TAG_MAX {
            result.error(
                Issue::TooLong {
                    field: format!("tag {tag}"),
                    max: TAG_MAX,
                },
                Some("tags"),
            );
        } else if !TAG_RE.is_match(tag) {
            result.error(Issue::InvalidTag(tag.clone()), Some("tags"));
        }
        if !seen.insert(tag.to_lowercase()) {
            result.error(Issue::DuplicateTag(tag.clone()), Some("tags"));
        }
    }
}

fn check_parameters(def: &CommandDefinition, result: &mut ValidationResult) {
    if def.parameters.len() > MAX_PARAMETERS {
        result.error(
            Issue::TooMany {
                field: "parameters".to_string(),
                max: MAX_PARAMETERS,
            },
            Some("parameters"),
        );
    }

    let ctx = ClassificationContext::default();
    let mut seen = HashSet::new();
    let mut seen_optional = false;

    for param in &def.parameters {
        let name = param.name.as_str();
        if name.is_empty() {
            result.error(
                Issue::MissingField("parameter name".to_string()),
                Some("parameters"),
            );
            continue;
        }
        if !PARAMETER_NAME_RE.is_match(name) {
            result.error(Issue::InvalidParameterName(name.to_string()), Some("parameters"));
        }
        if !seen.insert(name) {
            result.error(Issue::DuplicateParameter(name.to_string()), Some("parameters"));
        }

        if param.description.trim().is_empty() {
            result.warn(Issue::MissingDescription(name.to_string()), Some("parameters"));
        } else if param.description.chars().count() > PARAMETER_DESCRIPTION_MAX {
            result.error(
                Issue::TooLong {
                    field: format!("description of {name}"),
                    max: PARAMETER_DESCRIPTION_MAX,
                },
                Some("parameters"),
            );
        }

        if param.is_required() {
            if seen_optional {
                result.warn(
                    Issue::RequiredAfterOptional(name.to_string()),
                    Some("parameters"),
                );
            }
            if param.fallback().is_some() {
                result.warn(Issue::RequiredWithDefault(name.to_string()), Some("parameters"));
            }
        } else {
            seen_optional = true;
        }

        if param.data_type == DataType::Enum && param.enum_values.is_empty() {
            result.warn(
                Issue::MissingField(format!("enum values of {name}")),
                Some("parameters"),
            );
        }

        if classify(param, &ctx).category == Category::Unknown {
            result.warn(
                Issue::UnknownClassification(name.to_string()),
                Some("parameters"),
            );
        }

        if let Some(parent) = &param.parent_option
            && def.find_option(parent).is_none()
        {
            result.warn(
                Issue::DanglingReference {
                    source_name: name.to_string(),
                    target: format!("option {parent}"),
                },
                Some("parameters"),
            );
        }

        let dangling_condition = match &param.conditional_on {
            Some(Condition::Option(flag)) if def.find_option(flag).is_none() => {
                Some(format!("option {flag}"))
            }
            Some(Condition::Parameter(other)) if def.find_parameter(other).is_none() => {
                Some(format!("parameter {other}"))
            }
            _ => None,
        };
        if let Some(target) = dangling_condition {
            result.warn(
                Issue::DanglingReference {
                    source_name: name.to_string(),
                    target,
                },
                Some("parameters"),
            );
        }
    }
}

fn check_options(def: &CommandDefinition, result: &mut ValidationResult) {
    if def.options.len() > MAX_OPTIONS {
        result.error(
            Issue::TooMany {
                field: "options".to_string(),
                max: MAX_OPTIONS,
            },
            Some("options"),
        );
    }

    let mut seen = HashSet::new();
    for option in &def.options {
        let Some(primary) = option.primary_flag() else {
            result.error(Issue::MissingFlag, Some("options"));
            continue;
        };

        let mut spellings: Vec<&str> = Vec::new();
        for flag in option.spellings() {
            if !spellings.contains(&flag) {
                spellings.push(flag);
            }
        }
        for flag in spellings {
            if !FLAG_RE.is_match(flag) {
                result.error(Issue::InvalidFlag(flag.to_string()), Some("options"));
            }
            if !seen.insert(flag) {
                result.error(Issue::DuplicateFlag(flag.to_string()), Some("options"));
            }
        }

        if option.has_value && option.value_type.is_none() {
            result.warn(Issue::MissingValueType(primary.to_string()), Some("options"));
        }

        for target in option.conflicts_with.iter().chain(&option.depends_on) {
            if def.find_option(target).is_none() {
                result.warn(
                    Issue::DanglingReference {
                        source_name: primary.to_string(),
                        target: format!("option {target}"),
                    },
                    Some("options"),
                );
            }
        }
    }
}

/// Every placeholder needs a definition; every definition should be used.
fn check_placeholders(def: &CommandDefinition, result: &mut ValidationResult) {
    for bad in stray_placeholders(&def.command) {
        result.warn(Issue::MalformedPlaceholder(bad), Some("command"));
    }

    let used = placeholder::names(&def.command);
    for name in &used {
        if def.find_parameter(name).is_none() {
            result.error(Issue::UndefinedPlaceholder(name.clone()), Some("command"));
        }
    }

    for param in &def.parameters {
        if param.name.is_empty() || param.parent_option.is_some() {
            continue;
        }
        if !used.contains(&param.name) {
            result.warn(Issue::UnusedParameter(param.name.clone()), Some("parameters"));
        }
    }
}

fn check_duplicates(def: &CommandDefinition, ctx: &CreationContext<'_>, result: &mut ValidationResult) {
    let name = def.name.trim().to_lowercase();
    let command = def.command.trim();
    for existing in ctx.existing_commands {
        if def.id.is_some() && existing.id == def.id {
            continue;
        }
        if !name.is_empty() && existing.name.trim().to_lowercase() == name {
            result.warn(Issue::DuplicateName(def.name.trim().to_string()), Some("name"));
        }
        if !command.is_empty() && existing.command.trim() == command {
            result.warn(Issue::DuplicateCommand(command.to_string()), Some("command"));
        }
    }
}

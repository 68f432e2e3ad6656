//! Build suggestions for a partially filled selection.

use std::sync::LazyLock;

use command_template_core::{
    BuildConfig, CommandDefinition, DataType, Diagnostic, Issue, OptionDefinition,
    ParameterDefinition, Severity, placeholder,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex must compile"));

/// Candidate values for one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSuggestion {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub values: Vec<String>,
}

/// An option that can still be added to the selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSuggestion {
    pub flag: String,
    pub description: String,
    pub score: f64,
}

/// A common command line ranked against the partial selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationSuggestion {
    pub command: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSuggestions {
    pub parameters: Vec<ParameterSuggestion>,
    pub options: Vec<OptionSuggestion>,
    pub combinations: Vec<CombinationSuggestion>,
    pub warnings: Vec<Diagnostic>,
}

/// Suggests values, options and common command lines for `partial`.
///
/// # Examples
///
/// ```
/// use command_template_core::{BuildConfig, CommandDefinition, DataType, OptionDefinition, ParameterDefinition};
/// use command_template_engine::suggest::build_suggestions;
///
/// let def = CommandDefinition::new("Serve", "serve {{port}}")
///     .with_parameter(ParameterDefinition::required("port").with_type(DataType::Number))
///     .with_option(OptionDefinition::new("--verbose"));
///
/// let suggestions = build_suggestions(&def, &BuildConfig::default());
/// assert!(suggestions.parameters[0].values.contains(&"8080".to_string()));
/// assert_eq!(suggestions.options[0].flag, "--verbose");
/// ```
pub fn build_suggestions(def: &CommandDefinition, partial: &BuildConfig) -> BuildSuggestions {
    let parameters = def
        .parameters
        .iter()
        .map(|p| ParameterSuggestion {
            name: p.name.clone(),
            description: p.description.clone(),
            required: p.is_required(),
            values: parameter_values(p),
        })
        .collect();

    let mut options: Vec<OptionSuggestion> = def
        .options
        .iter()
        .filter(|o| partial.selected_spelling(o).is_none())
        .filter(|o| !o.conflicts_with.iter().any(|c| is_selected(def, partial, c)))
        .filter_map(|o| {
            Some(OptionSuggestion {
                flag: o.primary_flag()?.to_string(),
                description: o.description.clone(),
                score: option_score(def, o, partial),
            })
        })
        .collect();
    options.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut combinations: Vec<CombinationSuggestion> = def
        .common_commands
        .iter()
        .map(|command| CombinationSuggestion {
            command: command.clone(),
            confidence: combination_confidence(command, partial),
        })
        .collect();
    combinations.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    BuildSuggestions {
        parameters,
        options,
        combinations,
        warnings: potential_issues(def, partial),
    }
}

fn parameter_values(param: &ParameterDefinition) -> Vec<String> {
    let name = param.name.to_ascii_lowercase();
    let candidates: &[&str] = match param.data_type {
        DataType::Boolean => &["true", "false"],
        DataType::Number if name.contains("port") => &["3000", "8080", "80", "443"],
        DataType::Number if name.contains("count") || name.contains("limit") => {
            &["10", "50", "100"]
        }
        DataType::String | DataType::Url if name.contains("url") || name.contains("link") => {
            &["https://example.com", "http://localhost:3000"]
        }
        DataType::String | DataType::Email if name.contains("email") => &["user@example.com"],
        DataType::File => &["./file.txt", "../path/to/file", "*.txt"],
        DataType::Directory => &["./", "../", "/path/to/directory"],
        _ => &[],
    };

    let mut values: Vec<String> = Vec::new();
    let enum_values = param.enum_values.iter().map(String::as_str);
    let defaults = param.fallback().into_iter();
    for value in defaults.chain(enum_values).chain(candidates.iter().copied()) {
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
    values
}

/// Half the score for satisfied dependencies, plus bumps for options that
/// are usually worth showing.
fn option_score(def: &CommandDefinition, option: &OptionDefinition, partial: &BuildConfig) -> f64 {
    let mut score = 0.0;
    if !option.depends_on.is_empty() {
        let satisfied = option
            .depends_on
            .iter()
            .filter(|d| is_selected(def, partial, d))
            .count();
        score += satisfied as f64 / option.depends_on.len() as f64 * 50.0;
    }
    if option.required {
        score += 20.0;
    }
    if option.matches("--help") || option.matches("-h") {
        score += 10.0;
    }
    if option.matches("--verbose") || option.matches("-v") {
        score += 5.0;
    }
    score
}

/// 50 baseline, up to 30 for placeholders the selection already fills,
/// minus up to 20 for long command lines; clamped to 0..=100.
fn combination_confidence(command: &str, partial: &BuildConfig) -> f64 {
    let mut confidence = 50.0;
    let names = placeholder::names(command);
    if !names.is_empty() {
        let matched = names.iter().filter(|n| partial.value(n).is_some()).count();
        confidence += matched as f64 / names.len() as f64 * 30.0;
    }
    let complexity = WHITESPACE_RE.find_iter(command.trim()).count().min(20);
    confidence -= complexity as f64;
    confidence.clamp(0.0, 100.0)
}

fn potential_issues(def: &CommandDefinition, partial: &BuildConfig) -> Vec<Diagnostic> {
    let mut warnings = Vec::new();
    for param in def.parameters.iter().filter(|p| p.is_required()) {
        if partial.value(&param.name).is_none() {
            warnings.push(Diagnostic::new(
                Severity::Warning,
                Issue::MissingRequiredValue(param.name.clone()),
                Some(&param.name),
            ));
        }
    }
    for option in &def.options {
        let Some(spelling) = partial.selected_spelling(option) else {
            continue;
        };
        for target in option.conflicts_with.iter().filter(|c| is_selected(def, partial, c)) {
            warnings.push(Diagnostic::new(
                Severity::Warning,
                Issue::OptionConflict {
                    option: spelling.to_string(),
                    conflicts_with: target.clone(),
                },
                Some(spelling),
            ));
        }
    }
    warnings
}

fn is_selected(def: &CommandDefinition, partial: &BuildConfig, flag: &str) -> bool {
    def.find_option(flag)
        .map_or(partial.is_selected(flag), |o| partial.selected_spelling(o).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docker() -> CommandDefinition {
        CommandDefinition::new("Run", "docker run {{image}}")
            .with_parameter(ParameterDefinition::required("image"))
            .with_option(OptionDefinition::new("-d").conflicts_with("-it"))
            .with_option(OptionDefinition::new("-it"))
            .with_option(OptionDefinition::new("--rm").depends_on("-it"))
            .with_option(OptionDefinition::new("--help"))
            .with_common_command("docker run -it --rm {{image}}")
            .with_common_command("docker run {{image}}")
    }

    #[test]
    fn test_parameter_values_lead_with_default() {
        let param = ParameterDefinition::optional("format")
            .with_type(DataType::Enum)
            .with_enum_values(["json", "yaml"])
            .with_default("yaml");
        assert_eq!(parameter_values(&param), vec!["yaml", "json"]);
    }

    #[test]
    fn test_options_ranked_and_filtered() {
        let partial = BuildConfig::default().with_option("-it");
        let suggestions = build_suggestions(&docker(), &partial);
        let flags: Vec<_> = suggestions.options.iter().map(|o| o.flag.as_str()).collect();
        assert_eq!(flags, vec!["--rm", "--help"]);
        assert_eq!(suggestions.options[0].score, 50.0);
    }

    #[test]
    fn test_combinations_prefer_filled_and_short() {
        let partial = BuildConfig::default().with_value("image", "nginx");
        let suggestions = build_suggestions(&docker(), &partial);
        assert_eq!(suggestions.combinations[0].command, "docker run {{image}}");
        assert_eq!(suggestions.combinations[0].confidence, 78.0);
        assert_eq!(suggestions.combinations[1].confidence, 76.0);
    }

    #[test]
    fn test_warnings_for_missing_values_and_conflicts() {
        let partial = BuildConfig::default().with_option("-d").with_option("-it");
        let warnings = build_suggestions(&docker(), &partial).warnings;
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].issue, Issue::MissingRequiredValue("image".into()));
        assert_eq!(warnings[1].message, "option -d conflicts with -it");
        assert!(warnings.iter().all(|w| w.severity == Severity::Warning));
    }
}

//! Validation of a parsed command structure.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use command_template_core::{
    CommandStructure, Component, Issue, Token, ValidationResult, separators,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{security, stray_placeholders};
use crate::render;

static OPTION_FLAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:-[a-zA-Z0-9][a-zA-Z0-9]*|--[a-zA-Z][a-zA-Z0-9-]*|--|-\d+(?:\.\d+)?)$")
        .expect("static regex must compile")
});

static VALUE_FLAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^--?[a-zA-Z][a-zA-Z0-9-]*$").expect("static regex must compile")
});

/// Which optional checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralOptions {
    /// Report injection patterns, destructive and privileged commands.
    pub check_security: bool,
    /// Report operator precedence hazards.
    pub check_precedence: bool,
}

impl Default for StructuralOptions {
    fn default() -> Self {
        Self {
            check_security: false,
            check_precedence: true,
        }
    }
}

/// Validates a parsed structure.
///
/// # Examples
///
/// ```
/// use command_template_core::Issue;
/// use command_template_engine::validate::{StructuralOptions, validate_structure};
/// use command_template_engine::{parse, tokenize};
///
/// let structure = parse(&tokenize("cmd1 | | cmd2"));
/// let result = validate_structure(&structure, &StructuralOptions::default());
/// assert!(result.has_error(|i| matches!(i, Issue::ConsecutiveSeparators { .. })));
/// ```
pub fn validate_structure(
    structure: &CommandStructure,
    options: &StructuralOptions,
) -> ValidationResult {
    let mut result = ValidationResult::new();

    if structure.is_empty() {
        result.error(Issue::EmptyCommand, Some("command"));
        return result;
    }

    check_operator_placement(&structure.tokens, &mut result);

    for (index, component) in structure.components.iter().enumerate() {
        check_component(index, component, &mut result);
    }

    for token in &structure.tokens {
        if token.flags.unterminated_quote {
            result.warn(Issue::UnterminatedQuote(token.text.clone()), Some("command"));
        }
        for bad in stray_placeholders(&token.text) {
            result.warn(Issue::MalformedPlaceholder(bad), Some("command"));
        }
    }

    if options.check_precedence {
        check_precedence(structure, &mut result);
    }

    if options.check_security {
        result.merge(security::scan(&render(structure), structure));
    }

    result
}

fn check_operator_placement(tokens: &[Token], result: &mut ValidationResult) {
    for (index, token) in tokens.iter().enumerate() {
        if !token.is_separator() {
            continue;
        }
        let Some(spec) = separators::lookup(&token.value) else {
            continue;
        };

        match index.checked_sub(1).map(|i| &tokens[i]) {
            None if spec.rules.requires_command_before => {
                result.error(Issue::LeadingSeparator(token.value.clone()), Some("command"));
            }
            Some(previous)
                if previous.is_separator()
                    && !separators::is_allowed_sequence(&previous.value, &token.value) =>
            {
                result.error(
                    Issue::ConsecutiveSeparators {
                        first: previous.value.clone(),
                        second: token.value.clone(),
                    },
                    Some("command"),
                );
            }
            _ => {}
        }

        if index + 1 == tokens.len() && spec.rules.requires_command_after {
            result.warn(Issue::DanglingSeparator(token.value.clone()), Some("command"));
        }
    }
}

fn check_component(index: usize, component: &Component, result: &mut ValidationResult) {
    if component.is_empty() {
        return;
    }

    if component.base_command.is_none() {
        result.error(Issue::MissingBaseCommand(index), Some("command"));
    }

    let mut operator_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for redirect in &component.redirects {
        if redirect.target.is_none() {
            result.error(
                Issue::MissingRedirectTarget(redirect.operator.value.clone()),
                Some("command"),
            );
        }
        *operator_counts
            .entry(redirect.operator.text.as_str())
            .or_default() += 1;
    }
    for (symbol, count) in operator_counts {
        let chainable =
            separators::lookup(separators::operator_symbol(symbol)).is_none_or(|s| s.can_chain);
        if count > 1 && !chainable {
            result.warn(Issue::RepeatedOperator(symbol.to_string()), Some("command"));
        }
    }

    if let Some(terminator) = &component.terminator
        && separators::lookup(&terminator.value).is_some_and(|s| s.rules.is_terminal)
        && !component.trailing.is_empty()
    {
        result.error(Issue::BackgroundNotTerminal, Some("command"));
    }

    let mut seen = HashSet::new();
    for option in &component.options {
        if !is_well_formed_option(option) {
            result.error(Issue::MalformedOption(option.text.clone()), Some("command"));
        }
        if !seen.insert(option.text.as_str()) {
            result.warn(
                Issue::DuplicateOptionToken(option.text.clone()),
                Some("command"),
            );
        }
    }
}

/// Short (`-x`, `-abc`), long (`--opt`), GNU (`--opt=value`), `--`, or a
/// negative number.
fn is_well_formed_option(option: &Token) -> bool {
    let flag = option.flag();
    if flag.contains("{{") {
        return true;
    }
    match option.option_value() {
        Some(value) => !value.is_empty() && VALUE_FLAG_RE.is_match(flag),
        None => OPTION_FLAG_RE.is_match(flag),
    }
}

/// Flags `&&`/`||` chains that rely on left-to-right evaluation.
fn check_precedence(structure: &CommandStructure, result: &mut ValidationResult) {
    let logic: HashSet<&str> = structure
        .separators
        .iter()
        .map(|t| t.value.as_str())
        .filter(|s| *s == "&&" || *s == "||")
        .collect();
    if logic.len() > 1 {
        result.suggest(Issue::MixedLogicChain, Some("command"));
    }
}

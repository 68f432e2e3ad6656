//! Structural parser: groups tokens into pipeline components.
//!
//! Parsing is permissive. Leading operators, stray tokens and missing
//! targets all produce a structure; the structural validator decides what
//! is wrong with it. This keeps partially typed commands re-parseable.

use std::collections::BTreeMap;

use command_template_core::{
    CommandStructure, Component, Redirect, Token, TokenKind, separators,
};

/// Known subcommands per base command.
static KNOWN_SUBCOMMANDS: &[(&str, &[&str])] = &[
    (
        "git",
        &[
            "clone", "pull", "push", "commit", "add", "status", "log", "branch", "checkout",
            "merge", "fetch", "rebase", "diff", "tag", "stash", "remote", "reset", "switch",
        ],
    ),
    (
        "docker",
        &[
            "run", "build", "pull", "push", "ps", "images", "exec", "logs", "stop", "start",
            "rm", "rmi", "compose",
        ],
    ),
    (
        "npm",
        &[
            "install", "run", "build", "test", "publish", "init", "start", "stop", "ci",
            "uninstall", "update",
        ],
    ),
    (
        "yarn",
        &["add", "remove", "install", "run", "build", "test", "upgrade"],
    ),
    (
        "pnpm",
        &["add", "remove", "install", "run", "build", "test", "update"],
    ),
    (
        "kubectl",
        &[
            "get", "create", "delete", "apply", "describe", "logs", "exec", "edit", "scale",
            "rollout",
        ],
    ),
    ("aws", &["s3", "ec2", "iam", "lambda", "cloudformation", "sts"]),
    (
        "cargo",
        &[
            "build", "run", "test", "check", "clippy", "fmt", "doc", "publish", "add", "new",
            "install",
        ],
    ),
];

/// Subcommands recognised after `base`, or an empty slice.
///
/// # Examples
///
/// ```
/// use command_template_engine::parser::known_subcommands;
///
/// assert!(known_subcommands("git").contains(&"clone"));
/// assert!(known_subcommands("ls").is_empty());
/// ```
pub fn known_subcommands(base: &str) -> &'static [&'static str] {
    KNOWN_SUBCOMMANDS
        .iter()
        .find(|(name, _)| *name == base)
        .map(|(_, subs)| *subs)
        .unwrap_or(&[])
}

pub fn is_known_subcommand(base: &str, word: &str) -> bool {
    known_subcommands(base).contains(&word)
}

pub struct StructureParser;

impl StructureParser {
    pub fn parse(tokens: &[Token]) -> CommandStructure {
        let mut structure = CommandStructure {
            tokens: tokens.to_vec(),
            ..CommandStructure::default()
        };
        let mut current = Component::default();
        // Set after `&` until an operator opens the next component.
        let mut after_background = false;
        let mut iter = tokens.iter().peekable();

        while let Some(token) = iter.next() {
            if !token.is_separator() {
                if after_background {
                    if let Some(last) = structure.components.last_mut() {
                        last.trailing.push(token.clone());
                    }
                } else {
                    attach(&mut current, token);
                }
                continue;
            }

            structure.separators.push(token.clone());
            let Some(spec) = separators::lookup(&token.value) else {
                continue;
            };

            if spec.is_redirect() {
                let target = match iter.peek() {
                    Some(next) if !next.is_separator() => iter.next().cloned(),
                    _ => None,
                };
                let redirect = Redirect {
                    operator: token.clone(),
                    target,
                };
                if after_background {
                    if let Some(last) = structure.components.last_mut() {
                        last.trailing.push(redirect.operator);
                        last.trailing.extend(redirect.target);
                    }
                } else {
                    current.tokens.push(redirect.operator.clone());
                    current.tokens.extend(redirect.target.clone());
                    current.redirects.push(redirect);
                }
                continue;
            }

            if after_background {
                after_background = !spec.opens_component();
                continue;
            }

            current.terminator = Some(token.clone());
            structure.components.push(std::mem::take(&mut current));
            after_background = !spec.opens_component();
        }

        if !current.is_empty() {
            structure.components.push(current);
        }

        flatten(&mut structure);
        structure
    }
}

/// Parses a token stream. See [`StructureParser`].
///
/// # Examples
///
/// ```
/// use command_template_engine::{parse, tokenize};
///
/// let structure = parse(&tokenize("git log --oneline | head -n 5"));
/// assert_eq!(structure.components.len(), 2);
/// assert_eq!(structure.base_command.as_ref().unwrap().value, "git");
/// assert_eq!(structure.subcommands[0].value, "log");
/// ```
pub fn parse(tokens: &[Token]) -> CommandStructure {
    StructureParser::parse(tokens)
}

/// Renders a structure back into a command string.
///
/// Words are gathered from the parsed components (base command, subcommand,
/// options, arguments, parameters, redirect targets and trailing words) and
/// operators from the separator list, then laid out in source order. Words
/// keep their source text (quotes and escapes included); whitespace is
/// normalised to single spaces and operators follow the registry's spacing
/// rules.
///
/// # Examples
///
/// ```
/// use command_template_engine::{parse, render, tokenize};
///
/// let structure = parse(&tokenize("make   build;make test"));
/// assert_eq!(render(&structure), "make build; make test");
/// ```
pub fn render(structure: &CommandStructure) -> String {
    let mut ordered: BTreeMap<usize, &Token> = BTreeMap::new();
    for component in &structure.components {
        let words = component
            .base_command
            .iter()
            .chain(&component.subcommand)
            .chain(&component.options)
            .chain(&component.arguments)
            .chain(&component.parameters)
            .chain(component.redirects.iter().filter_map(|r| r.target.as_ref()))
            .chain(&component.trailing);
        for token in words {
            ordered.insert(token.span.start, token);
        }
    }
    for operator in &structure.separators {
        ordered.insert(operator.span.start, operator);
    }

    separators::join_spaced(
        ordered
            .into_values()
            .map(|t| (t.text.as_str(), t.is_separator())),
    )
}

fn attach(component: &mut Component, token: &Token) {
    component.tokens.push(token.clone());
    match token.kind {
        TokenKind::Option => component.options.push(token.clone()),
        TokenKind::Parameter => component.parameters.push(token.clone()),
        TokenKind::Argument | TokenKind::Path => {
            let Some(base) = &component.base_command else {
                component.base_command = Some(token.clone());
                return;
            };
            if component.subcommand.is_none()
                && token.kind == TokenKind::Argument
                && is_known_subcommand(&base.value, &token.value)
            {
                component.subcommand = Some(token.clone());
            } else {
                component.arguments.push(token.clone());
            }
        }
        TokenKind::Quoted => component.arguments.push(token.clone()),
        TokenKind::Separator => {}
    }
}

fn flatten(structure: &mut CommandStructure) {
    structure.base_command = structure
        .components
        .iter()
        .find_map(|c| c.base_command.clone());
    for component in &structure.components {
        structure.subcommands.extend(component.subcommand.clone());
        structure.options.extend(component.options.iter().cloned());
        structure.arguments.extend(component.arguments.iter().cloned());
        structure.parameters.extend(component.parameters.iter().cloned());
    }
}

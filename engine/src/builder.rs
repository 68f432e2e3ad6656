//! Command builder.
//!
//! Composes a command string from a definition and a selection set in a
//! fixed order:
//!
//! 1. template head (leading literal words such as `git clone`)
//! 2. selected subcommands not already in the template
//! 3. selected options in declaration order, skipping flags the template
//!    already spells out, each followed by its value when it takes one
//! 4. the rest of the first component with placeholders substituted
//! 5. declared parameters the template never references
//! 6. the remaining components of the template
//! 7. trailing operator segments
//!
//! The builder is a pure function of its inputs.

use command_template_core::placeholder::{self, Placeholder};
use command_template_core::{
    BuildConfig, BuildMode, CommandDefinition, OptionDefinition, ParameterDefinition, Token,
    separators,
};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::tokenize;

/// Characters that force double quoting of an unquoted value.
const SPECIAL_CHARS: &[char] = &[
    '<', '>', '"', '\'', '|', '&', ';', '(', ')', '$', '`', '\\', '*', '?', '#', '~', '{',
    '}',
];

/// Characters escaped with a backslash inside double quotes.
const DOUBLE_QUOTE_ESCAPED: &[char] = &['\\', '"', '$', '`'];

/// Quoting context of a position inside a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteContext {
    Unquoted,
    Single,
    Double,
}

/// Escapes `value` for insertion in `context`.
///
/// # Examples
///
/// ```
/// use command_template_engine::builder::{QuoteContext, escape_value};
///
/// assert_eq!(escape_value("plain", QuoteContext::Unquoted), "plain");
/// assert_eq!(escape_value("my app", QuoteContext::Unquoted), "\"my app\"");
/// assert_eq!(escape_value("say \"hi\"", QuoteContext::Unquoted), r#""say \"hi\"""#);
/// assert_eq!(escape_value("$HOME", QuoteContext::Double), r"\$HOME");
/// assert_eq!(escape_value("{{name}}", QuoteContext::Unquoted), "\"{{name}}\"");
/// assert_eq!(escape_value("it's", QuoteContext::Single), r"it'\''s");
/// ```
pub fn escape_value(value: &str, context: QuoteContext) -> String {
    match context {
        QuoteContext::Unquoted => {
            if value.contains(char::is_whitespace) || value.contains(SPECIAL_CHARS) {
                format!("\"{}\"", escape_double_quoted(value))
            } else {
                value.to_string()
            }
        }
        QuoteContext::Double => escape_double_quoted(value),
        QuoteContext::Single => value.replace('\'', r"'\''"),
    }
}

fn escape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        if DOUBLE_QUOTE_ESCAPED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Quoting context at byte `offset` of a word's source text.
pub fn quote_context(text: &str, offset: usize) -> QuoteContext {
    let mut context = QuoteContext::Unquoted;
    let mut chars = text.char_indices();
    while let Some((idx, ch)) = chars.next() {
        if idx >= offset {
            break;
        }
        match (context, ch) {
            (QuoteContext::Unquoted, '\\') | (QuoteContext::Double, '\\') => {
                chars.next();
            }
            (QuoteContext::Unquoted, '\'') => context = QuoteContext::Single,
            (QuoteContext::Unquoted, '"') => context = QuoteContext::Double,
            (QuoteContext::Single, '\'') | (QuoteContext::Double, '"') => {
                context = QuoteContext::Unquoted;
            }
            _ => {}
        }
    }
    context
}

/// Whether an unresolved occurrence of `placeholder` blocks the build.
///
/// A plain `{{name}}` needs a value unless its definition explicitly says
/// `required: false`; a parameter marked required needs one unless the
/// occurrence carries an inline default.
pub(crate) fn occurrence_required(
    placeholder: &Placeholder,
    param: Option<&ParameterDefinition>,
) -> bool {
    let plain = placeholder.is_required() && param.is_none_or(|p| p.required != Some(false));
    let declared = param.is_some_and(ParameterDefinition::is_required)
        && placeholder.inline_default().is_none();
    plain || declared
}

/// Whether `param` must receive a value for the build to succeed.
pub(crate) fn requires_value(def: &CommandDefinition, param: &ParameterDefinition) -> bool {
    if param.parent_option.is_some() {
        return false;
    }
    let occurrences: Vec<Placeholder> = placeholder::scan(&def.command)
        .into_iter()
        .filter(|p| p.name == param.name)
        .collect();
    if occurrences.is_empty() {
        return param.is_required();
    }
    occurrences
        .iter()
        .any(|p| occurrence_required(p, Some(param)))
}

/// Rejects selections that reference undeclared options, parameters or
/// operators.
pub(crate) fn check_references(def: &CommandDefinition, config: &BuildConfig) -> Result<()> {
    for flag in config.selected_options.iter().chain(config.option_values.keys()) {
        if def.find_option(flag).is_none() {
            return Err(EngineError::UndeclaredOption(flag.clone()));
        }
    }
    for name in config.parameter_values.keys() {
        if def.find_parameter(name).is_none() {
            return Err(EngineError::UndeclaredParameter(name.clone()));
        }
    }
    for segment in &config.trailing {
        if separators::lookup(&segment.symbol).is_none() {
            return Err(EngineError::UnknownSeparator(segment.symbol.clone()));
        }
    }
    Ok(())
}

/// Builds a command string from a definition and a selection set.
pub struct CommandBuilder<'a> {
    def: &'a CommandDefinition,
    config: &'a BuildConfig,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(def: &'a CommandDefinition, config: &'a BuildConfig) -> Self {
        Self { def, config }
    }

    /// Produces the string, or `None` in validation mode.
    pub fn build(&self) -> Result<Option<String>> {
        check_references(self.def, self.config)?;
        if self.config.mode == BuildMode::Validation {
            return Ok(None);
        }

        let tokens = tokenize(&self.def.command);
        let split = tokens
            .iter()
            .position(|t| {
                t.is_separator()
                    && separators::lookup(&t.value).is_some_and(|s| s.is_control())
            })
            .unwrap_or(tokens.len());
        let (first, rest) = tokens.split_at(split);
        let head_len = first
            .iter()
            .take_while(|t| t.is_word() && !t.flags.is_placeholder)
            .count();

        let mut words: Vec<(String, bool)> = Vec::new();

        for token in &first[..head_len] {
            words.push((token.text.clone(), false));
        }

        for subcommand in &self.config.selected_subcommands {
            let present = tokens.iter().any(|t| t.value == *subcommand)
                || words.iter().any(|(w, _)| w == subcommand);
            if !present {
                words.push((self.escape_unquoted(subcommand), false));
            }
        }

        for option in &self.def.options {
            let Some(spelling) = self.config.selected_spelling(option) else {
                continue;
            };
            let in_template = first
                .iter()
                .any(|t| t.is_option() && option.matches(t.flag()));
            if in_template {
                continue;
            }
            words.push((spelling.to_string(), false));
            if option.has_value {
                words.push((self.option_value(option)?, false));
            }
        }

        for token in &first[head_len..] {
            self.push_token(token, &mut words)?;
        }

        let referenced = placeholder::names(&self.def.command);
        for param in &self.def.parameters {
            if param.parent_option.is_some() || referenced.contains(&param.name) {
                continue;
            }
            if let Some(word) = self.unreferenced_parameter(param)? {
                words.push((word, false));
            }
        }

        for token in rest {
            self.push_token(token, &mut words)?;
        }

        for segment in &self.config.trailing {
            words.push((segment.symbol.clone(), true));
            if let Some(target) = &segment.target {
                words.push((target.trim().to_string(), false));
            }
        }

        let built = separators::join_spaced(words.iter().map(|(w, op)| (w.as_str(), *op)));
        debug!(mode = %self.config.mode, command = %built, "Built command");
        Ok(Some(built))
    }

    fn push_token(&self, token: &Token, words: &mut Vec<(String, bool)>) -> Result<()> {
        if token.is_separator() {
            words.push((token.text.clone(), true));
            return Ok(());
        }
        let text = self.substitute(token)?;
        if !text.is_empty() {
            words.push((text, false));
        }
        Ok(())
    }

    /// Substitutes every placeholder in a word.
    fn substitute(&self, token: &Token) -> Result<String> {
        if !token.flags.is_placeholder {
            return Ok(token.text.clone());
        }

        if self.config.mode == BuildMode::Template {
            return Ok(match placeholder::parse_exact(&token.text) {
                Some(p) => {
                    let param = self.def.find_parameter(&p.name);
                    placeholder::render_template(&p.name, occurrence_required(&p, param))
                }
                None => token.text.clone(),
            });
        }

        let mut out = String::with_capacity(token.text.len());
        let mut cursor = 0;
        for p in placeholder::scan(&token.text) {
            out.push_str(&token.text[cursor..p.span.start]);
            let param = self.def.find_parameter(&p.name);
            let value = self.config.value(&p.name).or_else(|| {
                self.config
                    .use_defaults
                    .then(|| p.inline_default().or_else(|| param.and_then(|d| d.fallback())))
                    .flatten()
            });
            match value {
                Some(value) => out.push_str(&self.escape(value, quote_context(&token.text, p.span.start))),
                None if occurrence_required(&p, param) => {
                    if self.config.validate_required {
                        return Err(EngineError::MissingRequiredValue(p.name.clone()));
                    }
                    out.push_str(&token.text[p.span.clone()]);
                }
                None => {}
            }
            cursor = p.span.end;
        }
        out.push_str(&token.text[cursor..]);
        Ok(out)
    }

    fn option_value(&self, option: &OptionDefinition) -> Result<String> {
        let bound = self.def.option_parameter(option);
        let placeholder_name = bound
            .map(|p| p.name.clone())
            .unwrap_or_else(|| option.value_name());

        if self.config.mode == BuildMode::Template {
            return Ok(placeholder::render_template(&placeholder_name, true));
        }

        let value = self.config.option_value(option).or_else(|| {
            bound.and_then(|p| {
                self.config.value(&p.name).or_else(|| {
                    self.config
                        .use_defaults
                        .then(|| p.fallback())
                        .flatten()
                })
            })
        });
        match value {
            Some(value) => Ok(self.escape_unquoted(value)),
            None if self.config.validate_required => {
                Err(EngineError::MissingRequiredValue(placeholder_name))
            }
            None => Ok(placeholder::render_template(&placeholder_name, true)),
        }
    }

    fn unreferenced_parameter(&self, param: &ParameterDefinition) -> Result<Option<String>> {
        if self.config.mode == BuildMode::Template {
            return Ok(Some(placeholder::render_template(
                &param.name,
                param.is_required(),
            )));
        }

        let value = self.config.value(&param.name).or_else(|| {
            self.config
                .use_defaults
                .then(|| param.fallback())
                .flatten()
        });
        match value {
            Some(value) => Ok(Some(self.escape_unquoted(value))),
            None if param.is_required() && self.config.validate_required => {
                Err(EngineError::MissingRequiredValue(param.name.clone()))
            }
            None if param.is_required() => Ok(Some(placeholder::render_template(&param.name, true))),
            None => Ok(None),
        }
    }

    fn escape(&self, value: &str, context: QuoteContext) -> String {
        if self.config.escape_values {
            escape_value(value, context)
        } else {
            value.to_string()
        }
    }

    fn escape_unquoted(&self, value: &str) -> String {
        self.escape(value, QuoteContext::Unquoted)
    }
}

/// Builds `def` with `config`. See [`CommandBuilder`].
///
/// # Examples
///
/// ```
/// use command_template_core::{BuildConfig, BuildMode, CommandDefinition, ParameterDefinition};
/// use command_template_engine::build;
///
/// let def = CommandDefinition::new("Clone", "git clone {{url}}")
///     .with_parameter(ParameterDefinition::required("url"));
///
/// let config = BuildConfig::new(BuildMode::Executable).with_value("url", "https://x.git");
/// assert_eq!(build(&def, &config).unwrap().as_deref(), Some("git clone https://x.git"));
///
/// let template = BuildConfig::new(BuildMode::Template);
/// assert_eq!(build(&def, &template).unwrap().as_deref(), Some("git clone {{url}}"));
/// ```
pub fn build(def: &CommandDefinition, config: &BuildConfig) -> Result<Option<String>> {
    CommandBuilder::new(def, config).build()
}

//! Lexical tokens produced by the command tokenizer.
//!
//! A [`Token`] keeps the exact source slice it was read from together with
//! the literal value a shell would see after quote removal and escape
//! processing. Tokens are immutable once produced.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Kind of a token, decided by its shape after escape processing.
///
/// # Examples
///
/// ```
/// use command_template_core::TokenKind;
///
/// assert_eq!(TokenKind::Option.as_str(), "option");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Plain word (command name, subcommand, operand).
    Argument,
    /// Word starting with `-`.
    Option,
    /// Placeholder-like word: `{{name}}`, `<name>` or `[name]`.
    Parameter,
    /// Shell control or redirect operator.
    Separator,
    /// Word fully enclosed in matching quotes.
    Quoted,
    /// Word containing `/`, `\` or `.`.
    Path,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Argument => "argument",
            Self::Option => "option",
            Self::Parameter => "parameter",
            Self::Separator => "separator",
            Self::Quoted => "quoted",
            Self::Path => "path",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flags derived from a token's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenFlags {
    /// Single-dash option (`-v`, `-abc`).
    pub is_short: bool,
    /// Double-dash option (`--verbose`).
    pub is_long: bool,
    /// Option carrying an inline value (`--name=value`).
    pub has_value: bool,
    /// Parameter written in a required form (`{{name}}`, `<name>`).
    pub is_required: bool,
    /// Parameter written in an optional form (`[name]`, `{{name?}}`, `{{name:x}}`).
    pub is_optional: bool,
    /// Parameter followed by `...`.
    pub is_variadic: bool,
    /// Token contains a `{{...}}` substitution point.
    pub is_placeholder: bool,
    /// A quote opened inside this token was never closed.
    pub unterminated_quote: bool,
}

/// A single lexical token.
///
/// # Examples
///
/// ```
/// use command_template_core::{Token, TokenKind};
///
/// let token = Token::new(TokenKind::Option, "--name=web", "--name=web", 0..10);
/// assert_eq!(token.flag(), "--name");
/// assert_eq!(token.option_value(), Some("web"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source slice, quotes and backslashes included.
    pub text: String,
    /// Literal value after quote removal and escape processing.
    pub value: String,
    /// Byte range of `text` in the tokenized input.
    pub span: Range<usize>,
    #[serde(default)]
    pub flags: TokenFlags,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        text: impl Into<String>,
        value: impl Into<String>,
        span: Range<usize>,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            value: value.into(),
            span,
            flags: TokenFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: TokenFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_separator(&self) -> bool {
        self.kind == TokenKind::Separator
    }

    pub fn is_option(&self) -> bool {
        self.kind == TokenKind::Option
    }

    /// Returns `true` for tokens that can name a command (argument or path).
    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Argument | TokenKind::Path)
    }

    /// Option flag without its inline value (`--name=x` → `--name`).
    ///
    /// For non-option tokens this is the literal value.
    pub fn flag(&self) -> &str {
        if self.is_option() {
            if let Some((flag, _)) = self.value.split_once('=') {
                return flag;
            }
        }
        &self.value
    }

    /// Inline option value (`--name=x` → `x`).
    pub fn option_value(&self) -> Option<&str> {
        if !self.is_option() {
            return None;
        }
        self.value.split_once('=').map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_strips_inline_value() {
        let token = Token::new(TokenKind::Option, "--port=80", "--port=80", 0..9);
        assert_eq!(token.flag(), "--port");
        assert_eq!(token.option_value(), Some("80"));
    }

    #[test]
    fn test_flag_on_argument_is_value() {
        let token = Token::new(TokenKind::Argument, "a=b", "a=b", 0..3);
        assert_eq!(token.flag(), "a=b");
        assert_eq!(token.option_value(), None);
    }

    #[test]
    fn test_token_serializes_kind_in_snake_case() {
        let token = Token::new(TokenKind::Quoted, "\"x\"", "x", 0..3);
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["kind"], "quoted");
        assert_eq!(json["span"]["start"], 0);
    }
}

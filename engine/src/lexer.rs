//! Tokenizer for shell-like command strings.
//!
//! The lexer scans left to right with one character of lookahead:
//!
//! 1. A backslash outside quotes escapes the next character.
//! 2. A quote opens a run that absorbs everything up to the matching quote.
//!    Inside double quotes a backslash escapes only `"`, `\`, `$` and `` ` ``;
//!    inside single quotes it is literal.
//! 3. A `{{` outside quotes opens a placeholder run that absorbs everything
//!    up to `}}`, so inline defaults may contain spaces and operators.
//! 4. A `<` that starts a word and encloses a bare name (`<src>`,
//!    `<files>...`) is read as a parameter word, not as a redirect.
//! 5. Whitespace outside quotes ends the current word.
//! 6. An operator from the separator registry ends the current word and is
//!    emitted as its own token, two-character symbols first. A descriptor
//!    number written against a redirect (`2>`, `2>&`) belongs to the
//!    operator token: its text keeps the digits, its value is the symbol.
//!
//! An unclosed quote is not an error here: the run extends to the end of the
//! input and the token is flagged with `unterminated_quote`.

use std::iter::Peekable;
use std::str::CharIndices;

use command_template_core::placeholder::{self, PlaceholderKind};
use command_template_core::{Token, TokenFlags, TokenKind, separators};

pub struct CommandLexer;

impl CommandLexer {
    pub fn tokenize(command: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut pending: Option<Pending> = None;
        let mut chars = command.char_indices().peekable();

        while let Some((idx, ch)) = chars.next() {
            match ch {
                '\\' => {
                    let word = pending.get_or_insert_with(|| Pending::at(idx));
                    let escaped = chars.next().map_or('\\', |(_, next)| next);
                    word.push(escaped);
                }
                '\'' | '"' => {
                    let word = pending.get_or_insert_with(|| Pending::at(idx));
                    word.shape.push(ch);
                    if read_quoted(&mut chars, ch, word) {
                        word.shape.push(ch);
                    } else {
                        word.unterminated = true;
                    }
                }
                '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                    let word = pending.get_or_insert_with(|| Pending::at(idx));
                    word.push('{');
                    read_placeholder(&mut chars, word);
                }
                c if c.is_whitespace() => {
                    flush(&mut tokens, &mut pending, command, idx);
                }
                c => {
                    if c == '<'
                        && pending.is_none()
                        && let Some(end) = angle_parameter_end(command, idx)
                    {
                        let word = pending.insert(Pending::at(idx));
                        word.push('<');
                        for _ in idx + 1..end {
                            if let Some((_, next)) = chars.next() {
                                word.push(next);
                            }
                        }
                    } else if let Some(spec) = separators::match_at(command, idx) {
                        let end = idx + spec.symbol.len();
                        let descriptor = pending.take_if(|word| {
                            spec.is_redirect()
                                && command.get(word.start..idx).is_some_and(is_descriptor)
                        });
                        let start = match descriptor {
                            Some(word) => word.start,
                            None => {
                                flush(&mut tokens, &mut pending, command, idx);
                                idx
                            }
                        };
                        tokens.push(Token::new(
                            TokenKind::Separator,
                            command.get(start..end).unwrap_or(spec.symbol),
                            spec.symbol,
                            start..end,
                        ));
                        for _ in 1..spec.symbol.chars().count() {
                            chars.next();
                        }
                    } else {
                        pending.get_or_insert_with(|| Pending::at(idx)).push(c);
                    }
                }
            }
        }

        flush(&mut tokens, &mut pending, command, command.len());
        tokens
    }
}

/// Tokenizes `command`. See [`CommandLexer`].
///
/// # Examples
///
/// ```
/// use command_template_core::TokenKind;
/// use command_template_engine::tokenize;
///
/// let tokens = tokenize(r#"docker run -d --name "my app" nginx"#);
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::Argument,
///         TokenKind::Argument,
///         TokenKind::Option,
///         TokenKind::Option,
///         TokenKind::Quoted,
///         TokenKind::Argument,
///     ]
/// );
/// assert_eq!(tokens[4].value, "my app");
/// ```
pub fn tokenize(command: &str) -> Vec<Token> {
    CommandLexer::tokenize(command)
}

/// Word being accumulated.
struct Pending {
    start: usize,
    /// Escapes consumed, quotes kept. Used to decide the token kind.
    shape: String,
    /// Escapes consumed, quotes removed.
    value: String,
    unterminated: bool,
}

impl Pending {
    fn at(start: usize) -> Self {
        Self {
            start,
            shape: String::new(),
            value: String::new(),
            unterminated: false,
        }
    }

    fn push(&mut self, ch: char) {
        self.shape.push(ch);
        self.value.push(ch);
    }
}

/// Consumes a quoted run after its opening quote. Returns `false` when the
/// input ends before the closing quote.
fn read_quoted(chars: &mut Peekable<CharIndices<'_>>, quote: char, word: &mut Pending) -> bool {
    while let Some((_, c)) = chars.next() {
        if c == quote {
            return true;
        }
        if quote == '"' && c == '\\' {
            if let Some(&(_, next)) = chars.peek()
                && matches!(next, '"' | '\\' | '$' | '`')
            {
                chars.next();
                word.push(next);
                continue;
            }
        }
        word.push(c);
    }
    false
}

/// Consumes a placeholder run after its first `{`, up to and including `}}`.
fn read_placeholder(chars: &mut Peekable<CharIndices<'_>>, word: &mut Pending) {
    let mut previous = None;
    for (_, c) in chars.by_ref() {
        word.push(c);
        if previous == Some('}') && c == '}' && word.shape.len() > 3 {
            return;
        }
        previous = Some(c);
    }
}

/// Byte offset just past the `>` of a `<name>` parameter starting at `at`.
///
/// The name must be an identifier and the closing `>` must end the word
/// (optionally followed by `...`), so `sort <in.txt` and `a <b>c` still
/// tokenize as redirects.
fn angle_parameter_end(command: &str, at: usize) -> Option<usize> {
    let rest = command.get(at + 1..)?;
    let close = rest.find('>')?;
    let mut name = rest[..close].chars();
    let is_identifier = name.next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !is_identifier {
        return None;
    }
    let after = &rest[close + 1..];
    let after = after.strip_prefix("...").unwrap_or(after);
    after
        .chars()
        .next()
        .is_none_or(char::is_whitespace)
        .then_some(at + close + 2)
}

fn is_descriptor(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn flush(tokens: &mut Vec<Token>, pending: &mut Option<Pending>, command: &str, end: usize) {
    let Some(word) = pending.take() else {
        return;
    };
    let text = command.get(word.start..end).unwrap_or_default();
    let (kind, mut flags) = classify(&word.shape, word.unterminated);
    flags.unterminated_quote = word.unterminated;
    tokens.push(Token::new(kind, text, word.value, word.start..end).with_flags(flags));
}

/// Decides the kind of a word from its shape.
fn classify(shape: &str, unterminated: bool) -> (TokenKind, TokenFlags) {
    let mut flags = TokenFlags {
        is_placeholder: !placeholder::scan(shape).is_empty(),
        ..TokenFlags::default()
    };

    if shape.len() > 1 && shape.starts_with('-') {
        flags.is_long = shape.starts_with("--");
        flags.is_short = !flags.is_long;
        flags.has_value = shape.contains('=');
        return (TokenKind::Option, flags);
    }

    let (core, variadic) = match shape.strip_suffix("...") {
        Some(core) => (core, true),
        None => (shape, false),
    };
    if let Some(parameter_flags) = parameter_shape(core) {
        flags.is_required = parameter_flags.0;
        flags.is_optional = parameter_flags.1;
        flags.is_variadic = variadic;
        return (TokenKind::Parameter, flags);
    }

    if !unterminated && is_fully_quoted(shape) {
        return (TokenKind::Quoted, flags);
    }

    if shape.contains(['/', '\\', '.']) {
        return (TokenKind::Path, flags);
    }

    (TokenKind::Argument, flags)
}

/// Returns `(is_required, is_optional)` for parameter-shaped words.
fn parameter_shape(core: &str) -> Option<(bool, bool)> {
    if core.starts_with("{{") && core.ends_with("}}") && core.len() > 4 {
        let required = placeholder::parse_exact(core)
            .is_none_or(|p| p.kind == PlaceholderKind::Required);
        return Some((required, !required));
    }
    if core.len() > 2 && core.starts_with('<') && core.ends_with('>') {
        return Some((true, false));
    }
    if core.len() > 2 && core.starts_with('[') && core.ends_with(']') {
        return Some((false, true));
    }
    None
}

fn is_fully_quoted(shape: &str) -> bool {
    let mut chars = shape.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) => (first == '"' || first == '\'') && first == last,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    fn values(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.value.as_str()).collect()
    }

    #[test]
    fn test_tokenize_docker_run_keeps_quoted_space() {
        let tokens = tokenize(r#"docker run -d --name "my app" nginx"#);
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[4].kind, TokenKind::Quoted);
        assert_eq!(tokens[4].text, "\"my app\"");
        assert_eq!(tokens[4].value, "my app");
        assert!(tokens[2].flags.is_short);
        assert!(tokens[3].flags.is_long);
    }

    #[test]
    fn test_tokenize_empty_and_blank() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t ").is_empty());
    }

    #[test]
    fn test_two_char_separators_before_one_char() {
        let tokens = tokenize("make && make install || echo fail");
        assert_eq!(tokens[1].text, "&&");
        assert_eq!(tokens[4].text, "||");
        assert_eq!(tokens[1].span, 5..7);
    }

    #[test]
    fn test_separators_split_words_without_whitespace() {
        let tokens = tokenize("ls|wc -l>out.txt");
        assert_eq!(values(&tokens), vec!["ls", "|", "wc", "-l", ">", "out.txt"]);
        assert_eq!(tokens[5].kind, TokenKind::Path);
    }

    #[test]
    fn test_descriptor_number_joins_redirect() {
        let tokens = tokenize("npm run build > build.log 2>&1");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["npm", "run", "build", ">", "build.log", "2>&", "1"]);
        assert_eq!(tokens[5].kind, TokenKind::Separator);
        assert_eq!(tokens[5].value, ">&");
        assert_eq!(tokens[5].span, 26..29);

        let tokens = tokenize("echo 2 > x");
        assert_eq!(values(&tokens), vec!["echo", "2", ">", "x"]);

        let tokens = tokenize("make 2|tee");
        assert_eq!(values(&tokens), vec!["make", "2", "|", "tee"]);
    }

    #[test]
    fn test_double_pipe_with_space_is_two_pipes() {
        let tokens = tokenize("cmd1 | | cmd2");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Argument,
                TokenKind::Separator,
                TokenKind::Separator,
                TokenKind::Argument,
            ]
        );
    }

    #[test]
    fn test_quotes_absorb_separators() {
        let tokens = tokenize("echo 'a | b; c' \"x && y\"");
        assert_eq!(values(&tokens), vec!["echo", "a | b; c", "x && y"]);
        assert!(tokens.iter().all(|t| !t.is_separator()));
    }

    #[test]
    fn test_backslash_escapes_outside_quotes() {
        let tokens = tokenize(r"echo my\ file \| x");
        assert_eq!(values(&tokens), vec!["echo", "my file", "|", "x"]);
        assert_eq!(tokens[2].kind, TokenKind::Argument);
        assert_eq!(tokens[1].text, r"my\ file");
    }

    #[test]
    fn test_double_quote_escapes_are_posix_subset() {
        let tokens = tokenize(r#"echo "a \"b\" \$c \n""#);
        assert_eq!(tokens[1].value, r#"a "b" $c \n"#);
    }

    #[test]
    fn test_single_quotes_are_literal() {
        let tokens = tokenize(r"echo 'a\b'");
        assert_eq!(tokens[1].value, r"a\b");
    }

    #[test]
    fn test_unterminated_quote_absorbs_rest() {
        let tokens = tokenize("echo \"hello | world");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].value, "hello | world");
        assert!(tokens[1].flags.unterminated_quote);
        assert_ne!(tokens[1].kind, TokenKind::Quoted);
    }

    #[test]
    fn test_parameter_shapes() {
        let tokens = tokenize("cp <src> [dest] {{file}} {{mode?}} <files>...");
        assert!(tokens[1..].iter().all(|t| t.kind == TokenKind::Parameter));
        assert!(tokens[1].flags.is_required);
        assert!(tokens[2].flags.is_optional);
        assert!(tokens[3].flags.is_required && tokens[3].flags.is_placeholder);
        assert!(tokens[4].flags.is_optional);
        assert!(tokens[5].flags.is_variadic);
    }

    #[test]
    fn test_angle_parameter_needs_identifier_and_word_end() {
        let tokens = tokenize("sort <in.txt");
        assert_eq!(values(&tokens), vec!["sort", "<", "in.txt"]);

        let tokens = tokenize("cat <a>b");
        assert_eq!(values(&tokens), vec!["cat", "<", "a", ">", "b"]);

        let tokens = tokenize("cmd < input");
        assert_eq!(tokens[1].kind, TokenKind::Separator);

        let tokens = tokenize("cp <src> <dest>");
        assert_eq!(values(&tokens), vec!["cp", "<src>", "<dest>"]);
        assert_eq!(tokens[2].span, 9..15);
    }

    #[test]
    fn test_placeholder_default_may_contain_spaces_and_operators() {
        let tokens = tokenize("echo {{msg:hello | world}} done");
        assert_eq!(values(&tokens), vec!["echo", "{{msg:hello | world}}", "done"]);
        assert_eq!(tokens[1].kind, TokenKind::Parameter);
        assert!(tokens[1].flags.is_optional);
    }

    #[test]
    fn test_embedded_placeholder_marks_token() {
        let tokens = tokenize("curl --port={{port}} http://{{host}}/x");
        assert_eq!(tokens[1].kind, TokenKind::Option);
        assert!(tokens[1].flags.has_value && tokens[1].flags.is_placeholder);
        assert_eq!(tokens[2].kind, TokenKind::Path);
        assert!(tokens[2].flags.is_placeholder);
    }

    #[test]
    fn test_lone_dash_is_argument() {
        let tokens = tokenize("cat -");
        assert_eq!(tokens[1].kind, TokenKind::Argument);
    }

    #[test]
    fn test_spans_cover_source_text() {
        let input = "git  commit -m \"fix it\"";
        for token in tokenize(input) {
            assert_eq!(&input[token.span.clone()], token.text);
        }
    }
}

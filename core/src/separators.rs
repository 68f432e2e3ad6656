//! Static registry of shell control and redirect operators.
//!
//! The registry is configuration data: a fixed table consulted by the
//! tokenizer (symbol matching), the parser (component splitting), the
//! validators (positional legality) and the renderers (spacing). It has no
//! mutation API.
//!
//! # Examples
//!
//! ```
//! use command_template_core::separators::{self, SeparatorClass};
//!
//! let spec = separators::lookup("&&").unwrap();
//! assert_eq!(spec.class, SeparatorClass::Logic);
//! assert!(spec.rules.requires_command_after);
//!
//! // Two-character operators win over their one-character prefixes.
//! assert_eq!(separators::match_at("a || b", 2).unwrap().symbol, "||");
//! ```

use serde::Serialize;

/// Operator identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparatorKind {
    Pipe,
    PipeAll,
    And,
    Or,
    Sequence,
    Background,
    RedirectOut,
    RedirectAppend,
    RedirectAll,
    RedirectIn,
    HereDoc,
    DuplicateOut,
    DuplicateIn,
}

/// Operator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparatorClass {
    Pipe,
    Logic,
    Sequence,
    Background,
    Redirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Associativity {
    Left,
    Right,
}

/// Where an operator may legally appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionRules {
    /// A command must precede the operator.
    pub requires_command_before: bool,
    /// A command must follow the operator.
    pub requires_command_after: bool,
    /// The operator must be the last token of its component.
    pub is_terminal: bool,
    /// The operator consumes the next word as its target (file, delimiter).
    pub requires_target: bool,
}

/// Whether a space is emitted before and after the operator when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Spacing {
    pub before: bool,
    pub after: bool,
}

/// Metadata for one operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeparatorSpec {
    pub kind: SeparatorKind,
    pub class: SeparatorClass,
    pub symbol: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Lower binds tighter.
    pub precedence: u8,
    pub associativity: Associativity,
    /// Whether the operator may appear more than once in a single component.
    pub can_chain: bool,
    pub rules: PositionRules,
    pub spacing: Spacing,
}

impl SeparatorSpec {
    pub fn is_redirect(&self) -> bool {
        self.class == SeparatorClass::Redirect
    }

    /// Control operators close the current component; redirects do not.
    pub fn is_control(&self) -> bool {
        !self.is_redirect()
    }

    /// Whether the token after this operator starts a new component.
    ///
    /// Background (`&`) closes its component without opening another one.
    pub fn opens_component(&self) -> bool {
        matches!(
            self.class,
            SeparatorClass::Pipe | SeparatorClass::Logic | SeparatorClass::Sequence
        )
    }
}

const SPACED: Spacing = Spacing {
    before: true,
    after: true,
};

/// `2>&1`: the target descriptor is written against the operator.
const ATTACHED_TARGET: Spacing = Spacing {
    before: true,
    after: false,
};

const CHAINING: PositionRules = PositionRules {
    requires_command_before: true,
    requires_command_after: true,
    is_terminal: false,
    requires_target: false,
};

const REDIRECTING: PositionRules = PositionRules {
    requires_command_before: true,
    requires_command_after: false,
    is_terminal: false,
    requires_target: true,
};

/// The full operator table.
pub static SEPARATORS: [SeparatorSpec; 13] = [
    SeparatorSpec {
        kind: SeparatorKind::Pipe,
        class: SeparatorClass::Pipe,
        symbol: "|",
        name: "pipe",
        description: "Send standard output to the next command",
        precedence: 1,
        associativity: Associativity::Left,
        can_chain: true,
        rules: CHAINING,
        spacing: SPACED,
    },
    SeparatorSpec {
        kind: SeparatorKind::PipeAll,
        class: SeparatorClass::Pipe,
        symbol: "|&",
        name: "pipe-all",
        description: "Send standard output and standard error to the next command",
        precedence: 1,
        associativity: Associativity::Left,
        can_chain: true,
        rules: CHAINING,
        spacing: SPACED,
    },
    SeparatorSpec {
        kind: SeparatorKind::And,
        class: SeparatorClass::Logic,
        symbol: "&&",
        name: "and",
        description: "Run the next command only if the previous one succeeded",
        precedence: 2,
        associativity: Associativity::Left,
        can_chain: true,
        rules: CHAINING,
        spacing: SPACED,
    },
    SeparatorSpec {
        kind: SeparatorKind::Or,
        class: SeparatorClass::Logic,
        symbol: "||",
        name: "or",
        description: "Run the next command only if the previous one failed",
        precedence: 2,
        associativity: Associativity::Left,
        can_chain: true,
        rules: CHAINING,
        spacing: SPACED,
    },
    SeparatorSpec {
        kind: SeparatorKind::Sequence,
        class: SeparatorClass::Sequence,
        symbol: ";",
        name: "sequence",
        description: "Run the next command after the previous one finishes",
        precedence: 3,
        associativity: Associativity::Left,
        can_chain: true,
        rules: PositionRules {
            requires_command_before: true,
            requires_command_after: false,
            is_terminal: false,
            requires_target: false,
        },
        spacing: Spacing {
            before: false,
            after: true,
        },
    },
    SeparatorSpec {
        kind: SeparatorKind::Background,
        class: SeparatorClass::Background,
        symbol: "&",
        name: "background",
        description: "Run the command in the background",
        precedence: 4,
        associativity: Associativity::Left,
        can_chain: false,
        rules: PositionRules {
            requires_command_before: true,
            requires_command_after: false,
            is_terminal: true,
            requires_target: false,
        },
        spacing: SPACED,
    },
    SeparatorSpec {
        kind: SeparatorKind::RedirectOut,
        class: SeparatorClass::Redirect,
        symbol: ">",
        name: "redirect-out",
        description: "Write standard output to a file",
        precedence: 0,
        associativity: Associativity::Right,
        can_chain: false,
        rules: REDIRECTING,
        spacing: SPACED,
    },
    SeparatorSpec {
        kind: SeparatorKind::RedirectAppend,
        class: SeparatorClass::Redirect,
        symbol: ">>",
        name: "redirect-append",
        description: "Append standard output to a file",
        precedence: 0,
        associativity: Associativity::Right,
        can_chain: false,
        rules: REDIRECTING,
        spacing: SPACED,
    },
    SeparatorSpec {
        kind: SeparatorKind::RedirectAll,
        class: SeparatorClass::Redirect,
        symbol: "&>",
        name: "redirect-all",
        description: "Write standard output and standard error to a file",
        precedence: 0,
        associativity: Associativity::Right,
        can_chain: false,
        rules: REDIRECTING,
        spacing: SPACED,
    },
    SeparatorSpec {
        kind: SeparatorKind::RedirectIn,
        class: SeparatorClass::Redirect,
        symbol: "<",
        name: "redirect-in",
        description: "Read standard input from a file",
        precedence: 0,
        associativity: Associativity::Right,
        can_chain: false,
        rules: REDIRECTING,
        spacing: SPACED,
    },
    SeparatorSpec {
        kind: SeparatorKind::HereDoc,
        class: SeparatorClass::Redirect,
        symbol: "<<",
        name: "here-document",
        description: "Read standard input until a delimiter line",
        precedence: 0,
        associativity: Associativity::Right,
        can_chain: false,
        rules: REDIRECTING,
        spacing: SPACED,
    },
    SeparatorSpec {
        kind: SeparatorKind::DuplicateOut,
        class: SeparatorClass::Redirect,
        symbol: ">&",
        name: "duplicate-out",
        description: "Point an output descriptor at another descriptor",
        precedence: 0,
        associativity: Associativity::Right,
        can_chain: false,
        rules: REDIRECTING,
        spacing: ATTACHED_TARGET,
    },
    SeparatorSpec {
        kind: SeparatorKind::DuplicateIn,
        class: SeparatorClass::Redirect,
        symbol: "<&",
        name: "duplicate-in",
        description: "Point an input descriptor at another descriptor",
        precedence: 0,
        associativity: Associativity::Right,
        can_chain: false,
        rules: REDIRECTING,
        spacing: ATTACHED_TARGET,
    },
];

/// Operator pairs that may appear back to back (`cmd | &`).
const ALLOWED_SEQUENCES: &[(&str, &str)] = &[("|", "&")];

/// All registered operators.
pub fn all() -> &'static [SeparatorSpec] {
    &SEPARATORS
}

/// Looks up an operator by its exact symbol.
pub fn lookup(symbol: &str) -> Option<&'static SeparatorSpec> {
    SEPARATORS.iter().find(|spec| spec.symbol == symbol)
}

pub fn is_separator(symbol: &str) -> bool {
    lookup(symbol).is_some()
}

/// Registry symbol of an operator word, without a leading descriptor number.
///
/// ```
/// use command_template_core::separators::operator_symbol;
///
/// assert_eq!(operator_symbol("2>&"), ">&");
/// assert_eq!(operator_symbol("&&"), "&&");
/// ```
pub fn operator_symbol(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_ascii_digit())
}

/// Matches an operator starting at byte offset `at`, two-character symbols
/// first.
pub fn match_at(input: &str, at: usize) -> Option<&'static SeparatorSpec> {
    let rest = input.get(at..)?;
    for width in [2, 1] {
        if let Some(candidate) = rest.get(..width)
            && let Some(spec) = lookup(candidate)
        {
            return Some(spec);
        }
    }
    None
}

/// Returns `true` when `second` may directly follow `first`.
pub fn is_allowed_sequence(first: &str, second: &str) -> bool {
    ALLOWED_SEQUENCES
        .iter()
        .any(|(a, b)| *a == first && *b == second)
}

/// Joins words with single spaces, honoring operator spacing rules.
///
/// Each item is `(word, is_operator)`; only operator words consult the
/// registry. An operator word may carry a descriptor prefix (`2>`).
///
/// # Examples
///
/// ```
/// use command_template_core::separators::join_spaced;
///
/// let joined = join_spaced([("make", false), (";", true), ("ls", false)]);
/// assert_eq!(joined, "make; ls");
/// ```
pub fn join_spaced<'a, I>(words: I) -> String
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    let mut out = String::new();
    let mut previous: Option<Option<&'static SeparatorSpec>> = None;

    for (word, is_operator) in words {
        if word.is_empty() {
            continue;
        }
        let spec = if is_operator {
            lookup(operator_symbol(word))
        } else {
            None
        };
        if let Some(prev) = previous {
            let space_after_prev = prev.is_none_or(|p| p.spacing.after);
            let space_before_this = spec.is_none_or(|s| s.spacing.before);
            if space_after_prev && space_before_this {
                out.push(' ');
            }
        }
        out.push_str(word);
        previous = Some(spec);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_symbols_are_unique() {
        let mut symbols: Vec<_> = all().iter().map(|s| s.symbol).collect();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), SEPARATORS.len());
    }

    #[test]
    fn test_match_at_prefers_two_char_symbols() {
        assert_eq!(match_at("a>>b", 1).map(|s| s.symbol), Some(">>"));
        assert_eq!(match_at("a>b", 1).map(|s| s.symbol), Some(">"));
        assert_eq!(match_at("a&>b", 1).map(|s| s.symbol), Some("&>"));
        assert_eq!(match_at("a|&b", 1).map(|s| s.symbol), Some("|&"));
        assert_eq!(match_at("2>&1", 1).map(|s| s.kind), Some(SeparatorKind::DuplicateOut));
        assert_eq!(match_at("0<&3", 1).map(|s| s.kind), Some(SeparatorKind::DuplicateIn));
        assert!(match_at("abc", 1).is_none());
        assert!(match_at("abc", 10).is_none());
    }

    #[test]
    fn test_background_is_terminal_and_does_not_open_component() {
        let bg = lookup("&").unwrap();
        assert!(bg.rules.is_terminal);
        assert!(!bg.opens_component());
        assert!(lookup(";").unwrap().opens_component());
        assert!(!lookup(">").unwrap().is_control());
    }

    #[test]
    fn test_allowed_sequence_is_directional() {
        assert!(is_allowed_sequence("|", "&"));
        assert!(!is_allowed_sequence("&", "|"));
        assert!(!is_allowed_sequence("|", "|"));
    }

    #[test]
    fn test_join_spaced_applies_sequence_spacing() {
        let joined = join_spaced([
            ("a", false),
            (";", true),
            ("b", false),
            ("|", true),
            ("c", false),
        ]);
        assert_eq!(joined, "a; b | c");
    }

    #[test]
    fn test_join_spaced_keeps_descriptor_redirects_together() {
        let joined = join_spaced([
            ("make", false),
            (">", true),
            ("log", false),
            ("2>&", true),
            ("1", false),
        ]);
        assert_eq!(joined, "make > log 2>&1");
    }

    #[test]
    fn test_join_spaced_treats_plain_words_as_words() {
        let joined = join_spaced([("echo", false), (";", false)]);
        assert_eq!(joined, "echo ;");
    }
}

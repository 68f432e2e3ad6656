//! Parsed command structure.

use serde::{Deserialize, Serialize};

use crate::Token;

/// A redirect operator with the word it redirects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub operator: Token,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Token>,
}

/// One pipeline stage: the tokens between two control operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_command: Option<Token>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcommand: Option<Token>,
    pub options: Vec<Token>,
    pub arguments: Vec<Token>,
    pub parameters: Vec<Token>,
    pub redirects: Vec<Redirect>,
    /// Control operator that closed this component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminator: Option<Token>,
    /// Tokens found after a background operator that did not open a new
    /// component.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trailing: Vec<Token>,
    /// Every token of the component in source order, terminator excluded.
    pub tokens: Vec<Token>,
}

impl Component {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Structural view of a command string.
///
/// Top-level lists flatten the per-component lists; `tokens` keeps the full
/// stream so the command can be rendered back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStructure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_command: Option<Token>,
    pub subcommands: Vec<Token>,
    pub options: Vec<Token>,
    pub arguments: Vec<Token>,
    pub parameters: Vec<Token>,
    pub separators: Vec<Token>,
    pub components: Vec<Component>,
    pub tokens: Vec<Token>,
}

impl CommandStructure {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Base command names of every component, in order.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.components
            .iter()
            .filter_map(|c| c.base_command.as_ref())
            .map(|t| t.value.as_str())
    }
}

//! Core types for shell command templates.
//!
//! This crate defines the data model shared by the template engine and the
//! command manager:
//!
//! - [`Token`] and [`CommandStructure`]: the lexical and structural view of
//!   a shell-like command string.
//! - [`separators`]: the static registry of control and redirect operators
//!   with their precedence, position and spacing rules.
//! - [`CommandDefinition`], [`ParameterDefinition`], [`OptionDefinition`]:
//!   the authored template and its declared inputs.
//! - [`BuildConfig`]: the build-time selection set.
//! - [`ParameterClassification`]: the derived requirement/level/scope/position
//!   tuple of a parameter.
//! - [`placeholder`]: the `{{name}}`, `{{name?}}`, `{{name:default}}` grammar.
//! - [`ValidationResult`]: the output contract of every validator.
//!
//! # Example
//!
//! ```
//! use command_template_core::*;
//!
//! let def = CommandDefinition::new("Clone", "git clone {{url}} {{dir?}}")
//!     .with_parameter(ParameterDefinition::required("url").with_type(DataType::Url))
//!     .with_parameter(ParameterDefinition::optional("dir"))
//!     .with_option(OptionDefinition::new("--depth").with_value(DataType::Number));
//!
//! assert_eq!(placeholder::names(&def.command), vec!["url", "dir"]);
//! assert!(def.find_option("--depth").unwrap().has_value);
//! assert!(separators::lookup("|").is_some());
//! ```

mod report;
mod structure;
mod token;
mod types;

pub mod placeholder;
pub mod separators;

pub use report::{Diagnostic, Issue, IssueCategory, Severity, ValidationResult};
pub use separators::SeparatorSpec;
pub use structure::{CommandStructure, Component, Redirect};
pub use token::{Token, TokenFlags, TokenKind};
pub use types::*;

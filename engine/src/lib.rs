//! Template engine for shell-like command strings.
//!
//! The pipeline runs leaf-first:
//!
//! 1. [`tokenize`] splits a command into typed [`Token`]s, honoring quotes,
//!    escapes and `{{placeholder}}` runs.
//! 2. [`parse`] groups tokens into a [`CommandStructure`] of components
//!    joined by control operators; [`render`] turns it back into a string.
//! 3. [`classify`] derives requirement, level, scope and position for each
//!    declared parameter.
//! 4. [`validate`] checks structures, definitions and build selections.
//! 5. [`build`] composes a template or executable string from a definition
//!    and a [`BuildConfig`].
//!
//! # Example
//!
//! ```
//! use command_template_core::{BuildConfig, BuildMode, CommandDefinition, ParameterDefinition};
//! use command_template_engine::{build, validate};
//!
//! let def = CommandDefinition::new("Clone", "git clone {{url}}")
//!     .with_parameter(ParameterDefinition::required("url"));
//! let config = BuildConfig::new(BuildMode::Executable).with_value("url", "https://x.git");
//!
//! assert!(validate::validate_build(&def, &config).unwrap().is_valid());
//! assert_eq!(build(&def, &config).unwrap().as_deref(), Some("git clone https://x.git"));
//! ```
//!
//! [`Token`]: command_template_core::Token
//! [`CommandStructure`]: command_template_core::CommandStructure
//! [`BuildConfig`]: command_template_core::BuildConfig

pub mod analyzer;
pub mod builder;
pub mod classify;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod suggest;
pub mod validate;

pub use analyzer::{Analysis, AnalyzerOptions, analyze};
pub use builder::{CommandBuilder, build};
pub use classify::{ClassificationContext, Classifier};
pub use error::{EngineError, Result};
pub use lexer::tokenize;
pub use parser::{parse, render};
pub use suggest::{BuildSuggestions, build_suggestions};

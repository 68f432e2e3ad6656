//! Lifecycle management for shell command templates.
//!
//! [`CommandManager`] ties the engine together for callers that store
//! definitions: it preprocesses and validates new definitions, stamps ids and
//! timestamps, applies partial updates under field protection rules, builds
//! commands with full diagnostics, and keeps a bounded version and build
//! history per command.
//!
//! Storage stays with the caller. Categories, existing commands and the
//! current stored version arrive per call through [`ManagerContext`].

pub mod config;
pub mod error;
pub mod history;
pub mod manager;
pub mod observer;
pub mod outcome;
pub mod preprocess;

pub use config::ManagerConfig;
pub use error::{ManagerError, Result};
pub use history::{BuildRecord, HistoryKind, HistoryStatistics, VersionAction, VersionRecord};
pub use manager::{AnalysisInput, CommandManager, ManagerContext, load_definition};
pub use observer::{CommandEvent, CommandObserver, TracingObserver};
pub use outcome::{
    AnalysisOutcome, BuildMetadata, BuildOutcome, CreateOutcome, FieldChange, UpdateOutcome,
};

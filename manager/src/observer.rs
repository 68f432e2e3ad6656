//! Lifecycle notifications.

use command_template_core::{BuildMode, CommandDefinition};
use tracing::info;

use crate::outcome::FieldChange;

/// Something that happened to a command.
#[derive(Debug, Clone, Copy)]
pub enum CommandEvent<'a> {
    Created {
        command: &'a CommandDefinition,
    },
    Updated {
        original: &'a CommandDefinition,
        updated: &'a CommandDefinition,
        changes: &'a [FieldChange],
    },
    Built {
        command: &'a CommandDefinition,
        mode: BuildMode,
        result: Option<&'a str>,
        success: bool,
    },
}

/// Receives [`CommandEvent`]s from the manager.
///
/// Observers are passed per call through
/// [`ManagerContext`](crate::ManagerContext) and run synchronously before the
/// operation returns.
pub trait CommandObserver: Send + Sync {
    fn on_event(&self, event: &CommandEvent<'_>);
}

/// Logs every event at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CommandObserver for TracingObserver {
    fn on_event(&self, event: &CommandEvent<'_>) {
        match event {
            CommandEvent::Created { command } => {
                info!(id = ?command.id, name = %command.name, "Command created");
            }
            CommandEvent::Updated {
                updated, changes, ..
            } => {
                info!(
                    id = ?updated.id,
                    version = updated.version,
                    changed = changes.len(),
                    "Command updated"
                );
            }
            CommandEvent::Built {
                command,
                mode,
                success,
                ..
            } => {
                info!(id = ?command.id, %mode, success, "Command built");
            }
        }
    }
}

//! Bounded per-command version and build history.

use std::collections::{HashMap, VecDeque};

use command_template_core::{BuildConfig, CommandDefinition};
use serde::{Deserialize, Serialize};

/// FIFO buffer that drops its oldest entry once full.
///
/// # Examples
///
/// ```
/// use command_template_manager::history::HistoryBuffer;
///
/// let mut buffer = HistoryBuffer::new(2);
/// buffer.push(1);
/// buffer.push(2);
/// buffer.push(3);
/// assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> HistoryBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: T) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Why a version was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionAction {
    Created,
    BeforeUpdate,
    Updated,
}

/// Snapshot of a definition at one point in its life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub command: CommandDefinition,
    pub action: VersionAction,
    /// RFC 3339.
    pub timestamp: String,
}

/// One build request and what it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub config: BuildConfig,
    pub result: Option<String>,
    pub success: bool,
    /// RFC 3339.
    pub timestamp: String,
}

/// Which history [`clear`](crate::CommandManager::clear_history) removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Command,
    Build,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryStatistics {
    pub total_commands: usize,
    pub total_builds: usize,
    pub average_builds_per_command: f64,
}

/// Version and build buffers keyed by command id.
#[derive(Debug)]
pub(crate) struct HistoryStore {
    versions: HashMap<String, HistoryBuffer<VersionRecord>>,
    builds: HashMap<String, HistoryBuffer<BuildRecord>>,
    capacity: usize,
}

impl HistoryStore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            versions: HashMap::new(),
            builds: HashMap::new(),
            capacity,
        }
    }

    pub(crate) fn record_version(&mut self, id: &str, record: VersionRecord) {
        let capacity = self.capacity;
        self.versions
            .entry(id.to_string())
            .or_insert_with(|| HistoryBuffer::new(capacity))
            .push(record);
    }

    pub(crate) fn record_build(&mut self, id: &str, record: BuildRecord) {
        let capacity = self.capacity;
        self.builds
            .entry(id.to_string())
            .or_insert_with(|| HistoryBuffer::new(capacity))
            .push(record);
    }

    pub(crate) fn versions(&self, id: &str) -> Vec<VersionRecord> {
        self.versions
            .get(id)
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn builds(&self, id: &str) -> Vec<BuildRecord> {
        self.builds
            .get(id)
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Most recent snapshot of a command.
    pub(crate) fn latest_command(&self, id: &str) -> Option<CommandDefinition> {
        self.versions
            .get(id)
            .and_then(HistoryBuffer::latest)
            .map(|r| r.command.clone())
    }

    pub(crate) fn clear(&mut self, id: Option<&str>, kind: HistoryKind) {
        let versions = matches!(kind, HistoryKind::Command | HistoryKind::All);
        let builds = matches!(kind, HistoryKind::Build | HistoryKind::All);
        match id {
            Some(id) => {
                if versions {
                    self.versions.remove(id);
                }
                if builds {
                    self.builds.remove(id);
                }
            }
            None => {
                if versions {
                    self.versions.clear();
                }
                if builds {
                    self.builds.clear();
                }
            }
        }
    }

    pub(crate) fn statistics(&self) -> HistoryStatistics {
        let total_commands = self.versions.len();
        let total_builds = self.builds.values().map(HistoryBuffer::len).sum();
        let average_builds_per_command = if total_commands > 0 {
            total_builds as f64 / total_commands as f64
        } else {
            0.0
        };
        HistoryStatistics {
            total_commands,
            total_builds,
            average_builds_per_command,
        }
    }
}

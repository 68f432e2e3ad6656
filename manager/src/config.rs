//! Manager configuration.
//!
//! Loaded from YAML. Every field has a default, so a partial file (or none
//! at all) is fine.
//!
//! # Example YAML
//!
//! ```yaml
//! enable_validation: true
//! enable_suggestions: true
//! enable_security: true
//! strict_mode: false
//! auto_save: true
//! max_history_versions: 10
//! allow_system_modification: false
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ManagerError, Result};

/// Default number of versions and builds kept per command.
pub const DEFAULT_MAX_HISTORY_VERSIONS: usize = 10;

/// Switches for [`CommandManager`](crate::CommandManager).
///
/// # Examples
///
/// ```
/// use command_template_manager::ManagerConfig;
///
/// let config = ManagerConfig::default();
/// assert!(config.enable_validation);
/// assert_eq!(config.max_history_versions, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Run the creation and build validators.
    pub enable_validation: bool,
    /// Attach improvement hints to analyses.
    pub enable_suggestions: bool,
    /// Always produce a security report.
    pub enable_security: bool,
    /// Treat validation warnings as errors on create and update.
    pub strict_mode: bool,
    /// Record a version on every create and update.
    pub auto_save: bool,
    /// Cap on versions and builds kept per command.
    pub max_history_versions: usize,
    /// Permit updates to commands the user did not author.
    pub allow_system_modification: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            enable_validation: true,
            enable_suggestions: true,
            enable_security: true,
            strict_mode: false,
            auto_save: true,
            max_history_versions: DEFAULT_MAX_HISTORY_VERSIONS,
            allow_system_modification: false,
        }
    }
}

impl ManagerConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ManagerError::IoError) if the file cannot be read,
    /// [`YamlError`](ManagerError::YamlError) if parsing fails, or
    /// [`InvalidConfig`](ManagerError::InvalidConfig) if a value is unusable.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_history_versions == 0 {
            return Err(ManagerError::InvalidConfig(
                "max_history_versions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manager.yml");
        let config = ManagerConfig {
            strict_mode: true,
            max_history_versions: 3,
            ..ManagerConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ManagerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manager.yml");
        std::fs::write(&path, "strict_mode: true\n").unwrap();
        let config = ManagerConfig::load(&path).unwrap();
        assert!(config.strict_mode);
        assert!(config.auto_save);
        assert_eq!(config.max_history_versions, DEFAULT_MAX_HISTORY_VERSIONS);
    }

    #[test]
    fn test_zero_history_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manager.yml");
        std::fs::write(&path, "max_history_versions: 0\n").unwrap();
        assert!(matches!(
            ManagerConfig::load(&path),
            Err(ManagerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ManagerConfig::load(dir.path().join("absent.yml"));
        assert!(matches!(result, Err(ManagerError::IoError(_))));
    }
}

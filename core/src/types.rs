//! Command template data model.
//!
//! These types form the JSON contract at the storage boundary: field names
//! are serialized in camelCase and every optional field has a serde default,
//! so definitions authored by hand or produced by other tools deserialize
//! without ceremony.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value type expected by a parameter or option value.
///
/// # Examples
///
/// ```
/// use command_template_core::DataType;
///
/// let dt: DataType = serde_json::from_str("\"email\"").unwrap();
/// assert_eq!(dt, DataType::Email);
/// assert_eq!(DataType::default(), DataType::String);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Number,
    #[serde(alias = "path")]
    File,
    Directory,
    Url,
    Email,
    Boolean,
    Enum,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::File => "file",
            Self::Directory => "directory",
            Self::Url => "url",
            Self::Email => "email",
            Self::Boolean => "boolean",
            Self::Enum => "enum",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a parameter must receive a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Required,
    Optional,
    /// Required only while its [`Condition`] holds.
    Conditional,
    None,
}

/// Syntactic level a parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Command,
    Option,
    Subcommand,
    Global,
}

/// Visibility of a parameter across subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Local,
    Inherited,
    Isolated,
}

/// How a parameter is written on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Positional,
    Named,
    Flag,
    /// Value of an option (`--name <value>`).
    Value,
}

/// Activation condition of a conditional parameter.
///
/// Serialized as `{"option": "-o"}` or `{"parameter": "host"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Active while the option is selected.
    Option(String),
    /// Active while the parameter has a value.
    Parameter(String),
}

/// Named (requirement, level) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    RequiredCommand,
    OptionalCommand,
    RequiredOption,
    OptionalOption,
    Conditional,
    Global,
    Unknown,
}

/// Whether a value must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValuePolicy {
    Always,
    Never,
    Conditional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Fixed,
    Flexible,
}

/// Merged validation-rule bundle derived from a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    pub must_have_value: ValuePolicy,
    pub allow_empty: bool,
    pub priority: Priority,
    pub placement: Placement,
    pub order_matters: bool,
    pub can_be_omitted: bool,
    pub affects_execution: bool,
}

/// Classification of a parameter along four axes, plus derived data.
///
/// Always computed from a [`ParameterDefinition`] and context; never stored
/// on the definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterClassification {
    pub requirement: Requirement,
    pub level: Level,
    pub scope: Scope,
    pub position: Position,
    pub category: Category,
    pub rules: ValidationRules,
}

/// Author-time parameter declaration.
///
/// # Examples
///
/// ```
/// use command_template_core::{DataType, ParameterDefinition};
///
/// let url = ParameterDefinition::required("url")
///     .with_type(DataType::Url)
///     .with_description("Repository URL");
/// assert!(url.is_required());
///
/// let branch = ParameterDefinition::optional("branch").with_default("main");
/// assert_eq!(branch.default_value.as_deref(), Some("main"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `Some(true)` marks the parameter as required; anything else is optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, rename = "type", alias = "dataType")]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Option whose value this parameter provides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_option: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_on: Option<Condition>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_flag: bool,
}

impl ParameterDefinition {
    fn with_requirement(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required: Some(required),
            default_value: None,
            data_type: DataType::String,
            enum_values: Vec::new(),
            level: None,
            scope: None,
            position: None,
            parent_option: None,
            conditional_on: None,
            is_flag: false,
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        Self::with_requirement(name, true)
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self::with_requirement(name, false)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_type = DataType::Enum;
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Binds the parameter to an option's value.
    pub fn for_option(mut self, flag: impl Into<String>) -> Self {
        self.parent_option = Some(flag.into());
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditional_on = Some(condition);
        self
    }

    pub fn is_required(&self) -> bool {
        self.required == Some(true)
    }

    /// Non-empty default value, if any.
    pub fn fallback(&self) -> Option<&str> {
        self.default_value.as_deref().filter(|v| !v.is_empty())
    }
}

/// Author-time option declaration.
///
/// An option may be spelled through `flag`, `short_flag` and `long_flag`;
/// every spelling identifies the same option.
///
/// # Examples
///
/// ```
/// use command_template_core::{DataType, OptionDefinition};
///
/// let name = OptionDefinition::new("--name")
///     .with_short("-n")
///     .with_value(DataType::String);
/// assert!(name.matches("-n"));
/// assert!(name.matches("--name"));
/// assert_eq!(name.primary_flag(), Some("--name"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_flag: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub has_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<DataType>,
    /// Options that must not be selected together with this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts_with: Vec<String>,
    /// Options that must be selected whenever this one is.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl OptionDefinition {
    pub fn new(flag: impl Into<String>) -> Self {
        Self {
            flag: Some(flag.into()),
            short_flag: None,
            long_flag: None,
            description: String::new(),
            required: false,
            has_value: false,
            value_type: None,
            conflicts_with: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short_flag = Some(short.into());
        self
    }

    pub fn with_long(mut self, long: impl Into<String>) -> Self {
        self.long_flag = Some(long.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_value(mut self, value_type: DataType) -> Self {
        self.has_value = true;
        self.value_type = Some(value_type);
        self
    }

    pub fn conflicts_with(mut self, flag: impl Into<String>) -> Self {
        self.conflicts_with.push(flag.into());
        self
    }

    pub fn depends_on(mut self, flag: impl Into<String>) -> Self {
        self.depends_on.push(flag.into());
        self
    }

    pub fn mark_required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Every non-empty spelling, in `flag`, `long_flag`, `short_flag` order.
    pub fn spellings(&self) -> impl Iterator<Item = &str> {
        [&self.flag, &self.long_flag, &self.short_flag]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .filter(|f| !f.is_empty())
    }

    /// Preferred spelling used when rendering and reporting.
    pub fn primary_flag(&self) -> Option<&str> {
        self.spellings().next()
    }

    pub fn matches(&self, flag: &str) -> bool {
        self.spellings().any(|f| f == flag)
    }

    /// Name used for the option's value placeholder (`--out-dir` → `out-dir`).
    pub fn value_name(&self) -> String {
        self.primary_flag()
            .map(|f| f.trim_start_matches('-').to_string())
            .unwrap_or_else(|| "value".to_string())
    }
}

/// Category entry supplied by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Nesting depth, `0` for top-level categories.
    #[serde(default)]
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl CategoryInfo {
    pub fn new(id: impl Into<String>, level: u8) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            level,
            parent_id: None,
        }
    }
}

/// A command template definition.
///
/// # Examples
///
/// ```
/// use command_template_core::{CommandDefinition, ParameterDefinition};
///
/// let def = CommandDefinition::new("Clone repo", "git clone {{url}}")
///     .with_parameter(ParameterDefinition::required("url"));
/// assert!(def.find_parameter("url").is_some());
/// assert!(def.id.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Template with `{{name}}` placeholders.
    pub command: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
    #[serde(default)]
    pub options: Vec<OptionDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub common_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_user_created: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
}

/// Fields that only the system may set.
pub const PROTECTED_FIELDS: &[&str] = &["id", "createdAt", "isUserCreated"];

/// Fields an update may change.
pub const UPDATABLE_FIELDS: &[&str] = &[
    "name",
    "description",
    "command",
    "category",
    "tags",
    "parameters",
    "options",
    "commonCommands",
];

impl CommandDefinition {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            command: command.into(),
            parameters: Vec::new(),
            options: Vec::new(),
            category: None,
            tags: Vec::new(),
            common_commands: Vec::new(),
            is_user_created: None,
            created_at: None,
            updated_at: None,
            version: 0,
            usage_count: 0,
            last_used: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_option(mut self, option: OptionDefinition) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_common_command(mut self, command: impl Into<String>) -> Self {
        self.common_commands.push(command.into());
        self
    }

    pub fn find_parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Finds an option by any of its spellings.
    pub fn find_option(&self, flag: &str) -> Option<&OptionDefinition> {
        self.options.iter().find(|o| o.matches(flag))
    }

    /// Parameter bound to the option's value, if any.
    pub fn option_parameter(&self, option: &OptionDefinition) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| {
            p.parent_option
                .as_deref()
                .is_some_and(|parent| option.matches(parent))
        })
    }

    /// `true` when the command is a built-in the user did not author.
    pub fn is_system(&self) -> bool {
        self.is_user_created == Some(false)
    }
}

/// What a build produces.
///
/// # Examples
///
/// ```
/// use command_template_core::BuildMode;
///
/// assert_eq!("executable".parse::<BuildMode>().unwrap(), BuildMode::Executable);
/// assert!("run".parse::<BuildMode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Placeholders retained.
    #[default]
    Template,
    /// Placeholders substituted and values escaped.
    Executable,
    /// Diagnostics only, no string produced.
    Validation,
}

impl BuildMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Executable => "executable",
            Self::Validation => "validation",
        }
    }
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown build mode name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid build mode: {0}")]
pub struct UnknownBuildMode(pub String);

impl FromStr for BuildMode {
    type Err = UnknownBuildMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "template" => Ok(Self::Template),
            "executable" => Ok(Self::Executable),
            "validation" => Ok(Self::Validation),
            _ => Err(UnknownBuildMode(s.to_string())),
        }
    }
}

/// Operator appended after the composed command (`| grep x`, `> out.txt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailingSegment {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Build-time selection set. Never persisted.
///
/// # Examples
///
/// ```
/// use command_template_core::{BuildConfig, BuildMode};
///
/// let config = BuildConfig::new(BuildMode::Executable)
///     .with_option("-v")
///     .with_value("url", "https://x.git");
/// assert!(config.is_selected("-v"));
/// assert!(config.use_defaults && config.validate_required && config.escape_values);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    #[serde(default)]
    pub mode: BuildMode,
    #[serde(default)]
    pub selected_subcommands: Vec<String>,
    #[serde(default)]
    pub selected_options: BTreeSet<String>,
    #[serde(default)]
    pub parameter_values: BTreeMap<String, String>,
    /// Values for `has_value` options, keyed by any spelling of the option.
    #[serde(default)]
    pub option_values: BTreeMap<String, String>,
    #[serde(default)]
    pub trailing: Vec<TrailingSegment>,
    #[serde(default = "default_true")]
    pub use_defaults: bool,
    #[serde(default = "default_true")]
    pub validate_required: bool,
    #[serde(default = "default_true")]
    pub escape_values: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new(BuildMode::Template)
    }
}

impl BuildConfig {
    pub fn new(mode: BuildMode) -> Self {
        Self {
            mode,
            selected_subcommands: Vec::new(),
            selected_options: BTreeSet::new(),
            parameter_values: BTreeMap::new(),
            option_values: BTreeMap::new(),
            trailing: Vec::new(),
            use_defaults: true,
            validate_required: true,
            escape_values: true,
        }
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_subcommand(mut self, subcommand: impl Into<String>) -> Self {
        self.selected_subcommands.push(subcommand.into());
        self
    }

    pub fn with_option(mut self, flag: impl Into<String>) -> Self {
        self.selected_options.insert(flag.into());
        self
    }

    pub fn with_option_value(mut self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        let flag = flag.into();
        self.selected_options.insert(flag.clone());
        self.option_values.insert(flag, value.into());
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameter_values.insert(name.into(), value.into());
        self
    }

    pub fn with_trailing(mut self, symbol: impl Into<String>, target: Option<&str>) -> Self {
        self.trailing.push(TrailingSegment {
            symbol: symbol.into(),
            target: target.map(str::to_string),
        });
        self
    }

    pub fn is_selected(&self, flag: &str) -> bool {
        self.selected_options.contains(flag)
    }

    /// Whether any spelling of `option` is selected; returns the selected one.
    pub fn selected_spelling<'a>(&self, option: &'a OptionDefinition) -> Option<&'a str> {
        option.spellings().find(|f| self.is_selected(f))
    }

    /// Explicit non-blank value supplied for a parameter.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.parameter_values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Explicit non-blank value supplied for an option, under any spelling.
    pub fn option_value(&self, option: &OptionDefinition) -> Option<&str> {
        option
            .spellings()
            .filter_map(|f| self.option_values.get(f))
            .map(String::as_str)
            .find(|v| !v.trim().is_empty())
    }
}

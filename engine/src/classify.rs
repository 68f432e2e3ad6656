//! Parameter classification.
//!
//! [`classify`] maps a parameter definition and its context to a
//! requirement/level/scope/position tuple, a named category and a merged
//! rule bundle. It is a pure function; [`Classifier`] only memoizes it by a
//! SHA-256 content hash of its inputs.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

use command_template_core::{
    Category, Condition, Issue, Level, ParameterClassification, ParameterDefinition, Placement,
    Position, Priority, Requirement, Scope, ValidationResult, ValidationRules, ValuePolicy,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::validate::check_value;

static NAMED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").expect("static regex must compile")
});

/// Context a parameter is classified in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassificationContext {
    /// Subcommand the parameter is declared under, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcommand: Option<String>,
}

impl ClassificationContext {
    pub fn under_subcommand(name: impl Into<String>) -> Self {
        Self {
            subcommand: Some(name.into()),
        }
    }
}

/// Classifies a parameter.
///
/// # Examples
///
/// ```
/// use command_template_core::{Category, Level, ParameterDefinition, Position};
/// use command_template_engine::classify::{ClassificationContext, classify};
///
/// let port = ParameterDefinition::optional("port").for_option("-p");
/// let c = classify(&port, &ClassificationContext::default());
/// assert_eq!(c.level, Level::Option);
/// assert_eq!(c.position, Position::Value);
/// assert_eq!(c.category, Category::OptionalOption);
/// ```
pub fn classify(def: &ParameterDefinition, ctx: &ClassificationContext) -> ParameterClassification {
    let requirement = if def.is_required() {
        Requirement::Required
    } else if def.conditional_on.is_some() {
        Requirement::Conditional
    } else {
        Requirement::Optional
    };

    let level = def.level.unwrap_or_else(|| {
        if def.parent_option.is_some() {
            Level::Option
        } else if def.scope == Some(Scope::Global) || def.name.starts_with("global-") {
            Level::Global
        } else if ctx.subcommand.is_some() {
            Level::Subcommand
        } else {
            Level::Command
        }
    });

    let scope = def.scope.unwrap_or(match level {
        Level::Global => Scope::Global,
        Level::Subcommand => Scope::Inherited,
        Level::Option | Level::Command => Scope::Local,
    });

    let position = def.position.unwrap_or_else(|| {
        if def.parent_option.is_some() {
            Position::Value
        } else if def.is_flag {
            Position::Flag
        } else if NAMED_RE.is_match(&def.name) {
            Position::Named
        } else {
            Position::Positional
        }
    });

    ParameterClassification {
        requirement,
        level,
        scope,
        position,
        category: category_of(requirement, level),
        rules: merge_rules(requirement, level),
    }
}

fn category_of(requirement: Requirement, level: Level) -> Category {
    match (requirement, level) {
        (Requirement::Required, Level::Command) => Category::RequiredCommand,
        (Requirement::Optional, Level::Command) => Category::OptionalCommand,
        (Requirement::Required, Level::Option) => Category::RequiredOption,
        (Requirement::Optional, Level::Option) => Category::OptionalOption,
        (Requirement::Conditional, _) => Category::Conditional,
        (_, Level::Global) => Category::Global,
        _ => Category::Unknown,
    }
}

fn merge_rules(requirement: Requirement, level: Level) -> ValidationRules {
    let (must_have_value, allow_empty, priority) = match requirement {
        Requirement::Required => (ValuePolicy::Always, false, Priority::High),
        Requirement::Optional => (ValuePolicy::Never, true, Priority::Medium),
        Requirement::Conditional => (ValuePolicy::Conditional, false, Priority::High),
        Requirement::None => (ValuePolicy::Never, true, Priority::Low),
    };
    let (placement, order_matters, can_be_omitted, affects_execution) = match level {
        Level::Command | Level::Subcommand => (Placement::Flexible, true, false, true),
        Level::Option => (Placement::Fixed, false, true, false),
        Level::Global => (Placement::Flexible, false, true, true),
    };
    ValidationRules {
        must_have_value,
        allow_empty,
        priority,
        placement,
        order_matters,
        can_be_omitted,
        affects_execution,
    }
}

/// SHA-256 hex digest of the serialized (definition, context) pair.
pub fn content_hash(def: &ParameterDefinition, ctx: &ClassificationContext) -> Option<String> {
    let bytes = serde_json::to_vec(&(def, ctx)).ok()?;
    Some(format!("{:x}", Sha256::digest(&bytes)))
}

/// Entries a [`Classifier`] holds before it starts over.
pub const CACHE_CAPACITY: usize = 1024;

/// Memoizing classifier, safe to share across threads.
///
/// The cache is bounded: once it holds `capacity` entries the next miss
/// empties it before inserting.
#[derive(Debug)]
pub struct Classifier {
    cache: Mutex<HashMap<String, ParameterClassification>>,
    capacity: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_capacity(CACHE_CAPACITY)
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: Mutex::default(),
            capacity: capacity.max(1),
        }
    }

    /// Classifies `def`, reusing a cached result for identical inputs.
    pub fn classify(
        &self,
        def: &ParameterDefinition,
        ctx: &ClassificationContext,
    ) -> ParameterClassification {
        let Some(key) = content_hash(def, ctx) else {
            return classify(def, ctx);
        };

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(&key) {
            debug!(parameter = %def.name, "Classification cache hit");
            return hit.clone();
        }
        let classification = classify(def, ctx);
        if cache.len() >= self.capacity {
            debug!(entries = cache.len(), "Classification cache full, clearing");
            cache.clear();
        }
        cache.insert(key, classification.clone());
        classification
    }

    pub fn cached_entries(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn clear(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Checks a value against the parameter's classification and type.
    ///
    /// `condition_active` tells whether the parameter's condition currently
    /// holds; it is ignored for unconditional parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_template_core::{Condition, ParameterDefinition};
    /// use command_template_engine::classify::{ClassificationContext, Classifier};
    ///
    /// let classifier = Classifier::new();
    /// let ctx = ClassificationContext::default();
    /// let port = ParameterDefinition::optional("port").when(Condition::Option("-p".into()));
    ///
    /// assert!(classifier.validate_value(&port, None, &ctx, false).is_valid());
    /// assert!(!classifier.validate_value(&port, None, &ctx, true).is_valid());
    /// ```
    pub fn validate_value(
        &self,
        def: &ParameterDefinition,
        value: Option<&str>,
        ctx: &ClassificationContext,
        condition_active: bool,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();
        let classification = self.classify(def, ctx);
        let value = value.filter(|v| !v.trim().is_empty());

        let needs_value = match classification.rules.must_have_value {
            ValuePolicy::Always => true,
            ValuePolicy::Conditional => condition_active,
            ValuePolicy::Never => false,
        };

        match value {
            None if needs_value => {
                result.error(
                    Issue::MissingRequiredValue(def.name.clone()),
                    Some(&def.name),
                );
            }
            None => {}
            Some(value) => check_value(&def.name, def.data_type, &def.enum_values, value, &mut result),
        }

        result
    }
}

/// Names the option or parameter a condition refers to.
pub fn condition_target(condition: &Condition) -> &str {
    match condition {
        Condition::Option(flag) => flag,
        Condition::Parameter(name) => name,
    }
}

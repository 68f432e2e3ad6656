//! Normalisation applied before validation.

use command_template_core::{CommandDefinition, OptionDefinition};

/// Trims text fields, lowercases and deduplicates tags, and drops parameter
/// and option entries that carry no name or flag.
///
/// # Examples
///
/// ```
/// use command_template_core::CommandDefinition;
/// use command_template_manager::preprocess::preprocess;
///
/// let def = CommandDefinition::new("  Build  ", " cargo build ")
///     .with_tag("Rust")
///     .with_tag(" rust ")
///     .with_tag("");
/// let def = preprocess(def);
/// assert_eq!(def.name, "Build");
/// assert_eq!(def.command, "cargo build");
/// assert_eq!(def.tags, vec!["rust"]);
/// ```
pub fn preprocess(mut def: CommandDefinition) -> CommandDefinition {
    def.name = def.name.trim().to_string();
    def.description = def.description.trim().to_string();
    def.command = def.command.trim().to_string();
    def.category = def
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let mut tags: Vec<String> = Vec::new();
    for tag in def.tags.iter().map(|t| t.trim().to_lowercase()) {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    def.tags = tags;

    def.parameters.retain_mut(|p| {
        p.name = p.name.trim().to_string();
        p.description = p.description.trim().to_string();
        !p.name.is_empty()
    });

    def.options.retain_mut(|o| {
        normalise_option(o);
        o.primary_flag().is_some()
    });

    def.common_commands.retain_mut(|c| {
        *c = c.trim().to_string();
        !c.is_empty()
    });

    def
}

fn normalise_option(option: &mut OptionDefinition) {
    for flag in [
        &mut option.flag,
        &mut option.short_flag,
        &mut option.long_flag,
    ] {
        *flag = flag
            .take()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
    }
    option.description = option.description.trim().to_string();
}

use command_template_core::{
    BuildConfig, BuildMode, CommandDefinition, DataType, Issue, OptionDefinition,
    ParameterDefinition, TokenKind,
};
use command_template_engine::validate::{
    CreationContext, StructuralOptions, validate_build, validate_definition, validate_structure,
};
use command_template_engine::{EngineError, build, parse, render, tokenize};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn clone_definition() -> CommandDefinition {
    CommandDefinition::new("Clone repository", "git clone {{url}}")
        .with_description("Clone a git repository")
        .with_category("vcs")
        .with_parameter(
            ParameterDefinition::required("url")
                .with_type(DataType::Url)
                .with_description("Repository URL"),
        )
}

fn exec() -> BuildConfig {
    BuildConfig::new(BuildMode::Executable)
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

#[test]
fn test_executable_build_substitutes_url() {
    let def = clone_definition();
    let config = exec().with_value("url", "https://x.git");

    let validation = validate_build(&def, &config).unwrap();
    assert!(validation.is_valid(), "{:?}", validation.errors);
    assert_eq!(
        build(&def, &config).unwrap().as_deref(),
        Some("git clone https://x.git")
    );
}

#[test]
fn test_missing_url_fails_and_names_parameter() {
    let def = clone_definition();
    let config = exec();

    let validation = validate_build(&def, &config).unwrap();
    assert!(!validation.is_valid());
    assert!(validation.error_messages().iter().any(|m| m.contains("url")));

    let err = build(&def, &config).unwrap_err();
    assert_eq!(err, EngineError::MissingRequiredValue("url".into()));
    assert!(err.to_string().contains("url"));
}

#[test]
fn test_conflicting_options_name_both_flags() {
    let def = CommandDefinition::new("Tool", "tool")
        .with_option(OptionDefinition::new("-v"))
        .with_option(OptionDefinition::new("-q").conflicts_with("-v"));
    let config = exec().with_option("-v").with_option("-q");

    let validation = validate_build(&def, &config).unwrap();
    let conflicts: Vec<_> = validation
        .errors
        .iter()
        .filter(|d| matches!(d.issue, Issue::OptionConflict { .. }))
        .collect();
    assert_eq!(conflicts.len(), 1);
    assert!(conflicts[0].message.contains("-q"));
    assert!(conflicts[0].message.contains("-v"));
}

#[test]
fn test_template_and_executable_from_same_definition() {
    let def = CommandDefinition::new("Run", "docker run {{image}} {{cmd?}}")
        .with_description("Run a container")
        .with_category("containers")
        .with_parameter(ParameterDefinition::required("image").with_description("Image"))
        .with_parameter(ParameterDefinition::optional("cmd").with_description("Command"))
        .with_option(OptionDefinition::new("-d").with_description("Detach"))
        .with_option(
            OptionDefinition::new("--name")
                .with_value(DataType::String)
                .with_description("Container name"),
        );

    let template = BuildConfig::new(BuildMode::Template)
        .with_option("-d")
        .with_option("--name");
    assert_eq!(
        build(&def, &template).unwrap().as_deref(),
        Some("docker run -d --name {{name}} {{image}} [{{cmd}}]")
    );

    let executable = exec()
        .with_option("-d")
        .with_option_value("--name", "my app")
        .with_value("image", "nginx");
    let built = build(&def, &executable).unwrap().unwrap();
    assert_eq!(built, r#"docker run -d --name "my app" nginx"#);

    let values: Vec<_> = tokenize(&built).into_iter().map(|t| t.value).collect();
    assert_eq!(values, vec!["docker", "run", "-d", "--name", "my app", "nginx"]);
}

#[test]
fn test_template_selection_validates_without_values() {
    let template = BuildConfig::new(BuildMode::Template).with_option("--depth");
    let def = clone_definition().with_option(
        OptionDefinition::new("--depth")
            .with_value(DataType::Number)
            .with_description("Clone depth"),
    );
    let result = validate_build(&def, &template).unwrap();
    assert!(result.is_valid(), "{:?}", result.errors);
    assert_eq!(
        build(&def, &template).unwrap().as_deref(),
        Some("git clone --depth {{depth}} {{url}}")
    );
}

// ---------------------------------------------------------------------------
// Tokenizing and parsing
// ---------------------------------------------------------------------------

#[test]
fn test_tokenize_docker_run_with_quoted_name() {
    let tokens = tokenize(r#"docker run -d --name "my app" nginx"#);
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Argument,
            TokenKind::Argument,
            TokenKind::Option,
            TokenKind::Option,
            TokenKind::Quoted,
            TokenKind::Argument,
        ]
    );
    assert_eq!(tokens[4].text, r#""my app""#);
    assert_eq!(tokens[4].value, "my app");

    let structure = parse(&tokens);
    assert_eq!(structure.base_command.as_ref().unwrap().value, "docker");
    assert_eq!(structure.subcommands[0].value, "run");
    assert_eq!(structure.options.len(), 2);
}

#[test]
fn test_consecutive_pipes_are_rejected() {
    let structure = parse(&tokenize("cmd1 | | cmd2"));
    let result = validate_structure(&structure, &StructuralOptions::default());
    assert!(result.has_error(|i| matches!(
        i,
        Issue::ConsecutiveSeparators { first, second } if first == "|" && second == "|"
    )));
}

#[test]
fn test_descriptor_redirect_survives_build() {
    let def = CommandDefinition::new("Build", "npm run build > {{log}} 2>&1")
        .with_parameter(ParameterDefinition::required("log"));
    let config = exec().with_value("log", "build.log");
    let result = validate_build(&def, &config).unwrap();
    assert!(result.is_valid(), "{:?}", result.errors);
    assert_eq!(
        build(&def, &config).unwrap().as_deref(),
        Some("npm run build > build.log 2>&1")
    );
}

#[test]
fn test_render_normalises_spacing() {
    let structure = parse(&tokenize("cat  a.txt|grep  x>out.txt&&echo ok ;ls &"));
    assert_eq!(render(&structure), "cat a.txt | grep x > out.txt && echo ok; ls &");
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[test]
fn test_well_formed_definition_is_accepted() {
    let result = validate_definition(&clone_definition(), &CreationContext::default());
    assert!(result.is_valid(), "{:?}", result.errors);
}

#[test]
fn test_placeholder_without_parameter_is_rejected() {
    let mut def = clone_definition();
    def.command = "git clone {{url}} {{dir}}".into();
    let result = validate_definition(&def, &CreationContext::default());
    assert!(result.has_error(|i| *i == Issue::UndefinedPlaceholder("dir".into())));
}

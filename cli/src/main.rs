use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use command_template_core::{BuildConfig, BuildMode, CommandDefinition, ParameterClassification};
use command_template_engine::{AnalyzerOptions, ClassificationContext, tokenize};
use command_template_manager::{
    AnalysisInput, CommandManager, ManagerConfig, ManagerContext, ManagerError, TracingObserver,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// CLI-specific build mode enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliBuildMode {
    Template,
    Executable,
    Validation,
}

impl From<CliBuildMode> for BuildMode {
    fn from(mode: CliBuildMode) -> Self {
        match mode {
            CliBuildMode::Template => Self::Template,
            CliBuildMode::Executable => Self::Executable,
            CliBuildMode::Validation => Self::Validation,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliTokenFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "cmdtpl")]
#[command(about = "Shell command template analysis and building")]
struct Cli {
    /// Log verbosity written to stderr.
    #[arg(long, global = true, default_value = "warn")]
    log_level: LogLevel,
    /// YAML manager configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split a shell command line into classified tokens.
    Tokenize(TokenizeArgs),
    /// Analyze a raw command line or a definition's template.
    Analyze(AnalyzeArgs),
    /// Show the classification of every parameter in a definition.
    Classify(ClassifyArgs),
    /// Validate one or more command definition JSON files.
    Validate(ValidateArgs),
    /// Build a command line from a definition.
    Build(BuildArgs),
    /// Suggest values, options and examples for a partial build.
    Suggest(SuggestArgs),
}

#[derive(Debug, Args)]
struct TokenizeArgs {
    /// Command line to tokenize.
    command: String,
    /// Output format.
    #[arg(long, default_value = "text")]
    format: CliTokenFormat,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Raw command line to analyze.
    #[arg(required_unless_present = "definition", conflicts_with = "definition")]
    command: Option<String>,
    /// Definition JSON file whose template is analyzed.
    #[arg(long)]
    definition: Option<PathBuf>,
    /// Skip dangerous-pattern checks.
    #[arg(long)]
    no_security: bool,
    /// Skip operator precedence checks.
    #[arg(long)]
    no_precedence: bool,
}

#[derive(Debug, Args)]
struct ClassifyArgs {
    /// Definition JSON file.
    #[arg(long)]
    definition: PathBuf,
    /// Subcommand the parameters are classified under.
    #[arg(long)]
    subcommand: Option<String>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Definition files and/or directories containing definition JSON files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Print a JSON report instead of one line per file.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct SelectionArgs {
    /// Definition JSON file.
    #[arg(long)]
    definition: PathBuf,
    /// Parameter value as NAME=VALUE. Repeatable.
    #[arg(long = "set", value_parser = parse_key_value)]
    values: Vec<(String, String)>,
    /// Select an option by any of its spellings. Repeatable.
    #[arg(long = "option", allow_hyphen_values = true)]
    options: Vec<String>,
    /// Select an option and give it a value as FLAG=VALUE. Repeatable.
    #[arg(long = "option-value", allow_hyphen_values = true, value_parser = parse_key_value)]
    option_values: Vec<(String, String)>,
    /// Subcommand to insert after the command name. Repeatable.
    #[arg(long = "subcommand")]
    subcommands: Vec<String>,
}

impl SelectionArgs {
    fn to_config(&self, mode: BuildMode) -> BuildConfig {
        let mut config = BuildConfig::new(mode);
        for subcommand in &self.subcommands {
            config = config.with_subcommand(subcommand);
        }
        for flag in &self.options {
            config = config.with_option(flag);
        }
        for (flag, value) in &self.option_values {
            config = config.with_option_value(flag, value);
        }
        for (name, value) in &self.values {
            config = config.with_value(name, value);
        }
        config
    }
}

#[derive(Debug, Args)]
struct BuildArgs {
    #[command(flatten)]
    selection: SelectionArgs,
    /// Build mode.
    #[arg(long, default_value = "executable")]
    mode: CliBuildMode,
    /// Append a separator segment as "SYMBOL [TARGET]", e.g. "| grep error". Repeatable.
    #[arg(long = "trailing")]
    trailing: Vec<String>,
    /// Do not fall back to parameter defaults.
    #[arg(long)]
    no_defaults: bool,
    /// Leave missing required values as placeholders instead of failing.
    #[arg(long)]
    no_validate_required: bool,
    /// Substitute values verbatim.
    #[arg(long)]
    no_escape: bool,
    /// Print the full build outcome as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct SuggestArgs {
    #[command(flatten)]
    selection: SelectionArgs,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    let result = load_manager(cli.config.as_deref()).and_then(|manager| match cli.command {
        Command::Tokenize(args) => run_tokenize(args),
        Command::Analyze(args) => run_analyze(&manager, args),
        Command::Classify(args) => run_classify(&manager, args),
        Command::Validate(args) => run_validate(&manager, args),
        Command::Build(args) => run_build(&manager, args),
        Command::Suggest(args) => run_suggest(&manager, args),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_manager(path: Option<&Path>) -> Result<CommandManager, String> {
    let config = match path {
        Some(path) => ManagerConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => ManagerConfig::default(),
    };
    debug!(?config, "Manager configuration loaded");
    Ok(CommandManager::new(config))
}

/// Context for manager calls: no stored commands, lifecycle events logged.
fn context() -> ManagerContext<'static> {
    ManagerContext {
        observer: Some(&TracingObserver),
        ..ManagerContext::default()
    }
}

fn run_tokenize(args: TokenizeArgs) -> Result<(), String> {
    let tokens = tokenize(&args.command);
    match args.format {
        CliTokenFormat::Json => print_json(&tokens)?,
        CliTokenFormat::Text => {
            for token in &tokens {
                println!("{}\t{}", token.kind.as_str(), token.text);
            }
        }
    }
    Ok(())
}

fn run_analyze(manager: &CommandManager, args: AnalyzeArgs) -> Result<(), String> {
    let options = AnalyzerOptions {
        check_security: !args.no_security,
        check_precedence: !args.no_precedence,
    };
    let ctx = context();

    let outcome = match (&args.definition, &args.command) {
        (Some(path), _) => {
            let def = load_definition(path)?;
            manager.analyze_command_comprehensive(AnalysisInput::Definition(&def), &options, &ctx)
        }
        (None, Some(command)) => {
            manager.analyze_command_comprehensive(AnalysisInput::Raw(command), &options, &ctx)
        }
        (None, None) => return Err("Specify a command line or --definition".to_string()),
    };

    print_json(&outcome)
}

#[derive(Debug, Serialize)]
struct ClassifiedParameter<'a> {
    parameter: &'a str,
    classification: ParameterClassification,
}

fn run_classify(manager: &CommandManager, args: ClassifyArgs) -> Result<(), String> {
    let def = load_definition(&args.definition)?;
    let ctx = ClassificationContext {
        subcommand: args.subcommand,
    };

    let classified: Vec<_> = def
        .parameters
        .iter()
        .map(|param| ClassifiedParameter {
            parameter: &param.name,
            classification: manager.classifier().classify(param, &ctx),
        })
        .collect();

    print_json(&classified)
}

#[derive(Debug, Serialize)]
struct FileReport {
    path: PathBuf,
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

fn run_validate(manager: &CommandManager, args: ValidateArgs) -> Result<(), String> {
    let paths = collect_definition_paths(&args.inputs)?;
    info!(files = paths.len(), "Validating command definitions");

    let reports: Vec<FileReport> = paths
        .par_iter()
        .map(|path| validate_file(manager, path))
        .collect();

    let invalid = reports.iter().filter(|report| !report.valid).count();

    if args.json {
        print_json(&reports)?;
    } else {
        for report in &reports {
            if report.valid {
                println!("ok      {}", report.path.display());
            } else {
                println!(
                    "invalid {}: {}",
                    report.path.display(),
                    report.errors.join("; ")
                );
            }
            for warning in &report.warnings {
                println!("        warning: {warning}");
            }
        }
        println!(
            "Validated {} definition file(s), {invalid} invalid.",
            reports.len()
        );
    }

    if invalid > 0 {
        return Err(format!("{invalid} definition file(s) failed validation"));
    }
    Ok(())
}

fn validate_file(manager: &CommandManager, path: &Path) -> FileReport {
    let def = match load_definition(path) {
        Ok(def) => def,
        Err(err) => {
            return FileReport {
                path: path.to_path_buf(),
                valid: false,
                errors: vec![err],
                warnings: Vec::new(),
            };
        }
    };

    let outcome = manager.create_command(def, &context());
    FileReport {
        path: path.to_path_buf(),
        valid: outcome.success,
        errors: outcome.validation.error_messages(),
        warnings: outcome.validation.warning_messages(),
    }
}

fn run_build(manager: &CommandManager, args: BuildArgs) -> Result<(), String> {
    let def = load_definition(&args.selection.definition)?;

    let mut config = args.selection.to_config(args.mode.into());
    for raw in &args.trailing {
        let raw = raw.trim();
        let (symbol, target) = match raw.split_once(char::is_whitespace) {
            Some((symbol, target)) => (symbol, Some(target.trim())),
            None => (raw, None),
        };
        config = config.with_trailing(symbol, target.filter(|t| !t.is_empty()));
    }
    config.use_defaults = !args.no_defaults;
    config.validate_required = !args.no_validate_required;
    config.escape_values = !args.no_escape;

    let outcome = manager.build_command_with_context(&def, &config, &context());

    if args.json {
        print_json(&outcome)?;
    } else {
        for warning in outcome.validation.warning_messages() {
            eprintln!("warning: {warning}");
        }
        if outcome.success {
            match &outcome.built_command {
                Some(command) => println!("{command}"),
                None => println!("Definition '{}' is valid for this selection.", def.name),
            }
        }
    }

    if !outcome.success {
        return Err(outcome.validation.error_messages().join("; "));
    }
    Ok(())
}

fn run_suggest(manager: &CommandManager, args: SuggestArgs) -> Result<(), String> {
    let def = load_definition(&args.selection.definition)?;
    let partial = args.selection.to_config(BuildMode::Template);
    print_json(&manager.build_suggestions(&def, &partial))
}

fn load_definition(path: &Path) -> Result<CommandDefinition, String> {
    command_template_manager::load_definition(path).map_err(|err| match err {
        ManagerError::IoError(err) => format!("Failed to read '{}': {err}", path.display()),
        err => format!("Failed to parse definition '{}': {err}", path.display()),
    })
}

/// Expands directories to the `.json` files they contain, sorted and
/// deduplicated.
fn collect_definition_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, String> {
    let mut paths = BTreeSet::new();

    for input in inputs {
        if input.is_dir() {
            let entries = fs::read_dir(input)
                .map_err(|err| format!("Failed to read directory '{}': {err}", input.display()))?;
            for entry in entries {
                let path = entry.map_err(|err| err.to_string())?.path();
                if path.extension() == Some(OsStr::new("json")) {
                    paths.insert(path);
                }
            }
            continue;
        }

        if input.is_file() {
            if input.extension() != Some(OsStr::new("json")) {
                return Err(format!(
                    "Definition file '{}' must end in .json",
                    input.display()
                ));
            }
            paths.insert(input.clone());
            continue;
        }

        return Err(format!(
            "Definition path '{}' does not exist",
            input.display()
        ));
    }

    if paths.is_empty() {
        return Err("No definition JSON files found in provided inputs".to_string());
    }

    Ok(paths.into_iter().collect())
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(value)
        .map_err(|err| format!("Failed to serialize output: {err}"))?;
    println!("{raw}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("url=https://x.git?a=b").unwrap(),
            ("url".to_string(), "https://x.git?a=b".to_string())
        );
        assert_eq!(parse_key_value("name=").unwrap().1, "");
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_selection_to_config() {
        let selection = SelectionArgs {
            definition: PathBuf::from("x.json"),
            values: vec![("name".into(), "web".into())],
            options: vec!["-v".into()],
            option_values: vec![("-p".into(), "8080".into())],
            subcommands: vec!["run".into()],
        };
        let config = selection.to_config(BuildMode::Executable);
        assert_eq!(config.mode, BuildMode::Executable);
        assert!(config.is_selected("-v"));
        assert!(config.is_selected("-p"));
        assert_eq!(config.value("name"), Some("web"));
        assert_eq!(config.selected_subcommands, vec!["run"]);
    }

    #[test]
    fn test_cli_parses_build_arguments() {
        let cli = Cli::try_parse_from([
            "cmdtpl",
            "build",
            "--definition",
            "def.json",
            "--set",
            "url=https://x.git",
            "--mode",
            "template",
            "--trailing",
            "| grep x",
        ])
        .unwrap();
        match cli.command {
            Command::Build(args) => {
                assert!(matches!(args.mode, CliBuildMode::Template));
                assert_eq!(args.selection.values.len(), 1);
                assert_eq!(args.trailing, vec!["| grep x"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

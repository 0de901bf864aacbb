use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use form_template::{
    EngineConfig, ResolutionMode, TemplateContext, TemplateEngine, TemplateExpression,
    VariableSuggestion, resolve_document,
};
use schemars::schema_for;
use serde_json::{Map, Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Form template expression tool",
    long_about = "Parses, evaluates and autocompletes ${...} template expressions and resolves them inside JSON form documents"
)]
struct Cli {
    /// Optional JSON file with engine limits (max_depth, cache_capacity, suggestion_depth).
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Log engine activity to stderr at debug level.
    #[arg(long, global = true, alias = "debug")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Strict,
    Lenient,
}

impl From<ModeArg> for ResolutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Strict => ResolutionMode::Strict,
            ModeArg::Lenient => ResolutionMode::Lenient,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the parsed expression tree as JSON.
    Parse {
        /// Raw template string, e.g. 'Hello ${user.name}'.
        #[arg(long, value_name = "RAW")]
        expr: String,
    },
    /// Evaluate a template and print the result.
    Eval {
        /// Raw template string.
        #[arg(long, value_name = "RAW")]
        expr: String,
        /// JSON object whose keys become registered variables.
        #[arg(long, value_name = "VARS")]
        vars: Option<PathBuf>,
        /// JSON object used as the per-call context.
        #[arg(long, value_name = "CONTEXT")]
        context: Option<PathBuf>,
        /// Print the stringified result instead of JSON.
        #[arg(long)]
        string: bool,
    },
    /// List autocomplete suggestions for a partially typed expression.
    Suggest {
        /// Text typed so far, with or without the leading '${'.
        #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
        partial: String,
        /// JSON object whose keys become registered variables.
        #[arg(long, value_name = "VARS")]
        vars: Option<PathBuf>,
    },
    /// Resolve every template string inside a JSON document.
    Resolve {
        /// JSON document to resolve, e.g. a form definition.
        #[arg(long, value_name = "DOCUMENT")]
        document: PathBuf,
        /// JSON object whose keys become registered variables.
        #[arg(long, value_name = "VARS")]
        vars: Option<PathBuf>,
        /// JSON object used as the per-call context.
        #[arg(long, value_name = "CONTEXT")]
        context: Option<PathBuf>,
        /// Fail on the first broken template, or keep it verbatim.
        #[arg(long, value_enum, default_value_t = ModeArg::Strict)]
        mode: ModeArg,
        /// Write the resolved document here instead of stdout.
        #[arg(long, value_name = "OUT")]
        out: Option<PathBuf>,
    },
    /// Print JSON Schemas for the expression tree and suggestion payloads.
    Schema,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Parse { expr } => run_parse(config, &expr),
        Command::Eval {
            expr,
            vars,
            context,
            string,
        } => run_eval(config, &expr, vars, context, string),
        Command::Suggest { partial, vars } => run_suggest(config, &partial, vars),
        Command::Resolve {
            document,
            vars,
            context,
            mode,
            out,
        } => run_resolve(config, document, vars, context, mode.into(), out),
        Command::Schema => run_schema(),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // a subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let contents = fs::read_to_string(path)?;
    let config = EngineConfig::from_json_str(&contents)?;
    debug!(?config, path = %path.display(), "loaded engine config");
    Ok(config)
}

fn read_object(path: &Path) -> CliResult<Map<String, Value>> {
    let contents = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&contents)? {
        Value::Object(map) => Ok(map),
        _ => Err(format!("{} must contain a JSON object", path.display()).into()),
    }
}

fn build_engine(config: EngineConfig, vars: Option<PathBuf>) -> CliResult<TemplateEngine> {
    let mut engine = TemplateEngine::with_config(config);
    if let Some(path) = vars {
        for (name, value) in read_object(&path)? {
            engine.register_variable(name, value);
        }
    }
    Ok(engine)
}

fn load_context(path: Option<PathBuf>) -> CliResult<TemplateContext> {
    match path {
        Some(path) => Ok(TemplateContext::from(read_object(&path)?)),
        None => Ok(TemplateContext::new()),
    }
}

fn run_parse(config: EngineConfig, expr: &str) -> CliResult<()> {
    let engine = TemplateEngine::with_config(config);
    let parsed = engine.parse(expr)?;
    println!("{}", serde_json::to_string_pretty(parsed.as_ref())?);
    Ok(())
}

fn run_eval(
    config: EngineConfig,
    expr: &str,
    vars: Option<PathBuf>,
    context: Option<PathBuf>,
    string: bool,
) -> CliResult<()> {
    let engine = build_engine(config, vars)?;
    let ctx = load_context(context)?;
    if string {
        println!("{}", engine.evaluate_as_string(expr, &ctx)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&engine.evaluate(expr, &ctx)?)?);
    }
    Ok(())
}

fn run_suggest(config: EngineConfig, partial: &str, vars: Option<PathBuf>) -> CliResult<()> {
    let engine = build_engine(config, vars)?;
    let suggestions = engine.get_suggestions(partial);
    println!("{}", serde_json::to_string_pretty(&suggestions)?);
    Ok(())
}

fn run_resolve(
    config: EngineConfig,
    document_path: PathBuf,
    vars: Option<PathBuf>,
    context: Option<PathBuf>,
    mode: ResolutionMode,
    out: Option<PathBuf>,
) -> CliResult<()> {
    let engine = build_engine(config, vars)?;
    let ctx = load_context(context)?;
    let document: Value = serde_json::from_str(&fs::read_to_string(&document_path)?)?;

    let resolved = resolve_document(&engine, &document, &ctx, mode)?;
    let rendered = serde_json::to_string_pretty(&resolved)?;
    match out {
        Some(path) => {
            fs::write(&path, format!("{rendered}\n"))?;
            println!("Resolved document written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn schemas() -> Value {
    json!({
        "template_expression": schema_for!(TemplateExpression),
        "variable_suggestion": schema_for!(VariableSuggestion),
    })
}

fn run_schema() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&schemas())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, serde_json::to_string(value).expect("serialize")).expect("write");
        path
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn vars_file_registers_top_level_keys() {
        let dir = TempDir::new().expect("temp dir");
        let vars = write_json(&dir, "vars.json", &json!({ "user": { "name": "Ada" } }));
        let engine = build_engine(EngineConfig::default(), Some(vars)).expect("engine");
        assert_eq!(engine.registry().get_variable("user.name"), Some(&json!("Ada")));
    }

    #[test]
    fn vars_file_must_be_an_object() {
        let dir = TempDir::new().expect("temp dir");
        let vars = write_json(&dir, "vars.json", &json!(["not", "an", "object"]));
        let err = build_engine(EngineConfig::default(), Some(vars)).unwrap_err();
        assert!(err.to_string().contains("must contain a JSON object"));
    }

    #[test]
    fn config_file_overrides_limits() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_json(&dir, "config.json", &json!({ "cache_capacity": 0 }));
        let config = load_config(Some(&path)).expect("config");
        assert_eq!(config.cache_capacity, 0);
        assert_eq!(config.max_depth, EngineConfig::default().max_depth);
        assert_eq!(load_config(None).expect("default"), EngineConfig::default());
    }

    #[test]
    fn mode_argument_maps_to_resolution_mode() {
        assert_eq!(ResolutionMode::from(ModeArg::Lenient), ResolutionMode::Lenient);
        assert_eq!(ResolutionMode::from(ModeArg::Strict), ResolutionMode::Strict);
    }

    #[test]
    fn schemas_cover_both_payloads() {
        let value = schemas();
        assert!(value["template_expression"].is_object());
        assert!(value["variable_suggestion"].is_object());
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use outview_core::{
    check_result, next_state, DisplayType, InvocationContext, InvocationState, OutputFile,
    OutputViewMetadata, OutviewConfig, ParameterUpdate, ProviderCatalog, ProviderRegistry,
    RequestContext, ViewSession,
};

/// Check output view provider results and drive providers from the shell.
#[derive(Parser, Debug)]
#[command(name = "outview", version, about)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json, global = true)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a provider result and print its form controls
    Check {
        /// Result JSON file
        result: PathBuf,

        /// Display type the provider declares
        #[arg(long, short = 't')]
        display_type: DisplayType,
    },

    /// Compute the next invocation state after an edit
    Apply {
        /// Result JSON file declaring the interactive parameters
        #[arg(long)]
        result: PathBuf,

        #[arg(long, short = 't')]
        display_type: DisplayType,

        /// Current state JSON file; the declared values are used when omitted
        #[arg(long)]
        state: Option<PathBuf>,

        /// Changed value, as name=value (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Show provider order for an output
    Providers {
        /// Registry configuration (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output metadata JSON, e.g. '{"output-view-providers": ["plot"]}'
        #[arg(long, default_value = "{}")]
        metadata: String,
    },

    /// Run a registered provider on a local file
    Render {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Provider label
        #[arg(long, default_value = "default")]
        label: String,

        /// Output file to visualize
        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long, default_value = "local")]
        experiment_id: String,

        #[arg(long, default_value = "output")]
        output_field: String,

        /// Edit applied after the first render, as name=value (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Check {
            result,
            display_type,
        } => {
            let raw = read_json(&result)?;
            let checked = check_result(display_type, &raw)
                .with_context(|| format!("{} is not a valid {} result", result.display(), display_type))?;
            emit(cli.format, &checked)
        }

        Command::Apply {
            result,
            display_type,
            state,
            set,
        } => {
            let raw = read_json(&result)?;
            let checked = check_result(display_type, &raw)?;
            let current: Option<InvocationState> = match state {
                Some(path) => Some(
                    serde_json::from_value(read_json(&path)?)
                        .with_context(|| format!("Invalid state in {}", path.display()))?,
                ),
                None => None,
            };
            let update = parse_assignments(&set)?;
            let next = next_state(&checked.result, current.as_ref(), &update)?;
            emit(cli.format, &next)
        }

        Command::Providers { config, metadata } => {
            let config = load_config(config.as_deref())?;
            let registry = ProviderRegistry::from_config(&config, &ProviderCatalog::builtin())?;
            let selection = OutputViewMetadata::parse(&metadata).resolve(&registry);
            emit(
                cli.format,
                &serde_json::json!({
                    "category": registry.category(),
                    "providers": selection.labels(),
                    "initial": selection.initial(),
                    "fallback": selection.fallback(),
                }),
            )
        }

        Command::Render {
            config,
            label,
            file,
            experiment_id,
            output_field,
            set,
        } => {
            let config = load_config(config.as_deref())?;
            let registry = ProviderRegistry::from_config(&config, &ProviderCatalog::builtin())?;
            let output_file = match file {
                Some(path) => Some(
                    OutputFile::from_path(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => None,
            };
            let context = InvocationContext {
                request: RequestContext {
                    username: std::env::var("USER").ok(),
                    portal_base_url: config.portal_base_url.clone(),
                },
                output_field,
                experiment_id,
                output_file,
            };

            tracing::info!(label = %label, category = %registry.category(), "Rendering output view");
            let mut session = ViewSession::from_registry(&registry, &label, context)?;
            let view = if set.is_empty() {
                session.render()?
            } else {
                session.render()?;
                session.edit(&parse_assignments(&set)?)?
            };
            if let Some(error) = &view.error {
                tracing::warn!(label = %label, error = %error, "Provider fell back to download link");
            }
            emit(cli.format, view)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_json(path: &Path) -> Result<Value> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<OutviewConfig> {
    match path {
        Some(path) => OutviewConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(OutviewConfig::default()),
    }
}

/// Parse `name=value` pairs. Values that parse as JSON scalars keep their
/// type (`7`, `0.5`, `true`); anything else is a string.
fn parse_assignments(assignments: &[String]) -> Result<ParameterUpdate> {
    let mut object = serde_json::Map::new();
    for assignment in assignments {
        let Some((name, raw)) = assignment.split_once('=') else {
            bail!("Expected NAME=VALUE, got '{}'", assignment);
        };
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => v,
            _ => Value::String(raw.to_string()),
        };
        object.insert(name.trim().to_string(), value);
    }
    Ok(ParameterUpdate::from_json(&object)?)
}

fn emit<T: Serialize + ?Sized>(format: Format, value: &T) -> Result<()> {
    let text = match format {
        Format::Json => serde_json::to_string_pretty(value)?,
        Format::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", text);
    Ok(())
}

//! faultline CLI: inspect JSON error trees from the terminal.
//!
//! # Commands
//! ```bash
//! faultline stack <file.json> [--shallow]
//! faultline json  <file.json> [--all | --map <map.json>] [--exclude <exclude.json>]
//! faultline merge <base.json> <err.json>... [--field <name>] [--json]
//! faultline kinds [--kinds <kinds.json>]
//! faultline new   <Kind> [message] [--field <name>] [--additional <json>] [--json]
//! ```
//!
//! Set `RUST_LOG=faultline_core=trace` to see merge decisions on stderr.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use serde_json::Value;

use faultline_core::stack::{render_value, render_with, Depth};
use faultline_core::value::wrap_sequence;
use faultline_core::{
    add, add_at, from_value, project_value, to_client, AggregationError, ErrorRef, Exclude,
    KindRegistry, Projection,
};
use faultline_kinds::StandardKinds;

#[derive(Parser)]
#[command(
    name = "faultline",
    about = "Render, project and merge JSON error trees",
    version
)]
struct Cli {
    /// Log library decisions to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the diagnostic stack of an error document
    Stack {
        /// JSON file holding an error object or an array of them
        file: PathBuf,
        /// Only the headline, additional info and causes
        #[arg(long)]
        shallow: bool,
    },

    /// Print a redacted JSON projection of an error document
    Json {
        /// JSON file holding an error object or an array of them
        file: PathBuf,
        /// Emit every field instead of the client-safe view
        #[arg(long, conflicts_with = "map")]
        all: bool,
        /// JSON object of `source path -> output key` pairs
        #[arg(long)]
        map: Option<PathBuf>,
        /// JSON exclusion set, e.g. {"stack": true, "from": {"name": true}}
        #[arg(long)]
        exclude: Option<PathBuf>,
    },

    /// Merge error documents into a base one
    Merge {
        /// Base error document
        base: PathBuf,
        /// Errors to add, in order
        #[arg(required = true, num_args = 1..)]
        errors: Vec<PathBuf>,
        /// Attach every error under this field
        #[arg(long)]
        field: Option<String>,
        /// Output the client-safe JSON instead of the stack
        #[arg(long)]
        json: bool,
    },

    /// List the declared error kinds
    Kinds {
        /// Extra kinds to declare (JSON array of kind declarations)
        #[arg(long)]
        kinds: Option<PathBuf>,
    },

    /// Construct an error of a declared kind
    New {
        /// Kind name, e.g. UserError
        kind: String,
        /// Message (the kind default when omitted)
        message: Option<String>,
        /// Field the error belongs to
        #[arg(long)]
        field: Option<String>,
        /// Additional info as inline JSON
        #[arg(long)]
        additional: Option<String>,
        /// Extra kinds to declare (JSON array of kind declarations)
        #[arg(long)]
        kinds: Option<PathBuf>,
        /// Capture a backtrace into the stack
        #[arg(long)]
        backtrace: bool,
        /// Output the client-safe JSON instead of the stack
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Stack { file, shallow } => cmd_stack(&file, shallow),

        Commands::Json { file, all, map, exclude } => {
            cmd_json(&file, all, map.as_deref(), exclude.as_deref())
        }

        Commands::Merge { base, errors, field, json } => {
            cmd_merge(&base, &errors, field.as_deref(), json)
        }

        Commands::Kinds { kinds } => cmd_kinds(kinds.as_deref()),

        Commands::New { kind, message, field, additional, kinds, backtrace, json } => cmd_new(
            &kind,
            message.as_deref(),
            field.as_deref(),
            additional.as_deref(),
            kinds.as_deref(),
            backtrace,
            json,
        ),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ─── Command implementations ─────────────────────────────────────────────────

fn cmd_stack(file: &Path, shallow: bool) -> Result<()> {
    let value = read_json(file)?;
    let text = if shallow {
        render_with(&coerce(&value), Depth::Causes)
    } else {
        render_value(&value)
    };
    println!("{text}");
    Ok(())
}

fn cmd_json(file: &Path, all: bool, map: Option<&Path>, exclude: Option<&Path>) -> Result<()> {
    let value = read_json(file)?;

    let projection = match map {
        Some(path) => {
            let pairs: IndexMap<String, String> = serde_json::from_value(read_json(path)?)
                .with_context(|| format!("{} is not a map of strings", path.display()))?;
            Projection::Custom(pairs)
        }
        None if all => Projection::All,
        None => Projection::Default,
    };
    let exclude: Exclude = match exclude {
        Some(path) => serde_json::from_value(read_json(path)?)
            .with_context(|| format!("{} is not an exclusion set", path.display()))?,
        None => Exclude::default(),
    };

    print_json(&project_value(&value, &projection, &exclude))
}

fn cmd_merge(base: &Path, errors: &[PathBuf], field: Option<&str>, as_json: bool) -> Result<()> {
    let base_value = read_json(base)?;
    let errors = errors
        .iter()
        .map(|path| read_json(path).map(|value| from_value(&value)))
        .collect::<Result<Vec<_>>>()?;

    let mut merged = match &base_value {
        Value::Object(_) | Value::Array(_) => from_value(&base_value),
        _ => {
            return Err(AggregationError { errors }).with_context(|| base.display().to_string());
        }
    };
    for err in &errors {
        merged = match field {
            Some(field) => add_at(&merged, Some(field), err),
            None => add(&merged, err),
        };
    }
    tracing::debug!(count = errors.len(), root = %merged, "merged error documents");

    if as_json {
        print_json(&to_client(&merged))
    } else {
        println!("{}", merged.stack());
        Ok(())
    }
}

fn cmd_kinds(extra: Option<&Path>) -> Result<()> {
    let kinds = load_kinds(extra, false)?;
    let registry = kinds.registry();
    for name in registry.names() {
        if let Some(kind) = registry.get(&name) {
            println!("{kind}");
        }
    }
    println!("\n{} kinds", registry.len());
    Ok(())
}

fn cmd_new(
    kind: &str,
    message: Option<&str>,
    field: Option<&str>,
    additional: Option<&str>,
    extra: Option<&Path>,
    backtrace: bool,
    as_json: bool,
) -> Result<()> {
    let kinds = load_kinds(extra, backtrace)?;
    let mut builder = kinds
        .build(kind, message.unwrap_or_default())
        .ok_or_else(|| anyhow!("unknown kind '{kind}' (see `faultline kinds`)"))?;

    if let Some(field) = field {
        builder = builder.field(field);
    }
    if let Some(additional) = additional {
        let payload: Value =
            serde_json::from_str(additional).context("--additional is not valid JSON")?;
        builder = builder.additional(&payload);
    }
    let err = builder.finish();

    if as_json {
        print_json(&to_client(&err))
    } else {
        println!("{}", err.stack());
        Ok(())
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Arrays are shown as one `Array` record listing their entries.
fn coerce(value: &Value) -> ErrorRef {
    match value {
        Value::Array(items) if !items.is_empty() => {
            wrap_sequence(items.iter().map(from_value).collect())
        }
        other => from_value(other),
    }
}

fn load_kinds(extra: Option<&Path>, backtrace: bool) -> Result<StandardKinds> {
    let kinds = if backtrace {
        StandardKinds::new()
    } else {
        StandardKinds::without_capture()
    };
    if backtrace && !kinds.captures_stacks() {
        tracing::warn!("built without the `backtrace` feature; --backtrace has no effect");
    }
    if let Some(path) = extra {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let count = kinds
            .load_json(&content)
            .with_context(|| format!("cannot declare kinds from {}", path.display()))?;
        tracing::debug!(count, file = %path.display(), "loaded extra kinds");
    }
    Ok(kinds)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

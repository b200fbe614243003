//! Sifter CLI - compile field selections and project data through them
//!
//! Usage:
//!   sifter compile --shape <shape.json> [--fields <selection>] [--order <order>]
//!   sifter project --shape <shape.json> --data <data.json> [--fields <selection>] [--flatten]
//!   sifter check   --shape <shape.json> --fields <selection>
//!
//! Examples:
//!   sifter compile -s libro.json -f "titulo,precio,autor(nombre)" -o -autor.nombre
//!   sifter compile -s libro.json --schema models.toml -m libro -f "all,-precio" --keys
//!   sifter project -s libro.json -d libros.json -f "titulo,autor(nombre)" --flatten
//!   sifter project -s libro.json -d libros.json -p autor.nombre=Poe

use clap::{Args, Parser, Subcommand};
use sifter::config::{Settings, SettingsError};
use sifter::projection::{project, ProjectionMode};
use sifter::query::QueryObject;
use sifter::schema::{SchemaError, SchemaRegistry};
use sifter::selection::{CompileOptions, CompileOutput, Compiler, Severity};
use sifter::shape::{ShapeError, ShapeNode};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sifter")]
#[command(about = "Sifter - compile field selections and project data through them")]
#[command(version)]
struct Cli {
    /// Path to a sifter.toml (searched for when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a selection into a descriptor (printed as JSON)
    Compile {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Project a JSON document through a selection
    Project {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Path to the data JSON file
        #[arg(short, long)]
        data: PathBuf,

        /// Flatten nested results into dotted keys
        #[arg(long)]
        flatten: bool,
    },

    /// Report problems in a selection string without compiling output
    Check {
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

#[derive(Args)]
struct SelectionArgs {
    /// Path to the shape JSON file
    #[arg(short, long)]
    shape: PathBuf,

    /// Path to a schema TOML file
    #[arg(long, requires = "model")]
    schema: Option<PathBuf>,

    /// Schema model the root of the shape maps to
    #[arg(short, long)]
    model: Option<String>,

    /// Selection string, e.g. "titulo,autor(nombre)"
    #[arg(short, long)]
    fields: Option<String>,

    /// Ordering string, e.g. "-autor.nombre,titulo"
    #[arg(short, long)]
    order: Option<String>,

    /// Extra query parameters (filters, limit, offset, col, distinct)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Keys mode: honor inline filters and back-fill key fields
    #[arg(short, long)]
    keys: bool,

    /// Maximum relation nesting depth
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Error reading file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid shape: {0}")]
    Shape(#[from] ShapeError),

    #[error("Invalid schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid configuration: {0}")]
    Settings(#[from] SettingsError),

    #[error("Invalid data JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything a command needs, loaded from disk.
struct Prepared {
    shape: ShapeNode,
    query: QueryObject,
    options: CompileOptions,
    schema: Option<(SchemaRegistry, String)>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Compile { selection } => cmd_compile(&selection, &settings),
        Commands::Project {
            selection,
            data,
            flatten,
        } => cmd_project(&selection, &data, flatten, &settings),
        Commands::Check { selection } => cmd_check(&selection, &settings),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    let settings = match path {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    Ok(settings)
}

fn cmd_compile(args: &SelectionArgs, settings: &Settings) -> Result<ExitCode, CliError> {
    let prepared = prepare(args, settings)?;
    let output = compile(&prepared)?;
    print_diagnostics(&output);

    println!("{}", serde_json::to_string_pretty(&output.descriptor)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_project(
    args: &SelectionArgs,
    data_path: &Path,
    flatten: bool,
    settings: &Settings,
) -> Result<ExitCode, CliError> {
    let prepared = prepare(args, settings)?;
    let data: serde_json::Value = serde_json::from_str(&read_file(data_path)?)?;
    let output = compile(&prepared)?;
    print_diagnostics(&output);

    let mode = if flatten {
        ProjectionMode::Flatten
    } else {
        settings.projector.mode()
    };
    let projected = project(&data, &prepared.shape, &output.descriptor, mode)
        .unwrap_or(serde_json::Value::Null);

    println!("{}", serde_json::to_string_pretty(&projected)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_check(args: &SelectionArgs, settings: &Settings) -> Result<ExitCode, CliError> {
    let prepared = prepare(args, settings)?;
    let output = compile(&prepared)?;

    if output.diagnostics.is_empty() {
        println!("OK: selection is clean");
        return Ok(ExitCode::SUCCESS);
    }

    for diag in &output.diagnostics {
        println!("{}", diag);
    }
    if output.has_warnings() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn prepare(args: &SelectionArgs, settings: &Settings) -> Result<Prepared, CliError> {
    let shape = ShapeNode::from_json_str(&read_file(&args.shape)?)?;

    let mut query = QueryObject::from_pairs(args.params.iter().cloned());
    if let Some(fields) = &args.fields {
        query.fields = Some(fields.clone());
    }
    if let Some(order) = &args.order {
        query.order = Some(order.clone());
    }

    let mut options = settings.compiler.to_options();
    if args.keys {
        options.include_keys = true;
    }
    if let Some(max_depth) = args.max_depth {
        options.max_depth = max_depth;
    }

    let schema = match (&args.schema, &args.model) {
        (Some(path), Some(model)) => {
            let registry = SchemaRegistry::from_file(path)?;
            registry.require_model(model)?;
            Some((registry, model.clone()))
        }
        _ => None,
    };

    Ok(Prepared {
        shape,
        query,
        options,
        schema,
    })
}

fn compile(prepared: &Prepared) -> Result<CompileOutput, CliError> {
    let compiler =
        Compiler::new(prepared.shape.shape()).with_options(prepared.options.clone());

    let output = match &prepared.schema {
        Some((registry, model)) => {
            let schema = registry.require_model(model)?;
            compiler
                .with_schema(schema)
                .compile_with_diagnostics(&prepared.query)
        }
        None => compiler.compile_with_diagnostics(&prepared.query),
    };
    Ok(output)
}

fn print_diagnostics(output: &CompileOutput) {
    for diag in &output.diagnostics {
        if diag.severity == Severity::Warning {
            eprintln!("{}", diag);
        }
    }
}

fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

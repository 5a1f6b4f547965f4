use clap::{Parser, Subcommand, ValueEnum};
use richdoc::{
    Assoc, JsonError, Mappable, Mapping, ModelError, Node, Schema, SchemaError, SchemaSpec, Step,
    Transform, TransformError,
};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a list of steps to a document and print the result
    Apply {
        #[arg(long)]
        doc: PathBuf,
        #[arg(long)]
        steps: PathBuf,
        #[arg(long)]
        schema: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Map a position through the maps of a list of steps
    Map {
        #[arg(long)]
        steps: PathBuf,
        #[arg(long)]
        pos: usize,
        #[arg(long, value_enum, default_value_t = Side::After)]
        assoc: Side,
        #[arg(long)]
        schema: Option<PathBuf>,
    },
    /// Check a document against the schema
    Check {
        #[arg(long)]
        doc: PathBuf,
        #[arg(long)]
        schema: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Before,
    After,
}

impl From<Side> for Assoc {
    fn from(side: Side) -> Self {
        match side {
            Side::Before => Assoc::Before,
            Side::After => Assoc::After,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("{path}: {source}")]
    Json { path: String, source: JsonError },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("steps file must hold a JSON array")]
    NotAnArray,
    #[error("step {index}: {source}")]
    Step {
        index: usize,
        source: TransformError,
    },
    #[error("invalid document: {0}")]
    Invalid(#[from] ModelError),
    #[error("writing output: {0}")]
    Output(#[source] serde_json::Error),
}

#[derive(Serialize)]
struct MappedPosition {
    pos: usize,
    deleted: bool,
    deleted_before: bool,
    deleted_after: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RICHDOC_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply {
            doc,
            steps,
            schema,
            json,
        } => apply_command(&doc, &steps, schema.as_deref(), json),
        Commands::Map {
            steps,
            pos,
            assoc,
            schema,
        } => map_command(&steps, pos, assoc.into(), schema.as_deref()),
        Commands::Check { doc, schema } => check_command(&doc, schema.as_deref()),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn read_json(path: &Path) -> Result<Value, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn load_schema(path: Option<&Path>) -> Result<Schema, CliError> {
    let spec = match path {
        Some(path) => {
            let value = read_json(path)?;
            serde_json::from_value::<SchemaSpec>(value).map_err(|source| CliError::Parse {
                path: path.display().to_string(),
                source,
            })?
        }
        None => SchemaSpec::basic(),
    };
    Ok(Schema::new(spec)?)
}

fn load_doc(schema: &Schema, path: &Path) -> Result<Node, CliError> {
    let value = read_json(path)?;
    Node::from_json(schema, &value).map_err(|source| CliError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn load_steps(schema: &Schema, path: &Path) -> Result<Vec<Step>, CliError> {
    let value = read_json(path)?;
    let Value::Array(items) = value else {
        return Err(CliError::NotAnArray);
    };
    items
        .iter()
        .map(|item| {
            Step::from_json(schema, item).map_err(|source| CliError::Json {
                path: path.display().to_string(),
                source,
            })
        })
        .collect()
}

fn apply_command(
    doc: &Path,
    steps: &Path,
    schema: Option<&Path>,
    json: bool,
) -> Result<(), CliError> {
    let schema = load_schema(schema)?;
    let doc = load_doc(&schema, doc)?;
    let steps = load_steps(&schema, steps)?;
    info!(steps = steps.len(), "applying steps");

    let mut tr = Transform::new(doc);
    for (index, step) in steps.into_iter().enumerate() {
        tr.step(step)
            .map_err(|source| CliError::Step { index, source })?;
    }

    if json {
        let value = tr.doc().to_json().map_err(|source| CliError::Json {
            path: "<output>".to_string(),
            source,
        })?;
        let out = serde_json::to_string_pretty(&value).map_err(CliError::Output)?;
        println!("{out}");
    } else {
        println!("{}", tr.doc());
    }
    Ok(())
}

fn map_command(
    steps: &Path,
    pos: usize,
    assoc: Assoc,
    schema: Option<&Path>,
) -> Result<(), CliError> {
    let schema = load_schema(schema)?;
    let steps = load_steps(&schema, steps)?;
    let mapping = Mapping::from_maps(steps.iter().map(Step::get_map).collect());
    debug!(maps = mapping.len(), pos, "mapping position");

    let result = mapping.map_result(pos, assoc);
    let mapped = MappedPosition {
        pos: result.pos,
        deleted: result.deleted(),
        deleted_before: result.deleted_before(),
        deleted_after: result.deleted_after(),
    };
    let out = serde_json::to_string(&mapped).map_err(CliError::Output)?;
    println!("{out}");
    Ok(())
}

fn check_command(doc: &Path, schema: Option<&Path>) -> Result<(), CliError> {
    let schema = load_schema(schema)?;
    let doc = load_doc(&schema, doc)?;
    doc.check()?;
    println!("ok: {doc}");
    Ok(())
}

mod config;
mod logging;
mod output;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use config::{TablegraphConfig, load_config};
use logging::init_logging;
use tablegraph_core::{
    ConstraintSummary, Error as CoreError, SchemaGraph, SchemaSnapshot, attach_implied,
    attach_inferred, build_anomaly_report, build_order_report, find_rails, order_tables,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("output error: {0}")]
    Output(String),
}

type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "tablegraph", version, about = "Schema relationship graph and table ordering")]
struct Cli {
    /// Append JSON log lines to this file instead of logging to stderr.
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print insertion and deletion order for a schema snapshot.
    Order(OrderArgs),
    /// List relationships inferred from naming conventions.
    Implied(InferArgs),
    /// Report schema smells.
    Anomalies(InferArgs),
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug)]
struct OrderArgs {
    /// Schema snapshot (JSON).
    #[arg(value_name = "SNAPSHOT")]
    snapshot: PathBuf,
    /// Optional TOML config with inference options and overrides.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Skip implied constraint inference.
    #[arg(long, default_value_t = false)]
    no_implied: bool,
    /// Infer Rails `<singular>_id` relationships.
    #[arg(long, default_value_t = false)]
    rails: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report here instead of stdout.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InferArgs {
    /// Schema snapshot (JSON).
    #[arg(value_name = "SNAPSHOT")]
    snapshot: PathBuf,
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let run_id = Uuid::new_v4().to_string();
    let timer = Instant::now();
    tracing::info!(event = "run_started", run_id = %run_id);

    let result = match cli.command {
        Command::Order(args) => run_order(args, &run_id),
        Command::Implied(args) => run_implied(args),
        Command::Anomalies(args) => run_anomalies(args),
    };

    let duration_ms = timer.elapsed().as_millis();
    match &result {
        Ok(()) => {
            tracing::info!(event = "run_finished", status = "success", duration_ms = duration_ms);
        }
        Err(err) => {
            tracing::error!(
                event = "run_finished",
                status = "failed",
                error = %err,
                duration_ms = duration_ms
            );
        }
    }
    result
}

fn load_graph(path: &Path) -> CliResult<SchemaGraph> {
    let content = std::fs::read_to_string(path)?;
    let snapshot: SchemaSnapshot = serde_json::from_str(&content)?;
    tracing::info!(
        event = "snapshot_read",
        path = %path.display(),
        tables = snapshot.tables.len()
    );
    Ok(SchemaGraph::from_snapshot(&snapshot)?)
}

/// Attach inferred constraints per the config.
fn infer(graph: &mut SchemaGraph, config: &TablegraphConfig) {
    let overrides = config.overrides();
    let mut added = 0;
    if config.inference.implied {
        added += attach_implied(graph, &config.inference, &overrides).len();
    }
    if config.inference.rails {
        let rails = attach_inferred(graph, find_rails(graph, &overrides));
        tracing::info!(event = "rails_attached", count = rails.len());
        added += rails.len();
    }
    tracing::info!(event = "inference_finished", added = added);
}

fn run_order(args: OrderArgs, run_id: &str) -> CliResult<()> {
    let OrderArgs {
        snapshot,
        config,
        no_implied,
        rails,
        format,
        out,
    } = args;

    let mut config = load_config(config.as_deref())?;
    if no_implied {
        config.inference.implied = false;
    }
    if rails {
        config.inference.rails = true;
    }

    let mut graph = load_graph(&snapshot)?;
    infer(&mut graph, &config);

    let order = order_tables(&graph);
    tracing::info!(
        event = "tables_ordered",
        tables = order.insertion.len(),
        recursive = order.recursive.len(),
        skipped_remote = order.skipped_remote.len()
    );

    let mut report = build_order_report(&graph, &order);
    report.run_id = Some(run_id.to_string());
    report.generated_at = Some(chrono::Utc::now().to_rfc3339());

    let rendered = match format {
        OutputFormat::Text => output::render_order_text(&report),
        OutputFormat::Json => output::to_json(&report)?,
    };
    output::emit(out.as_deref(), &rendered)
}

fn run_implied(args: InferArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let mut graph = load_graph(&args.snapshot)?;
    infer(&mut graph, &config);

    let inferred: Vec<ConstraintSummary> = graph
        .constraints()
        .filter(|(_, constraint)| !constraint.is_real())
        .map(|(id, _)| ConstraintSummary::from_graph(&graph, id))
        .collect();

    let rendered = match args.format {
        OutputFormat::Text => output::render_constraints_text(&inferred),
        OutputFormat::Json => output::to_json(&inferred)?,
    };
    output::emit(None, &rendered)
}

fn run_anomalies(args: InferArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let mut graph = load_graph(&args.snapshot)?;
    infer(&mut graph, &config);

    let report = build_anomaly_report(&graph);
    let rendered = match args.format {
        OutputFormat::Text => output::render_anomalies_text(&report),
        OutputFormat::Json => output::to_json(&report)?,
    };
    output::emit(None, &rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablegraph_core::{Column, ColumnType, Table};

    fn artist_album() -> SchemaGraph {
        let mut graph = SchemaGraph::new();
        for (name, columns) in [("Artist", &["Id"][..]), ("Album", &["Id", "ArtistId"][..])] {
            let table = graph.add_table(Table::new(None, None, name)).unwrap();
            let mut key = None;
            for column in columns {
                let id = graph
                    .add_column(table, Column::new(*column, ColumnType::named("int")))
                    .unwrap();
                key.get_or_insert(id);
            }
            graph.set_primary_key(table, &[key.unwrap()]).unwrap();
        }
        graph
    }

    #[test]
    fn infer_attaches_per_config() {
        let mut graph = artist_album();
        infer(&mut graph, &TablegraphConfig::default());
        assert_eq!(graph.constraint_count(), 1);

        let mut config = TablegraphConfig::default();
        config.inference.implied = false;
        let mut graph = artist_album();
        infer(&mut graph, &config);
        assert_eq!(graph.constraint_count(), 0);
    }
}

//! Reconload CLI: reconcile reconnaissance output into an AD graph
//!
//! Reads one input file, applies it to either a JSON graph snapshot or a
//! running Neo4j server, and prints a summary of the outcomes.

use anyhow::{bail, Context};
use clap::Parser;
use comfy_table::{ContentArrangement, Table};
use reconload::gateway::{GraphGateway, MemoryGateway, Neo4jGateway};
use reconload::ingest::{IngestMode, IngestSummary, Ingestor, TracingSink};
use reconload::{GraphSnapshot, LoaderConfig, Neo4jConfig};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "reconload", version, about = "Load reconnaissance output into an AD graph")]
struct Cli {
    /// AD domain the records belong to, e.g. lab.local
    #[arg(short, long, env = "RECONLOAD_DOMAIN")]
    domain: String,

    /// Input file
    #[arg(short, long)]
    file: PathBuf,

    /// How the input file is read
    #[arg(long, value_enum, default_value = "properties")]
    mode: ModeArg,

    /// Shorthand for --mode sessions
    #[arg(short, long)]
    sessions: bool,

    /// Graph backend
    #[arg(long, value_enum, default_value = "memory")]
    backend: Backend,

    /// Graph snapshot to load (memory backend)
    #[arg(long)]
    graph: Option<PathBuf>,

    /// Where to write the reconciled snapshot (defaults to --graph)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Do not write the snapshot back
    #[arg(long)]
    dry_run: bool,

    /// Neo4j HTTP endpoint
    #[arg(long, default_value = "http://localhost:7474", env = "RECONLOAD_DB_URI")]
    db_uri: String,

    #[arg(short = 'u', long, default_value = "neo4j")]
    db_user: String,

    #[arg(short = 'p', long, default_value = "neo4j", env = "RECONLOAD_DB_PASSWORD", hide_env_values = true)]
    db_password: String,

    #[arg(long, default_value = "neo4j")]
    database: String,

    #[arg(long, default_value_t = 3)]
    connect_retries: u32,

    #[arg(long, default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Summary format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Properties,
    Sessions,
    Owned,
    Unowned,
}

impl From<ModeArg> for IngestMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Properties => IngestMode::Properties,
            ModeArg::Sessions => IngestMode::Sessions,
            ModeArg::Owned => IngestMode::Owned,
            ModeArg::Unowned => IngestMode::Unowned,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Backend {
    Memory,
    Neo4j,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

impl Cli {
    fn ingest_mode(&self) -> IngestMode {
        if self.sessions {
            IngestMode::Sessions
        } else {
            self.mode.into()
        }
    }

    fn neo4j_config(&self) -> Neo4jConfig {
        Neo4jConfig {
            uri: self.db_uri.clone(),
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            database: self.database.clone(),
            connect_retries: self.connect_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            ..Neo4jConfig::default()
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create log file {:?}", path))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(level)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = LoaderConfig::new(cli.domain.as_str(), cli.ingest_mode());
    info!("Ingesting {:?} for {} in {:?} mode", cli.file, config.domain, config.mode);

    let summary = match cli.backend {
        Backend::Memory => {
            let Some(graph) = cli.graph.as_ref() else {
                bail!("--graph is required with the memory backend");
            };
            let mut gateway = MemoryGateway::from_snapshot(GraphSnapshot::load(graph)?)?;
            let summary = ingest(&config, &mut gateway, &cli.file)?;

            if cli.dry_run {
                info!("Dry run, snapshot not written");
            } else {
                let output = cli.output.as_ref().unwrap_or(graph);
                gateway.snapshot().save(output)?;
            }
            summary
        }
        Backend::Neo4j => {
            if cli.graph.is_some() || cli.output.is_some() {
                warn!("--graph and --output are ignored with the neo4j backend");
            }
            let mut gateway = Neo4jGateway::connect(cli.neo4j_config())?;
            ingest(&config, &mut gateway, &cli.file)?
        }
    };

    print_summary(&summary, cli.format)
}

fn ingest<G: GraphGateway>(config: &LoaderConfig, gateway: G, file: &Path) -> anyhow::Result<IngestSummary> {
    let mut ingestor = Ingestor::new(config, gateway, TracingSink);
    let summary = ingestor
        .ingest_file(file)
        .with_context(|| format!("ingestion of {:?} stopped", file))?;
    Ok(summary)
}

fn print_summary(summary: &IngestSummary, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Outcome", "Count"]);
            table.add_row(vec!["Updated".to_string(), summary.updated.to_string()]);
            table.add_row(vec!["NotFound".to_string(), summary.not_found.to_string()]);
            table.add_row(vec![
                "RelationshipCreated".to_string(),
                summary.relationships_created.to_string(),
            ]);
            table.add_row(vec!["Skipped".to_string(), summary.skipped.to_string()]);

            println!("{}", table);
            println!("{} record(s)", summary.outcomes);
        }
    }
    Ok(())
}

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::error;

use scmdb_gmae::input::tsv::find_table;
use scmdb_gmae::input::{MemoryGeneCatalog, TsvRowSource};
use scmdb_gmae::model::grouping::GroupingScheme;
use scmdb_gmae::model::modality::{Level, Modality};
use scmdb_gmae::model::params::{DEFAULT_CLUSTERING, DEFAULT_EMBEDDING, EngineConfig, PlotRequest};
use scmdb_gmae::report::json::write_json;
use scmdb_gmae::report::text::render_heatmap_tsv;
use scmdb_gmae::tracing::init_tracing;
use scmdb_gmae::{Engine, GmaeError};

#[derive(Debug, Parser)]
#[command(name = "scmdb-gmae", version, about = "Aggregate single-cell measurements into plot-ready data")]
struct Cli {
    /// Debug logging (RUST_LOG overrides).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve gene names or IDs against the catalog.
    Resolve {
        #[arg(long)]
        data: PathBuf,
        /// Name prefix search instead of exact lookup.
        #[arg(long)]
        prefix: bool,
        #[arg(required = true)]
        tokens: Vec<String>,
    },
    /// Per-cell embedding scatter with colour-mapped values.
    Scatter(PlotArgs),
    /// Per-group value distributions.
    Box(PlotArgs),
    /// Genes x groups summary matrix, clustered on both axes.
    Heatmap {
        #[command(flatten)]
        plot: PlotArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Cells per group in the ensemble.
    Counts {
        #[command(flatten)]
        plot: PlotArgs,
        #[arg(long)]
        percentages: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Tsv,
}

#[derive(Debug, Args)]
struct PlotArgs {
    /// Data directory holding genes.tsv and the per-modality stores.
    #[arg(long)]
    data: PathBuf,
    /// JSON engine configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long)]
    ensemble: String,
    /// mCH, mCG, ... for methylation; atac or rna.
    #[arg(long)]
    modality: Modality,
    #[arg(long, default_value = DEFAULT_CLUSTERING)]
    clustering: String,
    #[arg(long, default_value = DEFAULT_EMBEDDING)]
    embedding: String,
    #[arg(long, default_value = "cluster")]
    grouping: GroupingScheme,
    #[arg(long, default_value = "original")]
    level: Level,
    #[arg(long)]
    hide_outliers: bool,
    /// Clip embedding axes to the configured quantiles.
    #[arg(long)]
    hide_embedding_outliers: bool,
    #[arg(long, default_value_t = 0.05)]
    p_lo: f64,
    #[arg(long, default_value_t = 0.95)]
    p_hi: f64,
    #[arg(long)]
    normalize_rows: bool,
    #[arg(long)]
    smoothing: bool,
    genes: Vec<String>,
}

impl PlotArgs {
    fn request(&self) -> PlotRequest {
        PlotRequest {
            ensemble: self.ensemble.clone(),
            modality: self.modality.clone(),
            clustering: self.clustering.clone(),
            embedding: self.embedding.clone(),
            grouping: self.grouping,
            level: self.level,
            outliers: !self.hide_outliers,
            hide_embedding_outliers: self.hide_embedding_outliers,
            p_lo: self.p_lo,
            p_hi: self.p_hi,
            normalize_rows: self.normalize_rows,
            smoothing: self.smoothing,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Engine(#[from] GmaeError),
    #[error("config: {0}")]
    Config(String),
    #[error("output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("output: {0}")]
    Io(#[from] std::io::Error),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli.command) {
        match &err {
            CliError::Engine(e) => {
                error!("{e}");
                eprintln!("{}", e.user_message());
            }
            other => eprintln!("{other}"),
        }
        std::process::exit(1);
    }
}

fn load_catalog(data: &Path) -> Result<MemoryGeneCatalog, CliError> {
    let path = find_table(data, "genes")
        .ok_or_else(|| CliError::Config(format!("no genes.tsv under {}", data.display())))?;
    MemoryGeneCatalog::from_tsv(&path).map_err(|e| CliError::Engine(e.into()))
}

fn load_config(args: &PlotArgs) -> Result<EngineConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)
                .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?
        }
        None => EngineConfig::default_v1(),
    };
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    // one-shot process: nothing to reuse
    config.cache_capacity = 0;
    Ok(config)
}

fn build_engine(args: &PlotArgs) -> Result<Engine, CliError> {
    let catalog = load_catalog(&args.data)?;
    let source = TsvRowSource::new(&args.data);
    Ok(Engine::new(
        Box::new(source),
        Box::new(catalog),
        load_config(args)?,
    )?)
}

fn run(command: Command) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match command {
        Command::Resolve {
            data,
            prefix,
            tokens,
        } => {
            let catalog = load_catalog(&data)?;
            let engine = Engine::new(
                Box::new(TsvRowSource::new(&data)),
                Box::new(catalog),
                EngineConfig {
                    cache_capacity: 0,
                    ..EngineConfig::default_v1()
                },
            )?;
            if prefix {
                let hits: Vec<_> = tokens.iter().flat_map(|t| engine.search_genes(t)).collect();
                write_json(&mut out, &hits)?;
            } else {
                write_json(&mut out, &engine.resolve_genes(&tokens))?;
            }
        }
        Command::Scatter(args) => {
            let engine = build_engine(&args)?;
            write_json(&mut out, &*engine.scatter(&args.genes, &args.request())?)?;
        }
        Command::Box(args) => {
            let engine = build_engine(&args)?;
            write_json(&mut out, &*engine.box_plot(&args.genes, &args.request())?)?;
        }
        Command::Heatmap { plot, format } => {
            let engine = build_engine(&plot)?;
            let payload = engine.heatmap(&plot.genes, &plot.request())?;
            match format {
                OutputFormat::Json => write_json(&mut out, &*payload)?,
                OutputFormat::Tsv => out.write_all(render_heatmap_tsv(&payload).as_bytes())?,
            }
        }
        Command::Counts { plot, percentages } => {
            let engine = build_engine(&plot)?;
            write_json(&mut out, &*engine.group_counts(&plot.request(), percentages)?)?;
        }
    }
    writeln!(out)?;
    Ok(())
}

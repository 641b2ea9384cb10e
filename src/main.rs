use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use epi_fetcher::apis::create_fetcher;
use epi_fetcher::config::Config;
use epi_fetcher::constants::get_supported_sources;
use epi_fetcher::feed::{FeedReader, FileFeedReader, HttpFeedReader};
use epi_fetcher::logging;
use epi_fetcher::metrics;
use epi_fetcher::pipeline::{PipelineContext, RunSummary};
use epi_fetcher::region::{InMemoryRegions, RegionResolver};
use epi_fetcher::storage::{InMemoryStore, SqliteStore, UpsertSink};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "epi_fetcher")]
#[command(about = "Fetches COVID-19 epidemiology feeds into a canonical record store")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML). Defaults to $FETCHER_CONFIG, then built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path, overriding the configuration
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, normalize and store one or more sources
    Run {
        /// Source codes to run (comma-separated). Defaults to the enabled sources
        #[arg(long)]
        sources: Option<String>,
        /// Replay a local CSV snapshot instead of downloading (single source only)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Normalize into memory without touching the database
        #[arg(long)]
        dry_run: bool,
    },
    /// List known sources and whether they are enabled
    List,
    /// Load an administrative division reference CSV into the database
    ImportDivisions {
        /// CSV with columns countrycode,country,adm_area_1,adm_area_2,adm_area_3,gid
        csv: PathBuf,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var("FETCHER_CONFIG").ok().map(PathBuf::from));

    let mut config = match path {
        Some(p) => Config::load(&p)?,
        None => Config::default(),
    };
    if let Some(db) = &cli.db {
        config.storage.db_path = db.clone();
    }
    Ok(config)
}

fn print_summary(summary: &RunSummary) {
    println!("\n📊 Pipeline Results for {}:", summary.source);
    println!("   Run id: {}", summary.run_id);
    println!("   Feed: {}", summary.feed_url);
    println!("   Rows read: {}", summary.rows_read);
    println!(
        "   Records: {} ({} inserted, {} updated, {} unchanged)",
        summary.records_emitted, summary.inserted, summary.updated, summary.unchanged
    );
    if summary.rows_skipped > 0 {
        println!("   ⚠️  Rows skipped (no country code): {}", summary.rows_skipped);
    }
    if summary.records_degraded > 0 {
        println!("   ⚠️  Records with unresolved region: {}", summary.records_degraded);
    }
    println!("   Duration: {:.2}s", summary.duration_secs);
}

fn run_sources(
    config: &Config,
    sources: Option<String>,
    input: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let source_names: Vec<String> = match sources {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => config.enabled_sources().into_iter().map(String::from).collect(),
    };
    if source_names.is_empty() {
        warn!("No sources enabled; nothing to do");
        return Ok(());
    }
    if input.is_some() && source_names.len() != 1 {
        bail!("--input replays a single source; name it with --sources");
    }

    let metrics_handle = match &config.metrics.snapshot_path {
        Some(_) => Some(metrics::init_metrics()?),
        None => None,
    };

    let reader: Box<dyn FeedReader> = match input {
        Some(path) => Box::new(FileFeedReader::new(path)),
        None => Box::new(HttpFeedReader::new(config.http.timeout(), &config.http.user_agent)?),
    };

    let sqlite = if dry_run {
        info!("Dry run: records stay in memory");
        None
    } else {
        Some(
            SqliteStore::open(&config.storage.db_path)
                .with_context(|| format!("opening {}", config.storage.db_path.display()))?,
        )
    };
    let memory = InMemoryStore::new();
    let sink: &dyn UpsertSink = match &sqlite {
        Some(store) => store,
        None => &memory,
    };

    let reference = config
        .regions
        .reference_csv
        .as_deref()
        .map(InMemoryRegions::load_csv)
        .transpose()?;
    let no_regions = InMemoryRegions::new();
    let resolver: &dyn RegionResolver = match (&reference, &sqlite) {
        (Some(regions), _) => regions,
        (None, Some(store)) => store,
        (None, None) => {
            warn!("No division reference configured; country names fall back to codes");
            &no_regions
        }
    };

    let mut failures = 0;
    for source in &source_names {
        let Some(fetcher) = create_fetcher(source) else {
            warn!("Unknown source specified: {}", source);
            println!("⚠️  Unknown source: {}", source);
            failures += 1;
            continue;
        };

        let ctx = PipelineContext {
            reader: reader.as_ref(),
            resolver,
            sink,
            feed_url: config.feed_url(source),
        };
        println!("🚀 Starting pipeline for {}", source);
        match fetcher.run(&ctx) {
            Ok(summary) => print_summary(&summary),
            Err(e) => {
                error!("Pipeline for {} failed: {}", source, e);
                println!("❌ {} failed: {}", source, e);
                failures += 1;
            }
        }
    }

    if dry_run {
        println!("\n🧪 Dry run kept {} records in memory", memory.count()?);
    }

    if let (Some(handle), Some(path)) = (&metrics_handle, &config.metrics.snapshot_path) {
        metrics::write_snapshot(handle, path)?;
    }

    if failures > 0 {
        bail!("{} of {} sources failed", failures, source_names.len());
    }
    Ok(())
}

fn list_sources(config: &Config) {
    println!("Known sources:");
    for source in get_supported_sources() {
        let url = config
            .feed_url(source)
            .map(str::to_string)
            .or_else(|| create_fetcher(source).map(|f| f.default_url().to_string()))
            .unwrap_or_default();
        let state = if config.is_enabled(source) { "enabled" } else { "disabled" };
        println!("  {:<10} {:<9} {}", source, state, url);
    }
}

fn import_divisions(config: &Config, csv: &Path) -> anyhow::Result<()> {
    let regions = InMemoryRegions::load_csv(csv)?;
    let store = SqliteStore::open(&config.storage.db_path)?;
    let imported = store.import_divisions(&regions)?;
    println!(
        "✅ Imported {} divisions into {}",
        imported,
        config.storage.db_path.display()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let _guard = logging::init_logging(&config.logging);

    match cli.command {
        Commands::Run {
            sources,
            input,
            dry_run,
        } => run_sources(&config, sources, input, dry_run)?,
        Commands::List => list_sources(&config),
        Commands::ImportDivisions { csv } => import_divisions(&config, &csv)?,
    }
    Ok(())
}

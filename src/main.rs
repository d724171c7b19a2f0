use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use appdex::catalog::SnapshotStorage;
use appdex::config::Settings;
use appdex::query::SubsequenceScorer;
use appdex::service::CatalogService;

#[derive(Parser)]
#[command(name = "appdex")]
#[command(about = "Searchable catalog of launchable desktop applications")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Rebuild the program catalog and persist it
    Index,

    /// Query the catalog
    Search {
        /// Query text
        query: String,

        /// Maximum number of results to print
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Watch program directories and re-index on changes
    Watch,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // For non-init commands, warn if the project is not initialized.
    if !matches!(cli.command, Commands::Init { .. }) {
        if let Err(warning) = Settings::check_init() {
            eprintln!("Warning: {warning}");
            eprintln!("Using default configuration for now.");
        }
    }

    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });
    appdex::logging::init_with_config(&settings.logging);

    if settings.parallel_threads > 0 {
        // One global pool serves both directory scans and scoring fan-out.
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.parallel_threads)
            .build_global();
    }

    match cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force).map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Configuration ready at {}", path.display());
        }

        Commands::Index => {
            let service = build_service(settings);
            service.rebuild().await;
            service.save()?;
            println!("Indexed {} programs", service.catalog().len());
        }

        Commands::Search { query, limit } => {
            let service = build_service(settings);
            service.bootstrap().await;

            let results = service.query(&query, CancellationToken::new()).await?;
            if results.is_empty() {
                println!("No matches");
            }
            for result in results.iter().take(limit) {
                if result.subtitle.is_empty() {
                    println!("{:>5}  {}", result.score, result.title);
                } else {
                    println!("{:>5}  {}  ({})", result.score, result.title, result.subtitle);
                }
            }
        }

        Commands::Watch => {
            let service = build_service(settings);
            service.bootstrap().await;

            let watcher = service.start_watching()?;
            println!(
                "Watching {} directories; Ctrl-C to stop",
                watcher.watched().len()
            );
            tokio::signal::ctrl_c().await?;
            service.save()?;
        }

        Commands::Config => {
            println!("{}", toml::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}

fn build_service(settings: Settings) -> Arc<CatalogService> {
    let storage = SnapshotStorage::new(data_path(&settings));
    Arc::new(CatalogService::new(
        settings,
        storage,
        Arc::new(SubsequenceScorer),
    ))
}

/// Resolve the snapshot directory: absolute as configured, otherwise rooted
/// at the workspace, otherwise under the platform data directory.
fn data_path(settings: &Settings) -> PathBuf {
    if settings.data_path.is_absolute() {
        return settings.data_path.clone();
    }
    match Settings::workspace_root() {
        Some(root) => root.join(&settings.data_path),
        None => dirs::data_local_dir()
            .map(|dir| dir.join("appdex"))
            .unwrap_or_else(|| settings.data_path.clone()),
    }
}

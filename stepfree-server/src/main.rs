mod config;
mod error;
mod feed;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use stepfree_core::import;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use state::AppState;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Parser)]
#[command(name = "stepfree-server", about = "Accessibility-aware footpaths and offsets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import the input data into the data directory
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, default_value = "data")]
        data_path: PathBuf,
    },
    /// Serve offsets and elevator updates over HTTP
    Serve {
        #[arg(short, long, default_value = "data")]
        data_path: PathBuf,
        /// Defaults to the configuration written by the last import
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Worker threads for precomputation, all cores when unset
        #[arg(long)]
        threads: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match Cli::parse().command {
        Command::Import { config, data_path } => run_import(&config, &data_path),
        Command::Serve {
            data_path,
            config,
            threads,
        } => {
            if let Some(threads) = threads {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()?;
            }
            let config = config.unwrap_or_else(|| data_path.join(CONFIG_FILE));
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(serve(&config, &data_path))
        }
    }
}

fn run_import(config_path: &Path, data_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::read(config_path)?;
    import(&config.import, data_path)?;
    // Written after a successful import so `serve` finds a matching setup
    config.write(&data_path.join(CONFIG_FILE))?;
    tracing::info!("Import into {} finished", data_path.display());
    Ok(())
}

async fn serve(config_path: &Path, data_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::read(config_path)?;

    let import_config = config.import.clone();
    let import_path = data_path.to_path_buf();
    let dataset =
        tokio::task::spawn_blocking(move || import(&import_config, &import_path)).await??;

    let imported = dataset.elevators.clone().unwrap_or_default();
    let state = AppState::new(dataset, &config.server);

    let feed_task = match (&config.import.elevators, config.server.feed_refresh_secs) {
        (Some(feed), Some(secs)) if secs > 0 => Some(feed::spawn_feed_refresh(
            state.accessibility.clone(),
            feed::FeedTracker::new(feed.clone(), &imported),
            Duration::from_secs(secs),
        )),
        _ => None,
    };

    let app = routes::create_router(state, config.server.max_concurrent_requests);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = feed_task {
        task.abort();
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

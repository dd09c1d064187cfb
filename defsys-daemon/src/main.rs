//! defsys daemon - backend for the strain / defense-system browser.
//!
//! A single Rust binary that provides:
//! - HTTP API over the strain, gene and defense-system database
//! - Phylogenetic tree images rendered with R and cached on disk
//! - Per-strain circos pages served from a static directory

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use defsys_daemon::config::DefsysConfig;
use defsys_daemon::render::{RscriptRunner, TreeRenderer};
use defsys_daemon::server::{create_router, AppState};
use defsys_daemon::storage::StrainBase;

/// defsys strain browser daemon
#[derive(Parser, Debug)]
#[command(name = "defsys-daemon")]
#[command(about = "HTTP backend for the defsys strain and defense-system browser")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./defsys.toml if present)
    #[arg(short, long, env = "DEFSYS_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// HTTP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to the DuckDB database file
    #[arg(long, env = "DEFSYS_DATABASE")]
    database: Option<PathBuf>,

    /// Directory for generated tree datasets, scripts and images
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Directory holding per-strain circos HTML pages
    #[arg(long)]
    circos_dir: Option<PathBuf>,

    /// Rscript executable
    #[arg(long, env = "DEFSYS_RSCRIPT")]
    rscript: Option<PathBuf>,

    /// SQL file executed against the database before serving
    #[arg(long)]
    init_sql: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the file configuration.
    fn apply(&self, config: &mut DefsysConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(database) = &self.database {
            config.database.path = database.clone();
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.render.cache_dir = cache_dir.clone();
        }
        if let Some(circos_dir) = &self.circos_dir {
            config.files.circos_dir = circos_dir.clone();
        }
        if let Some(rscript) = &self.rscript {
            config.render.rscript = rscript.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let mut config = DefsysConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    info!("Starting defsys daemon");
    info!("Database: {:?}", config.database.path);

    let db = StrainBase::open(&config.database.path)?;
    if let Some(sql_path) = &cli.init_sql {
        let sql = std::fs::read_to_string(sql_path)
            .with_context(|| format!("Failed to read init SQL: {:?}", sql_path))?;
        db.execute_batch(&sql)?;
        info!("Applied init SQL from {:?}", sql_path);
    }

    let stats = db.stats()?;
    info!(
        "Database opened: {} strains, {} defense systems, {} genes",
        stats.strains, stats.defense_systems, stats.genes
    );

    let runner = Arc::new(RscriptRunner::new(config.render.rscript.clone()));
    let renderer = TreeRenderer::new(&config.render, runner).with_context(|| {
        format!(
            "Failed to prepare tree cache directory: {:?}",
            config.render.cache_dir
        )
    })?;
    info!("Tree cache: {:?}", renderer.cache_dir());

    let state = AppState::from_store(db, renderer, config.files.clone())?;

    let router = create_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("defsys daemon listening on http://{}", addr);

    axum::serve(listener, router).await?;
    Ok(())
}

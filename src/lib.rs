use tokio::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use clap::{Parser, Subcommand};

pub mod common; // Shared types
pub mod schema;
pub mod rule;
pub mod ai;
pub mod storage;
pub mod executor;
pub mod format;
pub mod chart;
pub mod aggregate;
pub mod engine;
pub mod api;
pub mod cli;
pub mod config;
pub mod testing;

use aggregate::ReportKind;
use config::Config;
use engine::SalesEngine;

#[derive(Parser)]
#[command(name = "salesdesk")]
#[command(about = "salesdesk - Ask questions about your e-commerce sales data", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Port to listen on, overriding the config file
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Answer one question and print the JSON response
    Ask {
        /// The question, e.g. "What are my total sales?"
        question: String,
    },
    /// Render a top-10 chart to a PNG file
    Report {
        /// `sales` or `ad_spend`
        kind: ReportKind,
        /// Output path for the PNG
        #[arg(short, long, default_value = "chart.png")]
        output: PathBuf,
    },
    /// Interactive question prompt
    Repl,
    /// Initialize a new configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
        output: String,
    },
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Init needs no config, and must work before one exists
    if let Some(Commands::Init { output }) = &cli.command {
        return cli::run_init(output.clone()).await;
    }

    let env_file = config::load_env_file(None);
    let mut config = Config::load_or_default(cli.config.as_deref()).await?;
    if let Some(Commands::Serve { port: Some(port) }) = &cli.command {
        config.server.port = *port;
    }
    config.validate()?;
    init_logging(&config);
    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }

    let engine = Arc::new(build_engine(&config)?);

    match cli.command {
        Some(Commands::Ask { question }) => {
            cli::run_ask(engine, &question).await?;
        }
        Some(Commands::Report { kind, output }) => {
            cli::run_report(engine, kind, &output).await?;
        }
        Some(Commands::Repl) => {
            cli::run_repl(engine).await?;
        }
        Some(Commands::Serve { .. }) | Some(Commands::Init { .. }) | None => {
            start_server(engine, &config).await?;
        }
    }

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.logging.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        // Already installed, e.g. by a test harness
        eprintln!("Logging not initialized: {}", e);
    }
}

/// Wire the CSV store, the configured LLM provider and the PNG renderer.
///
/// Fails when the API credential is missing; nothing is served without it.
pub fn build_engine(config: &Config) -> Result<SalesEngine, Box<dyn std::error::Error>> {
    let api_key = config.api_key()?;
    let provider = ai::build_provider(&config.llm, &api_key)?;
    info!("LLM provider: {} ({})", provider.name(), config.llm.model);

    let store = storage::CsvStore::new(&config.storage.data_dir);
    for missing in store.missing_files() {
        warn!("Data file {} not found; questions on that table will fail", missing.display());
    }

    Ok(SalesEngine::new(
        Arc::new(store),
        provider,
        Arc::new(chart::BitmapBarChart::default()),
    ))
}

async fn start_server(engine: Arc<SalesEngine>, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting salesdesk...");
    let app = api::router(engine);

    let addr = config.bind_addr();
    info!("salesdesk listening on {}", addr);
    info!("API Endpoints:");
    info!("  - Ask: http://{}/ask?question=...", addr);
    info!("  - Charts: http://{}/chart/sales, http://{}/chart/ad_spend", addr, addr);
    info!("  - Health: http://{}/health", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::categories::CategoriesArgs;
use commands::run::RunArgs;
use commands::status::StatusArgs;
use std::path::PathBuf;
use tracing::Level;
use warden_broker::BrokerConfig;
use warden_core::LogLevel;

/// Warden permission broker
///
/// Inspects the category catalogue and simulates permission flows against a
/// scripted platform.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Broker configuration file (TOML)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[clap(long, global = true)]
    log_level: Option<LogLevel>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered categories
    Categories(CategoriesArgs),

    /// Print the state of every registered category
    Status(StatusArgs),

    /// Request a sequence of categories from the simulated platform
    Run(RunArgs),
}

fn tracing_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

fn init_tracing(level: LogLevel) {
    // Logs go to stderr so JSON output stays clean.
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing_level(level))
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => BrokerConfig::from_file(path)
            .await
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => BrokerConfig::default(),
    };

    init_tracing(cli.log_level.unwrap_or(config.log_level));

    match &cli.command {
        Commands::Categories(args) => commands::categories::execute(args, &config),
        Commands::Status(args) => commands::status::execute(args, config).await,
        Commands::Run(args) => commands::run::execute(args, config).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

//! Nocturne CLI - Generative Ambient Music Engine
//!
//! Command-line interface for the Nocturne engine.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nocturne::cli::{commands, Cli, Commands};
use nocturne::config::EngineConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Nocturne v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Some(cmd) => handle_command(cmd, config).await,
        None => {
            println!("Nocturne v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

async fn handle_command(cmd: Commands, config: EngineConfig) -> anyhow::Result<()> {
    let result = match cmd {
        Commands::Play(args) => commands::play(config, &args).await,
        Commands::Presets => commands::list_presets(),
        Commands::Controls => commands::list_controls(),
    };

    if let Err(err) = &result {
        for suggestion in err.recovery_suggestions() {
            eprintln!("  hint: {}", suggestion);
        }
    }
    Ok(result?)
}
